use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Generation Backend Args ---
    /// Generation backend type (huggingface, ollama)
    #[arg(long, env = "LLM_TYPE", default_value = "huggingface")]
    pub llm_type: String,

    /// Base URL for the generation backend (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "LLM_BASE_URL")] // No default, let adapters handle defaults if None
    pub llm_base_url: Option<String>,

    /// API token for the remote inference API
    #[arg(long, env = "HF_API_TOKEN", default_value = "")]
    pub api_token: String,

    /// Model identifier (Hugging Face repo id or Ollama model tag)
    #[arg(long, env = "MODEL_ID", default_value = "Eniiifeoluwa/mental-health-llama2-merged")]
    pub model_id: String,

    /// Timeout in seconds for a single generation request.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "120")]
    pub request_timeout_secs: u64,

    // --- Sampling Args ---
    /// Upper bound on generated tokens per reply.
    #[arg(long, env = "MAX_NEW_TOKENS", default_value = "200")]
    pub max_new_tokens: u32,

    #[arg(long, env = "TEMPERATURE", default_value = "0.5")]
    pub temperature: f32,

    #[arg(long, env = "TOP_P", default_value = "0.7")]
    pub top_p: f32,

    #[arg(long, env = "TOP_K", default_value = "50")]
    pub top_k: u32,

    #[arg(long, env = "REPETITION_PENALTY", default_value = "1.2")]
    pub repetition_penalty: f32,

    /// Block repeated n-grams of this size (0 disables).
    #[arg(long, env = "NO_REPEAT_NGRAM_SIZE", default_value = "3")]
    pub no_repeat_ngram_size: u32,

    /// Force sampling on or off. Left to the backend default when unset.
    #[arg(long, env = "DO_SAMPLE")]
    pub do_sample: Option<bool>,

    // --- Session Defaults ---
    /// Keep at most this many sentences of each reply (0 keeps everything).
    #[arg(long, env = "MAX_SENTENCES", default_value = "5")]
    pub max_sentences: usize,

    /// Include timestamps in rendered transcripts.
    #[arg(long, env = "SHOW_TIMESTAMPS", default_value = "true", action = clap::ArgAction::Set)]
    pub show_timestamps: bool,

    /// Name pre-filled into every new session's personalization.
    #[arg(long, env = "DEFAULT_USER_NAME")]
    pub default_user_name: Option<String>,

    // --- Server Args ---
    /// Host address and port for the WebSocket server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Optional API Key required for clients to connect to the WebSocket server. If set, clients must provide this key.
    #[arg(long, env = "SERVER_API_KEY")]
    pub server_api_key: Option<String>,

    /// Port for the HTTP API (health, mood presets). Disabled when unset.
    #[arg(long, env = "HTTP_PORT")]
    pub http_port: Option<u16>,
}

impl Args {
    pub fn sentence_limit(&self) -> Option<usize> {
        Some(self.max_sentences).filter(|n| *n > 0)
    }
}
