use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use super::{ non_empty, read_body, GenerationError, Generator };
use crate::llm::{ GenerationRequest, LlmConfig, LlmType, SamplingParams };

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Client for a locally served model through Ollama's generate endpoint.
#[derive(Debug)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    // The prompt already carries the instruction template.
    raw: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    repeat_penalty: f32,
}

impl From<&SamplingParams> for GenerateOptions {
    fn from(params: &SamplingParams) -> Self {
        // Greedy decoding when sampling is explicitly disabled.
        let temperature = match params.do_sample {
            Some(false) => 0.0,
            _ => params.temperature,
        };
        Self {
            num_predict: params.max_new_tokens,
            temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            repeat_penalty: params.repetition_penalty,
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl OllamaClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerationError> {
        if config.llm_type != LlmType::Ollama {
            return Err(GenerationError::Config("Invalid config type for OllamaClient".into()));
        }
        if config.model.trim().is_empty() {
            return Err(GenerationError::Config("model tag must not be empty".into()));
        }

        Ok(Self {
            http: HttpClient::builder().timeout(config.timeout).build()?,
            base_url: config.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Generator for OllamaClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        if request.params.no_repeat_ngram_size > 0 {
            debug!("Ollama has no n-gram repeat block; relying on repeat_penalty instead");
        }
        let payload = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
            raw: true,
            options: GenerateOptions::from(&request.params),
        };

        let resp = self.http.post(&url).json(&payload).send().await?;
        let body = read_body(resp).await?;
        let data: GenerateResponse = serde_json
            ::from_str(&body)
            .map_err(|e| GenerationError::Malformed(format!("{}: {}", e, body)))?;

        match (data.response, data.error) {
            (_, Some(error)) => Err(GenerationError::Backend(error)),
            (Some(text), None) => non_empty(text),
            (None, None) => Err(GenerationError::Malformed("missing 'response' field".into())),
        }
    }

    fn llm_type(&self) -> LlmType {
        LlmType::Ollama
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}
