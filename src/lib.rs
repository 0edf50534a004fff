pub mod agent;
pub mod cli;
pub mod config;
pub mod history;
pub mod llm;
pub mod models;
pub mod postprocess;
pub mod server;
pub mod websocket;

use agent::ChatAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("HTTP API Port: {:?}", args.http_port);
    info!("LLM Type: {}", args.llm_type);
    info!("Model: {}", args.model_id);
    info!("API Token Set: {}", !args.api_token.is_empty());
    info!("Request Timeout: {}s", args.request_timeout_secs);
    info!(
        "Sampling: max_new_tokens={} temperature={} top_p={} top_k={} repetition_penalty={} no_repeat_ngram_size={} do_sample={:?}",
        args.max_new_tokens,
        args.temperature,
        args.top_p,
        args.top_k,
        args.repetition_penalty,
        args.no_repeat_ngram_size,
        args.do_sample
    );
    info!("Sentence Limit: {:?}", args.sentence_limit());
    info!("Show Timestamps: {}", args.show_timestamps);
    info!("-------------------------");

    let agent = Arc::new(ChatAgent::from_args(&args)?);
    let server = Server::new(&args, agent);
    server.run().await?;

    Ok(())
}
