pub mod huggingface;
pub mod ollama;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use super::{ GenerationRequest, LlmConfig, LlmType };
use self::huggingface::HuggingFaceClient;
use self::ollama::OllamaClient;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request to generation backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("generation backend returned HTTP {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("generation backend reported an error: {0}")]
    Backend(String),
    #[error("malformed generation response: {0}")]
    Malformed(String),
    #[error("generation backend returned an empty response")]
    EmptyResponse,
    #[error("invalid generation backend configuration: {0}")]
    Config(String),
}

/// A text-completion backend. One call per conversation turn, no retries.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    fn llm_type(&self) -> LlmType;
    fn model(&self) -> String;
}

pub fn new_generator(config: &LlmConfig) -> Result<Arc<dyn Generator>, GenerationError> {
    let generator: Arc<dyn Generator> = match config.llm_type {
        LlmType::HuggingFace => Arc::new(HuggingFaceClient::from_config(config)?),
        LlmType::Ollama => Arc::new(OllamaClient::from_config(config)?),
    };
    Ok(generator)
}

pub(crate) fn non_empty(text: String) -> Result<String, GenerationError> {
    if text.trim().is_empty() {
        Err(GenerationError::EmptyResponse)
    } else {
        Ok(text)
    }
}

pub(crate) async fn read_body(resp: reqwest::Response) -> Result<String, GenerationError> {
    let status = resp.status();
    let body = resp.text().await?;
    if !status.is_success() {
        return Err(GenerationError::Status { status: status.as_u16(), body });
    }
    Ok(body)
}
