use async_trait::async_trait;
use log::{ debug, info };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use super::{ non_empty, read_body, GenerationError, Generator };
use crate::llm::{ GenerationRequest, LlmConfig, LlmType, SamplingParams };

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Client for the hosted Hugging Face text-generation inference API.
#[derive(Debug)]
pub struct HuggingFaceClient {
    http: HttpClient,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: &'a SamplingParams,
    options: InferenceOptions,
}

#[derive(Serialize)]
struct InferenceOptions {
    wait_for_model: bool,
}

#[derive(Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
    Error {
        error: String,
    },
}

impl HuggingFaceClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerationError> {
        if config.llm_type != LlmType::HuggingFace {
            return Err(GenerationError::Config("Invalid config type for HuggingFaceClient".into()));
        }
        if config.model.trim().is_empty() {
            return Err(GenerationError::Config("model id must not be empty".into()));
        }

        let http = HttpClient::builder().timeout(config.timeout).build()?;
        let api_key = config.api_key.clone().filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            info!("No Hugging Face API token configured; requests will be anonymous");
        }

        Ok(Self {
            http,
            base_url: config.base_url.clone().unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: config.model.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}", self.base_url.trim_end_matches('/'), self.model)
    }
}

#[async_trait]
impl Generator for HuggingFaceClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let url = self.endpoint();
        let payload = InferenceRequest {
            inputs: &request.prompt,
            parameters: &request.params,
            options: InferenceOptions { wait_for_model: true },
        };
        debug!("POST {} (max_new_tokens={})", url, request.params.max_new_tokens);

        let mut req = self.http.post(&url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let body = read_body(req.send().await?).await?;

        let parsed: InferenceResponse = serde_json
            ::from_str(&body)
            .map_err(|e| GenerationError::Malformed(format!("{}: {}", e, body)))?;

        match parsed {
            InferenceResponse::Batch(items) =>
                match items.into_iter().next() {
                    Some(item) => non_empty(item.generated_text),
                    None => Err(GenerationError::EmptyResponse),
                }
            InferenceResponse::Single(item) => non_empty(item.generated_text),
            InferenceResponse::Error { error } => Err(GenerationError::Backend(error)),
        }
    }

    fn llm_type(&self) -> LlmType {
        LlmType::HuggingFace
    }

    fn model(&self) -> String {
        self.model.clone()
    }
}
