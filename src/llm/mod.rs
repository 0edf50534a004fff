pub mod generation;

use serde::{ Deserialize, Serialize };
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmType {
    HuggingFace,
    Ollama,
}

impl fmt::Display for LlmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmType::HuggingFace => write!(f, "huggingface"),
            LlmType::Ollama => write!(f, "ollama"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
#[error("Invalid LLM type: '{0}'")]
pub struct ParseLlmTypeError(String);

impl FromStr for LlmType {
    type Err = ParseLlmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(LlmType::HuggingFace),
            "ollama" | "local" => Ok(LlmType::Ollama),
            _ => Err(ParseLlmTypeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub llm_type: LlmType,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

/// Sampling knobs sent with every generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SamplingParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub repetition_penalty: f32,
    pub no_repeat_ngram_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_sample: Option<bool>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 200,
            temperature: 0.5,
            top_p: 0.7,
            top_k: 50,
            repetition_penalty: 1.2,
            no_repeat_ngram_size: 3,
            do_sample: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub params: SamplingParams,
}

impl GenerationRequest {
    pub fn new(prompt: String, params: SamplingParams) -> Self {
        Self { prompt, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names_case_insensitively() {
        assert_eq!("HuggingFace".parse::<LlmType>(), Ok(LlmType::HuggingFace));
        assert_eq!(" ollama ".parse::<LlmType>(), Ok(LlmType::Ollama));
        assert_eq!("local".parse::<LlmType>(), Ok(LlmType::Ollama));
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = "gpt".parse::<LlmType>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid LLM type: 'gpt'");
    }

    #[test]
    fn default_sampling_matches_deployed_model_settings() {
        let params = SamplingParams::default();
        assert_eq!(params.max_new_tokens, 200);
        assert_eq!(params.top_k, 50);
        assert_eq!(params.no_repeat_ngram_size, 3);
        assert!(params.do_sample.is_none());
    }

    #[test]
    fn do_sample_omitted_from_wire_when_unset() {
        let json = serde_json::to_value(SamplingParams::default()).unwrap();
        assert!(json.get("do_sample").is_none());
        assert_eq!(json["top_k"], 50);
    }
}
