#![allow(dead_code)]

use async_trait::async_trait;
use mental_health_chat::agent::ChatAgent;
use mental_health_chat::llm::generation::{ GenerationError, Generator };
use mental_health_chat::llm::{ GenerationRequest, LlmType, SamplingParams };
use std::collections::VecDeque;
use std::sync::{ Arc, Mutex };

/// Replays canned backend results and records every request it receives.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Backend("script exhausted".into())))
    }

    fn llm_type(&self) -> LlmType {
        LlmType::Ollama
    }

    fn model(&self) -> String {
        "scripted".into()
    }
}

pub fn agent(generator: &Arc<ScriptedGenerator>) -> ChatAgent {
    ChatAgent::new(generator.clone(), SamplingParams::default())
}

pub fn reply(text: &str) -> Result<String, GenerationError> {
    Ok(text.to_string())
}
