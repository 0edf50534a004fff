use crate::cli::Args;
use crate::config::moods::Mood;
use crate::config::prompt::{ build_prompt, Personalization };
use crate::history::{ ConversationLog, LogError };
use crate::llm::generation::{ new_generator, GenerationError, Generator };
use crate::llm::{ GenerationRequest, LlmConfig, LlmType, SamplingParams };
use crate::models::chat::{ render, DisplayRecord };
use crate::postprocess::post_process;

use chrono::Local;
use log::{ info, warn, error };
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Reply shown when the backend could not produce one.
pub const GENERATION_FALLBACK: &str =
    "I'm sorry, I'm having trouble responding right now. Please try again in a moment.";

const TIMESTAMP_FORMAT: &str = "%H:%M";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyInput,
    #[error(transparent)]
    Log(#[from] LogError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Answered {
        index: usize,
        reply: String,
    },
    Fallback {
        index: usize,
        reply: String,
        diagnostic: String,
    },
}

impl TurnOutcome {
    pub fn index(&self) -> usize {
        match self {
            TurnOutcome::Answered { index, .. } | TurnOutcome::Fallback { index, .. } => *index,
        }
    }

    pub fn reply(&self) -> &str {
        match self {
            TurnOutcome::Answered { reply, .. } | TurnOutcome::Fallback { reply, .. } => reply,
        }
    }

    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            TurnOutcome::Fallback { diagnostic, .. } => Some(diagnostic),
            TurnOutcome::Answered { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub max_sentences: Option<usize>,
    pub max_new_tokens: u32,
    pub show_timestamps: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_sentences: Some(5),
            max_new_tokens: SamplingParams::default().max_new_tokens,
            show_timestamps: true,
        }
    }
}

impl SessionSettings {
    pub fn from_args(args: &Args) -> Self {
        Self {
            max_sentences: args.sentence_limit(),
            max_new_tokens: args.max_new_tokens,
            show_timestamps: args.show_timestamps,
        }
    }
}

/// Everything one client owns: its conversation, personalization and toggles.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub id: String,
    pub log: ConversationLog,
    pub personalization: Personalization,
    pub settings: SessionSettings,
}

impl ChatSession {
    pub fn new(settings: SessionSettings, user_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            log: ConversationLog::new(),
            personalization: Personalization::new(user_name),
            settings,
        }
    }

    pub fn set_user_name(&mut self, name: Option<String>) {
        self.personalization.set_user_name(name);
    }

    /// `Some(0)` for `max_sentences` disables truncation. Token budgets are
    /// clamped to at least one token.
    pub fn update_settings(
        &mut self,
        max_sentences: Option<usize>,
        max_new_tokens: Option<u32>,
        show_timestamps: Option<bool>
    ) {
        if let Some(n) = max_sentences {
            self.settings.max_sentences = Some(n).filter(|n| *n > 0);
        }
        if let Some(tokens) = max_new_tokens {
            self.settings.max_new_tokens = tokens.max(1);
        }
        if let Some(show) = show_timestamps {
            self.settings.show_timestamps = show;
        }
    }

    pub fn render(&self) -> Vec<DisplayRecord> {
        render(&self.log, self.settings.show_timestamps)
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new(SessionSettings::default(), None)
    }
}

/// Runs conversation turns against the configured backend. Holds no
/// per-session state, so one instance is shared by every connection.
pub struct ChatAgent {
    generator: Arc<dyn Generator>,
    sampling: SamplingParams,
}

impl ChatAgent {
    pub fn new(generator: Arc<dyn Generator>, sampling: SamplingParams) -> Self {
        Self { generator, sampling }
    }

    pub fn from_args(args: &Args) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let llm_type: LlmType = args.llm_type.parse()?;
        let config = LlmConfig {
            llm_type,
            api_key: Some(args.api_token.clone()).filter(|k| !k.is_empty()),
            model: args.model_id.clone(),
            base_url: args.llm_base_url.clone(),
            timeout: Duration::from_secs(args.request_timeout_secs),
        };
        let generator = new_generator(&config)?;
        info!(
            "Generation backend configured: Type={}, Model={}, BaseURL={}",
            llm_type,
            config.model,
            config.base_url.as_deref().unwrap_or("adapter default")
        );

        let sampling = SamplingParams {
            max_new_tokens: args.max_new_tokens,
            temperature: args.temperature,
            top_p: args.top_p,
            top_k: args.top_k,
            repetition_penalty: args.repetition_penalty,
            no_repeat_ngram_size: args.no_repeat_ngram_size,
            do_sample: args.do_sample,
        };
        Ok(Self::new(generator, sampling))
    }

    pub fn llm_type(&self) -> LlmType {
        self.generator.llm_type()
    }

    pub fn model(&self) -> String {
        self.generator.model()
    }

    /// Runs one full turn. Blank input is rejected before anything is logged;
    /// backend failures become a fallback reply instead of an error.
    pub async fn on_send(
        &self,
        session: &mut ChatSession,
        raw_text: &str
    ) -> Result<TurnOutcome, ChatError> {
        if raw_text.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let prior_turns = session.log.len();
        let index = session.log.append_pending(raw_text, now());
        let prompt = build_prompt(raw_text, &session.personalization, prior_turns);
        let params = SamplingParams {
            max_new_tokens: session.settings.max_new_tokens,
            ..self.sampling.clone()
        };

        let outcome = match self.generator.generate(&GenerationRequest::new(prompt, params)).await {
            Ok(raw) => {
                let reply = post_process(&raw, session.settings.max_sentences);
                TurnOutcome::Answered { index, reply }
            }
            Err(e) => {
                warn!("Generation failed for session {}: {}", session.id, e);
                TurnOutcome::Fallback {
                    index,
                    reply: GENERATION_FALLBACK.to_string(),
                    diagnostic: describe(&e),
                }
            }
        };

        if let Err(e) = session.log.resolve(index, outcome.reply(), now()) {
            error!("Conversation log out of sync for session {}: {}", session.id, e);
            return Err(e.into());
        }
        Ok(outcome)
    }

    pub async fn on_mood_shortcut(
        &self,
        session: &mut ChatSession,
        mood: Mood
    ) -> Result<TurnOutcome, ChatError> {
        self.on_send(session, mood.preset_text()).await
    }

    pub fn on_clear(&self, session: &mut ChatSession) {
        info!("Clearing {} turns for session {}", session.log.len(), session.id);
        session.log.clear();
    }
}

fn now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn describe(err: &GenerationError) -> String {
    match err {
        GenerationError::Transport(e) if e.is_timeout() =>
            format!("generation backend timed out: {}", e),
        other => other.to_string(),
    }
}
