use thiserror::Error;

/// Bot text shown while a reply is being generated.
pub const PENDING_REPLY: &str = "…";

#[derive(Debug, PartialEq, Eq, Error)]
pub enum LogError {
    #[error("turn {index} cannot be resolved (log holds {len} turns, last one pending: {pending})")]
    IndexOutOfRange {
        index: usize,
        len: usize,
        pending: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationTurn {
    pub user_text: String,
    pub bot_text: String,
    pub user_timestamp: String,
    pub bot_timestamp: Option<String>,
}

impl ConversationTurn {
    pub fn is_pending(&self) -> bool {
        self.bot_timestamp.is_none()
    }
}

/// Append-only, in-memory conversation. The only mutation besides appending
/// is filling in the reply of the newest pending turn.
#[derive(Clone, Debug, Default)]
pub struct ConversationLog {
    turns: Vec<ConversationTurn>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn append_pending(&mut self, user_text: impl Into<String>, timestamp: impl Into<String>) -> usize {
        self.turns.push(ConversationTurn {
            user_text: user_text.into(),
            bot_text: PENDING_REPLY.to_string(),
            user_timestamp: timestamp.into(),
            bot_timestamp: None,
        });
        self.turns.len() - 1
    }

    pub fn resolve(
        &mut self,
        index: usize,
        bot_text: impl Into<String>,
        timestamp: impl Into<String>
    ) -> Result<(), LogError> {
        let len = self.turns.len();
        let pending = self.turns.last().map_or(false, ConversationTurn::is_pending);
        if len == 0 || index != len - 1 || !pending {
            return Err(LogError::IndexOutOfRange { index, len, pending });
        }

        let turn = &mut self.turns[index];
        turn.bot_text = bot_text.into();
        turn.bot_timestamp = Some(timestamp.into());
        Ok(())
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn render_all(&self) -> impl Iterator<Item = &ConversationTurn> + '_ {
        self.turns.iter()
    }
}
