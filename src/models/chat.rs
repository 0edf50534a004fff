use serde::{ Serialize, Deserialize };
use crate::history::ConversationLog;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    User,
    Bot,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRecord {
    pub side: Side,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Flattens the log into alternating user/bot bubbles in chronological order.
pub fn render(log: &ConversationLog, show_timestamps: bool) -> Vec<DisplayRecord> {
    let stamp = |ts: Option<&String>| ts.filter(|_| show_timestamps).cloned();

    log.render_all()
        .flat_map(|turn| {
            [
                DisplayRecord {
                    side: Side::User,
                    text: turn.user_text.clone(),
                    timestamp: stamp(Some(&turn.user_timestamp)),
                },
                DisplayRecord {
                    side: Side::Bot,
                    text: turn.bot_text.clone(),
                    timestamp: stamp(turn.bot_timestamp.as_ref()),
                },
            ]
        })
        .collect()
}
