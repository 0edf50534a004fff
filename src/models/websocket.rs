use serde::{ Serialize, Deserialize };
use crate::config::moods::Mood;
use crate::models::chat::DisplayRecord;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "chat")] Chat {
        content: String,
    },
    #[serde(rename = "mood")] Mood {
        mood: Mood,
    },
    #[serde(rename = "clear")]
    Clear,
    #[serde(rename = "set_name")] SetName {
        #[serde(default)]
        name: Option<String>,
    },
    #[serde(rename = "settings")] Settings {
        #[serde(default)]
        max_sentences: Option<usize>,
        #[serde(default)]
        max_new_tokens: Option<u32>,
        #[serde(default)]
        show_timestamps: Option<bool>,
    },
    #[serde(rename = "render")]
    Render,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "transcript")] Transcript {
        records: Vec<DisplayRecord>,
    },
    #[serde(rename = "diagnostic")] Diagnostic {
        message: String,
    },
    #[serde(rename = "error")] Error {
        message: String,
    },
}
