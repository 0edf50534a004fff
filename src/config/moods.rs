use serde::{ Deserialize, Serialize };
use std::str::FromStr;
use thiserror::Error;

/// One-tap mood shortcuts offered next to the message box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Anxious,
    Sad,
    Stressed,
    Lonely,
    Angry,
    Grateful,
}

#[derive(Debug, PartialEq, Eq, Error)]
#[error("Unknown mood: '{0}'")]
pub struct ParseMoodError(String);

impl Mood {
    pub const ALL: [Mood; 6] = [
        Mood::Anxious,
        Mood::Sad,
        Mood::Stressed,
        Mood::Lonely,
        Mood::Angry,
        Mood::Grateful,
    ];

    pub fn preset_text(&self) -> &'static str {
        match self {
            Mood::Anxious => "I feel anxious and I can't seem to calm down.",
            Mood::Sad => "I've been feeling really sad lately.",
            Mood::Stressed => "I'm overwhelmed and stressed out.",
            Mood::Lonely => "I feel lonely and disconnected from people.",
            Mood::Angry => "I'm feeling angry and I don't know how to handle it.",
            Mood::Grateful => "I'm feeling grateful today and want to hold on to it.",
        }
    }
}

impl FromStr for Mood {
    type Err = ParseMoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anxious" => Ok(Mood::Anxious),
            "sad" => Ok(Mood::Sad),
            "stressed" => Ok(Mood::Stressed),
            "lonely" => Ok(Mood::Lonely),
            "angry" => Ok(Mood::Angry),
            "grateful" => Ok(Mood::Grateful),
            _ => Err(ParseMoodError(s.to_string())),
        }
    }
}
