pub mod moods;
pub mod prompt;
