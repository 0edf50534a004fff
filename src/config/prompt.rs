//! Llama-2 instruction prompt assembly.
//!
//! User text is embedded as-is. A message containing [`END_MARKER`] closes the
//! instruction block early; this is a known prompt-injection gap.

pub const BOS: &str = "<s>";
pub const INST_START: &str = "[INST]";
pub const END_MARKER: &str = "[/INST]";
pub const SYS_START: &str = "<<SYS>>";
pub const SYS_END: &str = "<</SYS>>";

pub const PERSONA: &str =
    "You are a helpful and empathetic mental health assistant. \
Listen carefully, respond with warmth and validation, and offer gentle, practical coping suggestions. \
Never diagnose conditions or prescribe medication. \
If someone may be in danger, encourage them to contact local emergency services or a crisis line.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Personalization {
    pub user_name: Option<String>,
}

impl Personalization {
    pub fn new(user_name: Option<String>) -> Self {
        let mut p = Self::default();
        p.set_user_name(user_name);
        p
    }

    /// Blank names clear the personalization.
    pub fn set_user_name(&mut self, name: Option<String>) {
        self.user_name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
    }

    fn header_lines(&self, prior_turns: usize) -> Option<String> {
        let name = self.user_name.as_deref()?;
        let history = match prior_turns {
            0 => "This is the start of your conversation.".to_string(),
            1 => "You have exchanged 1 message so far.".to_string(),
            n => format!("You have exchanged {} messages so far.", n),
        };
        Some(
            format!("The user's name is {}. Address them by name when it feels natural. {}", name, history)
        )
    }
}

pub fn build_prompt(user_text: &str, personalization: &Personalization, prior_turns: usize) -> String {
    let mut system = String::from(PERSONA);
    if let Some(lines) = personalization.header_lines(prior_turns) {
        system.push('\n');
        system.push_str(&lines);
    }

    format!(
        "{bos}{inst} {sys}\n{system}\n{sys_end}\n\n{user} {end}",
        bos = BOS,
        inst = INST_START,
        sys = SYS_START,
        system = system,
        sys_end = SYS_END,
        user = user_text,
        end = END_MARKER
    )
}
