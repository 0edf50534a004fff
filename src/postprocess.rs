//! Cleanup of raw model output into the text shown in the conversation.

use crate::config::prompt::{ BOS, END_MARKER, INST_START, SYS_END, SYS_START };

pub const EMPTY_REPLY_FALLBACK: &str = "I'm not sure how to respond to that.";

const CONTROL_TOKENS: [&str; 7] = [BOS, "</s>", "<unk>", INST_START, END_MARKER, SYS_START, SYS_END];

const TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Turns raw generated text into a display-ready reply.
///
/// Never fails. A reply emptied by the cleanup is replaced by
/// [`EMPTY_REPLY_FALLBACK`]. Applying it to its own output returns the same
/// text.
pub fn post_process(raw: &str, max_sentences: Option<usize>) -> String {
    let answer = match raw.rfind(END_MARKER) {
        Some(pos) => &raw[pos + END_MARKER.len()..],
        None => raw,
    };

    let stripped = strip_control_tokens(answer.trim());
    let normalized = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    let limited = match max_sentences {
        Some(n) if n > 0 => truncate_sentences(&normalized, n),
        _ => normalized,
    };

    let reply = ensure_terminal_punctuation(limited);
    if reply.is_empty() {
        EMPTY_REPLY_FALLBACK.to_string()
    } else {
        reply
    }
}

// Repeats until stable so that removals cannot splice a new token together.
fn strip_control_tokens(text: &str) -> String {
    let mut out = text.to_string();
    loop {
        let before = out.len();
        for token in CONTROL_TOKENS {
            if out.contains(token) {
                out = out.replace(token, "");
            }
        }
        if out.len() == before {
            return out;
        }
    }
}

fn truncate_sentences(text: &str, max_sentences: usize) -> String {
    if !text.contains('.') {
        return text.to_string();
    }

    let kept = text.split('.').take(max_sentences).collect::<Vec<_>>().join(".");
    let mut kept = kept.trim().to_string();
    if !kept.is_empty() && !kept.ends_with(TERMINATORS) {
        kept.push('.');
    }
    kept
}

fn ensure_terminal_punctuation(mut text: String) -> String {
    if !text.is_empty() && !text.ends_with(TERMINATORS) {
        text.push('.');
    }
    text
}
