//! Normalization of raw bot replies before they are rendered.
//!
//! Model output frequently pads emphasis markers with spaces (`** bold **`),
//! which markdown renderers refuse to treat as emphasis, and may carry a
//! `<think>...</think>` reasoning section that is shown collapsed instead of
//! inline with the answer.

use once_cell::sync::Lazy;
use regex::Regex;

static PADDED_STRONG_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*\s+([^*]+?)\s+\*\*").expect("valid regex"));
static PADDED_EMPHASIS_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\s+([^*]+?)\s+\*").expect("valid regex"));
static PADDED_STRONG_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__\s+([^_]+?)\s+__").expect("valid regex"));
static PADDED_EMPHASIS_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_\s+([^_]+?)\s+_").expect("valid regex"));
static THINK_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>(.*?)</think>").expect("valid regex"));

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Reply text as it arrives from the backend: either one string or a list of
/// fragments that are joined line by line.
#[derive(Debug, Clone, Copy)]
pub enum ReplyText<'a> {
    Whole(&'a str),
    Fragments(&'a [String]),
}

impl<'a> From<&'a str> for ReplyText<'a> {
    fn from(text: &'a str) -> Self {
        ReplyText::Whole(text)
    }
}

impl<'a> From<&'a [String]> for ReplyText<'a> {
    fn from(fragments: &'a [String]) -> Self {
        ReplyText::Fragments(fragments)
    }
}

impl ReplyText<'_> {
    fn joined(self) -> String {
        match self {
            ReplyText::Whole(text) => text.to_string(),
            ReplyText::Fragments(fragments) => fragments.join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub main_answer: String,
    pub reasoning: Option<String>,
}

fn normalize_once(text: &str) -> String {
    let fixed = PADDED_STRONG_STAR.replace_all(text, "**${1}**");
    let fixed = PADDED_EMPHASIS_STAR.replace_all(&fixed, "*${1}*");
    let fixed = PADDED_STRONG_UNDERSCORE.replace_all(&fixed, "__${1}__");
    let fixed = PADDED_EMPHASIS_UNDERSCORE.replace_all(&fixed, "_${1}_");
    fixed.replace("\r\n", "\n").replace('\r', "\n")
}

/// Collapses padded emphasis markers and normalizes line endings.
///
/// A single pass can expose a new padded pair (`* a * b *`), so passes repeat
/// until the text is stable. Every pass that changes the text makes it
/// shorter, which bounds the loop.
pub fn preprocess_markdown<'a>(text: impl Into<ReplyText<'a>>) -> String {
    let mut current = text.into().joined();
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Splits a reply into the answer to render and the optional reasoning
/// section.
///
/// Only the first `<think>` block becomes the reasoning; every block is
/// removed from the answer.
pub fn parse_bot_response<'a>(text: impl Into<ReplyText<'a>>) -> ParsedReply {
    let text = preprocess_markdown(text);
    if !(text.contains(THINK_OPEN) && text.contains(THINK_CLOSE)) {
        return ParsedReply {
            main_answer: text,
            reasoning: None,
        };
    }

    let main_answer = THINK_BLOCK.replace_all(&text, "").trim().to_string();
    let reasoning = THINK_BLOCK
        .captures(&text)
        .and_then(|captures| captures.get(1))
        .map(|inner| inner.as_str().trim().to_string())
        .filter(|inner| !inner.is_empty());

    ParsedReply {
        main_answer,
        reasoning,
    }
}
