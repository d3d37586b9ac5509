//! Render artifacts for the transcript, kept in step with the active history.
//!
//! egui lays the transcript out every frame, so bot replies are split,
//! parsed and highlighted once when they enter the history.

use crate::markdown::{self, PreparedBlock};
use crate::session::{Message, Sender};
use crate::transform::parse_bot_response;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReply {
    pub answer: Vec<PreparedBlock>,
    pub reasoning: Option<String>,
}

impl RenderedReply {
    fn from_message(message: &Message) -> Option<Self> {
        if message.sender() != Sender::Bot || message.is_error() {
            return None;
        }
        let reply = parse_bot_response(message.text());
        Some(Self {
            answer: markdown::prepare(&reply.main_answer),
            reasoning: reply.reasoning,
        })
    }
}

/// One entry per message. User and error bubbles render their raw text and
/// hold `None`.
#[derive(Debug, Default)]
pub struct ReplyCache {
    entries: Vec<Option<RenderedReply>>,
}

impl ReplyCache {
    pub fn build(messages: &[Message]) -> Self {
        Self {
            entries: messages.iter().map(RenderedReply::from_message).collect(),
        }
    }

    pub fn push(&mut self, message: &Message) {
        self.entries.push(RenderedReply::from_message(message));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn rebuild(&mut self, messages: &[Message]) {
        *self = Self::build(messages);
    }

    pub fn matches(&self, messages: &[Message]) -> bool {
        self.entries.len() == messages.len()
    }

    pub fn get(&self, index: usize) -> Option<&RenderedReply> {
        self.entries.get(index).and_then(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::ReplyCache;
    use crate::markdown::PreparedBlock;
    use crate::session::Message;

    #[test]
    fn only_successful_bot_replies_are_prepared() {
        let messages = vec![
            Message::user("**hi**"),
            Message::bot("<think>plan</think>**done**"),
            Message::bot_error("Error: HTTP error 500"),
        ];
        let cache = ReplyCache::build(&messages);

        assert!(cache.matches(&messages));
        assert!(cache.get(0).is_none());
        assert!(cache.get(2).is_none());
        let reply = cache.get(1).expect("bot reply should be prepared");
        assert_eq!(reply.reasoning.as_deref(), Some("plan"));
        let PreparedBlock::Text { spans, .. } = &reply.answer[0] else {
            panic!("expected a text block, got {:?}", reply.answer);
        };
        assert_eq!(spans[0].text, "done");
        assert!(spans[0].style.strong);
    }

    #[test]
    fn push_clear_and_rebuild_track_the_history() {
        let mut messages = vec![Message::user("question")];
        let mut cache = ReplyCache::build(&messages);

        let reply = Message::bot("```rust\nfn main() {}\n```");
        cache.push(&reply);
        messages.push(reply);
        assert!(cache.matches(&messages));
        assert!(matches!(
            cache.get(1).map(|reply| &reply.answer[..]),
            Some([PreparedBlock::Code(_)])
        ));

        cache.clear();
        assert!(cache.matches(&[]));
        assert!(cache.get(0).is_none());

        let loaded = vec![Message::bot("a"), Message::user("b"), Message::bot("c")];
        cache.rebuild(&loaded);
        assert!(cache.matches(&loaded));
        assert!(cache.get(0).is_some());
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
    }

    #[test]
    fn length_mismatch_is_detected() {
        let cache = ReplyCache::default();
        assert!(!cache.matches(&[Message::user("stray")]));
    }
}
