use crate::error::StoreError;
use crate::session::store::{Slot, SlotStore};
use crate::session::Message;
use tracing::info;

/// The active message sequence, mirrored to the history slot after every
/// mutation. In-memory state is updated first, so a failed write never loses
/// what the user sees.
#[derive(Debug)]
pub struct MessageStore {
    store: SlotStore,
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn restore(store: SlotStore) -> Self {
        let messages: Vec<Message> = store
            .read_json::<Vec<Message>>(Slot::ChatHistory)
            .unwrap_or_default()
            .into_iter()
            .map(Message::sanitized)
            .collect();
        info!(count = messages.len(), "restored chat history");
        Self { store, messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn append(&mut self, message: Message) -> Result<(), StoreError> {
        self.messages.push(message);
        self.persist()
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.messages.clear();
        self.persist()
    }

    /// Makes `messages` the active sequence, e.g. after loading a saved chat.
    pub fn replace(&mut self, messages: Vec<Message>) -> Result<(), StoreError> {
        self.messages = messages;
        self.persist()
    }

    fn persist(&self) -> Result<(), StoreError> {
        self.store.write_json(Slot::ChatHistory, &self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::MessageStore;
    use crate::session::store::{Slot, SlotStore};
    use crate::session::{Message, Sender};
    use std::fs;

    #[test]
    fn append_persists_and_restores_in_order() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut history = MessageStore::restore(SlotStore::new(dir.path()));
        history.append(Message::user("hello")).expect("append should persist");
        history.append(Message::bot("hi there")).expect("append should persist");

        let restored = MessageStore::restore(SlotStore::new(dir.path()));
        assert_eq!(restored.messages(), history.messages());
        assert_eq!(restored.messages()[0].sender(), Sender::User);
        assert_eq!(restored.messages()[1].text(), "hi there");
    }

    #[test]
    fn clear_persists_empty_history() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut history = MessageStore::restore(SlotStore::new(dir.path()));
        history.append(Message::user("hello")).expect("append should persist");
        history.clear().expect("clear should persist");

        let restored = MessageStore::restore(SlotStore::new(dir.path()));
        assert!(restored.is_empty());
    }

    #[test]
    fn malformed_history_restores_empty() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        fs::write(dir.path().join("chat_history.json"), "[{\"sender\":")
            .expect("fixture should write");
        let history = MessageStore::restore(SlotStore::new(dir.path()));
        assert!(history.is_empty());
    }

    #[test]
    fn history_with_bad_timestamp_keeps_message() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let store = SlotStore::new(dir.path());
        store
            .write(
                Slot::ChatHistory,
                r#"[{"sender":"bot","text":"ok","time":"Invalid Date","error":true}]"#,
            )
            .expect("fixture should write");

        let history = MessageStore::restore(store);
        assert_eq!(history.messages().len(), 1);
        assert!(history.messages()[0].time().is_none());
        assert!(history.messages()[0].is_error());
    }

    #[test]
    fn replace_swaps_the_whole_sequence() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut history = MessageStore::restore(SlotStore::new(dir.path()));
        history.append(Message::user("old")).expect("append should persist");
        history
            .replace(vec![Message::user("a"), Message::bot("b")])
            .expect("replace should persist");

        let texts: Vec<&str> = history.messages().iter().map(Message::text).collect();
        assert_eq!(texts, ["a", "b"]);
    }

    #[test]
    fn replaced_sequence_survives_restore() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let mut history = MessageStore::restore(SlotStore::new(dir.path()));
        history.append(Message::user("old")).expect("append should persist");
        history
            .replace(vec![Message::user("a"), Message::bot_error("Error: HTTP error 500")])
            .expect("replace should persist");

        let restored = MessageStore::restore(SlotStore::new(dir.path()));
        assert_eq!(restored.messages(), history.messages());
        assert_eq!(restored.messages()[0].text(), "a");
        assert!(restored.messages()[1].is_error());
    }
}
