use crate::error::CompletionError;
use crate::event::AppEvent;
use crate::session::Message;
use serde::{Deserialize, Serialize};
use std::sync::mpsc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    response: String,
}

/// Result of one completion request. Failures are ordinary values so the
/// caller always renders something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Reply(String),
    Failed(String),
}

impl CompletionOutcome {
    pub fn into_message(self) -> Message {
        match self {
            CompletionOutcome::Reply(text) => Message::bot(text),
            CompletionOutcome::Failed(reason) => Message::bot_error(format!("Error: {reason}")),
        }
    }
}

#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    chat_url: String,
    tx: mpsc::Sender<AppEvent>,
    runtime_handle: Handle,
}

impl CompletionClient {
    /// Must be called from inside a tokio runtime; requests are spawned onto
    /// that runtime.
    pub fn new(endpoint: &str, tx: mpsc::Sender<AppEvent>) -> Result<Self, CompletionError> {
        let runtime_handle =
            Handle::try_current().map_err(|err| CompletionError::NoRuntime(err.to_string()))?;
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            chat_url: format!("{}/chat", endpoint.trim_end_matches('/')),
            tx,
            runtime_handle,
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// Fires one request in the background and reports the outcome as
    /// `AppEvent::CompletionFinished`.
    pub fn send(&self, text: String) {
        let client = self.clone();
        self.runtime_handle.spawn(async move {
            let outcome = client.complete(&text).await;
            if client.tx.send(AppEvent::CompletionFinished(outcome)).is_err() {
                warn!("completion finished after the UI closed its event channel");
            }
        });
    }

    pub async fn complete(&self, text: &str) -> CompletionOutcome {
        match self.request(text).await {
            Ok(reply) => CompletionOutcome::Reply(reply),
            Err(err) => {
                warn!(url = %self.chat_url, "completion request failed: {err}");
                CompletionOutcome::Failed(err.to_string())
            }
        }
    }

    async fn request(&self, text: &str) -> Result<String, CompletionError> {
        debug!(url = %self.chat_url, chars = text.len(), "sending completion request");
        let response = self
            .http
            .post(&self.chat_url)
            .json(&ChatRequest { message: text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Status(status.as_u16()));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|err| CompletionError::Body(err.to_string()))?;
        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::{CompletionClient, CompletionOutcome};
    use crate::event::AppEvent;
    use crate::session::Sender;
    use mockito::Matcher;
    use serde_json::json;
    use std::sync::mpsc;
    use std::time::Duration;

    #[tokio::test]
    async fn posts_message_and_returns_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({ "message": "hello" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response":"Hi! **How** can I help?"}"#)
            .create_async()
            .await;

        let (tx, _rx) = mpsc::channel();
        let client = CompletionClient::new(&server.url(), tx).expect("client should build");
        let outcome = client.complete("hello").await;

        assert_eq!(
            outcome,
            CompletionOutcome::Reply("Hi! **How** can I help?".to_string())
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_becomes_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat")
            .with_status(500)
            .create_async()
            .await;

        let (tx, _rx) = mpsc::channel();
        let client = CompletionClient::new(&server.url(), tx).expect("client should build");
        let message = client.complete("hello").await.into_message();

        assert_eq!(message.sender(), Sender::Bot);
        assert!(message.is_error());
        assert_eq!(message.text(), "Error: HTTP error 500");
    }

    #[tokio::test]
    async fn wrong_body_shape_becomes_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer":"nope"}"#)
            .create_async()
            .await;

        let (tx, _rx) = mpsc::channel();
        let client = CompletionClient::new(&server.url(), tx).expect("client should build");
        let outcome = client.complete("hello").await;

        assert!(matches!(outcome, CompletionOutcome::Failed(reason) if reason.starts_with("unexpected response body")));
    }

    #[tokio::test]
    async fn transport_failure_becomes_error_message() {
        let (tx, _rx) = mpsc::channel();
        let client = CompletionClient::new("http://127.0.0.1:1", tx).expect("client should build");
        let message = client.complete("hello").await.into_message();

        assert!(message.is_error());
        assert!(message.text().starts_with("Error: "));
        assert!(message.text().len() > "Error: ".len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn send_delivers_outcome_on_channel() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response":"pong"}"#)
            .create_async()
            .await;

        let (tx, rx) = mpsc::channel();
        let client = CompletionClient::new(&format!("{}/", server.url()), tx)
            .expect("client should build");
        client.send("ping".to_string());

        let event = tokio::task::spawn_blocking(move || rx.recv_timeout(Duration::from_secs(10)))
            .await
            .expect("blocking task should join")
            .expect("event should arrive");
        let AppEvent::CompletionFinished(outcome) = event;
        assert_eq!(outcome, CompletionOutcome::Reply("pong".to_string()));
    }

    #[test]
    fn new_requires_a_runtime() {
        let (tx, _rx) = mpsc::channel();
        assert!(CompletionClient::new("http://localhost:5000", tx).is_err());
    }

    #[tokio::test]
    async fn endpoint_trailing_slash_is_trimmed() {
        let (tx, _rx) = mpsc::channel();
        let client = CompletionClient::new("http://localhost:5000/", tx).expect("client should build");
        assert_eq!(client.chat_url(), "http://localhost:5000/chat");
    }
}
