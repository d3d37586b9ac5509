use crate::completion::CompletionOutcome;

#[derive(Debug, Clone)]
pub enum AppEvent {
    CompletionFinished(CompletionOutcome),
}
