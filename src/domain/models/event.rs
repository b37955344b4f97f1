use super::ChatMessage;
use super::GenerationOutcome;
use super::StreamEvent;

/// Everything the stream consumers publish to whoever renders them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    GenerationStarted(),
    GenerationLog(StreamEvent),
    GenerationFinished(GenerationOutcome),
    ChatDelta(String),
    ChatFinished(ChatMessage),
    ChatFailed(String),
}
