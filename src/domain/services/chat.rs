#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

use anyhow::Result;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;

use super::EventStream;
use crate::domain::models::BackendBox;
use crate::domain::models::ChatMessage;
use crate::domain::models::ChatTranscript;
use crate::domain::models::Event;
use crate::domain::models::EventKind;

pub const CHAT_FAILED_MESSAGE: &str = "发送消息失败，请重试";

fn publish(tx: &mpsc::UnboundedSender<Event>, event: Event) {
    if let Err(err) = tx.send(event) {
        tracing::debug!(error = ?err, "No one is listening for chat events");
    }
}

fn fail_turn(
    transcript: &mut ChatTranscript,
    err: anyhow::Error,
    tx: &mpsc::UnboundedSender<Event>,
) -> anyhow::Error {
    tracing::error!(error = ?err, "Chat turn failed");
    transcript.fail(CHAT_FAILED_MESSAGE);
    publish(tx, Event::ChatFailed(CHAT_FAILED_MESSAGE.to_string()));
    return err;
}

pub struct ChatService {}

impl ChatService {
    /// Sends one question about a problem and streams the tutor's answer into
    /// the transcript.
    pub async fn send(
        backend: &BackendBox,
        problem_id: &str,
        transcript: &mut ChatTranscript,
        question: &str,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<ChatMessage> {
        transcript.begin_turn(question)?;

        let res = backend.problem_chat(problem_id, transcript.messages()).await;
        let body = match res {
            Ok(body) => body,
            Err(err) => return Err(fail_turn(transcript, err, tx)),
        };

        return ChatService::follow(transcript, &mut EventStream::new(body), tx).await;
    }

    /// Appends every `content` delta to the open turn and commits it once the
    /// stream ends. Any other event kind is ignored.
    pub async fn follow<R: AsyncBufRead + Unpin>(
        transcript: &mut ChatTranscript,
        events: &mut EventStream<R>,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<ChatMessage> {
        loop {
            let event = match events.next_event().await {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(err) => return Err(fail_turn(transcript, err, tx)),
            };

            if event.kind != EventKind::Content {
                tracing::debug!(kind = %event.kind, "Ignoring non content chat event");
                continue;
            }

            transcript.append_delta(&event.content);
            publish(tx, Event::ChatDelta(event.content));
        }

        let message = transcript.commit();
        tracing::debug!(length = message.content.len(), "Chat turn finished");
        publish(tx, Event::ChatFinished(message.clone()));

        return Ok(message);
    }
}
