#[cfg(test)]
#[path = "generation_test.rs"]
mod tests;

use anyhow::Result;
use chrono::Utc;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;

use super::EventStream;
use crate::domain::models::AuthSession;
use crate::domain::models::BackendBox;
use crate::domain::models::Event;
use crate::domain::models::GenerationOutcome;
use crate::domain::models::GenerationSession;

fn publish(tx: &mpsc::UnboundedSender<Event>, event: Event) {
    if let Err(err) = tx.send(event) {
        tracing::debug!(error = ?err, "No one is listening for generation events");
    }
}

fn settle(
    session: &mut GenerationSession,
    outcome: GenerationOutcome,
    tx: &mpsc::UnboundedSender<Event>,
) -> GenerationOutcome {
    tracing::info!(
        status = %outcome.status(),
        log_size = session.log().len(),
        message = outcome.message(),
        "Answer generation finished"
    );
    publish(tx, Event::GenerationFinished(outcome.clone()));
    return outcome;
}

pub struct GenerationService {}

impl GenerationService {
    /// Kicks off the answer generation job and follows it until the stream
    /// ends. Only refusing to start is an error, every other failure is folded
    /// into the returned outcome.
    pub async fn start(
        backend: &BackendBox,
        auth: &AuthSession,
        session: &mut GenerationSession,
        model: Option<String>,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> Result<GenerationOutcome> {
        session.begin()?;
        publish(tx, Event::GenerationStarted());

        let body = match backend.generate_answers(auth, model).await {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(error = ?err, "Failed to start answer generation");
                let outcome = session.fail(&err.to_string());
                return Ok(settle(session, outcome, tx));
            }
        };

        let outcome = GenerationService::follow(session, &mut EventStream::new(body), tx).await;
        return Ok(outcome);
    }

    /// Folds every event of a running session's stream into its log, then
    /// classifies the run.
    pub async fn follow<R: AsyncBufRead + Unpin>(
        session: &mut GenerationSession,
        events: &mut EventStream<R>,
        tx: &mpsc::UnboundedSender<Event>,
    ) -> GenerationOutcome {
        loop {
            let mut event = match events.next_event().await {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(err) => {
                    tracing::error!(error = ?err, "Answer generation stream broke");
                    let outcome = session.fail(&err.to_string());
                    return settle(session, outcome, tx);
                }
            };

            event.timestamp = Utc::now().timestamp_millis();
            tracing::debug!(body = ?event, "Generation event");

            if let Err(err) = session.record(event.clone()) {
                let outcome = session.fail(&err.to_string());
                return settle(session, outcome, tx);
            }
            publish(tx, Event::GenerationLog(event));
        }

        let outcome = session.finish();
        return settle(session, outcome, tx);
    }
}
