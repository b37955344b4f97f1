#[cfg(test)]
#[path = "stream_event_test.rs"]
mod tests;

use serde::Deserializer;
use serde_derive::Deserialize;
use serde_derive::Serialize;

const DATA_PREFIX: &str = "data: ";

/// Counts are optional extras. One the server sends as a float or a negative
/// number reads as absent instead of discarding the whole event.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = <Option<serde_json::Value> as serde::Deserialize>::deserialize(deserializer)?;
    let count = value.and_then(|value| {
        if let Some(count) = value.as_u64() {
            return Some(count);
        }

        let count = value.as_f64()?;
        if count >= 0.0 && count.fract() == 0.0 {
            return Some(count as u64);
        }

        return None;
    });

    return Ok(count);
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Info,
    Progress,
    Error,
    Complete,
    Content,
}

/// A single `data: ` event from either the answer generation stream or the
/// problem chat stream. `type` and `content` are required on the wire, anything
/// missing them is treated as malformed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub content: String,
    /// Milliseconds since epoch, stamped on arrival rather than trusted from
    /// the wire.
    #[serde(skip_deserializing)]
    pub timestamp: i64,
    #[serde(
        rename = "successCount",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub success_count: Option<u64>,
    #[serde(
        rename = "failedCount",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub failed_count: Option<u64>,
    #[serde(
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub total: Option<u64>,
}

impl StreamEvent {
    pub fn new(kind: EventKind, content: &str) -> StreamEvent {
        return StreamEvent {
            kind,
            content: content.to_string(),
            timestamp: 0,
            success_count: None,
            failed_count: None,
            total: None,
        };
    }

    pub fn with_counts(
        mut self,
        success_count: Option<u64>,
        failed_count: Option<u64>,
        total: Option<u64>,
    ) -> StreamEvent {
        self.success_count = success_count;
        self.failed_count = failed_count;
        self.total = total;
        return self;
    }

    /// Parses one raw line off the wire. Lines without the `data: ` prefix,
    /// payloads that don't match the event schema and events with empty
    /// `content` all yield `None`, a corrupt event must never end the stream.
    pub fn parse(line: &str) -> Option<StreamEvent> {
        let payload = line.strip_prefix(DATA_PREFIX)?;

        return match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) if event.content.is_empty() => {
                tracing::debug!(line = line, "Dropping stream event without content");
                None
            }
            Ok(event) => Some(event),
            Err(err) => {
                tracing::debug!(error = %err, line = line, "Dropping malformed stream event");
                None
            }
        };
    }

    pub fn has_counts(&self) -> bool {
        return self.success_count.is_some() || self.failed_count.is_some() || self.total.is_some();
    }
}
