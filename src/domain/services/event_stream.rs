#[cfg(test)]
#[path = "event_stream_test.rs"]
mod tests;

use anyhow::Result;
use futures::stream::TryStreamExt;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::Split;
use tokio_util::io::StreamReader;

use crate::domain::models::BodyReader;
use crate::domain::models::StreamEvent;

fn convert_err(err: reqwest::Error) -> std::io::Error {
    let err_msg = err.to_string();
    return std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg);
}

/// Wraps a streaming HTTP response body so it can be read line by line.
pub fn body_reader(res: reqwest::Response) -> BodyReader {
    let stream = res.bytes_stream().map_err(convert_err);
    return Box::new(StreamReader::new(stream));
}

/// Pulls `data: ` events out of a response body, one read at a time. Lines
/// are decoded lossily so a bad byte sequence can't end the stream, while a
/// failing read is returned as an error for the caller to treat as fatal.
pub struct EventStream<R> {
    lines: Split<R>,
}

impl<R: AsyncBufRead + Unpin> EventStream<R> {
    pub fn new(reader: R) -> EventStream<R> {
        return EventStream {
            lines: reader.split(b'\n'),
        };
    }

    pub async fn next_line(&mut self) -> Result<Option<String>> {
        let bytes = match self.lines.next_segment().await? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        let line = String::from_utf8_lossy(&bytes);
        return Ok(Some(line.trim_end_matches('\r').to_string()));
    }

    /// Next well formed event, skipping keep-alives and anything malformed.
    /// `Ok(None)` once the body is exhausted.
    pub async fn next_event(&mut self) -> Result<Option<StreamEvent>> {
        while let Some(line) = self.next_line().await? {
            if let Some(event) = StreamEvent::parse(&line) {
                return Ok(Some(event));
            }
        }

        return Ok(None);
    }
}
