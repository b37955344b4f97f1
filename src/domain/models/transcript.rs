#[cfg(test)]
#[path = "transcript_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use serde_derive::Deserialize;
use serde_derive::Serialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: &str) -> ChatMessage {
        return ChatMessage {
            role,
            content: content.to_string(),
        };
    }
}

/// Chat history for one problem. Committed messages are never edited, only the
/// streaming buffer changes while the assistant is answering.
#[derive(Clone, Debug, Default)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
    streaming_content: String,
    in_flight: bool,
    error: Option<String>,
}

impl ChatTranscript {
    pub fn messages(&self) -> &[ChatMessage] {
        return &self.messages;
    }

    pub fn streaming_content(&self) -> &str {
        return &self.streaming_content;
    }

    pub fn is_in_flight(&self) -> bool {
        return self.in_flight;
    }

    pub fn error(&self) -> Option<&str> {
        return self.error.as_deref();
    }

    /// Commits the user's question and opens a new assistant turn.
    pub fn begin_turn(&mut self, question: &str) -> Result<()> {
        if self.in_flight {
            bail!("The assistant is still answering the previous question");
        }
        if question.trim().is_empty() {
            bail!("Cannot send an empty question");
        }

        self.messages.push(ChatMessage::new(Role::User, question));
        self.streaming_content = "".to_string();
        self.error = None;
        self.in_flight = true;

        return Ok(());
    }

    pub fn append_delta(&mut self, delta: &str) {
        self.streaming_content += delta;
    }

    /// Moves the streaming buffer into the history as the assistant's reply.
    pub fn commit(&mut self) -> ChatMessage {
        let content = std::mem::take(&mut self.streaming_content);
        let message = ChatMessage::new(Role::Assistant, &content);

        self.messages.push(message.clone());
        self.in_flight = false;

        return message;
    }

    /// Drops whatever was streamed for the turn. The user's question stays.
    pub fn fail(&mut self, err: &str) {
        self.streaming_content = "".to_string();
        self.error = Some(err.to_string());
        self.in_flight = false;
    }

    pub fn clear(&mut self) -> Result<()> {
        if self.in_flight {
            bail!("Cannot clear the chat while the assistant is answering");
        }

        self.messages = vec![];
        self.streaming_content = "".to_string();
        self.error = None;

        return Ok(());
    }
}
