use anyhow::Result;
use async_trait::async_trait;
use tokio::io::AsyncBufRead;

use super::AuthSession;
use super::ChatMessage;
use super::Problem;
use super::User;

/// Raw response body of a streaming endpoint, before any line splitting.
pub type BodyReader = Box<dyn AsyncBufRead + Unpin + Send>;

#[async_trait]
pub trait Backend {
    /// Used before long running commands to verify the API is reachable.
    async fn health_check(&self) -> Result<()>;

    /// Exchanges a username and password for a token and the user it belongs
    /// to.
    async fn login(&self, username: &str, password: &str) -> Result<(String, User)>;

    async fn guest_login(&self) -> Result<(String, User)>;

    async fn profile(&self, auth: &AuthSession) -> Result<User>;

    async fn problem(&self, id: &str) -> Result<Problem>;

    /// Starts the batch job that writes answers for every problem missing one.
    /// Progress comes back as `data: ` events on the returned body.
    async fn generate_answers(&self, auth: &AuthSession, model: Option<String>)
        -> Result<BodyReader>;

    /// Asks the tutor about a problem with the full chat history. The reply is
    /// streamed back as `content` deltas.
    async fn problem_chat(&self, problem_id: &str, messages: &[ChatMessage]) -> Result<BodyReader>;
}

pub type BackendBox = Box<dyn Backend + Send + Sync>;
