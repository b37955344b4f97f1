#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;

use std::path;

use anyhow::Result;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: i64,
}

#[derive(Default, Serialize, Deserialize)]
struct AuthFile {
    token: Option<String>,
    user: Option<User>,
}

/// Credentials for the problem bank API. Handed to the backend explicitly, and
/// persisted to a YAML file between runs.
#[derive(Clone, Debug)]
pub struct AuthSession {
    file_path: path::PathBuf,
    token: Option<String>,
    user: Option<User>,
}

impl AuthSession {
    pub fn new(file_path: path::PathBuf) -> AuthSession {
        return AuthSession {
            file_path,
            token: None,
            user: None,
        };
    }

    /// Reads the session from disk. A missing file is an anonymous session.
    pub async fn load(file_path: path::PathBuf) -> Result<AuthSession> {
        let mut session = AuthSession::new(file_path);
        if !session.file_path.exists() {
            return Ok(session);
        }

        let payload = fs::read_to_string(&session.file_path).await?;
        let auth_file: AuthFile = serde_yaml::from_str(&payload)?;
        session.token = auth_file.token;
        session.user = auth_file.user;

        return Ok(session);
    }

    pub async fn save(&self) -> Result<()> {
        let payload = serde_yaml::to_string(&AuthFile {
            token: self.token.clone(),
            user: self.user.clone(),
        })?;

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = fs::File::create(&self.file_path).await?;
        file.write_all(payload.as_bytes()).await?;

        return Ok(());
    }

    pub async fn clear(&mut self) -> Result<()> {
        self.token = None;
        self.user = None;

        if self.file_path.exists() {
            fs::remove_file(&self.file_path).await?;
        }

        return Ok(());
    }

    pub fn set(&mut self, token: &str, user: User) {
        self.token = Some(token.to_string());
        self.user = Some(user);
    }

    pub fn token(&self) -> Option<&str> {
        return self.token.as_deref();
    }

    pub fn user(&self) -> Option<&User> {
        return self.user.as_ref();
    }

    pub fn is_authenticated(&self) -> bool {
        return self.token.is_some() && self.user.is_some();
    }

    pub fn bearer(&self) -> Option<String> {
        return self.token.as_ref().map(|token| return format!("Bearer {token}"));
    }
}
