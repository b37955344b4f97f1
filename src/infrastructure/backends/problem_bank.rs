#[cfg(test)]
#[path = "problem_bank_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::AuthSession;
use crate::domain::models::Backend;
use crate::domain::models::BodyReader;
use crate::domain::models::ChatMessage;
use crate::domain::models::Problem;
use crate::domain::models::User;
use crate::domain::services::body_reader;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AuthData {
    token: String,
    user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AuthResponse {
    status: String,
    #[serde(default)]
    message: String,
    data: Option<AuthData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ProfileResponse {
    status: String,
    #[serde(default)]
    message: String,
    data: Option<User>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct GenerateAnswersRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ProblemChatRequest {
    messages: Vec<ChatMessage>,
}

/// Pulls the `error` field out of a failed response, falling back to a fixed
/// message when the body isn't the usual JSON shape.
async fn error_message(res: reqwest::Response, fallback: &str) -> String {
    let status = res.status().as_u16();
    let body = res.json::<ErrorResponse>().await;
    tracing::error!(status = status, body = ?body, fallback = fallback, "Problem bank request failed");

    if let Ok(ErrorResponse { error: Some(err) }) = body {
        if !err.is_empty() {
            return err;
        }
    }

    return fallback.to_string();
}

fn into_credentials(res: AuthResponse) -> Result<(String, User)> {
    if res.status != "success" {
        if res.message.is_empty() {
            bail!("Login failed");
        }
        bail!(res.message);
    }

    return match res.data {
        Some(data) => Ok((data.token, data.user)),
        None => bail!("Login response is missing credentials"),
    };
}

pub struct ProblemBank {
    url: String,
    request_timeout: String,
    health_check_timeout: String,
}

impl Default for ProblemBank {
    fn default() -> ProblemBank {
        return ProblemBank::new(
            &Config::get(ConfigKey::ApiURL),
            &Config::get(ConfigKey::RequestTimeout),
            &Config::get(ConfigKey::HealthCheckTimeout),
        );
    }
}

impl ProblemBank {
    pub fn new(url: &str, request_timeout: &str, health_check_timeout: &str) -> ProblemBank {
        return ProblemBank {
            url: url.to_string(),
            request_timeout: request_timeout.to_string(),
            health_check_timeout: health_check_timeout.to_string(),
        };
    }

    fn endpoint(&self, path: &str) -> String {
        return format!("{url}/api/v1/{path}", url = self.url.trim_end_matches('/'));
    }

    fn timeout(&self) -> Result<Duration> {
        return Ok(Duration::from_millis(self.request_timeout.parse::<u64>()?));
    }
}

#[async_trait]
impl Backend for ProblemBank {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("Problem bank API URL is not defined");
        }

        let res = reqwest::Client::new()
            .get(&self.url)
            .timeout(Duration::from_millis(
                self.health_check_timeout.parse::<u64>()?,
            ))
            .send()
            .await;

        let status = match res {
            Ok(res) => res.status().as_u16(),
            Err(err) => {
                tracing::error!(error = ?err, "Problem bank is not reachable");
                bail!("Problem bank is not reachable at {}", self.url);
            }
        };
        if status >= 500 {
            tracing::error!(status = status, "Problem bank health check failed");
            bail!("Problem bank health check failed");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn login(&self, username: &str, password: &str) -> Result<(String, User)> {
        let req = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let res = reqwest::Client::new()
            .post(self.endpoint("auth/login"))
            .timeout(self.timeout()?)
            .json(&req)
            .send()
            .await?
            .json::<AuthResponse>()
            .await?;

        return into_credentials(res);
    }

    #[allow(clippy::implicit_return)]
    async fn guest_login(&self) -> Result<(String, User)> {
        let res = reqwest::Client::new()
            .post(self.endpoint("auth/guest"))
            .timeout(self.timeout()?)
            .header("Content-Type", "application/json")
            .send()
            .await?
            .json::<AuthResponse>()
            .await?;

        return into_credentials(res);
    }

    #[allow(clippy::implicit_return)]
    async fn profile(&self, auth: &AuthSession) -> Result<User> {
        let bearer = match auth.bearer() {
            Some(bearer) => bearer,
            None => bail!("You are not logged in. Run `probank login` first."),
        };

        let res = reqwest::Client::new()
            .get(self.endpoint("user/profile"))
            .timeout(self.timeout()?)
            .header("Authorization", bearer)
            .send()
            .await?
            .json::<ProfileResponse>()
            .await?;

        return match res.data {
            Some(user) if res.status == "success" => Ok(user),
            _ => bail!("Failed to fetch profile: {}", res.message),
        };
    }

    #[allow(clippy::implicit_return)]
    async fn problem(&self, id: &str) -> Result<Problem> {
        let res = reqwest::Client::new()
            .get(self.endpoint(&format!("problem/{id}")))
            .timeout(self.timeout()?)
            .send()
            .await?;

        if !res.status().is_success() {
            let err = error_message(res, "Failed to fetch problem").await;
            bail!(err);
        }

        return Ok(res.json::<Problem>().await?);
    }

    #[allow(clippy::implicit_return)]
    async fn generate_answers(
        &self,
        auth: &AuthSession,
        model: Option<String>,
    ) -> Result<BodyReader> {
        let req = GenerateAnswersRequest {
            model: model.filter(|model| return !model.is_empty()),
        };

        // The job runs for as long as there are problems to answer, so no
        // total deadline here.
        let mut builder = reqwest::Client::new()
            .post(self.endpoint("admin/generate-answers"))
            .json(&req);
        if let Some(bearer) = auth.bearer() {
            builder = builder.header("Authorization", bearer);
        }

        let res = builder.send().await?;
        if !res.status().is_success() {
            let err = error_message(res, "启动生成答案失败").await;
            bail!(err);
        }

        return Ok(body_reader(res));
    }

    #[allow(clippy::implicit_return)]
    async fn problem_chat(&self, problem_id: &str, messages: &[ChatMessage]) -> Result<BodyReader> {
        let req = ProblemChatRequest {
            messages: messages.to_vec(),
        };

        let res = reqwest::Client::new()
            .post(self.endpoint(&format!("problem_chat/{problem_id}")))
            .json(&req)
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(
                status = res.status().as_u16(),
                "Failed to start chat with the problem bank"
            );
            bail!("Failed to start chat");
        }

        return Ok(body_reader(res));
    }
}
