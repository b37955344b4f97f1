#[cfg(test)]
#[path = "generation_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;

use super::EventKind;
use super::StreamEvent;

#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum GenerationStatus {
    Idle,
    Running,
    Completed,
}

/// How a generation run ended. Every variant other than `Completed` lands the
/// session back in `Idle`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed {
        success_count: Option<u64>,
        failed_count: Option<u64>,
    },
    NoResponse,
    Errored,
    Interrupted,
    TransportFailed(String),
}

impl GenerationOutcome {
    /// Classifies a finished stream from its log. The order of the checks is
    /// the transition table: a `complete` event always wins, even alongside
    /// `error` events.
    pub fn classify(log: &[StreamEvent]) -> GenerationOutcome {
        if let Some(complete) = log.iter().rev().find(|e| return e.kind == EventKind::Complete) {
            return GenerationOutcome::Completed {
                success_count: complete.success_count,
                failed_count: complete.failed_count,
            };
        }

        if log.is_empty() {
            return GenerationOutcome::NoResponse;
        }

        if log.iter().any(|e| return e.kind == EventKind::Error) {
            return GenerationOutcome::Errored;
        }

        return GenerationOutcome::Interrupted;
    }

    pub fn status(&self) -> GenerationStatus {
        if let GenerationOutcome::Completed { .. } = self {
            return GenerationStatus::Completed;
        }

        return GenerationStatus::Idle;
    }

    pub fn message(&self) -> String {
        match self {
            GenerationOutcome::Completed {
                success_count,
                failed_count,
            } => {
                if success_count.is_none() && failed_count.is_none() {
                    return "答案生成完成！".to_string();
                }

                return format!(
                    "答案生成完成！成功: {}, 失败: {}",
                    success_count.unwrap_or(0),
                    failed_count.unwrap_or(0)
                );
            }
            GenerationOutcome::NoResponse => {
                return "生成失败：未收到服务器响应，请检查网络连接或后端服务".to_string();
            }
            GenerationOutcome::Errored => {
                return "生成过程中出现错误，请查看详情".to_string();
            }
            GenerationOutcome::Interrupted => {
                return "生成中断：请查看上方日志了解详情".to_string();
            }
            GenerationOutcome::TransportFailed(err) => {
                if err.trim().is_empty() {
                    return "生成答案失败".to_string();
                }

                return err.to_string();
            }
        }
    }
}

/// State of the answer generation job as seen by the admin. The log is only
/// appended to while running.
#[derive(Clone, Debug)]
pub struct GenerationSession {
    status: GenerationStatus,
    log: Vec<StreamEvent>,
    message: Option<String>,
}

impl Default for GenerationSession {
    fn default() -> GenerationSession {
        return GenerationSession {
            status: GenerationStatus::Idle,
            log: vec![],
            message: None,
        };
    }
}

impl GenerationSession {
    pub fn status(&self) -> GenerationStatus {
        return self.status;
    }

    pub fn log(&self) -> &[StreamEvent] {
        return &self.log;
    }

    pub fn message(&self) -> Option<&str> {
        return self.message.as_deref();
    }

    pub fn begin(&mut self) -> Result<()> {
        if self.status == GenerationStatus::Running {
            bail!("Answer generation is already running");
        }

        self.status = GenerationStatus::Running;
        self.log = vec![];
        self.message = None;

        return Ok(());
    }

    pub fn record(&mut self, event: StreamEvent) -> Result<()> {
        if self.status != GenerationStatus::Running {
            bail!("Cannot record {} event, generation is {}", event.kind, self.status);
        }

        self.log.push(event);
        return Ok(());
    }

    /// Called once the stream ends cleanly.
    pub fn finish(&mut self) -> GenerationOutcome {
        let outcome = GenerationOutcome::classify(&self.log);
        self.settle(&outcome);
        return outcome;
    }

    /// Called when the transport breaks. The classifier is skipped entirely.
    pub fn fail(&mut self, err: &str) -> GenerationOutcome {
        let outcome = GenerationOutcome::TransportFailed(err.to_string());
        self.settle(&outcome);
        return outcome;
    }

    pub fn clear(&mut self) -> Result<()> {
        if self.status == GenerationStatus::Running {
            bail!("Cannot clear the log while answer generation is running");
        }

        self.status = GenerationStatus::Idle;
        self.log = vec![];
        self.message = None;

        return Ok(());
    }

    fn settle(&mut self, outcome: &GenerationOutcome) {
        self.status = outcome.status();
        self.message = Some(outcome.message());
    }
}
