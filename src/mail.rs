use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MailError {
    pub message: String,
}

impl MailError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for MailError {}

/// Seam for the external mail collaborator. The daemon itself never talks
/// to a mail provider; it hands finished messages to a transport.
pub trait MailTransport {
    fn send(&self, msg: &EmailMessage) -> Result<(), MailError>;
}

/// Default transport: files each message as a JSON document under the
/// workspace outbox, where a delivery agent (or a test) picks it up.
/// File names carry a sequence prefix so dispatch order is recoverable.
pub struct OutboxTransport {
    dir: PathBuf,
}

impl OutboxTransport {
    pub fn new(workspace: &Path) -> Self {
        Self {
            dir: workspace.join("outbox"),
        }
    }

    fn next_seq(&self) -> Result<usize, MailError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| MailError::new(format!("outbox unreadable: {}", e)))?;
        Ok(entries.filter_map(|e| e.ok()).count())
    }
}

impl MailTransport for OutboxTransport {
    fn send(&self, msg: &EmailMessage) -> Result<(), MailError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| MailError::new(format!("cannot create outbox: {}", e)))?;
        let seq = self.next_seq()?;
        let name = format!("{:05}-{}.json", seq, uuid::Uuid::new_v4());
        let body = serde_json::to_vec_pretty(msg)
            .map_err(|e| MailError::new(format!("cannot encode message: {}", e)))?;
        std::fs::write(self.dir.join(name), body)
            .map_err(|e| MailError::new(format!("cannot write message: {}", e)))?;
        Ok(())
    }
}
