//! Outbound delivery collaborator.
//!
//! The pipeline hands a finished draft plus routing metadata to a
//! [`MailTransport`]. The bundled [`OutboxTransport`] writes one JSON file per
//! message into a directory that an external mailer drains.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Filesystem failure.
    #[error("outbox I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The message could not be encoded.
    #[error("outbound encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    /// The message is missing a recipient.
    #[error("outbound message has no recipient")]
    NoRecipient,
}

/// A reply ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Message id of the inquiry being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    /// Reply body.
    pub body: String,
}

impl OutboundMessage {
    /// Reply subject: the original with a single `Re:` prefix.
    pub fn reply_subject(original: &str) -> String {
        let trimmed = original.trim();
        if trimmed.to_lowercase().starts_with("re:") {
            trimmed.to_owned()
        } else if trimmed.is_empty() {
            "Re:".to_owned()
        } else {
            format!("Re: {trimmed}")
        }
    }
}

/// Receipt for a handed-off message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Transport-specific reference (file path, queue id ...).
    pub reference: String,
}

/// Mail transport.
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    /// Hand a message off for delivery.
    async fn send(&self, message: &OutboundMessage) -> Result<Delivery, TransportError>;
}

#[derive(Serialize)]
struct OutboxEnvelope<'a> {
    queued_at: DateTime<Utc>,
    #[serde(flatten)]
    message: &'a OutboundMessage,
}

/// Writes each message as `<timestamp>-<n>.json` into a directory.
#[derive(Debug, Clone)]
pub struct OutboxTransport {
    dir: PathBuf,
}

impl OutboxTransport {
    /// Transport writing into `dir` (created on first send).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Outbox directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait::async_trait]
impl MailTransport for OutboxTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<Delivery, TransportError> {
        if message.to.trim().is_empty() {
            return Err(TransportError::NoRecipient);
        }
        tokio::fs::create_dir_all(&self.dir).await?;

        let queued_at = Utc::now();
        let stamp = queued_at.format("%Y%m%dT%H%M%S%.6f");
        let body = serde_json::to_vec_pretty(&OutboxEnvelope { queued_at, message })?;

        let mut n = 0u32;
        let path = loop {
            let candidate = self.dir.join(format!("{stamp}-{n}.json"));
            if !tokio::fs::try_exists(&candidate).await? {
                break candidate;
            }
            n = n.saturating_add(1);
        };
        tokio::fs::write(&path, body).await?;
        info!(to = %message.to, path = %path.display(), "reply queued in outbox");
        Ok(Delivery {
            reference: path.display().to_string(),
        })
    }
}
