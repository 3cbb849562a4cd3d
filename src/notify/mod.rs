// src/notify/mod.rs
pub mod email;

use async_trait::async_trait;

use crate::digest::Digest;

pub use email::{EmailSender, SmtpSettings, TlsMode};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid mail address `{address}`: {reason}")]
    Address { address: String, reason: String },
    #[error("build email: {0}")]
    Build(String),
    #[error("smtp transport: {0}")]
    Transport(String),
}

/// Delivery channel for a rendered digest.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, digest: &Digest) -> Result<(), NotifyError>;

    fn name(&self) -> &'static str;
}

/// Dry-run channel used when no SMTP credentials are configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: &str, digest: &Digest) -> Result<(), NotifyError> {
        tracing::info!(
            recipient,
            subject = %digest.subject,
            total = digest.total,
            counts = ?digest.counts,
            "email disabled; digest logged only"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
