// src/notify/email.rs
use async_trait::async_trait;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use serde::Deserialize;
use std::time::Duration;

use super::{Notifier, NotifyError};
use crate::digest::Digest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Plain connect, then STARTTLS (submission port 587).
    #[default]
    Starttls,
    /// TLS from the first byte (port 465).
    Wrapper,
}

impl TlsMode {
    pub fn default_port(self) -> u16 {
        match self {
            TlsMode::Starttls => 587,
            TlsMode::Wrapper => 465,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub tls: TlsMode,
    pub username: String,
    pub password: String,
    pub from: String,
    pub timeout: Duration,
}

pub fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::Address {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let builder = match settings.tls {
            TlsMode::Starttls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host),
            TlsMode::Wrapper => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host),
        }
        .map_err(|e| NotifyError::Transport(format!("invalid SMTP host {}: {e}", settings.host)))?;

        let creds = Credentials::new(settings.username.clone(), settings.password.clone());
        let mailer = builder
            .port(settings.port)
            .credentials(creds)
            .timeout(Some(settings.timeout))
            .build();

        let from = parse_mailbox(&settings.from)?;
        Ok(Self { mailer, from })
    }

    pub fn build_message(&self, recipient: &str, digest: &Digest) -> Result<Message, NotifyError> {
        let to = parse_mailbox(recipient)?;
        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(digest.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                digest.summary.clone(),
                digest.html.clone(),
            ))
            .map_err(|e| NotifyError::Build(e.to_string()))
    }
}

#[async_trait]
impl Notifier for EmailSender {
    async fn send(&self, recipient: &str, digest: &Digest) -> Result<(), NotifyError> {
        let msg = self.build_message(recipient, digest)?;
        self.mailer
            .send(msg)
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        tracing::info!(recipient, subject = %digest.subject, "email sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.test".into(),
            port: 587,
            tls: TlsMode::Starttls,
            username: "bot@example.test".into(),
            password: "secret".into(),
            from: "Job Bot <bot@example.test>".into(),
            timeout: Duration::from_secs(5),
        }
    }

    fn digest() -> Digest {
        Digest {
            subject: "1 New Jobs: 1 UI/UX | 0 Data | 0 Internships | 0 Other".into(),
            summary: "Found 1 new job postings.".into(),
            html: "<html><body>UI Designer</body></html>".into(),
            counts: vec![("UI/UX".into(), 1)],
            total: 1,
        }
    }

    #[tokio::test]
    async fn message_carries_subject_and_both_parts() {
        let sender = EmailSender::new(&settings()).unwrap();
        let msg = sender.build_message("me@example.test", &digest()).unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("Subject: 1 New Jobs"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("To: me@example.test"));
    }

    #[tokio::test]
    async fn bad_recipient_is_address_error() {
        let sender = EmailSender::new(&settings()).unwrap();
        let err = sender.build_message("not an address", &digest()).unwrap_err();
        assert!(matches!(err, NotifyError::Address { .. }));
    }

    #[tokio::test]
    async fn bad_sender_is_rejected_up_front() {
        let mut s = settings();
        s.from = "nobody".into();
        assert!(matches!(EmailSender::new(&s), Err(NotifyError::Address { .. })));
    }

    #[test]
    fn tls_modes_have_conventional_ports() {
        assert_eq!(TlsMode::Starttls.default_port(), 587);
        assert_eq!(TlsMode::Wrapper.default_port(), 465);
    }
}
