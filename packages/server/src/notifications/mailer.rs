use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

use crate::config::{MailBackend, MailConfig};

/// A rendered plain-text message addressed to one recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

/// Why a single delivery failed. Never surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("invalid address '{address}': {reason}")]
    Address { address: String, reason: String },
    #[error("failed to build message: {0}")]
    Message(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError>;
}

/// Sends through an SMTP relay with STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailConfig) -> Result<Self, DeliveryError> {
        let from = parse_mailbox(&config.from)?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp.host)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?
            .port(config.smtp.port);
        if let (Some(username), Some(password)) = (&config.smtp.username, &config.smtp.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        let to = Mailbox::new(
            Some(mail.to_name.clone()),
            mail.to_email.parse().map_err(|e: lettre::address::AddressError| {
                DeliveryError::Address {
                    address: mail.to_email.clone(),
                    reason: e.to_string(),
                }
            })?,
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| DeliveryError::Message(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        info!(
            to = %mail.to_email,
            subject = %mail.subject,
            body = %mail.body,
            "Mail (log backend)"
        );
        Ok(())
    }
}

/// Keeps sent messages in memory. Addresses in `failing` are rejected.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Make every send to `email` fail with a transport error.
    pub fn fail_for(&self, email: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(email.to_string());
        }
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        let rejected = self
            .failing
            .lock()
            .map(|f| f.contains(&mail.to_email))
            .unwrap_or(false);
        if rejected {
            return Err(DeliveryError::Transport(format!(
                "recipient {} rejected",
                mail.to_email
            )));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail.clone());
        }
        Ok(())
    }
}

pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, DeliveryError> {
    Ok(match config.backend {
        MailBackend::Smtp => Arc::new(SmtpMailer::new(config)?),
        MailBackend::Log => Arc::new(LogMailer),
    })
}

fn parse_mailbox(value: &str) -> Result<Mailbox, DeliveryError> {
    value.parse().map_err(|e: lettre::address::AddressError| DeliveryError::Address {
        address: value.to_string(),
        reason: e.to_string(),
    })
}
