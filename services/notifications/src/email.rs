//! Outbound email, best-effort (spec §4.L: "failure is logged and
//! swallowed — never fails the caller"). The lone exception to the "no
//! error kind silently swallows a write" rule in spec §7.

use async_trait::async_trait;
use carbonledger_core::config::EmailConfig;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// A single HTML email with an optional call-to-action URL baked into the body.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send best-effort. Errors are logged by the implementation and never
    /// propagated — callers should not branch on the return value.
    async fn send(&self, message: EmailMessage);
}

/// SMTP-backed sender built from `EmailConfig`. Constructed once at
/// startup; `None` transport (no `smtp_host` configured) degrades to a
/// no-op logger, useful for local development.
pub struct SmtpEmailSender {
    from_address: String,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpEmailSender {
    pub fn new(config: &EmailConfig) -> Self {
        let transport = config.smtp_host.as_ref().and_then(|host| {
            let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host).ok()?;
            let builder = if let Some(api_key) = &config.provider_api_key {
                builder.credentials(Credentials::new(config.from_address.clone(), api_key.clone()))
            } else {
                builder
            };
            Some(builder.build())
        });

        Self {
            from_address: config.from_address.clone(),
            transport,
        }
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: EmailMessage) {
        let Some(transport) = &self.transport else {
            tracing::debug!(to = %message.to, subject = %message.subject, "no SMTP host configured, dropping email");
            return;
        };

        let built = Message::builder()
            .from(match self.from_address.parse() {
                Ok(addr) => addr,
                Err(err) => {
                    tracing::error!(error = %err, "invalid from-address, dropping email");
                    return;
                }
            })
            .to(match message.to.parse() {
                Ok(addr) => addr,
                Err(err) => {
                    tracing::warn!(error = %err, to = %message.to, "invalid recipient address, dropping email");
                    return;
                }
            })
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(message.html_body.clone());

        let built = match built {
            Ok(built) => built,
            Err(err) => {
                tracing::error!(error = %err, "failed to build email message, dropping");
                return;
            }
        };

        if let Err(err) = transport.send(built).await {
            tracing::warn!(error = %err, to = %message.to, "email delivery failed, swallowing per spec");
        }
    }
}
