//! Emails the finished report as an attachment
//!
//! Delivery never fails the caller: every problem, from a bad address to
//! rejected credentials, comes back as [`DeliveryStatus::Failed`].

use crate::config::EmailConfig;
use crate::error::{ReportError, Result};
use async_trait::async_trait;
use lettre::message::header::{ContentTransferEncoding, ContentType};
use lettre::message::{Attachment, Body, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use std::fmt;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Outcome of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    Failed(String),
}

impl DeliveryStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => write!(f, "Email sent successfully"),
            Self::Failed(reason) => write!(f, "Failed to send email: {reason}"),
        }
    }
}

/// Sends a report file to a receiver
#[async_trait]
pub trait ReportMailer: Send + Sync {
    async fn send(
        &self,
        receiver: &str,
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> DeliveryStatus;
}

/// Builds the message and hands it to a lettre transport
pub struct ReportDispatcher<T> {
    transport: T,
    sender: String,
}

impl ReportDispatcher<AsyncSmtpTransport<Tokio1Executor>> {
    /// Implicit-TLS SMTP with username/password authentication
    pub fn smtp(config: &EmailConfig) -> Result<Self> {
        let credentials = Credentials::new(
            config.sender.clone(),
            config.password.expose_secret().to_string(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| ReportError::ConfigError(format!("SMTP relay {}: {e}", config.smtp_host)))?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self::new(transport, config.sender.clone()))
    }
}

impl<T> ReportDispatcher<T> {
    pub fn new(transport: T, sender: impl Into<String>) -> Self {
        Self {
            transport,
            sender: sender.into(),
        }
    }
}

/// `text/plain` body followed by the file as a base64 attachment
async fn build_message(
    sender: &str,
    receiver: &str,
    subject: &str,
    body: &str,
    attachment: &Path,
) -> std::result::Result<Message, String> {
    let from: Mailbox = sender
        .parse()
        .map_err(|e| format!("invalid sender address '{sender}': {e}"))?;
    let to: Mailbox = receiver
        .parse()
        .map_err(|e| format!("invalid receiver address '{receiver}': {e}"))?;

    let bytes = tokio::fs::read(attachment)
        .await
        .map_err(|e| format!("cannot read attachment {}: {e}", attachment.display()))?;
    let filename = attachment
        .file_name()
        .map_or_else(|| "report".to_string(), |n| n.to_string_lossy().into_owned());

    let content = Body::new_with_encoding(bytes, ContentTransferEncoding::Base64)
        .map_err(|_| "attachment cannot be base64 encoded".to_string())?;
    let content_type =
        ContentType::parse("application/octet-stream").map_err(|e| e.to_string())?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(body.to_string()))
                .singlepart(Attachment::new(filename).body(content, content_type)),
        )
        .map_err(|e| format!("cannot build message: {e}"))
}

#[async_trait]
impl<T> ReportMailer for ReportDispatcher<T>
where
    T: AsyncTransport + Send + Sync,
    T::Error: fmt::Display,
{
    #[instrument(skip(self, body), fields(attachment = %attachment.display()))]
    async fn send(
        &self,
        receiver: &str,
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> DeliveryStatus {
        let message = match build_message(&self.sender, receiver, subject, body, attachment).await {
            Ok(message) => message,
            Err(reason) => {
                warn!(reason = %reason, "Email not sent");
                return DeliveryStatus::Failed(reason);
            }
        };

        match self.transport.send(message).await {
            Ok(_) => {
                info!("Email sent");
                DeliveryStatus::Delivered
            }
            Err(e) => {
                warn!(error = %e, "Email delivery failed");
                DeliveryStatus::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lettre::transport::stub::AsyncStubTransport;

    fn report_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("stock_report.pdf");
        std::fs::write(&path, b"%PDF-1.4 fake").unwrap();
        path
    }

    #[tokio::test]
    async fn test_delivered_with_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = report_file(&dir);
        let dispatcher = ReportDispatcher::new(AsyncStubTransport::new_ok(), "bot@example.com");

        let status = dispatcher
            .send("me@example.com", "IBM report", "Please find the report attached.", &path)
            .await;

        assert_eq!(status, DeliveryStatus::Delivered);
        let messages = dispatcher.transport.messages().await;
        assert_eq!(messages.len(), 1);
        let (_, raw) = &messages[0];
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("Please find the report attached."));
        assert!(raw.contains("application/octet-stream"));
        assert!(raw.contains("Content-Transfer-Encoding: base64"));
        assert!(raw.contains("attachment"));
        assert!(raw.contains("stock_report.pdf"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = report_file(&dir);
        let dispatcher = ReportDispatcher::new(AsyncStubTransport::new_error(), "bot@example.com");

        let status = dispatcher.send("me@example.com", "s", "b", &path).await;

        assert!(matches!(status, DeliveryStatus::Failed(_)));
        assert!(status.to_string().starts_with("Failed to send email"));
    }

    #[tokio::test]
    async fn test_bad_address_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = report_file(&dir);
        let dispatcher = ReportDispatcher::new(AsyncStubTransport::new_ok(), "bot@example.com");

        let status = dispatcher.send("not an address", "s", "b", &path).await;

        assert!(matches!(status, DeliveryStatus::Failed(reason) if reason.contains("receiver")));
        assert!(dispatcher.transport.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_attachment_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = ReportDispatcher::new(AsyncStubTransport::new_ok(), "bot@example.com");

        let status = dispatcher
            .send("me@example.com", "s", "b", &dir.path().join("missing.pdf"))
            .await;

        assert!(matches!(status, DeliveryStatus::Failed(reason) if reason.contains("attachment")));
    }

    #[tokio::test]
    async fn test_smtp_transport_builds() {
        let config = EmailConfig::new("bot@example.com", "app-password");
        assert!(ReportDispatcher::smtp(&config).is_ok());
    }
}
