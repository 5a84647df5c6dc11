// LogDigest - platform/mail.rs
//
// Outbound mail transport.
//
// `MailTransport` is the seam between report delivery (app::notify, which
// owns message wording and the retry policy) and the wire. The SMTP
// implementation makes exactly one connection attempt per `send` call,
// bounded by the configured timeout, and classifies failures so the caller
// can decide whether to retry.

use crate::util::constants;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fmt;
use std::time::Duration;

// =============================================================================
// Message model
// =============================================================================

/// A file attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Transport-independent outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<MailAttachment>,
}

/// Why a single delivery attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Connecting or talking to the server timed out.
    Timeout(String),

    /// The server rejected the credentials.
    Authentication(String),

    /// The message could not be built (bad address, bad content type).
    Compose(String),

    /// Any other transport failure.
    Transport(String),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(msg) => write!(f, "timed out: {msg}"),
            Self::Authentication(msg) => write!(f, "authentication rejected: {msg}"),
            Self::Compose(msg) => write!(f, "cannot build message: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// One delivery attempt of one message.
pub trait MailTransport {
    fn send(&self, mail: &OutboundMail) -> Result<(), DeliveryError>;
}

// =============================================================================
// SMTP
// =============================================================================

/// Connection settings for the SMTP relay.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

// Hand-written so the password never reaches a log line.
impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// SMTP submission with STARTTLS and login credentials.
#[derive(Debug, Clone)]
pub struct SmtpMailTransport {
    settings: SmtpSettings,
}

impl SmtpMailTransport {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }
}

impl MailTransport for SmtpMailTransport {
    fn send(&self, mail: &OutboundMail) -> Result<(), DeliveryError> {
        let message = build_message(mail)?;
        let s = &self.settings;

        let transport = SmtpTransport::starttls_relay(&s.host)
            .map_err(classify_smtp_error)?
            .port(s.port)
            .credentials(Credentials::new(s.username.clone(), s.password.clone()))
            .timeout(Some(s.timeout))
            .build();

        tracing::debug!(host = %s.host, port = s.port, to = %mail.to, "Sending mail");
        transport
            .send(&message)
            .map(|_| ())
            .map_err(classify_smtp_error)
    }
}

fn build_message(mail: &OutboundMail) -> Result<Message, DeliveryError> {
    let from: Mailbox = mail
        .from
        .parse()
        .map_err(|e| DeliveryError::Compose(format!("invalid sender '{}': {e}", mail.from)))?;
    let to: Mailbox = mail
        .to
        .parse()
        .map_err(|e| DeliveryError::Compose(format!("invalid recipient '{}': {e}", mail.to)))?;

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(mail.subject.clone());

    let built = match &mail.attachment {
        Some(att) => {
            let content_type = ContentType::parse(&att.content_type).map_err(|e| {
                DeliveryError::Compose(format!("invalid content type '{}': {e}", att.content_type))
            })?;
            builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(mail.body.clone()))
                    .singlepart(
                        Attachment::new(att.file_name.clone()).body(att.bytes.clone(), content_type),
                    ),
            )
        }
        None => builder.body(mail.body.clone()),
    };

    built.map_err(|e| DeliveryError::Compose(e.to_string()))
}

/// Map a lettre SMTP error onto the retry-relevant categories.
fn classify_smtp_error(e: lettre::transport::smtp::Error) -> DeliveryError {
    if e.is_timeout() {
        return DeliveryError::Timeout(e.to_string());
    }
    if let Some(code) = e.status() {
        let code = code.to_string();
        if constants::SMTP_AUTH_FAILURE_CODES.contains(&code.as_str()) {
            return DeliveryError::Authentication(e.to_string());
        }
    }
    DeliveryError::Transport(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(attachment: Option<MailAttachment>) -> OutboundMail {
        OutboundMail {
            from: "reports@example.com".to_string(),
            to: "dev@example.com".to_string(),
            subject: "Daily Log Report - 2024-01-01 - 3 Errors".to_string(),
            body: "Hello".to_string(),
            attachment,
        }
    }

    #[test]
    fn test_build_plain_message() {
        let message = build_message(&mail(None)).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Daily Log Report - 2024-01-01 - 3 Errors"));
    }

    #[test]
    fn test_build_message_with_attachment() {
        let message = build_message(&mail(Some(MailAttachment {
            file_name: "2024-01-01_report.json".to_string(),
            content_type: constants::REPORT_CONTENT_TYPE.to_string(),
            bytes: b"{}".to_vec(),
        })))
        .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("2024-01-01_report.json"));
        assert!(raw.contains("application/json"));
    }

    #[test]
    fn test_invalid_address_is_compose_error() {
        let mut m = mail(None);
        m.to = "not an address".to_string();
        assert!(matches!(build_message(&m), Err(DeliveryError::Compose(_))));
    }

    #[test]
    fn test_settings_debug_redacts_password() {
        let s = SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: "u".to_string(),
            password: "hunter2".to_string(),
            timeout: Duration::from_secs(10),
        };
        let text = format!("{s:?}");
        assert!(!text.contains("hunter2"));
    }
}
