// LogDigest - app/notify.rs
//
// Report delivery.
//
// The pipeline only knows the `Notifier` trait. `MailNotifier` composes the
// message, attaches the report, and drives a `MailTransport` under a bounded
// retry policy: timeouts and transport errors are retried, a credential
// rejection stops immediately and is fatal for the run.

use crate::core::retry::{run_with_retry, RetryDecision, RetryOutcome, RetryPolicy};
use crate::platform::config::NotifyConfig;
use crate::platform::mail::{
    DeliveryError, MailAttachment, MailTransport, OutboundMail, SmtpMailTransport, SmtpSettings,
};
use crate::platform::secrets::SecretProvider;
use crate::util::constants;
use crate::util::error::NotifyError;
use std::path::PathBuf;

/// What gets announced when a report is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub report_path: PathBuf,
    pub date: String,
    /// Count of the primary keyword; used in the subject line.
    pub error_count: u64,
}

/// How delivery ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Notification is switched off for this run.
    Disabled,

    Delivered { attempts: u32 },

    /// Every attempt failed, or the message could not be built. The report
    /// is still on disk; the run is not failed.
    Failed { attempts: u32, reason: String },
}

/// Announces a produced report.
pub trait Notifier {
    /// Deliver `notification`. `Err` is reserved for conditions that should
    /// fail the run (rejected credentials).
    fn notify(&self, notification: &Notification) -> Result<DeliveryStatus, NotifyError>;
}

/// Sends the report as a mail attachment.
#[derive(Debug)]
pub struct MailNotifier<T: MailTransport> {
    transport: T,
    sender: String,
    recipient: String,
    policy: RetryPolicy,
}

impl<T: MailTransport> MailNotifier<T> {
    pub fn with_transport(transport: T, sender: impl Into<String>, recipient: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sender: sender.into(),
            recipient: recipient.into(),
            policy,
        }
    }

    /// Build the outbound message. A report that cannot be read is logged and
    /// the message goes out without an attachment.
    fn compose(&self, n: &Notification) -> OutboundMail {
        let attachment = match std::fs::read(&n.report_path) {
            Ok(bytes) => Some(MailAttachment {
                file_name: n
                    .report_path
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_else(|| format!("{}{}", n.date, constants::REPORT_FILE_SUFFIX)),
                content_type: constants::REPORT_CONTENT_TYPE.to_string(),
                bytes,
            }),
            Err(e) => {
                tracing::warn!(
                    path = %n.report_path.display(),
                    error = %e,
                    "Report not readable; sending without attachment"
                );
                None
            }
        };

        OutboundMail {
            from: self.sender.clone(),
            to: self.recipient.clone(),
            subject: subject(&n.date, n.error_count),
            body: body(&n.date),
            attachment,
        }
    }
}

impl MailNotifier<SmtpMailTransport> {
    /// Build the SMTP notifier from validated settings. The password is
    /// fetched from `secrets` under `config.password_env`.
    pub fn from_config(config: &NotifyConfig, secrets: &dyn SecretProvider) -> Result<Self, NotifyError> {
        let username = config
            .username
            .clone()
            .ok_or(NotifyError::MissingAddress { field: "username" })?;
        let recipient = config
            .recipient
            .clone()
            .ok_or(NotifyError::MissingAddress { field: "recipient" })?;
        let sender = config.sender.clone().unwrap_or_else(|| username.clone());
        let password = secrets
            .secret(&config.password_env)
            .ok_or_else(|| NotifyError::MissingCredentials {
                variable: config.password_env.clone(),
            })?;

        let transport = SmtpMailTransport::new(SmtpSettings {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            username,
            password,
            timeout: config.timeout,
        });
        let policy = RetryPolicy::new(config.max_attempts, config.retry_delay);
        Ok(Self::with_transport(transport, sender, recipient, policy))
    }
}

impl<T: MailTransport> Notifier for MailNotifier<T> {
    fn notify(&self, notification: &Notification) -> Result<DeliveryStatus, NotifyError> {
        let mail = self.compose(notification);

        let outcome = run_with_retry(
            &self.policy,
            |attempt| {
                tracing::info!(
                    attempt,
                    max_attempts = self.policy.max_attempts,
                    to = %mail.to,
                    "Sending report"
                );
                let result = self.transport.send(&mail);
                if let Err(e) = &result {
                    tracing::warn!(attempt, error = %e, "Delivery attempt failed");
                }
                result
            },
            retry_decision,
        );

        match outcome {
            RetryOutcome::Succeeded { attempts, .. } => {
                tracing::info!(attempts, "Report delivered");
                Ok(DeliveryStatus::Delivered { attempts })
            }
            RetryOutcome::Aborted {
                error: DeliveryError::Authentication(reason),
                attempts,
            } => Err(NotifyError::AuthenticationRejected { attempts, reason }),
            RetryOutcome::Aborted { error, attempts } | RetryOutcome::Exhausted { error, attempts } => {
                tracing::error!(attempts, error = %error, "Report delivery failed");
                Ok(DeliveryStatus::Failed {
                    attempts,
                    reason: error.to_string(),
                })
            }
        }
    }
}

fn retry_decision(e: &DeliveryError) -> RetryDecision {
    match e {
        DeliveryError::Timeout(_) | DeliveryError::Transport(_) => RetryDecision::Retry,
        DeliveryError::Authentication(_) | DeliveryError::Compose(_) => RetryDecision::Abort,
    }
}

/// `Daily Log Report - <date> - <n> Errors`
pub fn subject(date: &str, error_count: u64) -> String {
    format!("Daily Log Report - {date} - {error_count} Errors")
}

pub fn body(date: &str) -> String {
    format!(
        "Hello Dev,\n\n\
         This is the log report for {date}.\n\
         The report is attached as a JSON file.\n\n\
         Best regards,\n\
         Your Log Processor"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::secrets::StaticSecretProvider;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Replays scripted results and records every message it was given.
    struct ScriptedTransport {
        script: RefCell<VecDeque<Result<(), DeliveryError>>>,
        sent: RefCell<Vec<OutboundMail>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<(), DeliveryError>>) -> Self {
            Self {
                script: RefCell::new(script.into()),
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl MailTransport for ScriptedTransport {
        fn send(&self, mail: &OutboundMail) -> Result<(), DeliveryError> {
            self.sent.borrow_mut().push(mail.clone());
            self.script.borrow_mut().pop_front().unwrap_or(Ok(()))
        }
    }

    fn notifier(script: Vec<Result<(), DeliveryError>>) -> MailNotifier<ScriptedTransport> {
        MailNotifier::with_transport(
            ScriptedTransport::new(script),
            "reports@example.com",
            "dev@example.com",
            RetryPolicy::new(3, Duration::ZERO),
        )
    }

    fn notification(dir: &std::path::Path) -> Notification {
        let report_path = dir.join("2024-01-01_report.json");
        std::fs::write(&report_path, b"{\"report_date\": \"2024-01-01\"}").unwrap();
        Notification {
            report_path,
            date: "2024-01-01".to_string(),
            error_count: 4,
        }
    }

    fn timeout() -> Result<(), DeliveryError> {
        Err(DeliveryError::Timeout("connect".to_string()))
    }

    #[test]
    fn test_succeeds_on_third_attempt_after_timeouts() {
        let dir = tempfile::tempdir().unwrap();
        let n = notifier(vec![timeout(), timeout(), Ok(())]);
        let status = n.notify(&notification(dir.path())).unwrap();
        assert_eq!(status, DeliveryStatus::Delivered { attempts: 3 });
        assert_eq!(n.transport.sent.borrow().len(), 3);
    }

    #[test]
    fn test_exhausted_is_failed_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let n = notifier(vec![timeout(), timeout(), timeout(), Ok(())]);
        let status = n.notify(&notification(dir.path())).unwrap();
        assert!(matches!(status, DeliveryStatus::Failed { attempts: 3, .. }));
        assert_eq!(n.transport.sent.borrow().len(), 3);
    }

    #[test]
    fn test_authentication_stops_after_one_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let n = notifier(vec![Err(DeliveryError::Authentication("535".to_string()))]);
        let result = n.notify(&notification(dir.path()));
        assert!(matches!(
            result,
            Err(NotifyError::AuthenticationRejected { attempts: 1, .. })
        ));
        assert_eq!(n.transport.sent.borrow().len(), 1);
    }

    #[test]
    fn test_message_wording_and_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let n = notifier(vec![]);
        n.notify(&notification(dir.path())).unwrap();
        let sent = n.transport.sent.borrow();
        let mail = &sent[0];
        assert_eq!(mail.subject, "Daily Log Report - 2024-01-01 - 4 Errors");
        assert!(mail.body.starts_with("Hello Dev,\n\nThis is the log report for 2024-01-01."));
        assert!(mail.body.ends_with("Best regards,\nYour Log Processor"));
        let att = mail.attachment.as_ref().unwrap();
        assert_eq!(att.file_name, "2024-01-01_report.json");
        assert_eq!(att.content_type, "application/json");
    }

    #[test]
    fn test_missing_report_sends_without_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let n = notifier(vec![]);
        let notification = Notification {
            report_path: dir.path().join("gone.json"),
            date: "2024-01-01".to_string(),
            error_count: 0,
        };
        assert_eq!(
            n.notify(&notification).unwrap(),
            DeliveryStatus::Delivered { attempts: 1 }
        );
        assert!(n.transport.sent.borrow()[0].attachment.is_none());
    }

    #[test]
    fn test_from_config_requires_password() {
        let config = NotifyConfig {
            username: Some("reports@example.com".to_string()),
            recipient: Some("dev@example.com".to_string()),
            ..NotifyConfig::default()
        };
        let result = MailNotifier::from_config(&config, &StaticSecretProvider::new());
        assert!(matches!(result, Err(NotifyError::MissingCredentials { .. })));

        let secrets = StaticSecretProvider::new().with(constants::DEFAULT_PASSWORD_ENV, "pw");
        let n = MailNotifier::from_config(&config, &secrets).unwrap();
        assert_eq!(n.sender, "reports@example.com");
    }

    #[test]
    fn test_from_config_requires_recipient() {
        let config = NotifyConfig {
            username: Some("reports@example.com".to_string()),
            ..NotifyConfig::default()
        };
        let secrets = StaticSecretProvider::new().with(constants::DEFAULT_PASSWORD_ENV, "pw");
        assert!(matches!(
            MailNotifier::from_config(&config, &secrets),
            Err(NotifyError::MissingAddress { field: "recipient" })
        ));
    }
}
