use crate::config::ServerConfig;
use async_trait::async_trait;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;
use tracing::info;

#[derive(Debug)]
pub struct MailError(pub String);

impl Display for MailError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for MailError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery port. The SMTP transport lives outside this service; the
/// default implementation records intent to the operator log and a
/// deployment wires a real transport behind the same trait.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}

pub struct TracingMailer;

#[async_trait]
impl Mailer for TracingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        info!(to = %email.to, subject = %email.subject, "outbound email");
        Ok(())
    }
}

/// Test mailer: captures every send, optionally failing them all.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutboundEmail>>,
    pub fail: bool,
}

impl RecordingMailer {
    #[must_use]
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    #[must_use]
    pub fn sent_subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|sent| sent.iter().map(|e| e.subject.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError("smtp transport unavailable".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}

// Fixed plaintext templates. Wording is part of the user-facing contract.

#[must_use]
pub fn editor_application_emails(
    config: &ServerConfig,
    name: &str,
    email: &str,
    message: &str,
) -> Vec<OutboundEmail> {
    let site = &config.site_name;
    vec![
        OutboundEmail {
            to: config.site_inbox.clone(),
            subject: format!("New Editor Application from {name}"),
            body: format!(
                "New editor application received:\n\nName: {name}\nEmail: {email}\n\nMessage:\n{message}\n\n---\nThis is an automated message from {site}\n"
            ),
        },
        OutboundEmail {
            to: email.to_string(),
            subject: format!("Your Editor Application - {site}"),
            body: format!(
                "Hello {name},\n\nThank you for your interest in becoming an editor for {site}!\n\nWe have received your application and will review it shortly. We'll get back to you within 5 business days.\n\nBest regards,\nThe {site} Team\n"
            ),
        },
    ]
}

#[must_use]
pub fn feedback_emails(
    config: &ServerConfig,
    name: &str,
    email: &str,
    message: &str,
) -> Vec<OutboundEmail> {
    let site = &config.site_name;
    vec![
        OutboundEmail {
            to: config.site_inbox.clone(),
            subject: format!("New Feedback from {name}"),
            body: format!(
                "New feedback received:\n\nName: {name}\nEmail: {email}\n\nMessage:\n{message}\n\n---\nThis is an automated message from {site}\n"
            ),
        },
        OutboundEmail {
            to: email.to_string(),
            subject: format!("Your Feedback - {site}"),
            body: format!(
                "Hello {name},\n\nThank you for your feedback!\n\nWe have received your message and appreciate you taking the time to help us improve {site}. Our team will review your feedback and take appropriate action.\n\nBest regards,\nThe {site} Team\n"
            ),
        },
    ]
}

#[must_use]
pub fn submission_email(config: &ServerConfig, to: &str, title: &str, kind: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("Page submitted for review: {title}"),
        body: format!(
            "The {kind} page \"{title}\" has been submitted for review on {}.\n\nPlease review it in the admin area.\n",
            config.site_name
        ),
    }
}

#[must_use]
pub fn approval_email(config: &ServerConfig, to: &str, title: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("Your page has been approved: {title}"),
        body: format!(
            "Good news: \"{title}\" has been approved and published on {}.\n",
            config.site_name
        ),
    }
}

#[must_use]
pub fn rejection_email(config: &ServerConfig, to: &str, title: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("Your page has been rejected: {title}"),
        body: format!(
            "\"{title}\" was reviewed on {} and sent back. Please revise it and submit again.\n",
            config.site_name
        ),
    }
}

#[must_use]
pub fn cancellation_email(config: &ServerConfig, to: &str, title: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("Review request cancelled: {title}"),
        body: format!(
            "The review request for \"{title}\" on {} was cancelled by the author.\n",
            config.site_name
        ),
    }
}
