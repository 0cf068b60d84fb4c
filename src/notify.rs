//! Outbound contact notifications.

use crate::config::MailgunSettings;
use async_trait::async_trait;
use std::time::Duration;

pub const CONTACT_SUBJECT: &str = "New Contact Message!";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub feedback: String,
}

impl ContactMessage {
    pub fn body(&self) -> String {
        format!(
            "user name: {}\nuser email: {}\nuser feedback: {}",
            self.name, self.email, self.feedback
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mail api returned {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("no recipient configured")]
    NoRecipient,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_contact(&self, message: &ContactMessage) -> Result<(), NotifyError>;
}

/// Sends through the Mailgun messages API.
pub struct MailgunNotifier {
    client: reqwest::Client,
    settings: MailgunSettings,
    recipient: Option<String>,
}

impl MailgunNotifier {
    pub fn new(settings: MailgunSettings, recipient: Option<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(MailgunNotifier {
            client,
            settings,
            recipient,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/messages",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.domain
        )
    }
}

#[async_trait]
impl Notifier for MailgunNotifier {
    async fn notify_contact(&self, message: &ContactMessage) -> Result<(), NotifyError> {
        let to = self.recipient.as_deref().ok_or(NotifyError::NoRecipient)?;
        let body = message.body();
        let form = [
            ("from", self.settings.sender.as_str()),
            ("to", to),
            ("subject", CONTACT_SUBJECT),
            ("text", body.as_str()),
        ];
        let resp = self
            .client
            .post(self.endpoint())
            .basic_auth("api", Some(&self.settings.api_key))
            .form(&form)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::info!(to, "contact notification sent");
        Ok(())
    }
}

/// Logs the message instead of sending it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_contact(&self, message: &ContactMessage) -> Result<(), NotifyError> {
        tracing::info!(
            subject = CONTACT_SUBJECT,
            name = %message.name,
            email = %message.email,
            feedback = %message.feedback,
            "contact message (mail not configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_lists_every_field() {
        let m = ContactMessage {
            name: "Ann".into(),
            email: "ann@example.org".into(),
            feedback: "hi".into(),
        };
        assert_eq!(m.body(), "user name: Ann\nuser email: ann@example.org\nuser feedback: hi");
    }

    #[test]
    fn endpoint_joins_base_and_domain() {
        let n = MailgunNotifier::new(
            MailgunSettings {
                domain: "mg.example.org".into(),
                api_key: "k".into(),
                sender: "s@example.org".into(),
                api_base: "https://api.mailgun.net/v3/".into(),
            },
            None,
        )
        .unwrap();
        assert_eq!(n.endpoint(), "https://api.mailgun.net/v3/mg.example.org/messages");
    }

    #[tokio::test]
    async fn missing_recipient_fails_before_sending() {
        let n = MailgunNotifier::new(
            MailgunSettings {
                domain: "d".into(),
                api_key: "k".into(),
                sender: "s".into(),
                api_base: "http://127.0.0.1:9".into(),
            },
            None,
        )
        .unwrap();
        let m = ContactMessage {
            name: "a".into(),
            email: "b".into(),
            feedback: "c".into(),
        };
        assert!(matches!(n.notify_contact(&m).await, Err(NotifyError::NoRecipient)));
    }
}
