use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("mailer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("mailer rejected the message with status {0}")]
    Rejected(u16),
}

/// Outbound email boundary. Template rendering and transport selection live
/// on the other side of this trait; callers hand over a template slug and a
/// JSON payload and must treat delivery as fire-and-forget.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn notify_by_email(
        &self,
        slug: &str,
        payload: serde_json::Value,
        recipient: &str,
        user_id: Option<&str>,
    ) -> Result<(), NotifyError>;
}

#[derive(Debug, Serialize)]
struct TemplateEmailBody<'a> {
    template: &'a str,
    params: &'a serde_json::Value,
    to: &'a str,
    sender: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

/// Delivers template emails through the platform mailer's HTTP API.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    sender: String,
}

impl HttpMailer {
    pub fn new(client: reqwest::Client, api_url: String, api_key: String, sender: String) -> Self {
        Self {
            client,
            api_url,
            api_key,
            sender,
        }
    }
}

#[async_trait]
impl NotificationSender for HttpMailer {
    async fn notify_by_email(
        &self,
        slug: &str,
        payload: serde_json::Value,
        recipient: &str,
        user_id: Option<&str>,
    ) -> Result<(), NotifyError> {
        let body = TemplateEmailBody {
            template: slug,
            params: &payload,
            to: recipient,
            sender: &self.sender,
            user_id,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }

        Ok(())
    }
}

/// Stand-in used when email delivery is not configured; messages are dropped
/// after a debug trace so the calling flows behave identically.
pub struct NoopMailer;

#[async_trait]
impl NotificationSender for NoopMailer {
    async fn notify_by_email(
        &self,
        slug: &str,
        _payload: serde_json::Value,
        recipient: &str,
        _user_id: Option<&str>,
    ) -> Result<(), NotifyError> {
        tracing::debug!(slug, recipient, "email delivery is disabled, dropping message");
        Ok(())
    }
}
