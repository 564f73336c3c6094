use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::MailConfig;

/// Outbound mail dispatch. Production sends through an HTTP mail API;
/// tests substitute a recording fake.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, name: &str, otp: &str) -> anyhow::Result<()>;
}

pub struct HttpMailer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
    reset_url: String,
}

impl HttpMailer {
    pub fn new(config: &MailConfig, base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
            reset_url: format!("{}/reset-password", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_password_reset(&self, to: &str, name: &str, otp: &str) -> anyhow::Result<()> {
        let body = json!({
            "from": self.from,
            "to": to,
            "subject": "Password Reset Code",
            "text": format!(
                "Hi {name},\n\nYour password reset code is {otp}.\n\n\
                 Enter it at {} to choose a new password. \
                 If you did not request a reset, you can ignore this email.",
                self.reset_url
            ),
        });
        self.http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        debug!(to, "password reset email dispatched");
        Ok(())
    }
}
