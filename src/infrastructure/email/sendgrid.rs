use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use zeroize::Zeroizing;

use crate::{errors::AppError, repositories::email::EmailService, settings::AppConfig};

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const INVITE_SUBJECT: &str = "You're Invited!";

pub struct SendGridEmailService {
    client: Client,
    api_key: Zeroizing<String>,
    from_name: String,
    from_email: String,
    signup_url: String,
}

impl SendGridEmailService {
    pub fn new(config: &AppConfig, api_key: &str) -> Self {
        SendGridEmailService {
            client: Client::new(),
            api_key: Zeroizing::new(api_key.to_string()),
            from_name: config.invite_from_name.clone(),
            from_email: config.invite_from_email.clone(),
            signup_url: config.signup_url.clone(),
        }
    }

    fn invite_payload(&self, to: &str) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from_email, "name": self.from_name },
            "subject": INVITE_SUBJECT,
            "content": [
                {
                    "type": "text/plain",
                    "value": format!("Your account is ready. Sign up here: {}", self.signup_url)
                },
                {
                    "type": "text/html",
                    "value": format!(
                        "<p>Your account is ready. <a href=\"{}\">Click to sign up</a></p>",
                        self.signup_url
                    )
                }
            ]
        })
    }
}

#[async_trait]
impl EmailService for SendGridEmailService {
    async fn send_invite_email(&self, to: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(SENDGRID_SEND_URL)
            .bearer_auth(self.api_key.as_str())
            .json(&self.invite_payload(to))
            .send()
            .await
            .map_err(|e| AppError::dependency("email.send_invite", e))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::dependency(
                "email.send_invite",
                format!("sendgrid returned {status}: {body}"),
            ));
        }

        tracing::info!(to, "Invite email sent");
        Ok(())
    }
}

/// Mailer used when no SendGrid key is configured; it only logs.
#[derive(Debug, Default, Clone)]
pub struct LogEmailService;

#[async_trait]
impl EmailService for LogEmailService {
    async fn send_invite_email(&self, to: &str) -> Result<(), AppError> {
        tracing::info!(to, "Invite email not sent: no email provider configured");
        Ok(())
    }
}
