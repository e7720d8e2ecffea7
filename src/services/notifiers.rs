// src/services/notifiers.rs
// DOCUMENTATION: Outbound notification channels shared by request handlers
// PURPOSE: One place holding push, SMS and email senders; delivery failures never fail a request

use crate::config::Config;
use crate::services::email_client::EmailClient;
use crate::services::events::PushNotifier;
use crate::services::pusher_client::PusherClient;
use crate::services::sms_client::SmsClient;

pub struct Notifiers {
    pub push: PushNotifier,
    sms: Option<SmsClient>,
    email: Option<EmailClient>,
}

impl Notifiers {
    pub fn new(push: PushNotifier, sms: Option<SmsClient>, email: Option<EmailClient>) -> Self {
        Self { push, sms, email }
    }

    /// Everything the configuration enables
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            PushNotifier::new(PusherClient::from_config(config)),
            SmsClient::from_config(config),
            EmailClient::from_config(config)?,
        ))
    }

    /// No outbound delivery at all
    pub fn disabled() -> Self {
        Self::new(PushNotifier::disabled(), None, None)
    }

    pub async fn send_sms(&self, to: &str, body: &str) {
        let Some(sms) = &self.sms else {
            log::debug!("SMS disabled; not texting {}", to);
            return;
        };

        if let Err(e) = sms.send(to, body).await {
            log::warn!("Failed to send SMS to {}: {}", to, e);
        }
    }

    pub async fn send_email(&self, to: &str, subject: &str, body: &str) {
        let Some(email) = &self.email else {
            log::debug!("Email disabled; not emailing {}", to);
            return;
        };

        if let Err(e) = email.send(to, subject, body).await {
            log::warn!("Failed to send email to {}: {:#}", to, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_sms_is_swallowed() {
        let sms = SmsClient::new(
            "AC1".to_string(),
            "token".to_string(),
            "+15555550100".to_string(),
            "http://127.0.0.1:9".to_string(),
        );
        let notifiers = Notifiers::new(PushNotifier::disabled(), Some(sms), None);
        notifiers.send_sms("+13216430987", "hello").await;
    }

    #[tokio::test]
    async fn test_from_test_config_disables_everything() {
        let notifiers = Notifiers::from_config(&Config::for_tests()).unwrap();
        assert!(notifiers.push.client().is_none());
        notifiers.send_email("mom@example.com", "Hi", "Hello").await;
    }
}
