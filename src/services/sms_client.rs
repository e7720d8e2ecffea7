// src/services/sms_client.rs
// DOCUMENTATION: Outbound SMS client
// PURPOSE: Send texts through a Twilio-style REST API

use crate::config::Config;
use crate::errors::VillageError;
use reqwest::Client;
use serde::Deserialize;

/// Twilio-style messaging client
/// DOCUMENTATION: POSTs form-encoded messages to
/// {api_base}/Accounts/{sid}/Messages.json using basic auth
pub struct SmsClient {
    client: Client,
    account_sid: String,
    auth_token: String,
    default_from: String,
    api_base: String,
}

/// Error body returned by the provider on failure
#[derive(Debug, Deserialize)]
struct SmsApiError {
    message: Option<String>,
}

impl SmsClient {
    pub fn new(account_sid: String, auth_token: String, default_from: String, api_base: String) -> Self {
        Self {
            client: Client::new(),
            account_sid,
            auth_token,
            default_from,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.sms_enabled() {
            return None;
        }
        Some(Self::new(
            config.sms_account_sid.clone(),
            config.sms_auth_token.clone(),
            config.sms_default_from.clone(),
            config.sms_api_base.clone(),
        ))
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.api_base, self.account_sid)
    }

    /// Send `body` to `to` from the default number
    pub async fn send(&self, to: &str, body: &str) -> Result<(), VillageError> {
        log::info!("Sending SMS to {}", to);

        let params = [("To", to), ("From", self.default_from.as_str()), ("Body", body)];
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| VillageError::ExternalApiError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .json::<SmsApiError>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(VillageError::ExternalApiError(format!(
                "SMS API returned {}: {}",
                status, message
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url() {
        let client = SmsClient::new(
            "AC123".to_string(),
            "token".to_string(),
            "+15555550100".to_string(),
            "https://api.twilio.com/2010-04-01/".to_string(),
        );
        assert_eq!(
            client.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn test_disabled_without_credentials() {
        let config = Config::for_tests();
        assert!(SmsClient::from_config(&config).is_none());
    }

    #[tokio::test]
    async fn test_send_reports_transport_errors() {
        let client = SmsClient::new(
            "AC123".to_string(),
            "token".to_string(),
            "+15555550100".to_string(),
            "http://127.0.0.1:9".to_string(),
        );
        let result = client.send("+13216430987", "hi").await;
        assert!(matches!(result, Err(VillageError::ExternalApiError(_))));
    }
}
