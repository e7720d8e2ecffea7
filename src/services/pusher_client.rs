// src/services/pusher_client.rs
// DOCUMENTATION: Pusher HTTP API client
// PURPOSE: Sign and send events to Pusher channels, and sign private channel subscriptions

use crate::config::Config;
use crate::errors::VillageError;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Pusher REST client
/// DOCUMENTATION: Requests are authenticated with an HMAC-SHA256 signature
/// over method, path and the sorted query string
pub struct PusherClient {
    client: Client,
    app_id: String,
    key: String,
    secret: String,
    base_url: String,
}

impl PusherClient {
    pub fn new(app_id: String, key: String, secret: String, cluster: &str) -> Self {
        let host = if cluster.is_empty() {
            "api.pusherapp.com".to_string()
        } else {
            format!("api-{}.pusher.com", cluster)
        };

        Self {
            client: Client::new(),
            app_id,
            key,
            secret,
            base_url: format!("https://{}", host),
        }
    }

    /// Client for the configured app, if Pusher is configured
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.pusher_enabled() {
            return None;
        }
        Some(Self::new(
            config.pusher_app_id.clone(),
            config.pusher_key.clone(),
            config.pusher_secret.clone(),
            &config.pusher_cluster,
        ))
    }

    /// Point the client at another host (local fakes)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn sign(&self, payload: &str) -> Result<String, VillageError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| VillageError::ExternalApiError(format!("Pusher signing failed: {}", e)))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Path and signed query string for an events request
    fn signed_events_query(&self, body: &str, timestamp: i64) -> Result<(String, String), VillageError> {
        let path = format!("/apps/{}/events", self.app_id);
        let body_md5 = format!("{:x}", md5::compute(body.as_bytes()));

        // parameters must be in alphabetical order
        let query = format!(
            "auth_key={}&auth_timestamp={}&auth_version=1.0&body_md5={}",
            self.key, timestamp, body_md5
        );
        let signature = self.sign(&format!("POST\n{}\n{}", path, query))?;

        Ok((path, format!("{}&auth_signature={}", query, signature)))
    }

    /// Trigger `event` on `channel` with `data`
    pub async fn trigger(&self, channel: &str, event: &str, data: &Value) -> Result<(), VillageError> {
        let body = json!({
            "name": event,
            "channels": [channel],
            "data": data.to_string(),
        })
        .to_string();

        let (path, query) = self.signed_events_query(&body, chrono::Utc::now().timestamp())?;
        let url = format!("{}{}?{}", self.base_url, path, query);

        log::debug!("Pusher trigger: channel={}, event={}", channel, event);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| VillageError::ExternalApiError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VillageError::ExternalApiError(format!(
                "Unexpected return status {}",
                response.status().as_u16()
            )));
        }

        Ok(())
    }

    /// Auth string for a private channel subscription: "{key}:{signature}"
    pub fn authenticate_channel(&self, socket_id: &str, channel: &str) -> Result<String, VillageError> {
        let signature = self.sign(&format!("{}:{}", socket_id, channel))?;
        Ok(format!("{}:{}", self.key, signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> PusherClient {
        PusherClient::new(
            "3".to_string(),
            "278d425bdf160c739803".to_string(),
            "7ad3773142a6692b25b8".to_string(),
            "",
        )
    }

    #[test]
    fn test_host_from_cluster() {
        let c = PusherClient::new("1".into(), "k".into(), "s".into(), "eu");
        assert_eq!(c.base_url, "https://api-eu.pusher.com");
        assert_eq!(client().base_url, "https://api.pusherapp.com");
    }

    #[test]
    fn test_signed_query_shape() {
        let c = client();
        let (path, query) = c.signed_events_query("{}", 1353088179).unwrap();

        assert_eq!(path, "/apps/3/events");
        assert!(query.starts_with(
            "auth_key=278d425bdf160c739803&auth_timestamp=1353088179&auth_version=1.0&body_md5="
        ));
        // md5("{}")
        assert!(query.contains("body_md5=99914b932bd37a50b983c5e7c90ae93b"));

        let signature = query.rsplit("auth_signature=").next().unwrap();
        assert_eq!(
            signature,
            "dad795af96c061dd8164ad284441e775bdaa3f135f1dbec4277e4aac26624795"
        );
    }

    #[test]
    fn test_signature_depends_on_body() {
        let c = client();
        let (_, a) = c.signed_events_query("{\"a\":1}", 1).unwrap();
        let (_, b) = c.signed_events_query("{\"a\":2}", 1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_authenticate_channel() {
        let c = client();
        let auth = c.authenticate_channel("1234.1234", "private-foobar").unwrap();
        assert_eq!(
            auth,
            "278d425bdf160c739803:58df8b0c36d6982b82c3ecf6b4662e34fe8c25bba48f5369f135bf843651c3a4"
        );
        assert_ne!(auth, c.authenticate_channel("1234.1234", "private-other").unwrap());
    }

    #[tokio::test]
    async fn test_trigger_reports_transport_errors() {
        let c = client().with_base_url("http://127.0.0.1:9");
        let result = c.trigger("channel", "event", &json!({})).await;
        assert!(matches!(result, Err(VillageError::ExternalApiError(_))));
    }
}
