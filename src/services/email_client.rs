// src/services/email_client.rs
// DOCUMENTATION: SMTP email delivery
// PURPOSE: Send plain-text invite emails through lettre

use crate::config::Config;
use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

/// SMTP sender for invite emails
pub struct EmailClient {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailClient {
    /// Build a client from SMTP settings, or None when SMTP is not configured
    pub fn from_config(config: &Config) -> Result<Option<Self>> {
        if !config.email_enabled() {
            return Ok(None);
        }

        let from = config
            .from_email
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid FROM_EMAIL address: {}", config.from_email))?;

        let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .context("Failed to configure SMTP transport")?
            .port(config.smtp_port);

        let builder = if config.smtp_username.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ))
        };

        Ok(Some(Self {
            transport: builder.build(),
            from,
        }))
    }

    pub async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let to = recipient
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid recipient email address: {}", recipient))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("Failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("Failed to send email")?;

        log::info!("Sent email \"{}\" to {}", subject, recipient);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_smtp_host() {
        let config = Config::for_tests();
        assert!(EmailClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_rejects_invalid_from_address() {
        let mut config = Config::for_tests();
        config.smtp_host = "smtp.example.com".to_string();
        config.from_email = "not an address".to_string();
        assert!(EmailClient::from_config(&config).is_err());
    }
}
