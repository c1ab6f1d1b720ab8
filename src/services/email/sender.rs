// Email Sender - delivery to the email provider
// This module handles the actual sending of emails through Resend

use super::types::{EmailError, EmailMessage, ResendEmailPayload};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Anything that can deliver a built message
///
/// `EmailSender` is the production transport; tests substitute a recording one.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn deliver(&self, message: EmailMessage) -> Result<(), EmailError>;
}

/// Email sender that posts to the Resend API
#[derive(Clone)]
pub struct EmailSender {
    client: Arc<Client>,
    api_key: String,
    api_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl EmailSender {
    /// Create a new email sender for Resend API
    ///
    /// Every request is bounded by `request_timeout`, since webhook handling waits on it.
    pub fn new_resend(
        api_key: String,
        api_url: String,
        request_timeout: Duration,
    ) -> Result<Self, EmailError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .timeout(request_timeout)
            .build()
            .map_err(|e| EmailError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            api_key,
            api_url,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Set maximum retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set delay between retries
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Send an email message
    #[instrument(skip(self, message), fields(to = ?message.to, subject = %message.subject))]
    pub async fn send(&self, message: EmailMessage) -> Result<(), EmailError> {
        if self.api_key.is_empty() {
            return Err(EmailError::ConfigError(
                "RESEND_API_KEY is not configured".to_string(),
            ));
        }

        let payload: ResendEmailPayload = message.into();

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(res) if res.status().is_success() => {
                info!("Email sent successfully");
                Ok(())
            },
            Ok(res) => {
                let status = res.status();
                let error_text = res
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());

                error!(
                    "Failed to send email. Status: {}, Error: {}",
                    status, error_text
                );

                if status.as_u16() == 429 {
                    Err(EmailError::RateLimitExceeded)
                } else if status.is_server_error() {
                    Err(EmailError::ServiceUnavailable)
                } else {
                    Err(EmailError::SendError(format!(
                        "Email send failed with status {}: {}",
                        status, error_text
                    )))
                }
            },
            Err(e) => {
                error!("Network error while sending email: {:?}", e);
                Err(EmailError::SendError(format!("Network error: {}", e)))
            },
        }
    }

    /// Delay before the retry following `attempt`: exponential, capped at 60s, plus 0-25% jitter
    fn backoff_delay(&self, attempt: u32) -> Duration {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let max_delay = Duration::from_secs(60);
        let exp = 2_u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        let base_delay = self
            .retry_delay
            .checked_mul(exp)
            .unwrap_or(max_delay)
            .min(max_delay);

        let mut rng = StdRng::from_entropy();
        let jitter_millis = rng.gen_range(0..=(base_delay.as_millis() / 4) as u64);
        base_delay + Duration::from_millis(jitter_millis)
    }

    /// Send an email with automatic retry on failure
    #[instrument(skip(self, message), fields(to = ?message.to, subject = %message.subject))]
    pub async fn send_with_retry(&self, message: EmailMessage) -> Result<(), EmailError> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.send(message.clone()).await {
                Ok(()) => return Ok(()),
                Err(e @ (EmailError::RateLimitExceeded | EmailError::ConfigError(_))) => {
                    warn!("Email send failed permanently, not retrying: {}", e);
                    return Err(e);
                },
                Err(e) => {
                    warn!("Email send attempt {} failed: {:?}", attempt, e);
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        let delay = self.backoff_delay(attempt);
                        info!("Retrying in {:?} (with jitter)", delay);
                        tokio::time::sleep(delay).await;
                    }
                },
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EmailError::SendError("Failed after maximum retry attempts".to_string())
        }))
    }
}

#[async_trait]
impl EmailTransport for EmailSender {
    async fn deliver(&self, message: EmailMessage) -> Result<(), EmailError> {
        self.send_with_retry(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage::new(
            "sender@example.com".to_string(),
            vec!["recipient@example.com".to_string()],
            "Test Subject".to_string(),
            "<h1>Test</h1>".to_string(),
        )
    }

    #[test]
    fn test_email_message_builder() {
        let message = message()
            .with_text("Test".to_string())
            .with_reply_to("reply@example.com".to_string());

        assert_eq!(message.from, "sender@example.com");
        assert_eq!(message.to, vec!["recipient@example.com"]);
        assert_eq!(message.text, Some("Test".to_string()));
        assert_eq!(message.reply_to, Some("reply@example.com".to_string()));
    }

    #[test]
    fn test_resend_payload_omits_empty_optionals() {
        let payload: ResendEmailPayload = message().into();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["subject"], "Test Subject");
        assert!(json.get("text").is_none());
        assert!(json.get("reply_to").is_none());
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let sender = EmailSender::new_resend(
            "test_key".to_string(),
            "https://api.resend.com/emails".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_retry_delay(Duration::from_secs(2));

        for (attempt, base) in [(1, 2), (2, 4), (3, 8)] {
            let delay = sender.backoff_delay(attempt);
            let base = Duration::from_secs(base);
            assert!(delay >= base && delay <= base + base / 4);
        }

        let capped = sender.backoff_delay(50);
        assert!(capped >= Duration::from_secs(60));
        assert!(capped <= Duration::from_secs(75));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let sender = EmailSender::new_resend(
            String::new(),
            "http://127.0.0.1:9".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_max_retries(3);

        let result = sender.send_with_retry(message()).await;
        assert!(matches!(result, Err(EmailError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_unresponsive_provider_times_out() {
        // Accepts the connection but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let sender = EmailSender::new_resend(
            "test_key".to_string(),
            format!("http://{}/emails", addr),
            Duration::from_millis(200),
        )
        .unwrap()
        .with_max_retries(1);

        let started = std::time::Instant::now();
        let result = sender.send(message()).await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
