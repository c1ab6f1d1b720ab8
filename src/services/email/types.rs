// Email Service Types - Shared types and structures for email module

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during email operations
#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Failed to send email: {0}")]
    SendError(String),

    #[error("Template rendering error: {0}")]
    TemplateError(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Generic email message structure that can be sent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: Option<String>,
    pub reply_to: Option<String>,
}

impl EmailMessage {
    pub fn new(from: String, to: Vec<String>, subject: String, html: String) -> Self {
        Self {
            from,
            to,
            subject,
            html,
            text: None,
            reply_to: None,
        }
    }

    pub fn with_text(mut self, text: String) -> Self {
        self.text = Some(text);
        self
    }

    pub fn with_reply_to(mut self, reply_to: String) -> Self {
        self.reply_to = Some(reply_to);
        self
    }
}

/// Trait that all email builders must implement
pub trait EmailBuilder {
    /// Build the email message
    fn build(&self) -> Result<EmailMessage, EmailError>;
}

/// What the applicant is told after submitting; also the outbox payload for redelivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSubmittedNotice {
    pub applicant_name: String,
    pub applicant_email: String,
    pub program: String,
    pub application_id: Uuid,
    pub submitted_at: DateTime<Utc>,
}

/// Payment confirmation inputs; `amount` is in whole currency units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfirmationNotice {
    pub applicant_name: String,
    pub applicant_email: String,
    pub amount: i64,
    pub currency: String,
    pub months_paid: i32,
    pub payment_reference: String,
    pub payment_date: DateTime<Utc>,
}

/// Data structure for the application submitted template
#[derive(Serialize)]
pub struct ApplicationSubmittedEmailData {
    pub applicant_name: String,
    pub program: String,
    pub program_name: String,
    pub application_id: String,
    pub submitted_on: String,
    pub portal_url: String,
    pub support_email: String,
    pub organisation: String,
    pub year: i32,
}

/// Data structure for the payment confirmation template
#[derive(Serialize)]
pub struct PaymentConfirmationEmailData {
    pub applicant_name: String,
    pub amount: String,
    pub months_label: String,
    pub payment_reference: String,
    pub payment_date: String,
    pub dashboard_url: String,
    pub support_email: String,
    pub organisation: String,
    pub year: i32,
}

/// Resend API specific email format
///
/// Optional fields (`text` and `reply_to`) are omitted from the JSON payload
/// when they are `None`.
#[derive(Debug, Serialize)]
pub struct ResendEmailPayload {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl From<EmailMessage> for ResendEmailPayload {
    fn from(message: EmailMessage) -> Self {
        Self {
            from: message.from,
            to: message.to,
            subject: message.subject,
            html: message.html,
            text: message.text,
            reply_to: message.reply_to,
        }
    }
}
