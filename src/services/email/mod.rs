// Email Service Module
// Orchestrates builders (what to send) and the transport (how to send it)

pub mod builders;
pub mod sender;
pub mod types;

use self::types::EmailBuilder;
use crate::app_config::EmailConfig;
use builders::{ApplicationSubmittedEmailBuilder, PaymentConfirmationEmailBuilder};
use handlebars::Handlebars;
use sender::EmailSender;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// Email service for the portal's notifications
#[derive(Clone)]
pub struct EmailService {
    transport: Arc<dyn EmailTransport>,
    config: EmailConfig,
    templates: Arc<Handlebars<'static>>,
}

impl EmailService {
    /// Create an email service that delivers through Resend
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let sender = EmailSender::new_resend(
            config.resend_api_key.clone(),
            config.resend_api_url.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )?
        .with_max_retries(config.max_retries)
        .with_retry_delay(Duration::from_millis(config.retry_delay_ms));

        Self::with_transport(config, Arc::new(sender))
    }

    /// Create an email service over any transport
    pub fn with_transport(
        config: EmailConfig,
        transport: Arc<dyn EmailTransport>,
    ) -> Result<Self, EmailError> {
        Ok(Self {
            transport,
            config,
            templates: Arc::new(Self::templates()?),
        })
    }

    /// Register all email templates
    pub fn templates() -> Result<Handlebars<'static>, EmailError> {
        let mut templates = Handlebars::new();
        templates.set_strict_mode(true);

        let application_submitted =
            include_str!("../../templates/email/application_submitted.html");
        templates
            .register_template_string("application_submitted", application_submitted)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let payment_confirmation = include_str!("../../templates/email/payment_confirmation.html");
        templates
            .register_template_string("payment_confirmation", payment_confirmation)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        Ok(templates)
    }

    /// Send the "application received" email
    #[instrument(skip(self, notice), fields(application_id = %notice.application_id))]
    pub async fn send_application_submitted(
        &self,
        notice: &ApplicationSubmittedNotice,
    ) -> Result<(), EmailError> {
        info!("Sending application notification to {}", notice.applicant_email);

        let message =
            ApplicationSubmittedEmailBuilder::new(notice, &self.config, &self.templates).build()?;
        self.transport.deliver(message).await
    }

    /// Send the payment receipt email
    #[instrument(skip(self, notice), fields(reference = %notice.payment_reference))]
    pub async fn send_payment_confirmation(
        &self,
        notice: &PaymentConfirmationNotice,
    ) -> Result<(), EmailError> {
        info!("Sending payment confirmation to {}", notice.applicant_email);

        let message =
            PaymentConfirmationEmailBuilder::new(notice, &self.config, &self.templates).build()?;
        self.transport.deliver(message).await
    }
}

// Re-export commonly used types for convenience
pub use sender::EmailTransport;
pub use types::{
    ApplicationSubmittedNotice, EmailError, EmailMessage, PaymentConfirmationNotice,
};
