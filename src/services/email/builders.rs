// Email Builders - one per notification the portal sends

use super::types::{
    ApplicationSubmittedEmailData, ApplicationSubmittedNotice, EmailBuilder, EmailError,
    EmailMessage, PaymentConfirmationEmailData, PaymentConfirmationNotice,
};
use crate::app_config::EmailConfig;
use crate::models::format_amount;
use chrono::Datelike;
use handlebars::Handlebars;
use tracing::instrument;

const ORGANISATION: &str = "BlacTech Africa";
const SCHOLARSHIP_NAME: &str = "BlacTech Scholarship";

fn sender_address(config: &EmailConfig) -> String {
    format!("{} <{}>", config.from_name, config.from_email)
}

fn first_name(full_name: &str) -> &str {
    full_name.split_whitespace().next().unwrap_or(full_name)
}

fn months_label(months: i32) -> String {
    if months == 1 {
        "1 month".to_string()
    } else {
        format!("{} months", months)
    }
}

/// Builder for the "application received" email sent after submission
pub struct ApplicationSubmittedEmailBuilder<'a> {
    notice: &'a ApplicationSubmittedNotice,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> ApplicationSubmittedEmailBuilder<'a> {
    pub fn new(
        notice: &'a ApplicationSubmittedNotice,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            notice,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for ApplicationSubmittedEmailBuilder<'a> {
    #[instrument(skip(self), fields(application_id = %self.notice.application_id))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let notice = self.notice;
        let submitted_on = notice.submitted_at.format("%B %-d, %Y").to_string();

        let data = ApplicationSubmittedEmailData {
            applicant_name: notice.applicant_name.clone(),
            program: notice.program.clone(),
            program_name: format!("{} Program", SCHOLARSHIP_NAME),
            application_id: notice.application_id.to_string(),
            submitted_on: submitted_on.clone(),
            portal_url: self.config.portal_url.clone(),
            support_email: self.config.support_email.clone(),
            organisation: ORGANISATION.to_string(),
            year: notice.submitted_at.year(),
        };

        let html = self
            .templates
            .render("application_submitted", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Dear {},\n\n\
            Thank you for applying to the {} Program.\n\n\
            Application ID: {}\n\
            Program: {}\n\
            Submitted: {}\n\n\
            Our team will review your application within 5-7 business days.\n\
            Questions? Contact us at {}.\n\n\
            The {} Team",
            notice.applicant_name,
            SCHOLARSHIP_NAME,
            notice.application_id,
            notice.program,
            submitted_on,
            self.config.support_email,
            ORGANISATION
        );

        Ok(EmailMessage::new(
            sender_address(self.config),
            vec![notice.applicant_email.clone()],
            format!("Application Submitted Successfully - {}", SCHOLARSHIP_NAME),
            html,
        )
        .with_text(text)
        .with_reply_to(self.config.support_email.clone()))
    }
}

/// Builder for the receipt email sent when a payment is confirmed by the gateway
pub struct PaymentConfirmationEmailBuilder<'a> {
    notice: &'a PaymentConfirmationNotice,
    config: &'a EmailConfig,
    templates: &'a Handlebars<'a>,
}

impl<'a> PaymentConfirmationEmailBuilder<'a> {
    pub fn new(
        notice: &'a PaymentConfirmationNotice,
        config: &'a EmailConfig,
        templates: &'a Handlebars<'a>,
    ) -> Self {
        Self {
            notice,
            config,
            templates,
        }
    }
}

impl<'a> EmailBuilder for PaymentConfirmationEmailBuilder<'a> {
    #[instrument(skip(self), fields(reference = %self.notice.payment_reference))]
    fn build(&self) -> Result<EmailMessage, EmailError> {
        let notice = self.notice;
        let amount = format_amount(notice.amount, &notice.currency);
        let payment_date = notice.payment_date.format("%B %-d, %Y").to_string();

        let data = PaymentConfirmationEmailData {
            applicant_name: first_name(&notice.applicant_name).to_string(),
            amount: amount.clone(),
            months_label: months_label(notice.months_paid),
            payment_reference: notice.payment_reference.clone(),
            payment_date: payment_date.clone(),
            dashboard_url: format!("{}/dashboard", self.config.portal_url.trim_end_matches('/')),
            support_email: self.config.support_email.clone(),
            organisation: ORGANISATION.to_string(),
            year: notice.payment_date.year(),
        };

        let html = self
            .templates
            .render("payment_confirmation", &data)
            .map_err(|e| EmailError::TemplateError(e.to_string()))?;

        let text = format!(
            "Thank you for your payment, {}!\n\n\
            Amount Paid: {}\n\
            Months Paid: {}\n\
            Payment Reference: {}\n\
            Payment Date: {}\n\n\
            Keep this email for your records. Questions? Contact {}.",
            data.applicant_name,
            amount,
            data.months_label,
            notice.payment_reference,
            payment_date,
            self.config.support_email
        );

        Ok(EmailMessage::new(
            sender_address(self.config),
            vec![notice.applicant_email.clone()],
            format!("Payment Confirmation - {} Received", amount),
            html,
        )
        .with_text(text)
        .with_reply_to(self.config.support_email.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::email::EmailService;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn config() -> EmailConfig {
        EmailConfig {
            resend_api_key: "re_test".to_string(),
            resend_api_url: "https://api.resend.com/emails".to_string(),
            from_email: "support@blactechafrica.com".to_string(),
            from_name: "BlacTech Scholarship Portal".to_string(),
            support_email: "support@blactechafrica.com".to_string(),
            portal_url: "https://pay.example.com/".to_string(),
            max_retries: 1,
            retry_delay_ms: 10,
            request_timeout_ms: 1_000,
        }
    }

    #[test]
    fn test_application_submitted_email() {
        let config = config();
        let templates = EmailService::templates().unwrap();
        let notice = ApplicationSubmittedNotice {
            applicant_name: "Ada Okafor".to_string(),
            applicant_email: "ada@example.com".to_string(),
            program: "Cloud Computing".to_string(),
            application_id: Uuid::nil(),
            submitted_at: Utc.with_ymd_and_hms(2025, 7, 4, 10, 0, 0).unwrap(),
        };

        let message = ApplicationSubmittedEmailBuilder::new(&notice, &config, &templates)
            .build()
            .unwrap();

        assert_eq!(
            message.from,
            "BlacTech Scholarship Portal <support@blactechafrica.com>"
        );
        assert_eq!(message.to, vec!["ada@example.com"]);
        assert_eq!(
            message.subject,
            "Application Submitted Successfully - BlacTech Scholarship"
        );
        assert!(message.html.contains("Dear Ada Okafor"));
        assert!(message.html.contains("Cloud Computing"));
        assert!(message.html.contains("July 4, 2025"));
        assert!(message.text.unwrap().contains(&Uuid::nil().to_string()));
    }

    #[test]
    fn test_payment_confirmation_email() {
        let config = config();
        let templates = EmailService::templates().unwrap();
        let notice = PaymentConfirmationNotice {
            applicant_name: "Ada Okafor".to_string(),
            applicant_email: "ada@example.com".to_string(),
            amount: 20_000,
            currency: "NGN".to_string(),
            months_paid: 2,
            payment_reference: "PAY_1720000000000_abc123xyz".to_string(),
            payment_date: Utc.with_ymd_and_hms(2025, 7, 4, 10, 0, 0).unwrap(),
        };

        let message = PaymentConfirmationEmailBuilder::new(&notice, &config, &templates)
            .build()
            .unwrap();

        assert_eq!(message.subject, "Payment Confirmation - ₦20,000 Received");
        assert!(message.html.contains("Thank you for your payment, Ada!"));
        assert!(message.html.contains("2 months"));
        assert!(message.html.contains("https://pay.example.com/dashboard"));
        assert!(message.html.contains("PAY_1720000000000_abc123xyz"));
    }

    #[test]
    fn test_months_label() {
        assert_eq!(months_label(1), "1 month");
        assert_eq!(months_label(3), "3 months");
    }
}
