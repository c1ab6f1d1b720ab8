// Payment portal: re-identify the applicant, offer bundles, hand off to the gateway widget

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    app_config::PaymentConfig,
    db::{PortalStore, StoreError},
    models::{
        format_amount, generate_payment_reference, Application, ApplicationSummary, NewPayment,
        Payment, PaymentStatus, PlanTerms, SummaryStatus,
    },
    services::payment_options::{compute_payment_options, monthly_price_label, PaymentOptions},
    utils::{
        audit_logger::{AuditAction, AuditLogger},
        service_error::ServiceError,
        validation::normalize_email,
    },
};

/// Reference collisions are astronomically unlikely; give up after this many
const MAX_REFERENCE_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyApplicantResponse {
    pub exists: bool,
    pub application_data: Option<ApplicationSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantPaymentOptions {
    pub application: ApplicationSummary,
    pub price_label: String,
    pub options: PaymentOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub email: String,
    pub months_to_pay: i32,
}

/// Carried through the gateway and echoed back in the webhook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetadata {
    pub application_id: Uuid,
    pub months_to_pay: i32,
    pub applicant_name: String,
}

/// Everything the hosted widget needs to open
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfig {
    pub key: String,
    pub email: String,
    /// Minor units (kobo)
    pub amount: i64,
    pub currency: String,
    pub reference: String,
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub payment: Payment,
    pub widget: WidgetConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmCheckoutRequest {
    pub gateway_reference: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutConfirmation {
    pub payment: Payment,
    /// True until the gateway's webhook has marked the payment successful
    pub awaiting_confirmation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthTile {
    pub month: i32,
    pub paid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDashboard {
    pub application: ApplicationSummary,
    pub payment_status: SummaryStatus,
    pub payment_status_label: String,
    pub months_paid: i32,
    pub total_months: i32,
    pub total_paid: i64,
    pub remaining_months: i32,
    pub remaining_balance: i64,
    pub currency: String,
    pub months: Vec<MonthTile>,
    pub can_pay_more: bool,
    /// Newest first
    pub payments: Vec<Payment>,
}

#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn PortalStore>,
    config: PaymentConfig,
}

impl PaymentService {
    pub fn new(store: Arc<dyn PortalStore>, config: PaymentConfig) -> Self {
        Self { store, config }
    }

    /// Look an applicant up by the email they applied with
    #[instrument(skip(self))]
    pub async fn verify_applicant(&self, email: &str) -> Result<VerifyApplicantResponse, ServiceError> {
        let email = required_email(email)?;
        let application = self.store.find_application_by_email(&email).await?;

        Ok(VerifyApplicantResponse {
            exists: application.is_some(),
            application_data: application.as_ref().map(ApplicationSummary::from),
        })
    }

    #[instrument(skip(self))]
    pub async fn options(&self, email: &str) -> Result<ApplicantPaymentOptions, ServiceError> {
        let application = self.application_for(email).await?;
        let terms = self.plan_terms(&application).await?;

        Ok(ApplicantPaymentOptions {
            application: ApplicationSummary::from(&application),
            price_label: monthly_price_label(&terms, &self.config.currency),
            options: compute_payment_options(application.months_paid, &terms, &self.config.currency),
        })
    }

    /// Create the pending payment the widget will charge for
    #[instrument(skip(self, request), fields(months = request.months_to_pay))]
    pub async fn start_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession, ServiceError> {
        let application = self.application_for(&request.email).await?;
        let terms = self.plan_terms(&application).await?;
        let options =
            compute_payment_options(application.months_paid, &terms, &self.config.currency);

        if options.plan_complete {
            return Err(ServiceError::Conflict(
                "All months have already been paid".to_string(),
            ));
        }
        let bundle = options.bundle_for(request.months_to_pay).ok_or_else(|| {
            ServiceError::BadRequest(format!(
                "Payment for {} month(s) is not available; {} month(s) remaining",
                request.months_to_pay, options.remaining_months
            ))
        })?;

        // Only the newest checkout stays payable
        let superseded = self.store.fail_pending_payments(application.id).await?;
        for old in &superseded {
            AuditLogger::log_payment_action(
                AuditAction::CheckoutSuperseded,
                Some(application.id),
                Some(&old.payment_reference),
                None,
            );
        }

        let payment = self
            .insert_pending_payment(application.id, bundle.months, bundle.amount)
            .await?;

        AuditLogger::log_payment_action(
            AuditAction::CheckoutStarted,
            Some(application.id),
            Some(&payment.payment_reference),
            Some(format!("months={} amount={}", payment.months_paid_for, payment.amount_paid)),
        );
        info!(
            reference = %payment.payment_reference,
            "Checkout started for {} month(s)", payment.months_paid_for
        );

        let widget = WidgetConfig {
            key: self.config.paystack_public_key.clone(),
            email: application.email.clone(),
            amount: payment.amount_paid * self.config.minor_unit_factor,
            currency: self.config.currency.clone(),
            reference: payment.payment_reference.clone(),
            metadata: CheckoutMetadata {
                application_id: application.id,
                months_to_pay: payment.months_paid_for,
                applicant_name: application.full_name.clone(),
            },
        };

        Ok(CheckoutSession { payment, widget })
    }

    async fn insert_pending_payment(
        &self,
        application_id: Uuid,
        months: i32,
        amount: i64,
    ) -> Result<Payment, ServiceError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let new = NewPayment::pending(application_id, months, amount, generate_payment_reference());
            match self.store.insert_payment(new).await {
                Ok(payment) => return Ok(payment),
                Err(StoreError::Conflict(msg)) if attempt < MAX_REFERENCE_ATTEMPTS => {
                    warn!("Payment reference collision, regenerating: {}", msg);
                },
                Err(e) => return Err(ServiceError::DatabaseError(e.to_string())),
            }
        }
    }

    /// The widget reported success. Only the gateway reference is kept; the signed
    /// webhook is what credits the payment.
    #[instrument(skip(self))]
    pub async fn confirm_checkout(
        &self,
        reference: &str,
        gateway_reference: &str,
    ) -> Result<CheckoutConfirmation, ServiceError> {
        let gateway_reference = gateway_reference.trim();
        if gateway_reference.is_empty() {
            return Err(ServiceError::BadRequest(
                "Gateway reference is required".to_string(),
            ));
        }

        let payment = self
            .store
            .record_gateway_reference(reference, gateway_reference)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;

        AuditLogger::log_payment_action(
            AuditAction::CheckoutConfirmed,
            Some(payment.application_id),
            Some(reference),
            Some(format!("gateway_reference={}", gateway_reference)),
        );

        Ok(CheckoutConfirmation {
            awaiting_confirmation: !payment.is_successful(),
            payment,
        })
    }

    /// The widget was closed without paying
    #[instrument(skip(self))]
    pub async fn cancel_checkout(&self, reference: &str) -> Result<Payment, ServiceError> {
        let payment = self
            .store
            .mark_payment_failed_if_pending(reference)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;

        if payment.status() == Some(PaymentStatus::Failed) {
            AuditLogger::log_payment_action(
                AuditAction::CheckoutCancelled,
                Some(payment.application_id),
                Some(reference),
                None,
            );
        }

        Ok(payment)
    }

    /// Plain-text receipt for a payment
    #[instrument(skip(self))]
    pub async fn receipt(&self, reference: &str) -> Result<String, ServiceError> {
        let payment = self
            .store
            .find_payment_by_reference(reference)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Payment not found".to_string()))?;
        let application = self
            .store
            .find_application(payment.application_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Application not found".to_string()))?;

        Ok(render_receipt(&payment, &application, &self.config.currency))
    }

    /// Read-only reconciliation view: the stored aggregate plus the ledger behind it
    #[instrument(skip(self))]
    pub async fn dashboard(&self, email: &str) -> Result<PaymentDashboard, ServiceError> {
        let application = self.application_for(email).await?;
        let terms = self.plan_terms(&application).await?;
        let payments = self
            .store
            .list_payments_for_application(application.id)
            .await?;

        let months_paid = application.months_paid;
        let remaining_months = (terms.total_months - months_paid).max(0);
        let status = application.summary_status();

        Ok(PaymentDashboard {
            application: ApplicationSummary::from(&application),
            payment_status: status,
            payment_status_label: status.display_name().to_string(),
            months_paid,
            total_months: terms.total_months,
            total_paid: application.total_amount_paid,
            remaining_months,
            remaining_balance: i64::from(remaining_months) * terms.monthly_amount,
            currency: self.config.currency.clone(),
            months: (1..=terms.total_months)
                .map(|month| MonthTile {
                    month,
                    paid: month <= months_paid,
                })
                .collect(),
            can_pay_more: remaining_months > 0,
            payments,
        })
    }

    async fn application_for(&self, email: &str) -> Result<Application, ServiceError> {
        let email = required_email(email)?;
        self.store
            .find_application_by_email(&email)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound("No application found for this email address".to_string())
            })
    }

    pub async fn plan_terms(&self, application: &Application) -> Result<PlanTerms, ServiceError> {
        Ok(resolve_plan_terms(self.store.as_ref(), &application.program, &self.config).await?)
    }
}

/// The program's plan, else the global plan, else the configured default
pub async fn resolve_plan_terms(
    store: &dyn PortalStore,
    program: &str,
    config: &PaymentConfig,
) -> Result<PlanTerms, StoreError> {
    let plan = store.find_plan_for_program(program).await?;
    Ok(plan.as_ref().map(PlanTerms::from).unwrap_or(PlanTerms {
        monthly_amount: config.monthly_amount,
        total_months: config.total_months,
    }))
}

fn required_email(email: &str) -> Result<String, ServiceError> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ServiceError::BadRequest("Email is required".to_string()));
    }
    Ok(email)
}

fn render_receipt(payment: &Payment, application: &Application, currency: &str) -> String {
    let status = match payment.status() {
        Some(PaymentStatus::Success) => "PAID",
        Some(PaymentStatus::Pending) => "PENDING",
        Some(PaymentStatus::Failed) => "FAILED",
        None => "UNKNOWN",
    };

    format!(
        "PAYMENT RECEIPT\n\
         ================\n\
         \n\
         Receipt #: {reference}\n\
         Date: {date}\n\
         \n\
         Applicant: {name}\n\
         Email: {email}\n\
         \n\
         Payment Details:\n\
         - Months Paid: {months}\n\
         - Amount: {amount}\n\
         - Payment Method: Paystack\n\
         - Reference: {gateway}\n\
         \n\
         Status: {status}\n\
         \n\
         Thank you for your payment!\n\
         Generated {generated}\n",
        reference = payment.payment_reference,
        date = payment.payment_date.format("%Y-%m-%d %H:%M UTC"),
        name = application.full_name,
        email = application.email,
        months = payment.months_paid_for,
        amount = format_amount(payment.amount_paid, currency),
        gateway = payment.paystack_reference.as_deref().unwrap_or("-"),
        status = status,
        generated = Utc::now().format("%Y-%m-%d %H:%M UTC"),
    )
}
