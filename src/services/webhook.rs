// Paystack webhook: signature check, then mark the referenced payment successful
//
// The database trigger recomputes the application's summary from the ledger, so
// nothing here touches `months_paid` directly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use ring::hmac;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    app_config::PaymentConfig,
    db::{CreditOutcome, PaymentTransition, PortalStore, StoreError},
    models::{DeliveryOutcome, NewPayment, PaymentStatus},
    services::{
        email::PaymentConfirmationNotice, notifications::NotificationOutbox,
        payments::resolve_plan_terms,
    },
    utils::audit_logger::{AuditAction, AuditLogger},
};

pub const SIGNATURE_HEADER: &str = "x-paystack-signature";
pub const CHARGE_SUCCESS: &str = "charge.success";

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Missing webhook signature")]
    MissingSignature,

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Webhook secret is not configured")]
    SecretNotConfigured,

    #[error("Malformed webhook payload: {0}")]
    Malformed(String),

    #[error("Failed to update payment record: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WebhookError::MissingSignature | WebhookError::InvalidSignature => {
                (StatusCode::UNAUTHORIZED, "Invalid signature")
            },
            WebhookError::SecretNotConfigured | WebhookError::Malformed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Webhook processing failed")
            },
            WebhookError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to update payment record",
            ),
        };

        if status.is_server_error() {
            error!("Webhook failed: {}", self);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// What happened to an accepted event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Not a `charge.success` event
    Ignored,
    /// Nothing in the ledger matched and there was no way to record it
    Unmatched { reference: String },
    /// Crediting the charge would pass the plan length; left uncredited for review
    ExceedsPlan { reference: String },
    Processed {
        reference: String,
        newly_successful: bool,
    },
}

impl WebhookOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            WebhookOutcome::Ignored => "Event not processed",
            WebhookOutcome::Unmatched { .. } => "Event acknowledged",
            WebhookOutcome::ExceedsPlan { .. } => "Payment exceeds remaining plan; flagged for review",
            WebhookOutcome::Processed { .. } => "Webhook processed successfully",
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeData {
    pub reference: String,
    /// Minor units (kobo)
    pub amount: i64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    pub customer: ChargeCustomer,
    #[serde(default, deserialize_with = "lenient_metadata")]
    pub metadata: ChargeMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeCustomer {
    #[serde(default)]
    pub email: String,
}

/// Echo of the metadata attached at checkout
#[derive(Debug, Clone, Default)]
pub struct ChargeMetadata {
    pub applicant_name: Option<String>,
    pub months_to_pay: Option<i32>,
    pub application_id: Option<Uuid>,
}

impl ChargeMetadata {
    /// Read each field on its own so one odd value does not hide the others
    fn from_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let text = |key: &str| {
            object
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };

        let months_to_pay = match object.get("monthsToPay") {
            Some(serde_json::Value::Number(n)) => n.as_i64().and_then(|m| i32::try_from(m).ok()),
            Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };

        Self {
            applicant_name: text("applicantName").map(str::to_string),
            months_to_pay,
            application_id: text("applicationId").and_then(|s| Uuid::parse_str(s).ok()),
        }
    }
}

// Paystack sends `""` or `{}` when a charge carries no metadata
fn lenient_metadata<'de, D>(deserializer: D) -> Result<ChargeMetadata, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_object()
        .map(ChargeMetadata::from_object)
        .unwrap_or_default())
}

/// Hex HMAC-SHA512 of `body` keyed with the gateway secret
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA512, secret.as_bytes());
    hex::encode(hmac::sign(&key, body).as_ref())
}

pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), WebhookError> {
    let expected = hex::decode(signature.trim()).map_err(|_| WebhookError::InvalidSignature)?;
    let key = hmac::Key::new(hmac::HMAC_SHA512, secret.as_bytes());
    hmac::verify(&key, body, &expected).map_err(|_| WebhookError::InvalidSignature)
}

#[derive(Clone)]
pub struct WebhookService {
    store: Arc<dyn PortalStore>,
    outbox: NotificationOutbox,
    config: PaymentConfig,
}

impl WebhookService {
    pub fn new(store: Arc<dyn PortalStore>, outbox: NotificationOutbox, config: PaymentConfig) -> Self {
        Self {
            store,
            outbox,
            config,
        }
    }

    /// Check the signature header against the raw body
    ///
    /// With signatures not required, an unsigned request passes but a signed one is
    /// still checked.
    pub fn authenticate(&self, signature: Option<&str>, body: &[u8]) -> Result<(), WebhookError> {
        let secret = self
            .config
            .paystack_secret_key
            .as_deref()
            .filter(|s| !s.is_empty());

        let result = match (signature, secret) {
            (Some(sig), Some(secret)) => verify_signature(secret, body, sig),
            (None, _) if self.config.require_webhook_signature => Err(WebhookError::MissingSignature),
            (Some(_), None) if self.config.require_webhook_signature => {
                Err(WebhookError::SecretNotConfigured)
            },
            _ => Ok(()),
        };

        if let Err(e) = &result {
            AuditLogger::log_payment_action(
                AuditAction::WebhookRejected,
                None,
                None,
                Some(e.to_string()),
            );
        }
        result
    }

    #[instrument(skip(self, signature, body), fields(body_len = body.len()))]
    pub async fn process(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<WebhookOutcome, WebhookError> {
        self.authenticate(signature, body)?;

        let event: RawEvent =
            serde_json::from_slice(body).map_err(|e| WebhookError::Malformed(e.to_string()))?;

        if event.event != CHARGE_SUCCESS {
            info!(event = %event.event, "Ignoring webhook event");
            return Ok(WebhookOutcome::Ignored);
        }

        let charge: ChargeData = serde_json::from_value(event.data)
            .map_err(|e| WebhookError::Malformed(e.to_string()))?;

        let credit = match self.credit_known_reference(&charge).await? {
            Some(credit) => credit,
            None => match self.record_unknown_reference(&charge).await? {
                Some(credit) => credit,
                None => {
                    warn!(
                        reference = %charge.reference,
                        "charge.success for an unknown reference without an application id"
                    );
                    return Ok(WebhookOutcome::Unmatched {
                        reference: charge.reference,
                    });
                },
            },
        };

        let transition = match credit {
            CreditOutcome::Credited(transition) => transition,
            CreditOutcome::ExceedsPlan {
                application_id,
                months_paid,
                months_requested,
            } => {
                AuditLogger::log_payment_action(
                    AuditAction::PaymentExceedsPlan,
                    Some(application_id),
                    Some(&charge.reference),
                    Some(format!(
                        "months_paid={} months_requested={} amount={}",
                        months_paid, months_requested, charge.amount
                    )),
                );
                warn!(
                    reference = %charge.reference,
                    "charge.success would exceed the plan; not credited"
                );
                return Ok(WebhookOutcome::ExceedsPlan {
                    reference: charge.reference,
                });
            },
        };

        let payment = &transition.payment;
        let charged = charge.amount / self.config.minor_unit_factor.max(1);
        if charged != payment.amount_paid {
            warn!(
                reference = %payment.payment_reference,
                "Charged amount {} differs from recorded amount {}", charged, payment.amount_paid
            );
        }

        let newly_successful = transition.became_successful();
        if newly_successful {
            AuditLogger::log_payment_action(
                AuditAction::PaymentSucceeded,
                Some(payment.application_id),
                Some(&payment.payment_reference),
                Some(format!("months={} amount={}", payment.months_paid_for, charged)),
            );
            self.send_confirmation(&charge, &transition, charged).await;
        } else {
            info!(reference = %payment.payment_reference, "Repeated charge.success; already recorded");
        }

        Ok(WebhookOutcome::Processed {
            reference: charge.reference,
            newly_successful,
        })
    }

    /// Plan length in months for the application's program
    async fn credit_limit(&self, program: &str) -> Result<i32, WebhookError> {
        let terms = resolve_plan_terms(self.store.as_ref(), program, &self.config).await?;
        Ok(terms.total_months)
    }

    /// Mark a reference checkout created as successful. `None` when it is unknown.
    async fn credit_known_reference(
        &self,
        charge: &ChargeData,
    ) -> Result<Option<CreditOutcome>, WebhookError> {
        let Some(payment) = self.store.find_payment_by_reference(&charge.reference).await? else {
            return Ok(None);
        };
        let Some(application) = self.store.find_application(payment.application_id).await? else {
            return Err(StoreError::NotFound.into());
        };
        let limit = self.credit_limit(&application.program).await?;

        Ok(self
            .store
            .mark_payment_successful(&charge.reference, &charge.reference, limit)
            .await?)
    }

    /// Record a success for a reference checkout never created, keyed on the reference
    async fn record_unknown_reference(
        &self,
        charge: &ChargeData,
    ) -> Result<Option<CreditOutcome>, WebhookError> {
        let Some(application_id) = charge.metadata.application_id else {
            return Ok(None);
        };
        let Some(application) = self.store.find_application(application_id).await? else {
            warn!(%application_id, "Webhook metadata names an unknown application");
            return Ok(None);
        };
        let limit = self.credit_limit(&application.program).await?;

        let months = charge.metadata.months_to_pay.unwrap_or(1).max(1);
        let mut new = NewPayment::pending(
            application_id,
            months,
            charge.amount / self.config.minor_unit_factor.max(1),
            charge.reference.clone(),
        );
        new.payment_status = PaymentStatus::Success.as_str().to_string();
        new.paystack_reference = Some(charge.reference.clone());
        if let Some(paid_at) = charge.paid_at {
            new.payment_date = paid_at;
        }

        let credit = self.store.upsert_successful_payment(new, limit).await?;
        if let CreditOutcome::Credited(_) = credit {
            AuditLogger::log_payment_action(
                AuditAction::PaymentRecordedFromWebhook,
                Some(application_id),
                Some(&charge.reference),
                Some(format!("months={}", months)),
            );
        }
        Ok(Some(credit))
    }

    async fn send_confirmation(&self, charge: &ChargeData, transition: &PaymentTransition, amount: i64) {
        let payment = &transition.payment;

        let mut applicant_name = charge.metadata.applicant_name.clone().unwrap_or_default();
        let mut applicant_email = charge.customer.email.trim().to_string();
        if applicant_name.is_empty() || applicant_email.is_empty() {
            match self.store.find_application(payment.application_id).await {
                Ok(Some(app)) => {
                    if applicant_name.is_empty() {
                        applicant_name = app.full_name;
                    }
                    if applicant_email.is_empty() {
                        applicant_email = app.email;
                    }
                },
                Ok(None) => {},
                Err(e) => warn!("Could not load applicant for confirmation email: {}", e),
            }
        }
        if applicant_email.is_empty() {
            warn!(reference = %payment.payment_reference, "No recipient for payment confirmation");
            return;
        }

        let notice = PaymentConfirmationNotice {
            applicant_name,
            applicant_email,
            amount,
            currency: charge
                .currency
                .clone()
                .unwrap_or_else(|| self.config.currency.clone()),
            months_paid: payment.months_paid_for,
            payment_reference: payment.payment_reference.clone(),
            payment_date: charge.paid_at.unwrap_or_else(Utc::now),
        };

        if let DeliveryOutcome::Failed(reason) = self.outbox.payment_confirmation(&notice).await {
            warn!(
                reference = %payment.payment_reference,
                "Payment confirmation email not sent: {}", reason
            );
        }
    }
}
