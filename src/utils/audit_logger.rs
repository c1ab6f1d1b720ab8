// Audit trail for payment state changes, emitted as JSON on the `audit` target
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    ApplicationSubmitted,
    CheckoutStarted,
    CheckoutConfirmed,
    CheckoutCancelled,
    CheckoutSuperseded,
    PaymentSucceeded,
    PaymentRecordedFromWebhook,
    PaymentExceedsPlan,
    WebhookRejected,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub action: AuditAction,
    pub application_id: Option<Uuid>,
    pub resource_id: Option<String>,
    pub resource_type: String,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct AuditLogger;

impl AuditLogger {
    /// Log an audit event for a payment, keyed by its payment reference
    pub fn log_payment_action(
        action: AuditAction,
        application_id: Option<Uuid>,
        payment_reference: Option<&str>,
        details: Option<String>,
    ) {
        Self::emit(AuditLog {
            id: Uuid::new_v4(),
            action,
            application_id,
            resource_id: payment_reference.map(str::to_string),
            resource_type: "payment".to_string(),
            details,
            timestamp: Utc::now(),
        });
    }

    pub fn log_application_action(
        action: AuditAction,
        application_id: Uuid,
        details: Option<String>,
    ) {
        Self::emit(AuditLog {
            id: Uuid::new_v4(),
            action,
            application_id: Some(application_id),
            resource_id: Some(application_id.to_string()),
            resource_type: "application".to_string(),
            details,
            timestamp: Utc::now(),
        });
    }

    fn emit(audit_log: AuditLog) {
        let json_log = serde_json::to_string(&audit_log).unwrap_or_else(|e| {
            warn!("Failed to serialize audit log: {}", e);
            format!("{:?}", audit_log)
        });

        info!(target: "audit", "{}", json_log);
    }
}
