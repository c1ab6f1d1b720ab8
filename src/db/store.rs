// Storage seam for the portal: one trait, a Postgres and an in-memory implementation

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Application, Country, DeliveryOutcome, NewApplication, NewPayment, Notification, Payment,
    PaymentPlan, PaymentStatus, Program, WizardDraft,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,
    #[error("Duplicate record: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Connection pool error: {0}")]
    Pool(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error};

        match err {
            Error::NotFound => StoreError::NotFound,
            Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                StoreError::Conflict(info.message().to_string())
            },
            other => StoreError::Database(other.to_string()),
        }
    }
}

/// A payment row before and after a status change
#[derive(Debug, Clone)]
pub struct PaymentTransition {
    pub payment: Payment,
    /// `None` when the row did not exist before the change
    pub previous_status: Option<PaymentStatus>,
}

impl PaymentTransition {
    /// True only on the first move into `success`; retries of the same event return false
    pub fn became_successful(&self) -> bool {
        self.payment.is_successful() && self.previous_status != Some(PaymentStatus::Success)
    }
}

/// Result of crediting a successful charge against an application's plan
#[derive(Debug, Clone)]
pub enum CreditOutcome {
    Credited(PaymentTransition),
    /// Crediting would take the application past `credit_limit` months; nothing was written
    ExceedsPlan {
        application_id: Uuid,
        months_paid: i32,
        months_requested: i32,
    },
}

/// Everything the portal reads and writes
///
/// Implementations own the application payment summary: after any payment mutation,
/// `months_paid`, `total_amount_paid` and `payment_status` on the parent application
/// must equal the aggregate of its successful payments. Postgres does this with a
/// trigger, the in-memory store recomputes inline.
#[async_trait]
pub trait PortalStore: Send + Sync {
    // Applications

    async fn insert_application(&self, new: NewApplication) -> Result<Application, StoreError>;

    /// Most recent application for a (normalized) email
    async fn find_application_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Application>, StoreError>;

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>, StoreError>;

    // Payments

    async fn insert_payment(&self, new: NewPayment) -> Result<Payment, StoreError>;

    async fn find_payment_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError>;

    /// Newest first by `payment_date`
    async fn list_payments_for_application(
        &self,
        application_id: Uuid,
    ) -> Result<Vec<Payment>, StoreError>;

    /// Set a known reference to `success`. `Ok(None)` when the reference does not exist.
    ///
    /// The application's successful months may not exceed `credit_limit`; the check and
    /// the update happen under the same lock. A payment already `success` is returned
    /// as-is without the check.
    async fn mark_payment_successful(
        &self,
        reference: &str,
        gateway_reference: &str,
        credit_limit: i32,
    ) -> Result<Option<CreditOutcome>, StoreError>;

    /// Insert-or-update keyed on the unique payment reference, ending in `success`,
    /// under the same `credit_limit` rule
    async fn upsert_successful_payment(
        &self,
        new: NewPayment,
        credit_limit: i32,
    ) -> Result<CreditOutcome, StoreError>;

    /// Every `pending` payment of an application → `failed`. Returns the rows changed.
    async fn fail_pending_payments(&self, application_id: Uuid) -> Result<Vec<Payment>, StoreError>;

    /// Store the widget's gateway reference without touching the status
    async fn record_gateway_reference(
        &self,
        reference: &str,
        gateway_reference: &str,
    ) -> Result<Option<Payment>, StoreError>;

    /// `pending` → `failed`; other states are returned unchanged
    async fn mark_payment_failed_if_pending(
        &self,
        reference: &str,
    ) -> Result<Option<Payment>, StoreError>;

    // Drafts

    async fn save_draft(&self, draft: &WizardDraft) -> Result<(), StoreError>;

    async fn load_draft(&self, id: Uuid) -> Result<Option<WizardDraft>, StoreError>;

    /// Returns whether a draft was removed
    async fn delete_draft(&self, id: Uuid) -> Result<bool, StoreError>;

    // Notification outbox

    async fn insert_notification(
        &self,
        notification: Notification,
    ) -> Result<Notification, StoreError>;

    async fn record_delivery(
        &self,
        id: Uuid,
        outcome: &DeliveryOutcome,
    ) -> Result<Option<Notification>, StoreError>;

    /// Rows still `pending` or `failed` with fewer than `max_attempts` attempts, oldest first
    async fn list_undelivered_notifications(
        &self,
        max_attempts: i32,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError>;

    // Reference data

    async fn list_programs(&self) -> Result<Vec<Program>, StoreError>;

    async fn list_countries(&self) -> Result<Vec<Country>, StoreError>;

    async fn list_payment_plans(&self) -> Result<Vec<PaymentPlan>, StoreError>;

    /// Active plan for a program by name, falling back to the first active global plan
    ///
    /// Plans are picked lowest id first, the same way the summary trigger picks them.
    async fn find_plan_for_program(
        &self,
        program: &str,
    ) -> Result<Option<PaymentPlan>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
