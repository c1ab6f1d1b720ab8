// Notification outbox rows: one per email the portal tried to send

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::notification_outbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationSubmitted,
    PaymentConfirmation,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ApplicationSubmitted => "application_submitted",
            NotificationKind::PaymentConfirmation => "payment_confirmation",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "application_submitted" => Some(NotificationKind::ApplicationSubmitted),
            "payment_confirmation" => Some(NotificationKind::PaymentConfirmation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(NotificationStatus::Pending),
            "sent" => Some(NotificationStatus::Sent),
            "failed" => Some(NotificationStatus::Failed),
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Insertable, ToSchema,
)]
#[diesel(table_name = notification_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Notification {
    pub id: Uuid,
    pub kind: String,
    pub recipient: String,
    /// Template data needed to rebuild the email on redelivery
    pub payload: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn new(kind: NotificationKind, recipient: &str, payload: serde_json::Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind: kind.as_str().to_string(),
            recipient: recipient.to_string(),
            payload,
            status: NotificationStatus::Pending.as_str().to_string(),
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
            sent_at: None,
        }
    }

    pub fn kind(&self) -> Option<NotificationKind> {
        NotificationKind::from_string(&self.kind)
    }

    pub fn status(&self) -> Option<NotificationStatus> {
        NotificationStatus::from_string(&self.status)
    }
}

/// Outcome of a delivery attempt, written back to the outbox row
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Sent,
    Failed(String),
}
