use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::payments;

/// One recorded charge attempt, keyed by the reference generated at checkout
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema,
)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub application_id: Uuid,
    pub amount_paid: i64, // Whole currency units (naira), not kobo
    pub months_paid_for: i32,
    pub payment_reference: String,
    pub paystack_reference: Option<String>,
    pub payment_status: String,
    pub payment_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPayment {
    pub id: Uuid,
    pub application_id: Uuid,
    pub amount_paid: i64,
    pub months_paid_for: i32,
    pub payment_reference: String,
    pub paystack_reference: Option<String>,
    pub payment_status: String,
    pub payment_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewPayment {
    /// A checkout that has been handed to the gateway but not confirmed yet
    pub fn pending(
        application_id: Uuid,
        months_paid_for: i32,
        amount_paid: i64,
        payment_reference: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            application_id,
            amount_paid,
            months_paid_for,
            payment_reference,
            paystack_reference: None,
            payment_status: PaymentStatus::Pending.as_str().to_string(),
            payment_date: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_payment(self) -> Payment {
        Payment {
            id: self.id,
            application_id: self.application_id,
            amount_paid: self.amount_paid,
            months_paid_for: self.months_paid_for,
            payment_reference: self.payment_reference,
            paystack_reference: self.paystack_reference,
            payment_status: self.payment_status,
            payment_date: self.payment_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "success" => Some(PaymentStatus::Success),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

impl Payment {
    pub fn status(&self) -> Option<PaymentStatus> {
        PaymentStatus::from_string(&self.payment_status)
    }

    pub fn is_successful(&self) -> bool {
        self.status() == Some(PaymentStatus::Success)
    }
}

/// Aggregate of an application's successful payments
///
/// This mirrors the `refresh_application_payment_summary` trigger so the
/// in-memory store and the database agree on what `months_paid` means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSummary {
    pub months_paid: i32,
    pub total_amount_paid: i64,
    pub status: SummaryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    Unpaid,
    PartiallyPaid,
    FullyPaid,
}

impl SummaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Unpaid => "unpaid",
            SummaryStatus::PartiallyPaid => "partially_paid",
            SummaryStatus::FullyPaid => "fully_paid",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(SummaryStatus::Unpaid),
            "partially_paid" => Some(SummaryStatus::PartiallyPaid),
            "fully_paid" => Some(SummaryStatus::FullyPaid),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SummaryStatus::Unpaid => "Unpaid",
            SummaryStatus::PartiallyPaid => "Partially Paid",
            SummaryStatus::FullyPaid => "Fully Paid",
        }
    }
}

impl PaymentSummary {
    pub fn from_payments<'a>(
        payments: impl IntoIterator<Item = &'a Payment>,
        total_months: i32,
    ) -> Self {
        let (months_paid, total_amount_paid) = payments
            .into_iter()
            .filter(|p| p.is_successful())
            .fold((0i32, 0i64), |(months, amount), p| {
                (months + p.months_paid_for, amount + p.amount_paid)
            });

        let status = if months_paid >= total_months {
            SummaryStatus::FullyPaid
        } else if months_paid > 0 {
            SummaryStatus::PartiallyPaid
        } else {
            SummaryStatus::Unpaid
        };

        Self {
            months_paid,
            total_amount_paid,
            status,
        }
    }
}

const REFERENCE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a gateway reference of the form `PAY_<unix-millis>_<9 base36 chars>`
pub fn generate_payment_reference() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect();
    format!("PAY_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Format a whole-unit amount with thousands separators, e.g. `₦20,000`
pub fn format_amount(amount: i64, currency: &str) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0 { "-" } else { "" };
    match currency {
        "NGN" => format!("{}₦{}", sign, grouped),
        other => format!("{}{} {}", sign, other, grouped),
    }
}
