// Applicant record, created once at submission

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::payment::SummaryStatus;
use crate::schema::applications;

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema,
)]
#[diesel(table_name = applications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Application {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: NaiveDate,
    pub country: String,
    pub address: String,
    pub gender: Option<String>,
    pub program: String,
    pub employment_status: String,
    pub salary: Option<String>,
    pub reason_for_joining: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    // The three fields below are owned by the payment summary trigger
    pub payment_status: String,
    pub months_paid: i32,
    pub total_amount_paid: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = applications)]
pub struct NewApplication {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: NaiveDate,
    pub country: String,
    pub address: String,
    pub gender: Option<String>,
    pub program: String,
    pub employment_status: String,
    pub salary: Option<String>,
    pub reason_for_joining: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl NewApplication {
    /// Materialize the row as the store will hold it right after insert
    pub fn into_application(self) -> Application {
        Application {
            id: self.id,
            full_name: self.full_name,
            email: self.email,
            phone_number: self.phone_number,
            date_of_birth: self.date_of_birth,
            country: self.country,
            address: self.address,
            gender: self.gender,
            program: self.program,
            employment_status: self.employment_status,
            salary: self.salary,
            reason_for_joining: self.reason_for_joining,
            notes: self.notes,
            status: self.status,
            payment_status: SummaryStatus::Unpaid.as_str().to_string(),
            months_paid: 0,
            total_amount_paid: 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Application {
    pub fn summary_status(&self) -> SummaryStatus {
        SummaryStatus::from_string(&self.payment_status).unwrap_or(SummaryStatus::Unpaid)
    }

    /// First token of the full name, used in email greetings
    pub fn first_name(&self) -> &str {
        self.full_name
            .split_whitespace()
            .next()
            .unwrap_or(self.full_name.as_str())
    }
}

/// Applicant details returned to the payment portal after re-identification
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub program: String,
    pub payment_status: SummaryStatus,
    pub months_paid: i32,
    pub total_amount_paid: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Application> for ApplicationSummary {
    fn from(app: &Application) -> Self {
        Self {
            id: app.id,
            full_name: app.full_name.clone(),
            email: app.email.clone(),
            program: app.program.clone(),
            payment_status: app.summary_status(),
            months_paid: app.months_paid,
            total_amount_paid: app.total_amount_paid,
            created_at: app.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NewApplication {
        let now = Utc::now();
        NewApplication {
            id: Uuid::new_v4(),
            full_name: "Ada Okafor Nwosu".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: "+234 801 234 5678".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1995, 4, 12).unwrap(),
            country: "Nigeria".to_string(),
            address: "12 Marina Road, Lagos".to_string(),
            gender: None,
            program: "Cloud Computing".to_string(),
            employment_status: "Employed".to_string(),
            salary: None,
            reason_for_joining: None,
            notes: None,
            status: ApplicationStatus::Pending.as_str().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_new_application_starts_unpaid() {
        let app = sample().into_application();
        assert_eq!(app.months_paid, 0);
        assert_eq!(app.total_amount_paid, 0);
        assert_eq!(app.summary_status(), SummaryStatus::Unpaid);
        assert_eq!(app.status, "pending");
    }

    #[test]
    fn test_first_name() {
        let app = sample().into_application();
        assert_eq!(app.first_name(), "Ada");
    }
}
