// Static reference data seeded by migration

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::schema::{countries, payment_plans, programs};

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema,
)]
#[diesel(table_name = programs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub duration_months: Option<i32>,
    pub is_active: bool,
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema,
)]
#[diesel(table_name = countries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Country {
    pub id: i32,
    pub code: String,
    pub name: String,
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable, Identifiable, ToSchema,
)]
#[diesel(table_name = payment_plans)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct PaymentPlan {
    pub id: i32,
    pub program_id: Option<i32>,
    pub monthly_amount: i64,
    pub total_duration_months: i32,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Price and length of the plan an applicant is paying against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanTerms {
    pub monthly_amount: i64,
    pub total_months: i32,
}

impl From<&PaymentPlan> for PlanTerms {
    fn from(plan: &PaymentPlan) -> Self {
        Self {
            monthly_amount: plan.monthly_amount,
            total_months: plan.total_duration_months,
        }
    }
}

impl PlanTerms {
    pub fn total_amount(&self) -> i64 {
        self.monthly_amount * i64::from(self.total_months)
    }
}

/// Reference lists the in-memory store is seeded with; kept in step with the seed migration
pub const SEED_PROGRAMS: &[&str] = &[
    "Cloud Computing",
    "Data Science",
    "Web Development",
    "Mobile App Development",
    "Cybersecurity",
    "AI & Machine Learning",
    "Software Engineering",
    "DevOps",
];

pub const SEED_COUNTRIES: &[(&str, &str)] = &[
    ("DE", "Germany"),
    ("US", "United States"),
    ("GB", "United Kingdom"),
    ("CA", "Canada"),
    ("AU", "Australia"),
    ("NG", "Nigeria"),
    ("ZA", "South Africa"),
    ("GH", "Ghana"),
    ("KE", "Kenya"),
    ("FR", "France"),
    ("ES", "Spain"),
];

pub const EMPLOYMENT_STATUSES: &[&str] = &[
    "Employed",
    "Unemployed",
    "Self-employed",
    "Student",
    "Freelancer",
];
