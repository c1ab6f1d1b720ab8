// Server-side wizard draft: the single JSON document an applicant's progress lives in

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::schema::application_drafts;
use crate::utils::validation::{
    validate_email_address, validate_phone_number, validate_required,
    validate_years_of_experience,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    PersonalInfo,
    EmploymentInfo,
    Review,
    Submitted,
}

impl WizardStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::PersonalInfo => "personal_info",
            WizardStep::EmploymentInfo => "employment_info",
            WizardStep::Review => "review",
            WizardStep::Submitted => "submitted",
        }
    }

    pub fn next(&self) -> Option<Self> {
        match self {
            WizardStep::PersonalInfo => Some(WizardStep::EmploymentInfo),
            WizardStep::EmploymentInfo => Some(WizardStep::Review),
            WizardStep::Review => Some(WizardStep::Submitted),
            WizardStep::Submitted => None,
        }
    }

    pub fn previous(&self) -> Option<Self> {
        match self {
            WizardStep::PersonalInfo | WizardStep::Submitted => None,
            WizardStep::EmploymentInfo => Some(WizardStep::PersonalInfo),
            WizardStep::Review => Some(WizardStep::EmploymentInfo),
        }
    }

    /// Position in the linear flow, used for "has the draft reached X" checks
    pub fn ordinal(&self) -> u8 {
        match self {
            WizardStep::PersonalInfo => 0,
            WizardStep::EmploymentInfo => 1,
            WizardStep::Review => 2,
            WizardStep::Submitted => 3,
        }
    }
}

/// First wizard page. Every field tolerates being blank so partial saves round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    #[validate(custom(function = "validate_required", message = "Full name is required"))]
    #[validate(length(max = 255, message = "Full name must be less than 255 characters"))]
    pub full_name: String,

    #[validate(custom(function = "validate_email_address"))]
    #[validate(length(max = 320, message = "Email must be less than 320 characters"))]
    pub email: String,

    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number: String,

    #[serde(deserialize_with = "deserialize_flexible_date")]
    #[schema(value_type = Option<String>, format = Date)]
    pub date_of_birth: Option<NaiveDate>,

    #[validate(custom(function = "validate_required", message = "Country is required"))]
    pub country: String,

    #[validate(custom(function = "validate_required", message = "Address is required"))]
    pub address: String,

    #[validate(custom(function = "validate_required", message = "Program is required"))]
    pub program: String,

    #[validate(length(max = 50, message = "Gender must be less than 50 characters"))]
    pub gender: Option<String>,
}

impl PersonalInfo {
    /// Trim every text field and lower-case the email
    pub fn sanitize(&mut self) {
        self.full_name = self.full_name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.phone_number = self.phone_number.trim().to_string();
        self.country = self.country.trim().to_string();
        self.address = self.address.trim().to_string();
        self.program = self.program.trim().to_string();
        self.gender = trim_optional(self.gender.take());
    }
}

/// Second wizard page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct EmploymentInfo {
    #[validate(custom(function = "validate_required", message = "Employment status is required"))]
    pub employment_status: String,

    // Number inputs arrive as strings from some clients
    #[serde(deserialize_with = "deserialize_string_or_number")]
    #[validate(custom(function = "validate_years_of_experience"))]
    pub years_of_experience: String,

    #[validate(length(max = 255, message = "Employer must be less than 255 characters"))]
    pub current_employer: Option<String>,

    #[validate(length(max = 100, message = "Salary must be less than 100 characters"))]
    pub salary: Option<String>,

    #[validate(length(max = 2000, message = "Reason must be less than 2000 characters"))]
    pub reason_for_joining: Option<String>,
}

impl EmploymentInfo {
    pub fn sanitize(&mut self) {
        self.employment_status = self.employment_status.trim().to_string();
        self.years_of_experience = self.years_of_experience.trim().to_string();
        self.current_employer = trim_optional(self.current_employer.take());
        self.salary = trim_optional(self.salary.take());
        self.reason_for_joining = trim_optional(self.reason_for_joining.take());
    }

    /// Lines recorded into `applications.notes` for fields without a column
    pub fn notes(&self) -> Option<String> {
        let mut lines = Vec::new();
        if !self.years_of_experience.is_empty() {
            lines.push(format!("Years of experience: {}", self.years_of_experience));
        }
        if let Some(employer) = &self.current_employer {
            lines.push(format!("Current employer: {}", employer));
        }

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Left behind in the draft once the application row exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedApplication {
    pub application_id: Uuid,
    pub full_name: String,
    pub email: String,
    pub program: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WizardDraft {
    pub id: Uuid,
    pub step: WizardStep,
    pub personal_info: Option<PersonalInfo>,
    pub employment_info: Option<EmploymentInfo>,
    pub submitted_application: Option<SubmittedApplication>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The `payload` column: everything in the draft except its identity and timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftPayload {
    step: WizardStep,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    personal_info: Option<PersonalInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    employment_info: Option<EmploymentInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    submitted_application: Option<SubmittedApplication>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = application_drafts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DraftRecord {
    pub id: Uuid,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WizardDraft {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            step: WizardStep::PersonalInfo,
            personal_info: None,
            employment_info: None,
            submitted_application: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.step == WizardStep::Submitted
    }

    pub fn has_reached(&self, step: WizardStep) -> bool {
        self.step.ordinal() >= step.ordinal()
    }

    pub fn to_record(&self) -> Result<DraftRecord, serde_json::Error> {
        let payload = DraftPayload {
            step: self.step,
            personal_info: self.personal_info.clone(),
            employment_info: self.employment_info.clone(),
            submitted_application: self.submitted_application.clone(),
        };

        Ok(DraftRecord {
            id: self.id,
            payload: serde_json::to_value(payload)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    pub fn from_record(record: DraftRecord) -> Result<Self, serde_json::Error> {
        let payload: DraftPayload = serde_json::from_value(record.payload)?;
        Ok(Self {
            id: record.id,
            step: payload.step,
            personal_info: payload.personal_info,
            employment_info: payload.employment_info,
            submitted_application: payload.submitted_application,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

impl Default for WizardDraft {
    fn default() -> Self {
        Self::new()
    }
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Accept `YYYY-MM-DD`, a full RFC 3339 timestamp, an empty string or null
fn deserialize_flexible_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(Some(date));
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| Some(dt.with_timezone(&Utc).date_naive()))
        .map_err(|_| serde::de::Error::custom(format!("invalid date: {}", trimmed)))
}

fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::Text(s)) => s,
        Some(StringOrNumber::Integer(n)) => n.to_string(),
        Some(StringOrNumber::Float(f)) => f.to_string(),
        None => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_personal_info_deserializes() {
        let info: PersonalInfo =
            serde_json::from_value(json!({ "fullName": "Ada", "email": "" })).unwrap();
        assert_eq!(info.full_name, "Ada");
        assert!(info.phone_number.is_empty());
        assert!(info.date_of_birth.is_none());
    }

    #[test]
    fn test_date_of_birth_accepts_iso_datetime() {
        let info: PersonalInfo =
            serde_json::from_value(json!({ "dateOfBirth": "1995-04-12T00:00:00.000Z" })).unwrap();
        assert_eq!(info.date_of_birth, NaiveDate::from_ymd_opt(1995, 4, 12));

        let info: PersonalInfo =
            serde_json::from_value(json!({ "dateOfBirth": "1995-04-12" })).unwrap();
        assert_eq!(info.date_of_birth, NaiveDate::from_ymd_opt(1995, 4, 12));

        let info: PersonalInfo = serde_json::from_value(json!({ "dateOfBirth": "" })).unwrap();
        assert!(info.date_of_birth.is_none());
    }

    #[test]
    fn test_years_of_experience_accepts_numbers() {
        let info: EmploymentInfo =
            serde_json::from_value(json!({ "yearsOfExperience": 5 })).unwrap();
        assert_eq!(info.years_of_experience, "5");

        let info: EmploymentInfo =
            serde_json::from_value(json!({ "yearsOfExperience": "7" })).unwrap();
        assert_eq!(info.years_of_experience, "7");
    }

    #[test]
    fn test_draft_record_round_trip_preserves_dates() {
        let mut draft = WizardDraft::new();
        draft.step = WizardStep::EmploymentInfo;
        draft.personal_info = Some(PersonalInfo {
            full_name: "Ada Okafor".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1995, 4, 12),
            ..Default::default()
        });

        let record = draft.to_record().unwrap();
        assert_eq!(record.payload["personalInfo"]["dateOfBirth"], "1995-04-12");
        assert!(record.payload.get("employmentInfo").is_none());

        let restored = WizardDraft::from_record(record).unwrap();
        assert_eq!(restored, draft);
    }

    #[test]
    fn test_step_transitions() {
        assert_eq!(WizardStep::PersonalInfo.previous(), None);
        assert_eq!(WizardStep::Submitted.previous(), None);
        assert_eq!(WizardStep::Submitted.next(), None);
        assert_eq!(
            WizardStep::EmploymentInfo.next(),
            Some(WizardStep::Review)
        );
    }

    #[test]
    fn test_employment_notes() {
        let info = EmploymentInfo {
            employment_status: "Employed".to_string(),
            years_of_experience: "3".to_string(),
            current_employer: Some("Andela".to_string()),
            ..Default::default()
        };
        assert_eq!(
            info.notes().as_deref(),
            Some("Years of experience: 3\nCurrent employer: Andela")
        );
        assert_eq!(EmploymentInfo::default().notes(), None);
    }
}
