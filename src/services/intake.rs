// Application intake wizard: personal info -> employment info -> review -> submitted

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    db::{PortalStore, StoreError},
    models::{
        reference::EMPLOYMENT_STATUSES, ApplicationStatus, DeliveryOutcome, EmploymentInfo,
        NewApplication, PersonalInfo, SubmittedApplication, WizardDraft, WizardStep,
    },
    services::{email::ApplicationSubmittedNotice, notifications::NotificationOutbox},
    utils::{
        audit_logger::{AuditAction, AuditLogger},
        service_error::ServiceError,
        validation::field_error,
    },
};

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Draft not found")]
    DraftNotFound,

    #[error("{0}")]
    OutOfOrder(String),

    #[error("Validation failed")]
    Invalid(ValidationErrors),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<IntakeError> for ServiceError {
    fn from(err: IntakeError) -> Self {
        match err {
            IntakeError::DraftNotFound => ServiceError::NotFound("Draft not found".to_string()),
            IntakeError::OutOfOrder(msg) => ServiceError::Conflict(msg),
            IntakeError::Invalid(errors) => ServiceError::InvalidFields(errors),
            // Drafts survive store failures, so the applicant only needs to retry
            IntakeError::Store(e) => ServiceError::DatabaseError(e.to_string()),
        }
    }
}

const ALREADY_SUBMITTED: &str = "This application has already been submitted";

/// Both wizard pages, validated and normalized
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationReview {
    pub draft_id: Uuid,
    pub personal_info: PersonalInfo,
    pub employment_info: EmploymentInfo,
}

#[derive(Clone)]
pub struct IntakeService {
    store: Arc<dyn PortalStore>,
    outbox: NotificationOutbox,
}

impl IntakeService {
    pub fn new(store: Arc<dyn PortalStore>, outbox: NotificationOutbox) -> Self {
        Self { store, outbox }
    }

    #[instrument(skip(self))]
    pub async fn create_draft(&self) -> Result<WizardDraft, IntakeError> {
        let draft = WizardDraft::new();
        self.store.save_draft(&draft).await?;
        info!(draft_id = %draft.id, "Created application draft");
        Ok(draft)
    }

    pub async fn load_draft(&self, id: Uuid) -> Result<WizardDraft, IntakeError> {
        self.store
            .load_draft(id)
            .await?
            .ok_or(IntakeError::DraftNotFound)
    }

    /// Store the first page as typed; validation waits for `advance`
    #[instrument(skip(self, personal_info))]
    pub async fn save_personal_info(
        &self,
        id: Uuid,
        personal_info: PersonalInfo,
    ) -> Result<WizardDraft, IntakeError> {
        let mut draft = self.load_draft(id).await?;
        if draft.is_submitted() {
            return Err(IntakeError::OutOfOrder(ALREADY_SUBMITTED.to_string()));
        }

        draft.personal_info = Some(personal_info);
        self.persist(&mut draft).await?;
        Ok(draft)
    }

    #[instrument(skip(self, employment_info))]
    pub async fn save_employment_info(
        &self,
        id: Uuid,
        employment_info: EmploymentInfo,
    ) -> Result<WizardDraft, IntakeError> {
        let mut draft = self.load_draft(id).await?;
        if draft.is_submitted() {
            return Err(IntakeError::OutOfOrder(ALREADY_SUBMITTED.to_string()));
        }
        if !draft.has_reached(WizardStep::EmploymentInfo) {
            return Err(IntakeError::OutOfOrder(
                "Complete your personal information first".to_string(),
            ));
        }

        draft.employment_info = Some(employment_info);
        self.persist(&mut draft).await?;
        Ok(draft)
    }

    /// Validate the current page and move one step forward
    #[instrument(skip(self))]
    pub async fn advance(&self, id: Uuid) -> Result<WizardDraft, IntakeError> {
        let mut draft = self.load_draft(id).await?;

        match draft.step {
            WizardStep::PersonalInfo => {
                let personal = self
                    .validate_personal_info(draft.personal_info.clone().unwrap_or_default())
                    .await?;
                draft.personal_info = Some(personal);
            },
            WizardStep::EmploymentInfo => {
                let employment =
                    validate_employment_info(draft.employment_info.clone().unwrap_or_default())?;
                draft.employment_info = Some(employment);
            },
            WizardStep::Review => {
                return Err(IntakeError::OutOfOrder(
                    "Review your answers and submit the application".to_string(),
                ));
            },
            WizardStep::Submitted => {
                return Err(IntakeError::OutOfOrder(ALREADY_SUBMITTED.to_string()));
            },
        }

        if let Some(step) = draft.step.next() {
            draft.step = step;
        }
        self.persist(&mut draft).await?;
        info!(draft_id = %draft.id, step = draft.step.as_str(), "Draft advanced");
        Ok(draft)
    }

    #[instrument(skip(self))]
    pub async fn back(&self, id: Uuid) -> Result<WizardDraft, IntakeError> {
        let mut draft = self.load_draft(id).await?;
        if draft.is_submitted() {
            return Err(IntakeError::OutOfOrder(ALREADY_SUBMITTED.to_string()));
        }

        match draft.step.previous() {
            Some(step) => {
                draft.step = step;
                self.persist(&mut draft).await?;
                Ok(draft)
            },
            None => Ok(draft),
        }
    }

    /// Merged summary shown on the review page
    #[instrument(skip(self))]
    pub async fn review(&self, id: Uuid) -> Result<ApplicationReview, IntakeError> {
        let draft = self.load_draft(id).await?;
        self.validated_review(&draft).await
    }

    /// Insert the application row, then clear the wizard pages from the draft
    #[instrument(skip(self))]
    pub async fn submit(&self, id: Uuid) -> Result<SubmittedApplication, IntakeError> {
        let mut draft = self.load_draft(id).await?;
        let review = self.validated_review(&draft).await?;
        let personal = review.personal_info;
        let employment = review.employment_info;

        let date_of_birth = personal.date_of_birth.ok_or_else(|| {
            IntakeError::OutOfOrder("Date of birth is missing".to_string())
        })?;

        let now = Utc::now();
        let new_application = NewApplication {
            id: Uuid::new_v4(),
            full_name: personal.full_name,
            email: personal.email,
            phone_number: personal.phone_number,
            date_of_birth,
            country: personal.country,
            address: personal.address,
            gender: personal.gender,
            program: personal.program,
            employment_status: employment.employment_status.clone(),
            salary: employment.salary.clone(),
            reason_for_joining: employment.reason_for_joining.clone(),
            notes: employment.notes(),
            status: ApplicationStatus::Pending.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };

        let application = self.store.insert_application(new_application).await.map_err(|e| {
            error!(draft_id = %draft.id, "Failed to store application: {}", e);
            e
        })?;

        let submitted = SubmittedApplication {
            application_id: application.id,
            full_name: application.full_name.clone(),
            email: application.email.clone(),
            program: application.program.clone(),
            submitted_at: application.created_at,
        };

        draft.personal_info = None;
        draft.employment_info = None;
        draft.submitted_application = Some(submitted.clone());
        draft.step = WizardStep::Submitted;
        if let Err(e) = self.persist(&mut draft).await {
            // The row exists; a stale draft is preferable to a second submission
            error!(draft_id = %draft.id, "Application stored but draft not updated: {}", e);
        }

        AuditLogger::log_application_action(
            AuditAction::ApplicationSubmitted,
            application.id,
            Some(format!("program={}", application.program)),
        );
        info!(application_id = %application.id, "Application submitted");

        let notice = ApplicationSubmittedNotice {
            applicant_name: application.full_name.clone(),
            applicant_email: application.email.clone(),
            program: application.program.clone(),
            application_id: application.id,
            submitted_at: application.created_at,
        };
        if let DeliveryOutcome::Failed(reason) = self.outbox.application_submitted(&notice).await {
            warn!(application_id = %application.id, "Submission email not sent: {}", reason);
        }

        Ok(submitted)
    }

    #[instrument(skip(self))]
    pub async fn discard_draft(&self, id: Uuid) -> Result<(), IntakeError> {
        if self.store.delete_draft(id).await? {
            Ok(())
        } else {
            Err(IntakeError::DraftNotFound)
        }
    }

    async fn persist(&self, draft: &mut WizardDraft) -> Result<(), IntakeError> {
        draft.updated_at = Utc::now();
        self.store.save_draft(draft).await?;
        Ok(())
    }

    async fn validated_review(&self, draft: &WizardDraft) -> Result<ApplicationReview, IntakeError> {
        if draft.is_submitted() {
            return Err(IntakeError::OutOfOrder(ALREADY_SUBMITTED.to_string()));
        }
        if draft.step != WizardStep::Review {
            return Err(IntakeError::OutOfOrder(
                "Complete every step before reviewing the application".to_string(),
            ));
        }

        let (Some(personal), Some(employment)) =
            (draft.personal_info.clone(), draft.employment_info.clone())
        else {
            return Err(IntakeError::OutOfOrder(
                "Complete every step before reviewing the application".to_string(),
            ));
        };

        // Either page may have been edited after advancing
        let personal = self.validate_personal_info(personal).await;
        let employment = validate_employment_info(employment);

        match (personal, employment) {
            (Ok(personal_info), Ok(employment_info)) => Ok(ApplicationReview {
                draft_id: draft.id,
                personal_info,
                employment_info,
            }),
            (Err(IntakeError::Invalid(mut errors)), Err(IntakeError::Invalid(more))) => {
                for (field, field_errors) in more.field_errors() {
                    for e in field_errors {
                        errors.add(field, e.clone());
                    }
                }
                Err(IntakeError::Invalid(errors))
            },
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }

    /// Field checks plus the ones that need the clock or the reference tables
    pub async fn validate_personal_info(
        &self,
        mut info: PersonalInfo,
    ) -> Result<PersonalInfo, IntakeError> {
        info.sanitize();
        let mut errors = info.validate().err().unwrap_or_else(ValidationErrors::new);

        match info.date_of_birth {
            None => errors.add(
                "date_of_birth",
                field_error("required", "Date of birth is required"),
            ),
            Some(dob) if dob > Utc::now().date_naive() => errors.add(
                "date_of_birth",
                field_error("future_date", "Date of birth cannot be in the future"),
            ),
            Some(_) => {},
        }

        if !info.country.is_empty() {
            let countries = self.store.list_countries().await?;
            if !countries.is_empty() {
                match countries.iter().find(|c| {
                    c.name.eq_ignore_ascii_case(&info.country)
                        || c.code.eq_ignore_ascii_case(&info.country)
                }) {
                    Some(country) => info.country = country.name.clone(),
                    None => errors.add(
                        "country",
                        field_error("unknown_country", "Please select a country from the list"),
                    ),
                }
            }
        }

        if !info.program.is_empty() {
            let programs = self.store.list_programs().await?;
            if !programs.is_empty() {
                match programs
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(&info.program))
                {
                    Some(program) => info.program = program.name.clone(),
                    None => errors.add(
                        "program",
                        field_error("unknown_program", "Please select a program from the list"),
                    ),
                }
            }
        }

        if errors.is_empty() {
            Ok(info)
        } else {
            Err(IntakeError::Invalid(errors))
        }
    }
}

pub fn validate_employment_info(mut info: EmploymentInfo) -> Result<EmploymentInfo, IntakeError> {
    info.sanitize();
    let mut errors = info.validate().err().unwrap_or_else(ValidationErrors::new);

    if !info.employment_status.is_empty() {
        match EMPLOYMENT_STATUSES
            .iter()
            .find(|s| s.eq_ignore_ascii_case(&info.employment_status))
        {
            Some(status) => info.employment_status = status.to_string(),
            None => errors.add(
                "employment_status",
                field_error("unknown_status", "Please select an employment status"),
            ),
        }
    }

    if errors.is_empty() {
        Ok(info)
    } else {
        Err(IntakeError::Invalid(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employment() -> EmploymentInfo {
        EmploymentInfo {
            employment_status: "employed".to_string(),
            years_of_experience: "4".to_string(),
            current_employer: Some("  Flutterwave ".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_employment_validation_canonicalizes_status() {
        let info = validate_employment_info(employment()).unwrap();
        assert_eq!(info.employment_status, "Employed");
        assert_eq!(info.current_employer.as_deref(), Some("Flutterwave"));
    }

    #[test]
    fn test_employment_validation_reports_each_field() {
        let err = validate_employment_info(EmploymentInfo::default()).unwrap_err();
        let IntakeError::Invalid(errors) = err else {
            panic!("expected validation errors");
        };
        let fields = errors.field_errors();
        assert!(fields.contains_key("employment_status"));
        assert!(fields.contains_key("years_of_experience"));
        assert!(!fields.contains_key("salary"));
    }

    #[test]
    fn test_unknown_employment_status_rejected() {
        let mut info = employment();
        info.employment_status = "Astronaut".to_string();
        assert!(matches!(
            validate_employment_info(info),
            Err(IntakeError::Invalid(_))
        ));
    }

    #[test]
    fn test_intake_errors_map_to_http_errors() {
        use axum::http::StatusCode;

        let cases = [
            (IntakeError::DraftNotFound, StatusCode::NOT_FOUND),
            (
                IntakeError::OutOfOrder("x".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                IntakeError::Invalid(ValidationErrors::new()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                IntakeError::Store(StoreError::Database("down".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServiceError::from(err).status_code(), status);
        }
    }
}
