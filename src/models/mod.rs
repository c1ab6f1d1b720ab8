pub mod application;
pub mod draft;
pub mod notification;
pub mod payment;
pub mod reference;

// Re-export common types
pub use application::{Application, ApplicationStatus, ApplicationSummary, NewApplication};
pub use draft::{
    DraftRecord, EmploymentInfo, PersonalInfo, SubmittedApplication, WizardDraft,
    WizardStep,
};
pub use notification::{DeliveryOutcome, Notification, NotificationKind, NotificationStatus};
pub use payment::{
    format_amount, generate_payment_reference, NewPayment, Payment, PaymentStatus,
    PaymentSummary, SummaryStatus,
};
pub use reference::{Country, PaymentPlan, PlanTerms, Program};
