// Services module for the scholarship portal
// Business logic layer for the application

pub mod email;
pub mod intake;
pub mod notifications;
pub mod payment_options;
pub mod payments;
pub mod webhook;

// Re-export commonly used services
pub use email::{EmailError, EmailService};
pub use intake::{ApplicationReview, IntakeError, IntakeService};
pub use notifications::{NotificationOutbox, RedeliveryReport};
pub use payment_options::{compute_payment_options, BundleKind, PaymentBundle, PaymentOptions};
pub use payments::PaymentService;
pub use webhook::{WebhookError, WebhookOutcome, WebhookService};
