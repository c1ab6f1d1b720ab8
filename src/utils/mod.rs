// Utility modules for the scholarship portal

pub mod audit_logger;
pub mod service_error;
pub mod validation;

pub use audit_logger::{AuditAction, AuditLogger};
pub use service_error::{ServiceError, GENERIC_FAILURE_MESSAGE};
pub use validation::{is_valid_email, normalize_email};
