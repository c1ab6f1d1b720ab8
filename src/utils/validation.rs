// Validation utilities for applicant-supplied fields

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    // Deliberately light: something@something.tld
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9\s\-()]+$").unwrap();
}

const MIN_PHONE_DIGITS: usize = 7;
const MAX_YEARS_OF_EXPERIENCE: u32 = 60;

/// Normalize an email for lookups: trimmed and lower-cased
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email.trim())
}

pub fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn validate_required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(field_error("required", "This field is required"));
    }
    Ok(())
}

pub fn validate_email_address(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(field_error("required", "Email is required"));
    }
    if !is_valid_email(email) {
        return Err(field_error("email", "Please enter a valid email address"));
    }
    Ok(())
}

/// Digits, spaces, dashes, parentheses and an optional leading `+`, with at least 7 digits
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(field_error("required", "Phone number is required"));
    }

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !PHONE_REGEX.is_match(phone) || digits < MIN_PHONE_DIGITS {
        return Err(field_error("phone", "Please enter a valid phone number"));
    }
    Ok(())
}

pub fn validate_years_of_experience(years: &str) -> Result<(), ValidationError> {
    let years = years.trim();
    if years.is_empty() {
        return Err(field_error("required", "Years of experience is required"));
    }

    match years.parse::<u32>() {
        Ok(n) if n <= MAX_YEARS_OF_EXPERIENCE => Ok(()),
        _ => Err(field_error(
            "range",
            "Years of experience must be a whole number between 0 and 60",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(validate_email_address("ada@example.com").is_ok());
        assert!(validate_email_address("  ada@example.com ").is_ok());
        assert!(validate_email_address("ada@example").is_err());
        assert!(validate_email_address("ada example@x.com").is_err());

        let err = validate_email_address("   ").unwrap_err();
        assert_eq!(err.code, "required");
    }

    #[test]
    fn test_phone_validation() {
        assert!(validate_phone_number("+234 801 234 5678").is_ok());
        assert!(validate_phone_number("(080) 123-4567").is_ok());
        assert!(validate_phone_number("123456").is_err());
        assert!(validate_phone_number("+234-801-abc-5678").is_err());
        assert_eq!(validate_phone_number("").unwrap_err().code, "required");
    }

    #[test]
    fn test_years_of_experience_range() {
        assert!(validate_years_of_experience("0").is_ok());
        assert!(validate_years_of_experience("60").is_ok());
        assert!(validate_years_of_experience("61").is_err());
        assert!(validate_years_of_experience("-1").is_err());
        assert!(validate_years_of_experience("two").is_err());
        assert_eq!(
            validate_years_of_experience(" ").unwrap_err().code,
            "required"
        );
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }
}
