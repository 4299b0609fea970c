//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::error::AccountError;

/// Minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Validate username
pub fn validate_username(username: &str) -> Result<(), AccountError> {
    if username.trim().is_empty() {
        return Err(AccountError::Validation("Please add a username".to_string()));
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), AccountError> {
    if email.is_empty() {
        return Err(AccountError::Validation("Please add an email".to_string()));
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        // Word characters are ASCII only
        Regex::new(r"^(?-u:\w)+([.-]?(?-u:\w)+)*@(?-u:\w)+([.-]?(?-u:\w)+)*(\.(?-u:\w){2,3})+$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err(AccountError::Validation(
            "Please add a valid email".to_string(),
        ));
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), AccountError> {
    if password.is_empty() {
        return Err(AccountError::Validation("Please add a password".to_string()));
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AccountError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_emails() {
        for email in ["jane@example.com", "jane.doe@mail.example.nc", "j-d@ex-ample.org"] {
            assert!(validate_email(email).is_ok(), "{email}");
        }
    }

    #[test]
    fn test_invalid_emails() {
        for email in ["", "jane", "jane@", "@example.com", "jane@example", "jane@example.info"] {
            assert!(validate_email(email).is_err(), "{email}");
        }
    }

    #[test]
    fn test_non_ascii_emails_are_rejected() {
        assert!(validate_email("jöhn@example.com").is_err());
        assert!(validate_email("john@exämple.com").is_err());
        assert!(validate_email("john@example.çom").is_err());
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("").is_err());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn test_username_required() {
        assert!(validate_username("").is_err());
        assert!(validate_username("   ").is_err());
        assert!(validate_username("jane").is_ok());
    }
}
