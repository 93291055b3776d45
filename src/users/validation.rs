use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 32;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]+$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn validate_username(username: &str) -> Result<(), AppError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(AppError::validation("username", "must be 3 to 20 characters"));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(AppError::validation(
            "username",
            "may only contain letters, digits and underscores",
        ));
    }
    Ok(())
}

/// Trim and lowercase. Applying it twice gives the same result.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AppError::validation("email", "must be a valid email address"))
    }
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN {
        return Err(AppError::validation("password", "must be at least 8 characters"));
    }
    if len > PASSWORD_MAX {
        return Err(AppError::validation("password", "must be at most 32 characters"));
    }
    Ok(())
}
