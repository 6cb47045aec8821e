// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Input validation: password policy, usernames and email addresses.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

const MAX_USERNAME_LENGTH: usize = 64;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}")]
    PolicyViolation(String),

    #[error("{0}")]
    InvalidUsername(String),

    #[error("the email address {0} is not in a valid format")]
    InvalidEmail(String),

    #[error("{0}")]
    MissingField(&'static str),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Password complexity requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Minimum length in characters
    pub min_length: usize,
    pub min_lowercase: usize,
    pub min_uppercase: usize,
    /// Characters that are neither alphanumeric nor whitespace
    pub min_symbols: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            min_lowercase: 1,
            min_uppercase: 1,
            min_symbols: 1,
        }
    }
}

impl PasswordPolicy {
    /// Check a candidate password against every rule.
    ///
    /// A failure always carries the same aggregate message, whichever rule
    /// was missed.
    pub fn validate(&self, candidate: &str) -> ValidationResult<()> {
        let mut length = 0;
        let mut lowercase = 0;
        let mut uppercase = 0;
        let mut symbols = 0;

        for c in candidate.chars() {
            length += 1;
            if c.is_lowercase() {
                lowercase += 1;
            } else if c.is_uppercase() {
                uppercase += 1;
            } else if is_symbol(c) {
                symbols += 1;
            }
        }

        if length < self.min_length
            || lowercase < self.min_lowercase
            || uppercase < self.min_uppercase
            || symbols < self.min_symbols
        {
            return Err(ValidationError::PolicyViolation(self.requirement_message()));
        }

        Ok(())
    }

    fn requirement_message(&self) -> String {
        format!(
            "password must be at least {} characters long and contain a mixture of upper and lowercase letters and at least {} symbol(s)",
            self.min_length, self.min_symbols
        )
    }
}

fn is_symbol(c: char) -> bool {
    !c.is_alphanumeric() && !c.is_whitespace()
}

/// Validate a username supplied at registration
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    if username.trim().is_empty() {
        return Err(ValidationError::MissingField("username must be supplied"));
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "username cannot exceed {MAX_USERNAME_LENGTH} characters"
        )));
    }

    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidUsername(
            "username must not contain whitespace".to_string(),
        ));
    }

    Ok(username)
}

/// Validate an email address
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    if email.is_empty() {
        return Err(ValidationError::MissingField("email address must be supplied"));
    }

    if email.len() > MAX_EMAIL_LENGTH || !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }

    Ok(email)
}
