/// Input validators
///
/// Length limits, format checks and a coarse SQL-injection screen for every
/// field accepted by the registration, login and savings endpoints. Each
/// validator returns the normalized value on success.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_NAME_LENGTH: usize = 256;
const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 100;
const MIN_SAVING_NAME_LENGTH: usize = 3;
const MAX_SAVING_NAME_LENGTH: usize = 50;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9]{8,15}$").unwrap();

    static ref SQL_INJECTION_PATTERNS: [Regex; 6] = [
        // Union-based
        Regex::new(r"(?i)\s+UNION\s+").unwrap(),
        // Comments and stored procedures
        Regex::new(r"(?i)(--|;|/\*|\*/|\bxp_|\bsp_)").unwrap(),
        // Stacked queries
        Regex::new(r"(?i);\s*(INSERT|UPDATE|DELETE|DROP|CREATE|ALTER)\b").unwrap(),
        // Time-based blind
        Regex::new(r"(?i)\b(SLEEP|WAITFOR|BENCHMARK|DBMS_LOCK)\b").unwrap(),
        // Boolean-based
        Regex::new(r#"(?i)(\bOR\b|\bAND\b)\s*(['"][0-9]*['"]|[0-9]*)\s*=\s*(['"][0-9]*['"]|[0-9]*|True|False)"#).unwrap(),
        // Function calls
        Regex::new(r"(?i)\b(CAST|CONVERT|SUBSTRING|CONCAT|LOAD_FILE)\s*\(").unwrap(),
    ];
}

fn field(name: &str) -> String {
    name.to_string()
}

/// Validates an email address
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field("email")));
    }
    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort(field("email"), MIN_EMAIL_LENGTH));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong(field("email"), MAX_EMAIL_LENGTH));
    }
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat(field("email")));
    }
    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent(field("email")));
    }
    if contains_sql_injection_patterns(trimmed) {
        return Err(ValidationError::PossibleSQLInjection);
    }

    Ok(trimmed.to_string())
}

/// Validates a person's display name
pub fn is_valid_name(name: &str) -> Result<String, ValidationError> {
    validate_text("name", name, 1, MAX_NAME_LENGTH)
}

/// Validates a saving goal name (3 to 50 characters)
pub fn is_valid_saving_name(name: &str) -> Result<String, ValidationError> {
    validate_text("name", name, MIN_SAVING_NAME_LENGTH, MAX_SAVING_NAME_LENGTH)
}

fn validate_text(name: &str, value: &str, min: usize, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let length = trimmed.chars().count();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field(name)));
    }
    if length < min {
        return Err(ValidationError::TooShort(field(name), min));
    }
    if length > max {
        return Err(ValidationError::TooLong(field(name), max));
    }
    if has_suspicious_name_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent(field(name)));
    }
    if contains_sql_injection_patterns(trimmed) {
        return Err(ValidationError::PossibleSQLInjection);
    }

    Ok(trimmed.to_string())
}

/// Password length check. The value is not trimmed.
pub fn is_valid_password(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();

    if password.is_empty() {
        return Err(ValidationError::EmptyField(field("password")));
    }
    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(field("password"), MIN_PASSWORD_LENGTH));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong(field("password"), MAX_PASSWORD_LENGTH));
    }

    Ok(())
}

pub fn passwords_match(password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if confirmation.is_empty() {
        return Err(ValidationError::EmptyField(field("confirmation_password")));
    }
    if password != confirmation {
        return Err(ValidationError::Mismatch(
            field("confirmation_password"),
            field("password"),
        ));
    }
    Ok(())
}

/// Validates a phone number; spaces and dashes are stripped
pub fn is_valid_phone_number(phone: &str) -> Result<String, ValidationError> {
    let normalized: String = phone
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .collect();

    if normalized.is_empty() {
        return Err(ValidationError::EmptyField(field("phone_number")));
    }
    if !PHONE_REGEX.is_match(&normalized) {
        return Err(ValidationError::InvalidFormat(field("phone_number")));
    }

    Ok(normalized)
}

/// Three ASCII letters, returned uppercased
pub fn is_valid_currency_code(code: &str) -> Result<String, ValidationError> {
    let trimmed = code.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field("currency_code")));
    }
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat(field("currency_code")));
    }

    Ok(trimmed.to_ascii_uppercase())
}

/// Parses a strictly positive, finite amount
pub fn is_positive_amount(name: &str, raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field(name)));
    }

    let amount = trimmed
        .parse::<f64>()
        .map_err(|_| ValidationError::InvalidFormat(field(name)))?;
    if !amount.is_finite() {
        return Err(ValidationError::InvalidFormat(field(name)));
    }
    if amount <= 0.0 {
        return Err(ValidationError::NotPositive(field(name)));
    }

    Ok(amount)
}

fn has_suspicious_email_patterns(email: &str) -> bool {
    if let Some(at_pos) = email.find('@') {
        if at_pos > 64 {
            return true;
        }
    }

    email.matches('@').count() != 1 || email.contains('\0')
}

fn has_suspicious_name_patterns(name: &str) -> bool {
    if name.chars().any(|c| c.is_control()) {
        return true;
    }

    let special_char_count = name
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace() && !matches!(c, '-' | '.' | '_' | '\''))
        .count();

    special_char_count > 5
}

fn contains_sql_injection_patterns(input: &str) -> bool {
    SQL_INJECTION_PATTERNS.iter().any(|pattern| pattern.is_match(input))
}
