//! Account field rules.

use super::error::DomainError;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const NAME_MAX_CHARS: usize = 150;
pub const EMAIL_MAX_CHARS: usize = 254;

/// Path segment used for the current user's profile.
const RESERVED_USERNAMES: &[&str] = &["me"];

pub fn normalize_username(username: &str) -> Result<String, DomainError> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > USERNAME_MAX_CHARS {
        return Err(DomainError::validation(
            "username",
            format!("Username must be between 1 and {USERNAME_MAX_CHARS} characters."),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(DomainError::validation(
            "username",
            "Username may contain only letters, digits and @/./+/-/_ characters.",
        ));
    }
    if RESERVED_USERNAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(username))
    {
        return Err(DomainError::validation(
            "username",
            "This username is reserved.",
        ));
    }
    Ok(username.to_string())
}

pub fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim();
    let invalid = || DomainError::validation("email", "Enter a valid email address.");

    if email.chars().count() > EMAIL_MAX_CHARS || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    Ok(email.to_string())
}

pub fn normalize_name(field: &'static str, value: &str) -> Result<String, DomainError> {
    let value = value.trim();
    if value.chars().count() > NAME_MAX_CHARS {
        return Err(DomainError::validation(
            field,
            format!("Ensure this field has no more than {NAME_MAX_CHARS} characters."),
        ));
    }
    Ok(value.to_string())
}
