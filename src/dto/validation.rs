//! Validation helpers for terminal input.

use validator::ValidationError;

/// Validates that a candidate looks like an email address.
///
/// Exactly one `@`, a non-empty local part, and a domain made of at least two
/// non-empty dot-separated labels. Whitespace is rejected anywhere.
///
/// # Examples
///
/// ```ignore
/// validate_email("a@b.co") // Ok
/// validate_email("a@b")    // Err - no top-level domain
/// validate_email("abc")    // Err - no @
/// ```
pub fn validate_email(candidate: &str) -> Result<(), ValidationError> {
    if candidate.chars().any(char::is_whitespace) {
        return Err(email_error("email_whitespace", "Email must not contain spaces"));
    }

    let Some((local, domain)) = candidate.split_once('@') else {
        return Err(email_error("email_missing_at", "Email must contain an @"));
    };
    if local.is_empty() || domain.contains('@') {
        return Err(email_error(
            "email_local_part",
            "Email must have exactly one @ preceded by a name",
        ));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(email_error(
            "email_domain",
            "Email domain must look like example.com",
        ));
    }

    Ok(())
}

/// Boolean form of [`validate_email`].
pub fn is_email(candidate: &str) -> bool {
    validate_email(candidate).is_ok()
}

fn email_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}
