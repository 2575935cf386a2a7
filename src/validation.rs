//! Client-side field checks.
//!
//! Every check here runs before a request is built, so a failure never
//! reaches the network.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::ValidationErrors;

/// Smallest donation the platform accepts, in LKR.
pub const MIN_DONATION_LKR: f64 = 100.0;

/// Largest attachment accepted by any upload form (5 MiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Validates an email address (`local@domain.tld`, no whitespace).
#[must_use]
pub fn is_valid_email(s: &str) -> bool {
    EMAIL_RE.is_match(s)
}

/// Validates a phone number: after dropping non-digits, 9 or 10 digits remain.
#[must_use]
pub fn is_valid_phone(s: &str) -> bool {
    let digits = digits_only(s);
    (9..=10).contains(&digits.len())
}

/// Strips everything but ASCII digits.
#[must_use]
pub fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Validates an absolute URL (e.g. a charity website).
#[must_use]
pub fn is_valid_url(s: &str) -> bool {
    Url::parse(s).is_ok()
}

/// Validates a six-digit numeric one-time password.
#[must_use]
pub fn is_valid_otp(s: &str) -> bool {
    s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Validates a person name: at least 2 characters, letters and spaces only.
#[must_use]
pub fn is_valid_person_name(s: &str) -> bool {
    s.chars().count() >= 2 && s.chars().all(|c| c.is_ascii_alphabetic() || c == ' ')
}

/// Validates a signup password.
///
/// - At least 8 characters
/// - Only letters, digits and `@$!%*#?&`
/// - At least one letter and one digit
#[must_use]
pub fn is_strong_password(s: &str) -> bool {
    s.len() >= 8
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@$!%*#?&".contains(c))
        && s.chars().any(|c| c.is_ascii_alphabetic())
        && s.chars().any(|c| c.is_ascii_digit())
}

/// Lower-cased extension of `file_name`, including the leading dot.
#[must_use]
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_ascii_lowercase()))
}

/// Checks an upload against an extension allow-list and the size cap.
pub fn check_attachment(
    errors: &mut ValidationErrors,
    field: &'static str,
    file_name: &str,
    size: u64,
    allowed: &[&str],
) {
    let ext_ok = file_extension(file_name).is_some_and(|ext| allowed.contains(&ext.as_str()));
    if !ext_ok {
        errors.push(
            field,
            format!("Please select a valid file type: {}", allowed.join(", ")),
        );
    } else if size > MAX_ATTACHMENT_BYTES {
        errors.push(field, "File size must be less than 5MB");
    }
}

/// Records a "required" error when `value` is blank.
pub fn require(errors: &mut ValidationErrors, field: &'static str, value: &str) -> bool {
    let present = !value.trim().is_empty();
    errors.check(present, field, "This field is required");
    present
}
