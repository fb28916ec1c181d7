//! Email address validation

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

/// Default message for a malformed address
pub const INVALID_EMAIL: &str = "Please enter a valid email address";

/// Checks the shape of an email address
///
/// The local part allows letters, digits and `._%+-`. The domain needs at
/// least one dot, no empty labels and a TLD of two or more letters.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();

    if email.len() < 6 || email.len() > 254 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || local.len() > 64 {
        return false;
    }

    if domain.split('.').any(|label| label.starts_with('-') || label.ends_with('-')) {
        return false;
    }

    EMAIL_REGEX.is_match(email)
}

/// Validates an email address, returning the default message on failure
pub fn validate_email(email: &str) -> Result<(), String> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(INVALID_EMAIL.to_string())
    }
}

/// Domain part of an address, empty when there is no `@`
pub fn email_domain(email: &str) -> &str {
    email.rsplit_once('@').map(|(_, domain)| domain).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a@b.com")]
    #[case("user@example.com")]
    #[case("first.last@sub.example.co.uk")]
    #[case("user+billing@example-corp.io")]
    fn accepts_well_formed_addresses(#[case] email: &str) {
        assert!(is_valid_email(email), "{email} should be valid");
    }

    #[rstest]
    #[case("")]
    #[case("bad")]
    #[case("user@")]
    #[case("@example.com")]
    #[case("user@@example.com")]
    #[case("user@example")]
    #[case("user@.com")]
    #[case("user@example..com")]
    #[case("user@-example.com")]
    #[case("user@example.c")]
    fn rejects_malformed_addresses(#[case] email: &str) {
        assert!(!is_valid_email(email), "{email} should be invalid");
    }

    #[test]
    fn validate_email_reports_default_message() {
        assert_eq!(validate_email("bad"), Err(INVALID_EMAIL.to_string()));
        assert!(validate_email("ops@dotmac.io").is_ok());
    }

    #[test]
    fn extracts_domain() {
        assert_eq!(email_domain("user@example.com"), "example.com");
        assert_eq!(email_domain("no-at-sign"), "");
    }
}
