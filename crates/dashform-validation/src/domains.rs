//! Email domain policy validators
//!
//! These follow garde's custom validator signature so they can be used
//! directly in `#[garde(custom(...))]` attributes on schema structs. The
//! `work_email` and `blocked_domains` field rules wrap them.

use crate::email::email_domain;

/// Free mail providers rejected by `no_public_email`
pub static PUBLIC_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "icloud.com",
    "aol.com",
    "mail.com",
    "protonmail.com",
    "yandex.com",
    "zoho.com",
];

pub fn is_public_domain(email: &str) -> bool {
    let domain = email_domain(email).to_ascii_lowercase();
    PUBLIC_DOMAINS.iter().any(|d| *d == domain)
}

/// Rejects addresses hosted by a public mail provider
pub fn no_public_email(value: &str, _ctx: &()) -> garde::Result {
    if is_public_domain(value) {
        return Err(garde::Error::new("Please use your work email address"));
    }
    Ok(())
}

/// Rejects addresses whose domain appears in `blocked` (case-insensitive)
pub fn not_blocked_domain(value: &str, blocked: &[String]) -> garde::Result {
    let domain = email_domain(value);
    if blocked.iter().any(|b| b.eq_ignore_ascii_case(domain)) {
        return Err(garde::Error::new("This email domain is not allowed"));
    }
    Ok(())
}
