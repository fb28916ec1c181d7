//! Password strength tiers

use std::fmt;
use std::str::FromStr;

const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?/~`";

/// Strength tiers accepted by the `password` rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordTier {
    /// 8+ characters
    #[default]
    Basic,
    /// 8+ characters with uppercase, lowercase and a digit
    Medium,
    /// Medium plus a special character
    Strong,
}

impl FromStr for PasswordTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "medium" => Ok(Self::Medium),
            "strong" => Ok(Self::Strong),
            other => Err(format!(
                "unknown password tier '{}', use basic, medium or strong",
                other
            )),
        }
    }
}

impl fmt::Display for PasswordTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::Medium => write!(f, "medium"),
            Self::Strong => write!(f, "strong"),
        }
    }
}

/// Validates a password against a tier, reporting the first unmet requirement
pub fn validate_password(password: &str, tier: PasswordTier) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }

    if tier == PasswordTier::Basic {
        return Ok(());
    }

    if !password.chars().any(char::is_uppercase) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(char::is_lowercase) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number".to_string());
    }

    if tier == PasswordTier::Strong && !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}
