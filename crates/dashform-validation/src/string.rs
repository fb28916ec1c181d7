//! String validation functions

use regex::Regex;

/// Fails when the value is empty after trimming
pub fn validate_required(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err("This field is required".to_string())
    } else {
        Ok(())
    }
}

/// Length is counted in characters, not bytes
pub fn validate_min_length(value: &str, min: usize) -> Result<(), String> {
    if value.chars().count() >= min {
        Ok(())
    } else {
        Err(format!("Must be at least {} characters", min))
    }
}

pub fn validate_max_length(value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() <= max {
        Ok(())
    } else {
        Err(format!("Must be at most {} characters", max))
    }
}

/// Whole-value match against a compiled pattern
pub fn validate_pattern(value: &str, pattern: &Regex) -> Result<(), String> {
    if pattern.is_match(value) {
        Ok(())
    } else {
        Err("Invalid format".to_string())
    }
}

/// Compiles `pattern` anchored at both ends, so `[a-z]+` means the whole value
pub fn anchored_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let trimmed = pattern.trim_start_matches('^').trim_end_matches('$');
    Regex::new(&format!("^(?:{})$", trimmed))
}

/// Lowercase letters, digits and single dashes, as used for tenant slugs
pub fn is_slug(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
