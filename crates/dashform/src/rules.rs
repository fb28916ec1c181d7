// File: src/rules.rs
// Purpose: Declarative per-field rules (required/min/max/pattern/custom)
// built on the dashform-validation functions

use crate::value::{display_value, is_blank, InputKind};
use dashform_validation::{
    is_slug, no_public_email, not_blocked_domain, parse_number, validate_email, validate_max,
    validate_max_items, validate_max_length, validate_min, validate_min_items, validate_min_length,
    validate_password, validate_pattern, validate_range, validate_required, validate_unique,
    PasswordTier,
};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// User-supplied validation closure
pub type CustomRule = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

#[derive(Clone)]
enum RuleKind {
    Required,
    Min(f64),
    Max(f64),
    Range(f64, f64),
    MinLength(usize),
    MaxLength(usize),
    Unique,
    Pattern(Regex),
    Slug,
    Email,
    WorkEmail,
    BlockedDomains(Vec<String>),
    Password(PasswordTier),
    Custom(CustomRule),
}

#[derive(Clone)]
struct Rule {
    kind: RuleKind,
    message: Option<String>,
}

/// Ordered rule chain for one field. The first failing rule wins.
///
/// Rules other than `required` are skipped for blank values, so optional
/// fields only get checked once the user fills them in.
#[derive(Clone, Default)]
pub struct FieldRules {
    rules: Vec<Rule>,
}

impl fmt::Debug for FieldRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.rules.iter().map(|r| r.kind.name()).collect();
        f.debug_struct("FieldRules").field("rules", &names).finish()
    }
}

impl RuleKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::Range(..) => "range",
            Self::MinLength(_) => "minLength",
            Self::MaxLength(_) => "maxLength",
            Self::Unique => "unique",
            Self::Pattern(_) => "pattern",
            Self::Slug => "slug",
            Self::Email => "email",
            Self::WorkEmail => "workEmail",
            Self::BlockedDomains(_) => "blockedDomains",
            Self::Password(_) => "password",
            Self::Custom(_) => "validate",
        }
    }
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, kind: RuleKind) -> Self {
        self.rules.push(Rule {
            kind,
            message: None,
        });
        self
    }

    pub fn required(self) -> Self {
        self.push(RuleKind::Required)
    }

    pub fn min(self, min: f64) -> Self {
        self.push(RuleKind::Min(min))
    }

    pub fn max(self, max: f64) -> Self {
        self.push(RuleKind::Max(max))
    }

    /// Inclusive on both ends
    pub fn range(self, min: f64, max: f64) -> Self {
        self.push(RuleKind::Range(min, max))
    }

    /// Characters for strings, items for arrays
    pub fn min_length(self, min: usize) -> Self {
        self.push(RuleKind::MinLength(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.push(RuleKind::MaxLength(max))
    }

    /// Array items must all differ
    pub fn unique(self) -> Self {
        self.push(RuleKind::Unique)
    }

    pub fn pattern(self, pattern: Regex) -> Self {
        self.push(RuleKind::Pattern(pattern))
    }

    /// Lowercase letters, digits and single dashes
    pub fn slug(self) -> Self {
        self.push(RuleKind::Slug)
    }

    pub fn email(self) -> Self {
        self.push(RuleKind::Email)
    }

    /// Rejects addresses at free mail providers
    pub fn work_email(self) -> Self {
        self.push(RuleKind::WorkEmail)
    }

    /// Rejects addresses whose domain is in `domains` (case-insensitive).
    /// An empty list adds no rule.
    pub fn blocked_domains(self, domains: &[String]) -> Self {
        if domains.is_empty() {
            return self;
        }
        self.push(RuleKind::BlockedDomains(domains.to_vec()))
    }

    pub fn password(self, tier: PasswordTier) -> Self {
        self.push(RuleKind::Password(tier))
    }

    pub fn custom<F>(self, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.push(RuleKind::Custom(Arc::new(check)))
    }

    /// Overrides the message of the most recently added rule
    pub fn message(mut self, message: impl Into<String>) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.message = Some(message.into());
        }
        self
    }

    pub fn is_required(&self) -> bool {
        self.rules
            .iter()
            .any(|r| matches!(r.kind, RuleKind::Required))
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs the chain against one value
    pub fn check(&self, value: &Value) -> Result<(), String> {
        let blank = is_blank(value);

        for rule in &self.rules {
            if blank && !matches!(rule.kind, RuleKind::Required) {
                continue;
            }

            if let Err(default_message) = rule.kind.check(value) {
                return Err(rule.message.clone().unwrap_or(default_message));
            }
        }

        Ok(())
    }

    /// HTML5 constraint attributes mirroring the rule chain
    pub fn html5_attrs(&self, kind: InputKind) -> Vec<(&'static str, String)> {
        let mut attrs = Vec::new();

        for rule in &self.rules {
            match &rule.kind {
                RuleKind::Required => attrs.push(("required", String::new())),
                RuleKind::Min(n) if kind == InputKind::Number => {
                    attrs.push(("min", display_value(&Value::from(*n))))
                }
                RuleKind::Max(n) if kind == InputKind::Number => {
                    attrs.push(("max", display_value(&Value::from(*n))))
                }
                RuleKind::Range(min, max) if kind == InputKind::Number => {
                    attrs.push(("min", display_value(&Value::from(*min))));
                    attrs.push(("max", display_value(&Value::from(*max))));
                }
                RuleKind::MinLength(n) if kind != InputKind::Checkbox => {
                    attrs.push(("minlength", n.to_string()))
                }
                RuleKind::MaxLength(n) if kind != InputKind::Checkbox => {
                    attrs.push(("maxlength", n.to_string()))
                }
                RuleKind::Pattern(re) if kind != InputKind::TextArea => {
                    let source = re.as_str().trim_start_matches('^').trim_end_matches('$');
                    attrs.push(("pattern", source.to_string()))
                }
                _ => {}
            }
        }

        attrs
    }
}

impl RuleKind {
    fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            Self::Required => match value {
                Value::String(s) => validate_required(s),
                other if is_blank(other) => Err("This field is required".to_string()),
                _ => Ok(()),
            },
            Self::Min(min) => validate_min(as_number(value)?, *min),
            Self::Max(max) => validate_max(as_number(value)?, *max),
            Self::Range(min, max) => validate_range(as_number(value)?, *min, *max),
            Self::MinLength(min) => match value {
                Value::Array(items) => validate_min_items(items, *min),
                other => validate_min_length(&display_value(other), *min),
            },
            Self::MaxLength(max) => match value {
                Value::Array(items) => validate_max_items(items, *max),
                other => validate_max_length(&display_value(other), *max),
            },
            Self::Unique => match value {
                // Serialized form compares objects regardless of key order
                Value::Array(items) => {
                    let keys: Vec<String> = items.iter().map(Value::to_string).collect();
                    validate_unique(&keys)
                }
                _ => Ok(()),
            },
            Self::Pattern(re) => validate_pattern(&display_value(value), re),
            Self::Slug => {
                if is_slug(&display_value(value)) {
                    Ok(())
                } else {
                    Err("Use lowercase letters, digits and single dashes".to_string())
                }
            }
            Self::Email => validate_email(&display_value(value)),
            Self::WorkEmail => no_public_email(&display_value(value), &()).map_err(|e| e.to_string()),
            Self::BlockedDomains(domains) => {
                not_blocked_domain(&display_value(value), domains).map_err(|e| e.to_string())
            }
            Self::Password(tier) => validate_password(&display_value(value), *tier),
            Self::Custom(check) => check(value),
        }
    }
}

fn as_number(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| "Must be a number".to_string()),
        Value::String(s) => parse_number(s),
        _ => Err("Must be a number".to_string()),
    }
}
