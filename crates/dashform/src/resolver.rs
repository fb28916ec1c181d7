// File: src/resolver.rs
// Purpose: Pluggable validation strategies consumed by the form container

use crate::rules::FieldRules;
use crate::value::{get_path, FieldPath};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;

/// Field path to error message. Absence of a key means the field is valid.
pub type FieldErrors = BTreeMap<String, String>;

/// Key for errors that belong to the form as a whole
pub const ROOT_ERROR_KEY: &str = "root";

/// Result of one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: FieldErrors,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            valid: true,
            errors: FieldErrors::new(),
        }
    }

    pub fn failure(errors: FieldErrors) -> Self {
        Self {
            valid: false,
            errors,
        }
    }

    /// Valid exactly when `errors` is empty
    pub fn from_errors(errors: FieldErrors) -> Self {
        if errors.is_empty() {
            Self::success()
        } else {
            Self::failure(errors)
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn get_error(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

/// A validation strategy. Implementations must be pure: the same values
/// always produce the same result.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, values: &Value) -> ValidationResult;

    /// Backend name used in logs
    fn name(&self) -> &'static str {
        "custom"
    }

    /// Rules for one field when the strategy has them, used to emit
    /// HTML5 constraint attributes
    fn rules_for(&self, _field: &str) -> Option<&FieldRules> {
        None
    }
}

/// Accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

#[async_trait]
impl Resolver for NoopResolver {
    async fn resolve(&self, _values: &Value) -> ValidationResult {
        ValidationResult::success()
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Wraps a synchronous validation closure
pub struct FnResolver<F> {
    check: F,
}

impl<F> FnResolver<F>
where
    F: Fn(&Value) -> ValidationResult + Send + Sync,
{
    pub fn new(check: F) -> Self {
        Self { check }
    }
}

#[async_trait]
impl<F> Resolver for FnResolver<F>
where
    F: Fn(&Value) -> ValidationResult + Send + Sync,
{
    async fn resolve(&self, values: &Value) -> ValidationResult {
        (self.check)(values)
    }

    fn name(&self) -> &'static str {
        "fn"
    }
}

/// Resolver built from declarative per-field rule chains
#[derive(Debug, Clone, Default)]
pub struct RulesResolver {
    fields: Vec<(FieldPath, FieldRules)>,
}

impl RulesResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule chain for `path`. Unparsable paths are dropped with a warning.
    pub fn field(mut self, path: &str, rules: FieldRules) -> Self {
        match FieldPath::parse(path) {
            Ok(parsed) => self.fields.push((parsed, rules)),
            Err(e) => tracing::warn!(field = path, error = %e, "ignoring rules for field"),
        }
        self
    }
}

#[async_trait]
impl Resolver for RulesResolver {
    async fn resolve(&self, values: &Value) -> ValidationResult {
        let mut errors = FieldErrors::new();

        for (path, rules) in &self.fields {
            let value = get_path(values, path).unwrap_or(&Value::Null);
            if let Err(message) = rules.check(value) {
                errors.insert(path.as_str().to_string(), message);
            }
        }

        ValidationResult::from_errors(errors)
    }

    fn name(&self) -> &'static str {
        "rules"
    }

    fn rules_for(&self, field: &str) -> Option<&FieldRules> {
        self.fields
            .iter()
            .find(|(path, _)| path.as_str() == field)
            .map(|(_, rules)| rules)
    }
}

/// Resolver backed by a garde-validated schema struct.
///
/// The value tree is deserialized into `T`; a tree that does not fit the
/// schema is reported under [`ROOT_ERROR_KEY`].
pub struct GardeResolver<T> {
    _schema: PhantomData<fn() -> T>,
}

impl<T> GardeResolver<T> {
    pub fn new() -> Self {
        Self {
            _schema: PhantomData,
        }
    }
}

impl<T> Default for GardeResolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Resolver for GardeResolver<T>
where
    T: DeserializeOwned + garde::Validate<Context = ()>,
{
    async fn resolve(&self, values: &Value) -> ValidationResult {
        let schema: T = match serde_json::from_value(values.clone()) {
            Ok(schema) => schema,
            Err(e) => {
                let mut errors = FieldErrors::new();
                errors.insert(ROOT_ERROR_KEY.to_string(), e.to_string());
                return ValidationResult::failure(errors);
            }
        };

        match schema.validate() {
            Ok(()) => ValidationResult::success(),
            Err(report) => {
                let mut errors = FieldErrors::new();
                for (path, error) in report.iter() {
                    let key = garde_path_to_dot(&path.to_string());
                    let key = if key.is_empty() {
                        ROOT_ERROR_KEY.to_string()
                    } else {
                        key
                    };
                    errors.entry(key).or_insert_with(|| error.message().to_string());
                }
                ValidationResult::from_errors(errors)
            }
        }
    }

    fn name(&self) -> &'static str {
        "garde"
    }
}

/// `items[0].sku` -> `items.0.sku`
fn garde_path_to_dot(path: &str) -> String {
    path.replace('[', ".").replace(']', "")
}
