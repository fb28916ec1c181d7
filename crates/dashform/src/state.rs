// File: src/state.rs
// Purpose: Authoritative state record for one form instance

use crate::error::{FormError, FormResult};
use crate::resolver::{FieldErrors, ValidationResult, ROOT_ERROR_KEY};
use crate::submission::{transition, SubmitEvent, SubmitStatus};
use crate::value::{conform, flatten, get_path, get_path_mut, set_path, type_name, FieldPath};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Values, errors and tracking flags for one form.
///
/// Plain data: every mutation goes through a method here, and the shared
/// [`Form`](crate::form::Form) handle publishes a snapshot afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    values: Value,
    defaults: Value,
    errors: FieldErrors,
    touched: BTreeSet<String>,
    dirty: bool,
    submit_count: u32,
    status: SubmitStatus,
}

impl FormState {
    /// Seeds a state from default values, which must be an object
    pub fn new(defaults: Value) -> FormResult<Self> {
        if !defaults.is_object() {
            return Err(FormError::InvalidDefaults(type_name(&defaults)));
        }

        Ok(Self {
            values: defaults.clone(),
            defaults,
            errors: FieldErrors::new(),
            touched: BTreeSet::new(),
            dirty: false,
            submit_count: 0,
            status: SubmitStatus::Idle,
        })
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn defaults(&self) -> &Value {
        &self.defaults
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn touched(&self) -> &BTreeSet<String> {
        &self.touched
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn submit_count(&self) -> u32 {
        self.submit_count
    }

    pub fn status(&self) -> SubmitStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get_value(&self, name: &str) -> FormResult<&Value> {
        let path = FieldPath::parse(name)?;
        get_path(&self.values, &path).ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    /// Writes one field, marking it touched and recomputing `dirty`
    pub fn set_value(&mut self, name: &str, value: Value) -> FormResult<()> {
        let path = FieldPath::parse(name)?;
        set_path(&mut self.values, &path, value)?;
        self.touched.insert(name.to_string());
        self.refresh_dirty();
        Ok(())
    }

    /// Marks a field as interacted with, without changing its value
    pub fn touch(&mut self, name: &str) -> FormResult<()> {
        self.get_value(name)?;
        self.touched.insert(name.to_string());
        Ok(())
    }

    /// Replaces the error map with the outcome of a full validation pass
    pub fn apply_validation(&mut self, result: &ValidationResult) {
        self.errors = result.errors.clone();
    }

    /// Replaces only the errors at or below `names`, keeping the rest
    pub fn merge_validation(&mut self, result: &ValidationResult, names: &[&str]) {
        let covers = |key: &str| {
            names
                .iter()
                .any(|n| key == *n || key.starts_with(&format!("{}.", n)))
        };

        self.errors.retain(|key, _| !covers(key));
        for (key, message) in &result.errors {
            if covers(key) {
                self.errors.insert(key.clone(), message.clone());
            }
        }
    }

    /// Records a manual error, e.g. one returned by the server.
    /// `root` is accepted for form-level messages.
    pub fn set_error(&mut self, name: &str, message: impl Into<String>) -> FormResult<()> {
        if name != ROOT_ERROR_KEY {
            self.get_value(name)?;
        }
        self.errors.insert(name.to_string(), message.into());
        Ok(())
    }

    /// Clears the listed errors, or all of them for `None`
    pub fn clear_errors(&mut self, names: Option<&[&str]>) {
        match names {
            None => self.errors.clear(),
            Some(names) => {
                for name in names {
                    self.errors.remove(*name);
                }
            }
        }
    }

    /// Restores values to `values` (which become the new defaults) or to the
    /// original defaults, and clears all tracking state.
    ///
    /// New defaults must declare the same fields as the current ones; array
    /// fields may hold a different number of items.
    pub fn reset(&mut self, values: Option<Value>) -> FormResult<()> {
        if self.status.is_busy() {
            return Err(FormError::Busy);
        }

        if let Some(values) = values {
            if !values.is_object() {
                return Err(FormError::InvalidDefaults(type_name(&values)));
            }
            conform(&self.defaults, &values, "")?;
            self.defaults = values;
        }

        self.values = self.defaults.clone();
        self.errors.clear();
        self.touched.clear();
        self.dirty = false;
        self.submit_count = 0;
        self.status = transition(self.status, SubmitEvent::Reset).unwrap_or(SubmitStatus::Idle);
        Ok(())
    }

    /// Leaf paths whose value differs from the defaults
    pub fn dirty_fields(&self) -> BTreeSet<String> {
        let current = flatten(&self.values);
        let defaults = flatten(&self.defaults);

        current
            .iter()
            .filter(|(key, value)| defaults.get(*key) != Some(*value))
            .map(|(key, _)| key.clone())
            .chain(defaults.keys().filter(|k| !current.contains_key(*k)).cloned())
            .collect()
    }

    /// Whether the value at `name`, or anything below it, differs from the
    /// defaults
    pub fn is_field_dirty(&self, name: &str) -> bool {
        let Ok(path) = FieldPath::parse(name) else {
            return false;
        };
        get_path(&self.values, &path) != get_path(&self.defaults, &path)
    }

    /// Appends an item to an array field declared in the defaults
    pub fn append(&mut self, name: &str, item: Value) -> FormResult<()> {
        self.ensure_idle()?;
        let items = self.array_mut(name)?;
        if let Some(first) = items.first() {
            conform(first, &item, &format!("{}.{}", name, items.len()))?;
        }
        items.push(item);
        self.touched.insert(name.to_string());
        self.refresh_dirty();
        Ok(())
    }

    /// Removes one item from an array field, shifting the errors and touched
    /// marks of later items down by one
    pub fn remove(&mut self, name: &str, index: usize) -> FormResult<Value> {
        self.ensure_idle()?;
        let items = self.array_mut(name)?;
        if index >= items.len() {
            return Err(FormError::IndexOutOfBounds {
                path: name.to_string(),
                index,
            });
        }
        let removed = items.remove(index);

        self.errors = reindex_after_remove(std::mem::take(&mut self.errors), name, index);
        let touched: BTreeMap<String, ()> = self.touched.iter().map(|k| (k.clone(), ())).collect();
        self.touched = reindex_after_remove(touched, name, index)
            .into_keys()
            .collect();
        self.touched.insert(name.to_string());
        self.refresh_dirty();
        Ok(removed)
    }

    /// Applies a submission event. Returns false when the event is ignored
    /// in the current status.
    pub fn apply_event(&mut self, event: SubmitEvent) -> bool {
        match transition(self.status, event) {
            Some(next) => {
                if next == SubmitStatus::Validating {
                    self.submit_count += 1;
                }
                self.status = next;
                true
            }
            None => false,
        }
    }

    fn ensure_idle(&self) -> FormResult<()> {
        if self.status.is_busy() {
            Err(FormError::Busy)
        } else {
            Ok(())
        }
    }

    fn array_mut(&mut self, name: &str) -> FormResult<&mut Vec<Value>> {
        let path = FieldPath::parse(name)?;
        match get_path_mut(&mut self.values, &path) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(FormError::NotAnArray(name.to_string())),
            None => Err(FormError::UnknownField(name.to_string())),
        }
    }

    fn refresh_dirty(&mut self) {
        self.dirty = self.values != self.defaults;
    }
}

/// Drops keys under `name.index` and renumbers keys under later indexes
fn reindex_after_remove<V>(map: BTreeMap<String, V>, name: &str, index: usize) -> BTreeMap<String, V> {
    let prefix = format!("{}.", name);

    map.into_iter()
        .filter_map(|(key, value)| {
            let Some(rest) = key.strip_prefix(&prefix) else {
                return Some((key, value));
            };
            let (head, tail) = match rest.split_once('.') {
                Some((head, tail)) => (head, Some(tail)),
                None => (rest, None),
            };
            let Ok(i) = head.parse::<usize>() else {
                return Some((key, value));
            };

            if i == index {
                None
            } else if i > index {
                let renumbered = match tail {
                    Some(tail) => format!("{}{}.{}", prefix, i - 1, tail),
                    None => format!("{}{}", prefix, i - 1),
                };
                Some((renumbered, value))
            } else {
                Some((key, value))
            }
        })
        .collect()
}
