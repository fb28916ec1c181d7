// File: src/form.rs
// Purpose: Shared handle for one mounted form instance

use crate::binding::ElementRegistry;
use crate::error::FormResult;
use crate::resolver::{FieldErrors, Resolver, ValidationResult, ROOT_ERROR_KEY};
use crate::state::FormState;
use crate::submission::{SubmitEvent, SubmitOptions, SubmitStatus};
use crate::value::{get_path, FieldPath};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;
use tracing::{debug, trace};
use uuid::Uuid;

/// Identifies one mounted form in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormId(Uuid);

impl FormId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FormId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// When field events trigger validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Only when the form is submitted
    #[default]
    OnSubmit,
    OnBlur,
    OnChange,
    /// On every blur and change
    All,
}

/// Field interaction kinds that may trigger validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEvent {
    Change,
    Blur,
}

impl ValidationMode {
    pub fn validates_on(&self, event: FieldEvent) -> bool {
        matches!(
            (self, event),
            (Self::All, _) | (Self::OnChange, FieldEvent::Change) | (Self::OnBlur, FieldEvent::Blur)
        )
    }
}

/// Per-form behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormOptions {
    /// Validation trigger before the first submission attempt
    #[serde(default)]
    pub mode: ValidationMode,

    /// Validation trigger after the first submission attempt
    #[serde(default = "default_revalidate_mode")]
    pub revalidate_mode: ValidationMode,

    #[serde(default)]
    pub submit: SubmitOptions,

    /// Prefix for generated control ids
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
}

fn default_revalidate_mode() -> ValidationMode {
    ValidationMode::OnChange
}

fn default_id_prefix() -> String {
    "field".to_string()
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            mode: ValidationMode::default(),
            revalidate_mode: default_revalidate_mode(),
            submit: SubmitOptions::default(),
            id_prefix: default_id_prefix(),
        }
    }
}

/// Read-only view of a form, published after every mutation
#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot {
    pub form_id: FormId,
    pub values: Value,
    pub errors: FieldErrors,
    pub touched: BTreeSet<String>,
    pub dirty: bool,
    pub dirty_fields: BTreeSet<String>,
    pub submit_count: u32,
    pub status: SubmitStatus,
}

impl FormSnapshot {
    fn capture(form_id: FormId, state: &FormState) -> Self {
        Self {
            form_id,
            values: state.values().clone(),
            errors: state.errors().clone(),
            touched: state.touched().clone(),
            dirty: state.is_dirty(),
            dirty_fields: state.dirty_fields(),
            submit_count: state.submit_count(),
            status: state.status(),
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        let path = FieldPath::parse(name).ok()?;
        get_path(&self.values, &path)
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    /// The error to show next to a field: only once the field was touched
    /// or a submission was attempted
    pub fn visible_error(&self, name: &str) -> Option<&str> {
        if self.touched.contains(name) || self.submit_count > 0 {
            self.error(name)
        } else {
            None
        }
    }

    /// Form-level message, e.g. a failed submit handler
    pub fn root_error(&self) -> Option<&str> {
        self.error(ROOT_ERROR_KEY)
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_submitting(&self) -> bool {
        self.status.is_busy()
    }

    pub fn is_submit_successful(&self) -> bool {
        self.status == SubmitStatus::SubmitSuccessful
    }

    /// Whether controls accept input right now
    pub fn is_interactive(&self, disable_on_submit: bool) -> bool {
        !(disable_on_submit && self.is_submitting())
    }
}

struct FormInner {
    id: FormId,
    state: RwLock<FormState>,
    resolver: Arc<dyn Resolver>,
    options: FormOptions,
    snapshots: watch::Sender<FormSnapshot>,
    mounted: AtomicBool,
    elements: ElementRegistry,
}

/// Cloneable handle to one form instance.
///
/// Owns the single source of truth for values, errors and flags. Every
/// mutation publishes a fresh [`FormSnapshot`] to subscribers. After
/// [`Form::unmount`] the handle stops writing state, so late async work
/// (an in-flight submission) can finish without touching a dead form.
#[derive(Clone)]
pub struct Form {
    inner: Arc<FormInner>,
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("id", &self.inner.id)
            .field("resolver", &self.inner.resolver.name())
            .field("status", &self.status())
            .finish()
    }
}

impl Form {
    /// Mounts a form seeded from `defaults`
    pub fn new<R: Resolver + 'static>(defaults: Value, resolver: R) -> FormResult<Self> {
        Self::with_options(defaults, resolver, FormOptions::default())
    }

    pub fn with_options<R: Resolver + 'static>(
        defaults: Value,
        resolver: R,
        options: FormOptions,
    ) -> FormResult<Self> {
        let state = FormState::new(defaults)?;
        Ok(Self::with_external_state(state, Arc::new(resolver), options))
    }

    /// Mounts a form over a caller-owned state, e.g. one restored from a draft
    pub fn with_external_state(
        state: FormState,
        resolver: Arc<dyn Resolver>,
        options: FormOptions,
    ) -> Self {
        let id = FormId::new();
        let (snapshots, _) = watch::channel(FormSnapshot::capture(id, &state));

        debug!(form_id = %id, resolver = resolver.name(), "form mounted");

        Self {
            inner: Arc::new(FormInner {
                id,
                state: RwLock::new(state),
                resolver,
                options,
                snapshots,
                mounted: AtomicBool::new(true),
                elements: ElementRegistry::default(),
            }),
        }
    }

    pub fn id(&self) -> FormId {
        self.inner.id
    }

    pub fn options(&self) -> &FormOptions {
        &self.inner.options
    }

    pub fn resolver(&self) -> &dyn Resolver {
        self.inner.resolver.as_ref()
    }

    pub(crate) fn elements(&self) -> &ElementRegistry {
        &self.inner.elements
    }

    fn read(&self) -> RwLockReadGuard<'_, FormState> {
        self.inner.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, FormState> {
        self.inner.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the state and publishes a snapshot afterwards
    fn mutate<T>(&self, f: impl FnOnce(&mut FormState) -> T) -> T {
        let (out, snapshot) = {
            let mut state = self.write();
            let out = f(&mut state);
            (out, FormSnapshot::capture(self.inner.id, &state))
        };
        self.inner.snapshots.send_replace(snapshot);
        out
    }

    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot::capture(self.inner.id, &self.read())
    }

    pub fn subscribe(&self) -> watch::Receiver<FormSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Follows the value of a single field
    pub fn watch(&self, name: &str) -> FormResult<FieldWatch> {
        let path = FieldPath::parse(name)?;
        let current = self.get_value(name)?;
        Ok(FieldWatch {
            receiver: self.subscribe(),
            path,
            last: current,
        })
    }

    pub fn status(&self) -> SubmitStatus {
        self.read().status()
    }

    pub fn get_value(&self, name: &str) -> FormResult<Value> {
        self.read().get_value(name).cloned()
    }

    pub fn get_values(&self) -> Value {
        self.read().values().clone()
    }

    pub fn is_field_dirty(&self, name: &str) -> bool {
        self.read().is_field_dirty(name)
    }

    /// Writes one field synchronously. No validation runs here; see
    /// [`Form::handle_change`] for the mode-aware variant.
    pub fn set_value(&self, name: &str, value: Value) -> FormResult<()> {
        trace!(form_id = %self.inner.id, field = name, "set value");
        self.mutate(|state| state.set_value(name, value))
    }

    pub fn touch(&self, name: &str) -> FormResult<()> {
        self.mutate(|state| state.touch(name))
    }

    /// Change event from a bound control: writes the value, then validates
    /// the field when the active mode asks for it
    pub async fn handle_change(&self, name: &str, value: Value) -> FormResult<()> {
        self.set_value(name, value)?;
        if self.validates_on(FieldEvent::Change) {
            self.trigger(&[name]).await;
        }
        Ok(())
    }

    /// Blur event from a bound control
    pub async fn handle_blur(&self, name: &str) -> FormResult<()> {
        self.touch(name)?;
        if self.validates_on(FieldEvent::Blur) {
            self.trigger(&[name]).await;
        }
        Ok(())
    }

    fn validates_on(&self, event: FieldEvent) -> bool {
        let mode = if self.read().submit_count() > 0 {
            self.inner.options.revalidate_mode
        } else {
            self.inner.options.mode
        };
        mode.validates_on(event)
    }

    /// Runs the resolver over the current values and replaces the error map
    pub async fn validate(&self) -> ValidationResult {
        self.validate_captured().await.1
    }

    /// Like [`Form::validate`], also returning the exact values the resolver
    /// saw. Edits that land while the resolver awaits are not part of them.
    pub(crate) async fn validate_captured(&self) -> (Value, ValidationResult) {
        let values = self.get_values();
        let result = self.inner.resolver.resolve(&values).await;

        if self.is_mounted() {
            self.mutate(|state| state.apply_validation(&result));
        }

        debug!(
            form_id = %self.inner.id,
            valid = result.valid,
            errors = result.errors.len(),
            "form validated"
        );
        (values, result)
    }

    /// Validates and updates only the listed fields' errors. An empty list
    /// validates the whole form. Returns whether the listed fields are valid.
    pub async fn trigger(&self, names: &[&str]) -> bool {
        if names.is_empty() {
            return self.validate().await.valid;
        }

        let values = self.get_values();
        let result = self.inner.resolver.resolve(&values).await;

        if self.is_mounted() {
            self.mutate(|state| state.merge_validation(&result, names));
        }

        names.iter().all(|name| {
            let nested = format!("{}.", name);
            !result
                .errors
                .keys()
                .any(|key| key == name || key.starts_with(&nested))
        })
    }

    /// Restores defaults (or `values`) and writes them back into any
    /// self-registered controls
    pub fn reset(&self, values: Option<Value>) -> FormResult<()> {
        self.mutate(|state| state.reset(values))?;
        self.inner.elements.sync_from(&self.get_values());
        debug!(form_id = %self.inner.id, "form reset");
        Ok(())
    }

    pub fn set_error(&self, name: &str, message: impl Into<String>) -> FormResult<()> {
        self.mutate(|state| state.set_error(name, message))
    }

    pub fn clear_errors(&self, names: Option<&[&str]>) {
        self.mutate(|state| state.clear_errors(names))
    }

    pub fn append(&self, name: &str, item: Value) -> FormResult<()> {
        self.mutate(|state| state.append(name, item))
    }

    pub fn remove(&self, name: &str, index: usize) -> FormResult<Value> {
        let removed = self.mutate(|state| state.remove(name, index))?;
        self.inner.elements.sync_from(&self.get_values());
        Ok(removed)
    }

    pub(crate) fn apply_event(&self, event: SubmitEvent) -> bool {
        let applied = self.mutate(|state| state.apply_event(event));
        if applied {
            trace!(form_id = %self.inner.id, ?event, status = %self.status(), "submission event");
        }
        applied
    }

    /// Handler rejection: back to idle with the message as the form-level error
    pub(crate) fn fail_submission(&self, message: String) {
        self.mutate(|state| {
            state.apply_event(SubmitEvent::HandlerRejected);
            // root is always a valid error key
            let _ = state.set_error(ROOT_ERROR_KEY, message);
        });
    }

    /// Marks the form as gone. State writes after this point are suppressed.
    pub fn unmount(&self) {
        if self.inner.mounted.swap(false, Ordering::SeqCst) {
            debug!(form_id = %self.inner.id, "form unmounted");
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.mounted.load(Ordering::SeqCst)
    }
}

/// Receiver for the value of one field
pub struct FieldWatch {
    receiver: watch::Receiver<FormSnapshot>,
    path: FieldPath,
    last: Value,
}

impl FieldWatch {
    pub fn current(&self) -> &Value {
        &self.last
    }

    /// Waits until the field's value differs from the last one seen.
    /// Returns `None` once the form is dropped.
    pub async fn changed(&mut self) -> Option<Value> {
        loop {
            self.receiver.changed().await.ok()?;
            let next = get_path(&self.receiver.borrow_and_update().values, &self.path)
                .cloned()
                .unwrap_or(Value::Null);
            if next != self.last {
                self.last = next.clone();
                return Some(next);
            }
        }
    }
}
