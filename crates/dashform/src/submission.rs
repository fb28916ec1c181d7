// File: src/submission.rs
// Purpose: Submission state machine and the async submit controller

use crate::form::Form;
use crate::resolver::FieldErrors;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use tracing::{debug, info, warn};

/// Where a form is in its submission lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    #[default]
    Idle,
    Validating,
    Submitting,
    SubmitSuccessful,
}

impl SubmitStatus {
    /// True while a submission attempt is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Validating | Self::Submitting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Submitting => "submitting",
            Self::SubmitSuccessful => "submit_successful",
        }
    }
}

impl fmt::Display for SubmitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitEvent {
    Submit,
    ValidationPassed,
    ValidationFailed,
    HandlerResolved,
    HandlerRejected,
    Reset,
}

/// Pure transition function. `None` means the event is ignored in `from`.
///
/// ```text
/// Idle             --Submit-->            Validating
/// SubmitSuccessful --Submit-->            Validating
/// Validating       --ValidationPassed-->  Submitting
/// Validating       --ValidationFailed-->  Idle
/// Submitting       --HandlerResolved-->   SubmitSuccessful
/// Submitting       --HandlerRejected-->   Idle
/// SubmitSuccessful --Reset-->             Idle
/// Idle             --Reset-->             Idle
/// ```
pub fn transition(from: SubmitStatus, event: SubmitEvent) -> Option<SubmitStatus> {
    use SubmitEvent as E;
    use SubmitStatus as S;

    match (from, event) {
        (S::Idle | S::SubmitSuccessful, E::Submit) => Some(S::Validating),
        (S::Validating, E::ValidationPassed) => Some(S::Submitting),
        (S::Validating, E::ValidationFailed) => Some(S::Idle),
        (S::Submitting, E::HandlerResolved) => Some(S::SubmitSuccessful),
        (S::Submitting, E::HandlerRejected) => Some(S::Idle),
        (S::Idle | S::SubmitSuccessful, E::Reset) => Some(S::Idle),
        _ => None,
    }
}

/// Behaviour switches for one controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOptions {
    /// Reset the form to its defaults right after a successful submission
    #[serde(default)]
    pub reset_on_success: bool,

    /// Render every control non-interactive while a submission is in flight
    #[serde(default = "default_true")]
    pub disable_on_submit: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            reset_on_success: false,
            disable_on_submit: true,
        }
    }
}

/// What a call to [`SubmissionController::submit`] did
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome<R> {
    /// A submission was already in flight, or the form was unmounted
    Ignored,
    /// Validation failed; the handler was not called
    Invalid(FieldErrors),
    /// The handler resolved with this result
    Submitted(R),
}

impl<R> SubmitOutcome<R> {
    pub fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted(_))
    }
}

/// Passed to the error callback
#[derive(Debug)]
pub enum SubmitFailure<'a, E> {
    Invalid(&'a FieldErrors),
    Rejected(&'a E),
}

type SuccessCallback<R> = Box<dyn Fn(&R) + Send + Sync>;
type ErrorCallback<E> = Box<dyn for<'a> Fn(SubmitFailure<'a, E>) + Send + Sync>;

/// Drives a form through validation and an async submit handler.
///
/// At most one submission runs per form: a call made while the form is
/// validating or submitting returns [`SubmitOutcome::Ignored`] without
/// touching `submit_count` or invoking the handler.
pub struct SubmissionController<R, E> {
    options: SubmitOptions,
    on_success: Option<SuccessCallback<R>>,
    on_error: Option<ErrorCallback<E>>,
}

impl<R, E> Default for SubmissionController<R, E> {
    fn default() -> Self {
        Self::new(SubmitOptions::default())
    }
}

impl<R, E> SubmissionController<R, E> {
    pub fn new(options: SubmitOptions) -> Self {
        Self {
            options,
            on_success: None,
            on_error: None,
        }
    }

    pub fn options(&self) -> SubmitOptions {
        self.options
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&R) + Send + Sync + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: for<'a> Fn(SubmitFailure<'a, E>) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    fn report(&self, failure: SubmitFailure<'_, E>) {
        if let Some(callback) = &self.on_error {
            callback(failure);
        }
    }

    /// Validates the form and, when valid, hands the validated values to
    /// `handler`. Edits made while validation awaits stay in the form but
    /// are not sent.
    ///
    /// A handler error is recorded on the form (status back to `Idle`,
    /// values kept, message under the `root` error key), passed to the
    /// error callback, then returned so the caller still sees it.
    pub async fn submit<F, Fut>(&self, form: &Form, handler: F) -> Result<SubmitOutcome<R>, E>
    where
        F: FnOnce(Value) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: fmt::Display,
    {
        if !form.is_mounted() {
            debug!(form_id = %form.id(), "submit on unmounted form ignored");
            return Ok(SubmitOutcome::Ignored);
        }

        if !form.apply_event(SubmitEvent::Submit) {
            debug!(
                form_id = %form.id(),
                status = %form.status(),
                "submission already in flight, ignoring"
            );
            return Ok(SubmitOutcome::Ignored);
        }

        let (validated, result) = form.validate_captured().await;

        if !form.is_mounted() {
            debug!(form_id = %form.id(), "form unmounted during validation");
            return Ok(SubmitOutcome::Ignored);
        }

        if !result.valid {
            form.apply_event(SubmitEvent::ValidationFailed);
            debug!(
                form_id = %form.id(),
                errors = result.errors.len(),
                "submission blocked by validation"
            );
            self.report(SubmitFailure::Invalid(&result.errors));
            return Ok(SubmitOutcome::Invalid(result.errors));
        }

        form.apply_event(SubmitEvent::ValidationPassed);

        match handler(validated).await {
            Ok(output) => {
                if form.is_mounted() {
                    form.apply_event(SubmitEvent::HandlerResolved);
                    info!(form_id = %form.id(), "form submitted");

                    if self.options.reset_on_success {
                        if let Err(e) = form.reset(None) {
                            warn!(form_id = %form.id(), error = %e, "reset after submit failed");
                        }
                    }
                } else {
                    debug!(form_id = %form.id(), "form unmounted during submission, skipping state update");
                }

                if let Some(callback) = &self.on_success {
                    callback(&output);
                }
                Ok(SubmitOutcome::Submitted(output))
            }
            Err(error) => {
                if form.is_mounted() {
                    form.fail_submission(error.to_string());
                } else {
                    debug!(form_id = %form.id(), "form unmounted during submission, skipping state update");
                }

                warn!(form_id = %form.id(), error = %error, "submit handler failed");
                self.report(SubmitFailure::Rejected(&error));
                Err(error)
            }
        }
    }
}
