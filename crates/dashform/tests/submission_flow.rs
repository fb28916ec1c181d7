use anyhow::anyhow;
use async_trait::async_trait;
use dashform::{
    FieldRules, Form, FormOptions, Resolver, RulesResolver, SubmissionController, SubmitFailure, SubmitOptions,
    SubmitOutcome, SubmitStatus, ValidationResult,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

fn login_rules() -> RulesResolver {
    RulesResolver::new()
        .field("email", FieldRules::new().required().email())
        .field("password", FieldRules::new().required().min_length(8))
}

fn login_form(options: FormOptions) -> Form {
    Form::with_options(json!({ "email": "", "password": "" }), login_rules(), options).unwrap()
}

/// Holds every validation pass until released, like a server-side check
struct GatedResolver {
    entered: Arc<Notify>,
    release: Arc<Notify>,
    rules: RulesResolver,
}

#[async_trait]
impl Resolver for GatedResolver {
    async fn resolve(&self, values: &Value) -> ValidationResult {
        self.entered.notify_one();
        self.release.notified().await;
        self.rules.resolve(values).await
    }
}

#[tokio::test]
async fn login_scenario_end_to_end() {
    let form = login_form(FormOptions::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let received = Arc::new(Mutex::new(Vec::<Value>::new()));
    let controller: SubmissionController<Value, anyhow::Error> = SubmissionController::new(SubmitOptions::default());

    form.set_value("email", json!("bad")).unwrap();
    form.set_value("password", json!("1234567")).unwrap();

    let outcome = controller
        .submit(&form, |values| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(values)
            }
        })
        .await
        .unwrap();

    let snapshot = form.snapshot();
    assert!(matches!(outcome, SubmitOutcome::Invalid(_)));
    assert_eq!(snapshot.status, SubmitStatus::Idle);
    assert_eq!(snapshot.errors.keys().collect::<Vec<_>>(), vec!["email", "password"]);
    assert_eq!(snapshot.submit_count, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    form.set_value("email", json!("a@b.com")).unwrap();
    form.set_value("password", json!("12345678")).unwrap();

    let observed = Arc::new(Mutex::new(None));
    let outcome = controller
        .submit(&form, |values| {
            let form = form.clone();
            let calls = calls.clone();
            let received = received.clone();
            let observed = observed.clone();
            async move {
                *observed.lock().unwrap() = Some(form.status());
                calls.fetch_add(1, Ordering::SeqCst);
                received.lock().unwrap().push(values.clone());
                Ok(values)
            }
        })
        .await
        .unwrap();

    assert!(outcome.is_submitted());
    assert_eq!(*observed.lock().unwrap(), Some(SubmitStatus::Submitting));
    assert_eq!(form.status(), SubmitStatus::SubmitSuccessful);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        received.lock().unwrap().as_slice(),
        &[json!({ "email": "a@b.com", "password": "12345678" })]
    );
    assert_eq!(form.snapshot().submit_count, 2);
    assert!(form.snapshot().errors.is_empty());
}

#[tokio::test]
async fn reset_on_success_returns_to_pristine_idle() {
    let mut options = FormOptions::default();
    options.submit.reset_on_success = true;
    let form = login_form(options.clone());
    let controller: SubmissionController<(), anyhow::Error> = SubmissionController::new(options.submit);

    form.set_value("email", json!("a@b.com")).unwrap();
    form.set_value("password", json!("12345678")).unwrap();
    controller.submit(&form, |_| async { Ok(()) }).await.unwrap();

    let snapshot = form.snapshot();
    assert_eq!(snapshot.status, SubmitStatus::Idle);
    assert_eq!(snapshot.values, json!({ "email": "", "password": "" }));
    assert_eq!(snapshot.submit_count, 0);
    assert!(!snapshot.dirty);
    assert!(snapshot.touched.is_empty());
}

#[tokio::test]
async fn rejected_handler_keeps_values_and_reraises() {
    let form = login_form(FormOptions::default());
    let rejected = Arc::new(AtomicUsize::new(0));
    let counter = rejected.clone();
    let controller: SubmissionController<(), anyhow::Error> = SubmissionController::new(SubmitOptions::default())
        .on_error(move |failure: SubmitFailure<'_, anyhow::Error>| {
            if let SubmitFailure::Rejected(e) = failure {
                assert_eq!(e.to_string(), "Invalid credentials");
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

    form.set_value("email", json!("a@b.com")).unwrap();
    form.set_value("password", json!("12345678")).unwrap();

    let err = controller
        .submit(&form, |_| async { Err(anyhow!("Invalid credentials")) })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid credentials");
    assert_eq!(rejected.load(Ordering::SeqCst), 1);

    let snapshot = form.snapshot();
    assert_eq!(snapshot.status, SubmitStatus::Idle);
    assert_eq!(snapshot.values, json!({ "email": "a@b.com", "password": "12345678" }));
    assert_eq!(snapshot.root_error(), Some("Invalid credentials"));

    // A retry validates again and clears the stale form-level error
    controller.submit(&form, |_| async { Ok(()) }).await.unwrap();
    assert_eq!(form.snapshot().root_error(), None);
    assert_eq!(form.status(), SubmitStatus::SubmitSuccessful);
}

#[tokio::test]
async fn invalid_submission_reports_field_map() {
    let form = login_form(FormOptions::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let controller: SubmissionController<(), anyhow::Error> = SubmissionController::new(SubmitOptions::default())
        .on_error(move |failure| {
            if let SubmitFailure::Invalid(errors) = failure {
                sink.lock().unwrap().extend(errors.keys().cloned());
            }
        });

    controller.submit(&form, |_| async { Ok(()) }).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["email".to_string(), "password".to_string()]);
}

#[tokio::test]
async fn second_submit_while_submitting_is_ignored() {
    let form = login_form(FormOptions::default());
    form.set_value("email", json!("a@b.com")).unwrap();
    form.set_value("password", json!("12345678")).unwrap();

    let controller: SubmissionController<(), anyhow::Error> = SubmissionController::new(SubmitOptions::default());
    let release = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let first = controller.submit(&form, |_| {
        let release = release.clone();
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            release.notified().await;
            Ok(())
        }
    });
    let second = async {
        tokio::task::yield_now().await;
        assert_eq!(form.status(), SubmitStatus::Submitting);
        let outcome = controller.submit(&form, |_| async { Ok(()) }).await;
        release.notify_one();
        outcome
    };

    let (first, second) = tokio::join!(first, second);

    assert!(first.unwrap().is_submitted());
    assert_eq!(second.unwrap(), SubmitOutcome::Ignored);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(form.snapshot().submit_count, 1);
    assert_eq!(form.status(), SubmitStatus::SubmitSuccessful);
}

#[tokio::test]
async fn unmount_mid_submission_suppresses_state_writes() {
    let form = login_form(FormOptions::default());
    form.set_value("email", json!("a@b.com")).unwrap();
    form.set_value("password", json!("12345678")).unwrap();

    let controller: SubmissionController<(), anyhow::Error> = SubmissionController::new(SubmitOptions::default());
    let release = Arc::new(Notify::new());

    let submit = controller.submit(&form, |_| {
        let release = release.clone();
        async move {
            release.notified().await;
            Err(anyhow!("network down"))
        }
    });
    let unmount = async {
        tokio::task::yield_now().await;
        form.unmount();
        release.notify_one();
    };

    let (result, ()) = tokio::join!(submit, unmount);

    // The error still reaches the caller, but the dead form is left alone
    assert!(result.is_err());
    let snapshot = form.snapshot();
    assert_eq!(snapshot.status, SubmitStatus::Submitting);
    assert_eq!(snapshot.root_error(), None);

    let outcome = controller.submit(&form, |_| async { Ok(()) }).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Ignored);
}

#[tokio::test]
async fn submit_during_validation_is_ignored_and_late_edits_are_not_sent() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let resolver = GatedResolver {
        entered: entered.clone(),
        release: release.clone(),
        rules: login_rules(),
    };
    let form = Form::new(json!({ "email": "", "password": "" }), resolver).unwrap();
    form.set_value("email", json!("a@b.com")).unwrap();
    form.set_value("password", json!("12345678")).unwrap();

    let controller: SubmissionController<Value, anyhow::Error> = SubmissionController::new(SubmitOptions::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let first = controller.submit(&form, |values| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(values)
        }
    });
    let second = async {
        entered.notified().await;
        assert_eq!(form.status(), SubmitStatus::Validating);
        let outcome = controller.submit(&form, |values| async move { Ok(values) }).await;
        form.set_value("email", json!("late@edit.io")).unwrap();
        release.notify_one();
        outcome
    };

    let (first, second) = tokio::join!(first, second);

    assert_eq!(second.unwrap(), SubmitOutcome::Ignored);
    assert_eq!(
        first.unwrap(),
        SubmitOutcome::Submitted(json!({ "email": "a@b.com", "password": "12345678" }))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(form.snapshot().submit_count, 1);
    assert_eq!(form.get_value("email").unwrap(), json!("late@edit.io"));
    assert_eq!(form.status(), SubmitStatus::SubmitSuccessful);
}
