// File: src/routes.rs
// Purpose: HTTP handlers

use crate::form_data::FormData;
use crate::{login_resolver, views, AppState};
use anyhow::anyhow;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use dashform::{Form, FormResult, InputKind, SessionError, SubmissionController, SubmitOutcome};
use serde_json::json;
use tracing::{error, info, warn};

const LOGIN_FIELDS: [(&str, InputKind); 3] = [
    ("email", InputKind::Email),
    ("password", InputKind::Password),
    ("remember", InputKind::Checkbox),
];

fn new_login_form(state: &AppState) -> FormResult<Form> {
    Form::with_options(
        json!({ "email": "", "password": "", "remember": false }),
        login_resolver(&state.config.form),
        state.config.form.form_options(),
    )
}

fn page(status: StatusCode, markup: maud::Markup) -> Response {
    (status, Html(markup.into_string())).into_response()
}

fn internal_error(e: impl std::fmt::Display) -> Response {
    error!(error = %e, "request failed");
    page(
        StatusCode::INTERNAL_SERVER_ERROR,
        views::message_page("Something went wrong", "Please try again."),
    )
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn login_form(State(state): State<AppState>) -> Response {
    match new_login_form(&state) {
        Ok(form) => page(StatusCode::OK, views::login_page(&form)),
        Err(e) => internal_error(e),
    }
}

pub async fn login_submit(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let form = match new_login_form(&state) {
        Ok(form) => form,
        Err(e) => return internal_error(e),
    };
    if let Err(e) = FormData::from_request(&headers, &body).apply(&form, &LOGIN_FIELDS) {
        return internal_error(e);
    }

    let account = state.account.clone();
    let controller: SubmissionController<String, anyhow::Error> =
        SubmissionController::new(state.config.form.submit_options());

    let outcome = controller
        .submit(&form, |values| async move {
            let email = values["email"].as_str().unwrap_or_default();
            let password = values["password"].as_str().unwrap_or_default();
            if email == account.email && password == account.password {
                Ok(email.to_string())
            } else {
                Err(anyhow!("Invalid email or password"))
            }
        })
        .await;

    match outcome {
        Ok(SubmitOutcome::Submitted(email)) => {
            info!(%email, "signed in");
            page(StatusCode::OK, views::welcome_page(&email))
        }
        Ok(SubmitOutcome::Invalid(_)) => page(StatusCode::UNPROCESSABLE_ENTITY, views::login_page(&form)),
        Ok(SubmitOutcome::Ignored) => page(StatusCode::CONFLICT, views::login_page(&form)),
        Err(e) => {
            warn!(error = %e, "sign-in rejected");
            page(StatusCode::UNAUTHORIZED, views::login_page(&form))
        }
    }
}

pub async fn list_tenants(State(state): State<AppState>) -> Response {
    let permissions = state.tenants.permissions();
    if let Err(denied) = permissions.require("tenants:read") {
        return page(StatusCode::FORBIDDEN, views::message_page("Forbidden", &denied.to_string()));
    }

    page(StatusCode::OK, views::tenants_page(&state.tenants.snapshot(), &permissions))
}

pub async fn switch_tenant(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(denied) = state.tenants.permissions().require("tenants:switch") {
        return page(StatusCode::FORBIDDEN, views::message_page("Forbidden", &denied.to_string()));
    }

    let data = FormData::from_request(&headers, &body);
    let Some(tenant_id) = data.get("tenant_id") else {
        return page(
            StatusCode::BAD_REQUEST,
            views::message_page("Bad request", "tenant_id is required"),
        );
    };

    match state.tenants.try_switch_tenant(tenant_id).await {
        Ok(_) => Redirect::to("/tenants").into_response(),
        Err(SessionError::UnknownTenant(id)) => page(
            StatusCode::NOT_FOUND,
            views::message_page("Not found", &format!("No workspace '{}'", id)),
        ),
        Err(e) => internal_error(e),
    }
}
