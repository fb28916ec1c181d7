use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use dashform::{DashformConfig, UserProfile};
use dashform_server::{app, demo_tenants, AppState};
use pretty_assertions::assert_eq;
use rstest::rstest;
use tower::ServiceExt;

async fn test_app() -> (Router, AppState) {
    let state = AppState::new(DashformConfig::default()).await.unwrap();
    (app(state.clone()), state)
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_check() {
    let (app, _) = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn login_form_renders_accessible_fields() {
    let (app, _) = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/login").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains(r#"<label for="field-email">Email"#));
    assert!(html.contains(r#"type="password""#));
    assert!(html.contains(r#"minlength="8""#));
    assert!(html.contains(r#"aria-describedby="field-password-description""#));
}

#[rstest]
#[case("email=bad&password=1234567", StatusCode::UNPROCESSABLE_ENTITY, "Please enter a valid email")]
#[case("email=bad&password=1234567", StatusCode::UNPROCESSABLE_ENTITY, "Password must be at least 8 characters")]
#[case("email=&password=", StatusCode::UNPROCESSABLE_ENTITY, "Email is required")]
#[case("email=ops%40dotmac.io&password=wrong-password", StatusCode::UNAUTHORIZED, "Invalid email or password")]
#[case("email=admin%40dotmac.io&password=dotmac-admin&remember=true", StatusCode::OK, "Signed in as")]
#[tokio::test]
async fn login_submission(#[case] body: &str, #[case] status: StatusCode, #[case] expected: &str) {
    let (app, _) = test_app().await;
    let response = app.oneshot(post_form("/login", body)).await.unwrap();
    assert_eq!(response.status(), status);
    assert!(body_text(response).await.contains(expected));
}

#[tokio::test]
async fn blocked_email_domains_fail_validation() {
    let mut config = DashformConfig::default();
    config.form.blocked_email_domains = vec!["spam.net".to_string()];
    let app = app(AppState::new(config).await.unwrap());

    let response = app
        .oneshot(post_form("/login", "email=ops%40SPAM.net&password=12345678"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("This email domain is not allowed"));
}

#[tokio::test]
async fn rejected_login_keeps_entered_email() {
    let (app, _) = test_app().await;
    let response = app
        .oneshot(post_form("/login", "email=ops%40dotmac.io&password=wrong-password"))
        .await
        .unwrap();
    let html = body_text(response).await;
    assert!(html.contains(r#"value="ops@dotmac.io""#));
    assert!(html.contains(r#"role="alert""#));
}

#[tokio::test]
async fn tenants_list_marks_current() {
    let (app, _) = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/tenants").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains(r#"<li data-tenant="t-acme" aria-current="true">"#));
    assert!(html.contains(r#"value="t-globex""#));
}

#[tokio::test]
async fn switching_tenants() {
    let (app, state) = test_app().await;

    let response = app.clone().oneshot(post_form("/tenants/switch", "tenant_id=t-globex")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(state.tenants.current_tenant_id().as_deref(), Some("t-globex"));
    assert_eq!(state.tenants.cache().generation(), 1);

    let response = app.oneshot(post_form("/tenants/switch", "tenant_id=t-umbrella")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(state.tenants.current_tenant_id().as_deref(), Some("t-globex"));
    assert_eq!(state.tenants.cache().generation(), 1);
}

#[tokio::test]
async fn tenants_require_permission() {
    let (app, state) = test_app().await;
    let viewer = UserProfile {
        id: "u-viewer".into(),
        email: "viewer@dotmac.io".into(),
        roles: vec!["viewer".into()],
        permissions: vec!["billing:read".into()],
        ..UserProfile::default()
    };
    state.tenants.sync_membership(&viewer, demo_tenants()).await.unwrap();

    let response = app
        .oneshot(Request::builder().uri("/tenants").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_text(response).await.contains("tenants:read"));
}
