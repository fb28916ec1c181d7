//! Reference server for dashform: a login form driven by the submission
//! controller and a permission-gated tenant switcher.

pub mod form_data;
pub mod routes;
pub mod views;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use dashform::{
    session_store_from_config, DashformConfig, FieldRules, FormConfig, MemoryQueryCache, RulesResolver, Tenant,
    TenantContext, TenantStatus, UserProfile,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DashformConfig>,
    pub tenants: Arc<TenantContext>,
    pub account: Arc<DemoAccount>,
}

/// The single account the demo login accepts
#[derive(Debug, Clone)]
pub struct DemoAccount {
    pub email: String,
    pub password: String,
}

impl Default for DemoAccount {
    fn default() -> Self {
        Self {
            email: "admin@dotmac.io".to_string(),
            password: "dotmac-admin".to_string(),
        }
    }
}

impl AppState {
    /// Builds the state and hydrates the demo session
    pub async fn new(config: DashformConfig) -> Result<Self> {
        let store = session_store_from_config(&config.session);
        let tenants = TenantContext::with_config(Arc::new(MemoryQueryCache::new()), store, config.permissions.clone());

        tenants
            .hydrate(&demo_profile(), demo_tenants())
            .await
            .context("Failed to hydrate tenant context")?;

        Ok(Self {
            config: Arc::new(config),
            tenants: Arc::new(tenants),
            account: Arc::new(DemoAccount::default()),
        })
    }
}

pub fn login_resolver(form: &FormConfig) -> RulesResolver {
    RulesResolver::new()
        .field(
            "email",
            FieldRules::new()
                .required()
                .message("Email is required")
                .email()
                .blocked_domains(&form.blocked_email_domains),
        )
        .field(
            "password",
            FieldRules::new()
                .required()
                .message("Password is required")
                .min_length(8)
                .message("Password must be at least 8 characters"),
        )
}

pub fn demo_profile() -> UserProfile {
    UserProfile {
        id: "u-admin".to_string(),
        email: "admin@dotmac.io".to_string(),
        roles: vec!["support".to_string()],
        permissions: vec!["tenants:*".to_string(), "billing:read".to_string()],
        tenant_ids: vec!["t-acme".to_string(), "t-globex".to_string(), "t-initech".to_string()],
        active_organization: Some("t-acme".to_string()),
    }
}

pub fn demo_tenants() -> Vec<Tenant> {
    vec![
        Tenant {
            id: "t-acme".to_string(),
            name: "Acme Fiber".to_string(),
            slug: "acme".to_string(),
            status: TenantStatus::Active,
            plan: "enterprise".to_string(),
        },
        Tenant {
            id: "t-globex".to_string(),
            name: "Globex Net".to_string(),
            slug: "globex".to_string(),
            status: TenantStatus::Trial,
            plan: "pro".to_string(),
        },
        Tenant {
            id: "t-initech".to_string(),
            name: "Initech ISP".to_string(),
            slug: "initech".to_string(),
            status: TenantStatus::Suspended,
            plan: "starter".to_string(),
        },
    ]
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/login", get(routes::login_form).post(routes::login_submit))
        .route("/tenants", get(routes::list_tenants))
        .route("/tenants/switch", axum::routing::post(routes::switch_tenant))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
