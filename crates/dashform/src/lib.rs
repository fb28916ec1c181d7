//! # dashform
//!
//! Headless form engine for admin dashboards: form state, pluggable
//! validation, a submission state machine, accessible field rendering and
//! a tenant-aware permission context.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dashform::{FieldRules, Form, RulesResolver, SubmissionController, SubmitOptions};
//! use serde_json::json;
//!
//! let resolver = RulesResolver::new()
//!     .field("email", FieldRules::new().required().email())
//!     .field("password", FieldRules::new().required().min_length(8));
//! let form = Form::new(json!({ "email": "", "password": "" }), resolver)?;
//!
//! form.set_value("email", json!("ops@dotmac.io"))?;
//! let controller = SubmissionController::new(SubmitOptions::default());
//! let outcome = controller
//!     .submit(&form, |values| async move { api.login(values).await })
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - **`value`** - dot paths over a JSON value tree, input coercion
//! - **`rules`** / **`resolver`** - per-field rule chains and the `Resolver` strategy
//! - **`state`** / **`form`** - the form state record and its shared handle
//! - **`submission`** - status machine and submission controller
//! - **`binding`** / **`field_group`** - maud-rendered field primitives
//! - **`permission`** / **`tenant`** - permission checks and tenant switching
//! - **`config`** - `dashform.toml`

pub mod binding;
pub mod config;
pub mod error;
pub mod field_group;
pub mod form;
pub mod permission;
pub mod resolver;
pub mod rules;
pub mod state;
pub mod submission;
pub mod tenant;
pub mod value;

pub use binding::{
    root_error_alert, Checkbox, ControlledBinding, Feedback, FieldIds, FieldProps, FormActions, NativeElement,
    RenderContext, Select, SelectOption, TextArea, TextInput, UncontrolledBinding,
};
pub use config::{DashformConfig, FormConfig, PermissionsConfig, ServerConfig, SessionConfig, SessionStorage};
pub use error::{FormError, FormResult, SessionError};
pub use field_group::{inject_id, is_injectable, Element, FormField, Node};
pub use form::{FieldEvent, FieldWatch, Form, FormId, FormOptions, FormSnapshot, ValidationMode};
pub use permission::{PermissionDenied, Permissions, UserProfile};
pub use resolver::{
    FieldErrors, FnResolver, GardeResolver, NoopResolver, Resolver, RulesResolver, ValidationResult, ROOT_ERROR_KEY,
};
pub use rules::{CustomRule, FieldRules};
pub use state::FormState;
pub use submission::{
    transition, SubmissionController, SubmitEvent, SubmitFailure, SubmitOptions, SubmitOutcome, SubmitStatus,
};
pub use tenant::{
    session_store_from_config, FileSessionStore, MemoryQueryCache, MemorySessionStore, PersistedSession, QueryCache,
    SessionStore, Tenant, TenantContext, TenantSnapshot, TenantStatus,
};
pub use value::{coerce_input, conform, flatten, get_path, set_path, ElementInput, FieldPath, FieldValue, InputKind};

// Password tiers are part of the rule builder surface
pub use dashform_validation::PasswordTier;
