// File: src/config.rs
// Purpose: Configuration parsing from dashform.toml

use crate::form::{FormOptions, ValidationMode};
use crate::submission::SubmitOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DashformConfig {
    #[serde(default)]
    pub form: FormConfig,

    #[serde(default)]
    pub permissions: PermissionsConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Defaults applied to every form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormConfig {
    #[serde(default = "default_true")]
    pub disable_on_submit: bool,

    #[serde(default = "default_false")]
    pub reset_on_success: bool,

    #[serde(default)]
    pub mode: ValidationMode,

    #[serde(default = "default_revalidate_mode")]
    pub revalidate_mode: ValidationMode,

    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,

    /// Email domains rejected by sign-in and invite forms
    #[serde(default)]
    pub blocked_email_domains: Vec<String>,
}

/// Permission matching
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionsConfig {
    /// Roles that bypass every permission check
    #[serde(default = "default_admin_roles")]
    pub admin_roles: Vec<String>,

    #[serde(default = "default_wildcard")]
    pub wildcard: String,

    /// Separates resource from action (`billing:read`)
    #[serde(default = "default_separator")]
    pub separator: String,
}

/// Where the current tenant selection is persisted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStorage {
    #[default]
    Memory,
    Filesystem,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    #[serde(default)]
    pub storage: SessionStorage,

    #[serde(default = "default_session_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

// Default values
fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_revalidate_mode() -> ValidationMode {
    ValidationMode::OnChange
}

fn default_id_prefix() -> String {
    "field".to_string()
}

fn default_admin_roles() -> Vec<String> {
    vec![
        "admin".to_string(),
        "super_admin".to_string(),
        "platform_admin".to_string(),
    ]
}

fn default_wildcard() -> String {
    "*".to_string()
}

fn default_separator() -> String {
    ":".to_string()
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".dashform/session.json")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            disable_on_submit: true,
            reset_on_success: false,
            mode: ValidationMode::default(),
            revalidate_mode: default_revalidate_mode(),
            id_prefix: default_id_prefix(),
            blocked_email_domains: Vec::new(),
        }
    }
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            admin_roles: default_admin_roles(),
            wildcard: default_wildcard(),
            separator: default_separator(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage: SessionStorage::default(),
            path: default_session_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl FormConfig {
    pub fn form_options(&self) -> FormOptions {
        FormOptions {
            mode: self.mode,
            revalidate_mode: self.revalidate_mode,
            submit: self.submit_options(),
            id_prefix: self.id_prefix.clone(),
        }
    }

    pub fn submit_options(&self) -> SubmitOptions {
        SubmitOptions {
            reset_on_success: self.reset_on_success,
            disable_on_submit: self.disable_on_submit,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DashformConfig {
    /// Load configuration from a toml file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Missing file means defaults
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: DashformConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load configuration from ./dashform.toml
    pub fn load_default() -> Result<Self> {
        Self::load("dashform.toml")
    }
}
