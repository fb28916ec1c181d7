// File: src/tenant.rs
// Purpose: Session-scoped tenant selection, query cache and persistence

use crate::config::{PermissionsConfig, SessionConfig, SessionStorage};
use crate::error::SessionError;
use crate::permission::{Permissions, UserProfile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

// ============================================================================
// Tenants
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    #[default]
    Active,
    Suspended,
    Trial,
    Inactive,
}

/// An isolated customer organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub status: TenantStatus,
    #[serde(default)]
    pub plan: String,
}

impl Tenant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let name = name.into();
        Self {
            slug: name.to_lowercase().replace(' ', "-"),
            id,
            name,
            status: TenantStatus::Active,
            plan: "free".to_string(),
        }
    }
}

// ============================================================================
// Query cache
// ============================================================================

/// Cache of tenant-scoped query results
#[async_trait]
pub trait QueryCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value);

    async fn invalidate(&self, key: &str);

    /// Drops every entry so the next read refetches
    async fn invalidate_all(&self);

    /// Incremented by each `invalidate_all`
    fn generation(&self) -> u64;

    fn name(&self) -> &'static str;
}

/// In-memory query cache
#[derive(Debug, Default)]
pub struct MemoryQueryCache {
    entries: RwLock<HashMap<String, Value>>,
    generation: AtomicU64,
}

impl MemoryQueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn size(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl QueryCache for MemoryQueryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: Value) {
        self.entries.write().await.insert(key.to_string(), value);
    }

    async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    async fn invalidate_all(&self) {
        self.entries.write().await.clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// Session persistence
// ============================================================================

/// What survives a page reload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub current_tenant_id: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl PersistedSession {
    pub fn new(current_tenant_id: Option<String>) -> Self {
        Self {
            current_tenant_id,
            saved_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<PersistedSession>, SessionError>;

    async fn save(&self, session: &PersistedSession) -> Result<(), SessionError>;

    async fn clear(&self) -> Result<(), SessionError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<PersistedSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<PersistedSession>, SessionError> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), SessionError> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        *self.session.write().await = None;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Stores the session as one JSON file
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<PersistedSession>, SessionError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn save(&self, session: &PersistedSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        if fs::try_exists(&self.path).await? {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}

/// Builds the session store selected in `[session]`
pub fn session_store_from_config(config: &SessionConfig) -> Arc<dyn SessionStore> {
    match config.storage {
        SessionStorage::Memory => Arc::new(MemorySessionStore::new()),
        SessionStorage::Filesystem => Arc::new(FileSessionStore::new(config.path.clone())),
    }
}

// ============================================================================
// Tenant context
// ============================================================================

/// Read-only view of the tenant context
#[derive(Debug, Clone, PartialEq)]
pub struct TenantSnapshot {
    pub user_id: Option<String>,
    pub tenants: Vec<Tenant>,
    pub current_tenant_id: Option<String>,
    pub permissions: Permissions,
}

impl TenantSnapshot {
    fn signed_out(config: &PermissionsConfig) -> Self {
        Self {
            user_id: None,
            tenants: Vec::new(),
            current_tenant_id: None,
            permissions: Permissions::empty(config),
        }
    }

    pub fn current_tenant(&self) -> Option<&Tenant> {
        let id = self.current_tenant_id.as_deref()?;
        self.tenants.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, tenant_id: &str) -> bool {
        self.tenants.iter().any(|t| t.id == tenant_id)
    }
}

/// Session-wide tenant selection and permissions.
///
/// Created once per session and shared by `Arc`. The current tenant id
/// always names a tenant in `tenants`. Every change of the current tenant
/// invalidates the query cache so tenant-scoped data never crosses over.
pub struct TenantContext {
    state: watch::Sender<TenantSnapshot>,
    // Serializes mutators across their awaits
    writer: Mutex<()>,
    cache: Arc<dyn QueryCache>,
    store: Arc<dyn SessionStore>,
    config: PermissionsConfig,
}

impl TenantContext {
    pub fn new(cache: Arc<dyn QueryCache>, store: Arc<dyn SessionStore>) -> Self {
        Self::with_config(cache, store, PermissionsConfig::default())
    }

    pub fn with_config(cache: Arc<dyn QueryCache>, store: Arc<dyn SessionStore>, config: PermissionsConfig) -> Self {
        let (state, _) = watch::channel(TenantSnapshot::signed_out(&config));
        Self {
            state,
            writer: Mutex::new(()),
            cache,
            store,
            config,
        }
    }

    pub fn snapshot(&self) -> TenantSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TenantSnapshot> {
        self.state.subscribe()
    }

    pub fn current_tenant_id(&self) -> Option<String> {
        self.state.borrow().current_tenant_id.clone()
    }

    pub fn current_tenant(&self) -> Option<Tenant> {
        self.state.borrow().current_tenant().cloned()
    }

    pub fn tenants(&self) -> Vec<Tenant> {
        self.state.borrow().tenants.clone()
    }

    pub fn permissions(&self) -> Permissions {
        self.state.borrow().permissions.clone()
    }

    pub fn cache(&self) -> &Arc<dyn QueryCache> {
        &self.cache
    }

    /// Session start: load memberships and pick the current tenant.
    ///
    /// The persisted selection wins while it is still a membership, then
    /// the profile's active organization, then the first tenant.
    pub async fn hydrate(&self, profile: &UserProfile, tenants: Vec<Tenant>) -> Result<Option<Tenant>, SessionError> {
        let _guard = self.writer.lock().await;

        let tenants = memberships(profile, tenants);
        let persisted = match self.store.load().await {
            Ok(session) => session.and_then(|s| s.current_tenant_id),
            Err(e) => {
                warn!(store = self.store.name(), error = %e, "ignoring unreadable session");
                None
            }
        };
        let current = pick_current(&tenants, [persisted.as_deref(), profile.active_organization.as_deref()]);

        let changed = self.commit(TenantSnapshot {
            user_id: Some(profile.id.clone()),
            permissions: Permissions::new(profile, &self.config),
            current_tenant_id: current.clone(),
            tenants,
        });
        if changed {
            self.cache.invalidate_all().await;
        }
        self.store.save(&PersistedSession::new(current.clone())).await?;

        info!(user_id = %profile.id, tenant_id = ?current, "tenant context hydrated");
        Ok(self.current_tenant())
    }

    /// Membership changed on the backend: resynchronize, never keeping a
    /// current id the user lost access to
    pub async fn sync_membership(&self, profile: &UserProfile, tenants: Vec<Tenant>) -> Result<(), SessionError> {
        let _guard = self.writer.lock().await;

        let tenants = memberships(profile, tenants);
        let previous = self.current_tenant_id();
        let current = pick_current(&tenants, [previous.as_deref(), profile.active_organization.as_deref()]);

        let changed = self.commit(TenantSnapshot {
            user_id: Some(profile.id.clone()),
            permissions: Permissions::new(profile, &self.config),
            current_tenant_id: current.clone(),
            tenants,
        });
        if changed {
            warn!(from = ?previous, to = ?current, "current tenant no longer available, falling back");
            self.cache.invalidate_all().await;
            self.store.save(&PersistedSession::new(current)).await?;
        }
        Ok(())
    }

    /// Switches to `tenant_id`. Unknown ids change nothing and return false.
    /// A known id always clears the query cache once, even when it is
    /// already the current tenant.
    pub async fn switch_tenant(&self, tenant_id: &str) -> bool {
        match self.try_switch_tenant(tenant_id).await {
            Ok(_) => true,
            Err(SessionError::UnknownTenant(_)) => false,
            Err(e) => {
                // Selection and invalidation already happened; only persistence failed
                warn!(tenant_id, error = %e, "failed to persist tenant selection");
                true
            }
        }
    }

    pub async fn try_switch_tenant(&self, tenant_id: &str) -> Result<Tenant, SessionError> {
        let _guard = self.writer.lock().await;

        let snapshot = self.snapshot();
        let tenant = snapshot
            .tenants
            .iter()
            .find(|t| t.id == tenant_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownTenant(tenant_id.to_string()))?;

        if snapshot.current_tenant_id.as_deref() == Some(tenant_id) {
            debug!(tenant_id, "tenant already current, refreshing");
        }

        self.commit(TenantSnapshot {
            current_tenant_id: Some(tenant.id.clone()),
            ..snapshot
        });
        self.cache.invalidate_all().await;
        info!(tenant_id, generation = self.cache.generation(), "switched tenant");

        self.store
            .save(&PersistedSession::new(Some(tenant.id.clone())))
            .await?;
        Ok(tenant)
    }

    /// Session end: drops tenants, permissions, persisted selection and cache
    pub async fn logout(&self) -> Result<(), SessionError> {
        let _guard = self.writer.lock().await;

        self.commit(TenantSnapshot::signed_out(&self.config));
        self.cache.invalidate_all().await;
        self.store.clear().await?;

        info!("tenant context cleared");
        Ok(())
    }

    /// Publishes `next`; reports whether a previously selected tenant changed
    fn commit(&self, next: TenantSnapshot) -> bool {
        let previous = self.state.borrow().current_tenant_id.clone();
        let changed = previous.is_some() && previous != next.current_tenant_id;
        self.state.send_replace(next);
        changed
    }
}

/// Tenants the profile belongs to, in the order given. A profile without
/// explicit memberships keeps the whole list.
fn memberships(profile: &UserProfile, tenants: Vec<Tenant>) -> Vec<Tenant> {
    if profile.tenant_ids.is_empty() {
        return tenants;
    }
    tenants
        .into_iter()
        .filter(|t| profile.tenant_ids.contains(&t.id))
        .collect()
}

/// First candidate that is a member, else the first tenant
fn pick_current<'a>(tenants: &[Tenant], candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|id| tenants.iter().any(|t| t.id == *id))
        .map(str::to_string)
        .or_else(|| tenants.first().map(|t| t.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn tenants() -> Vec<Tenant> {
        vec![
            Tenant::new("t-acme", "Acme Fiber"),
            Tenant::new("t-globex", "Globex Net"),
            Tenant::new("t-initech", "Initech ISP"),
        ]
    }

    fn profile(active: Option<&str>) -> UserProfile {
        UserProfile {
            id: "u-1".into(),
            email: "ops@dotmac.io".into(),
            roles: vec!["member".into()],
            permissions: vec!["tenants:read".into()],
            tenant_ids: vec!["t-acme".into(), "t-globex".into()],
            active_organization: active.map(str::to_string),
        }
    }

    fn context() -> (TenantContext, Arc<MemoryQueryCache>, Arc<MemorySessionStore>) {
        let cache = Arc::new(MemoryQueryCache::new());
        let store = Arc::new(MemorySessionStore::new());
        (TenantContext::new(cache.clone(), store.clone()), cache, store)
    }

    #[rstest]
    #[case(None, None, "t-acme")]
    #[case(None, Some("t-globex"), "t-globex")]
    #[case(Some("t-globex"), Some("t-acme"), "t-globex")]
    #[case(Some("t-initech"), Some("t-globex"), "t-globex")]
    #[case(Some("t-gone"), Some("t-gone"), "t-acme")]
    #[tokio::test]
    async fn hydrate_precedence(#[case] persisted: Option<&str>, #[case] active: Option<&str>, #[case] expected: &str) {
        let (ctx, cache, store) = context();
        if let Some(id) = persisted {
            store.save(&PersistedSession::new(Some(id.into()))).await.unwrap();
        }

        let current = ctx.hydrate(&profile(active), tenants()).await.unwrap();

        assert_eq!(current.map(|t| t.id), Some(expected.to_string()));
        assert_eq!(ctx.tenants().len(), 2);
        assert_eq!(cache.generation(), 0);
    }

    #[tokio::test]
    async fn switch_invalidates_exactly_once() {
        let (ctx, cache, store) = context();
        ctx.hydrate(&profile(None), tenants()).await.unwrap();
        cache.set("customers", serde_json::json!([1, 2])).await;

        assert!(ctx.switch_tenant("t-globex").await);
        assert_eq!(ctx.current_tenant_id().as_deref(), Some("t-globex"));
        assert_eq!(cache.generation(), 1);
        assert_eq!(cache.get("customers").await, None);
        assert_eq!(
            store.load().await.unwrap().and_then(|s| s.current_tenant_id).as_deref(),
            Some("t-globex")
        );
    }

    #[tokio::test]
    async fn unknown_tenant_changes_nothing() {
        let (ctx, cache, _) = context();
        ctx.hydrate(&profile(None), tenants()).await.unwrap();
        let before = ctx.snapshot();

        assert!(!ctx.switch_tenant("t-initech").await);
        assert!(!ctx.switch_tenant("nope").await);

        assert_eq!(ctx.snapshot(), before);
        assert_eq!(cache.generation(), 0);
    }

    #[tokio::test]
    async fn switching_to_the_current_tenant_still_refetches() {
        let (ctx, cache, store) = context();
        ctx.hydrate(&profile(None), tenants()).await.unwrap();
        cache.set("customers", serde_json::json!([1, 2])).await;
        let before = ctx.snapshot();

        assert!(ctx.switch_tenant("t-acme").await);

        assert_eq!(ctx.snapshot(), before);
        assert_eq!(cache.generation(), 1);
        assert_eq!(cache.get("customers").await, None);
        assert_eq!(
            store.load().await.unwrap().and_then(|s| s.current_tenant_id).as_deref(),
            Some("t-acme")
        );
    }

    #[tokio::test]
    async fn losing_membership_falls_back() {
        let (ctx, cache, _) = context();
        ctx.hydrate(&profile(None), tenants()).await.unwrap();
        assert!(ctx.switch_tenant("t-globex").await);

        let mut revoked = profile(None);
        revoked.tenant_ids = vec!["t-acme".into()];
        ctx.sync_membership(&revoked, tenants()).await.unwrap();

        assert_eq!(ctx.current_tenant_id().as_deref(), Some("t-acme"));
        assert_eq!(ctx.tenants().len(), 1);
        assert_eq!(cache.generation(), 2);

        // Unchanged membership keeps the selection and the cache
        ctx.sync_membership(&revoked, tenants()).await.unwrap();
        assert_eq!(cache.generation(), 2);
    }

    #[tokio::test]
    async fn logout_clears_everything() {
        let (ctx, cache, store) = context();
        ctx.hydrate(&profile(None), tenants()).await.unwrap();
        let mut rx = ctx.subscribe();

        ctx.logout().await.unwrap();

        rx.changed().await.unwrap();
        assert!(rx.borrow().tenants.is_empty());
        assert_eq!(ctx.current_tenant(), None);
        assert!(!ctx.permissions().has_permission("tenants:read"));
        assert_eq!(store.load().await.unwrap(), None);
        assert_eq!(cache.generation(), 1);
    }

    #[tokio::test]
    async fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));

        assert_eq!(store.load().await.unwrap(), None);
        let session = PersistedSession::new(Some("t-acme".into()));
        store.save(&session).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(session));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_session_file_is_ignored_on_hydrate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = Arc::new(FileSessionStore::new(&path));
        assert!(matches!(store.load().await, Err(SessionError::Serde(_))));

        let ctx = TenantContext::new(Arc::new(MemoryQueryCache::new()), store.clone());
        let current = ctx.hydrate(&profile(Some("t-globex")), tenants()).await.unwrap();
        assert_eq!(current.map(|t| t.id).as_deref(), Some("t-globex"));
        assert!(store.load().await.unwrap().is_some());
    }
}
