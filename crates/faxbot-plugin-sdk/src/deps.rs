//! Host-supplied dependencies injected into every plugin at construction.

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde_json::Value;
use tracing::Level;

use crate::types::JsonMap;

/// Opaque host resource (storage client, DB pool, HTTP client, ...).
/// Plugins recover the concrete type with [`PluginDeps::handle`].
pub type HostHandle = Arc<dyn Any + Send + Sync>;

/// Structured fields whose keys match one of these are dropped by
/// [`PluginDeps::log_info`] and [`PluginDeps::log_error`].
pub const PHI_FIELD_MARKERS: &[&str] = &[
    "ssn",
    "dob",
    "name",
    "address",
    "to_number",
    "from_number",
    "content",
];

/// Audit metadata keys allowed through [`PluginDeps::audit_event`].
pub const AUDIT_SAFE_FIELDS: &[&str] = &["plugin_id", "job_id", "status", "backend", "error_code"];

pub trait PluginLogger: Send + Sync {
    fn log(&self, level: Level, message: &str, fields: &JsonMap);
}

/// Forwards plugin log calls into the process-wide `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl PluginLogger for TracingLogger {
    fn log(&self, level: Level, message: &str, fields: &JsonMap) {
        let fields = Value::Object(fields.clone());
        match level {
            Level::ERROR => tracing::error!(target: "faxbot_plugin", %fields, "{message}"),
            Level::WARN => tracing::warn!(target: "faxbot_plugin", %fields, "{message}"),
            Level::INFO => tracing::info!(target: "faxbot_plugin", %fields, "{message}"),
            Level::DEBUG => tracing::debug!(target: "faxbot_plugin", %fields, "{message}"),
            Level::TRACE => tracing::trace!(target: "faxbot_plugin", %fields, "{message}"),
        }
    }
}

pub trait EventBus: Send + Sync {
    fn emit(&self, event: &str, payload: Value);
}

/// Event bus that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _event: &str, _payload: Value) {}
}

pub trait AuditSink: Send + Sync {
    fn record(&self, event: &str, metadata: &JsonMap) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: &str, _metadata: &JsonMap) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Dependency bundle handed to a plugin. Immutable once built; cloning
/// shares the underlying handles.
#[derive(Clone)]
pub struct PluginDeps {
    logger: Arc<dyn PluginLogger>,
    events: Arc<dyn EventBus>,
    audit: Arc<dyn AuditSink>,
    storage: HostHandle,
    db: HostHandle,
    http: HostHandle,
    cache: HostHandle,
    metrics: HostHandle,
    config_dir: PathBuf,
    extras: HashMap<String, HostHandle>,
}

impl PluginDeps {
    pub fn builder(config_dir: impl Into<PathBuf>) -> PluginDepsBuilder {
        PluginDepsBuilder::new(config_dir.into())
    }

    pub fn logger(&self) -> &dyn PluginLogger {
        self.logger.as_ref()
    }

    pub fn events(&self) -> &dyn EventBus {
        self.events.as_ref()
    }

    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self, filename: &str) -> PathBuf {
        self.config_dir.join(filename)
    }

    /// Typed view of a named host handle. Looks at the well-known slots
    /// (`storage`, `db`, `http`, `cache`, `metrics`) before `extras`.
    pub fn handle<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let handle = match name {
            "storage" => &self.storage,
            "db" => &self.db,
            "http" => &self.http,
            "cache" => &self.cache,
            "metrics" => &self.metrics,
            other => self.extras.get(other)?,
        };
        handle.clone().downcast::<T>().ok()
    }

    pub fn emit(&self, event: &str, payload: Value) {
        self.events.emit(event, payload);
    }

    /// Records an audit event with non-allowlisted metadata stripped.
    /// Sink failures are logged and swallowed.
    pub fn audit_event(&self, event: &str, fields: &JsonMap) {
        let metadata: JsonMap = fields
            .iter()
            .filter(|(k, _)| AUDIT_SAFE_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Err(err) = self.audit.record(event, &metadata) {
            tracing::warn!(event, error = %err, "audit sink rejected event");
        }
    }

    pub fn log_info(&self, message: &str, fields: &JsonMap) {
        self.log_safe(Level::INFO, message, fields);
    }

    pub fn log_error(&self, message: &str, fields: &JsonMap) {
        self.log_safe(Level::ERROR, message, fields);
    }

    fn log_safe(&self, level: Level, message: &str, fields: &JsonMap) {
        let safe: JsonMap = fields
            .iter()
            .filter(|(k, _)| !looks_like_phi_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.logger.log(level, message, &safe);
    }
}

impl fmt::Debug for PluginDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDeps")
            .field("config_dir", &self.config_dir)
            .field("extras", &self.extras.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn looks_like_phi_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    PHI_FIELD_MARKERS.iter().any(|m| key.contains(m))
}

fn inert() -> HostHandle {
    Arc::new(())
}

/// Builder for [`PluginDeps`]; every slot not set explicitly is inert.
pub struct PluginDepsBuilder {
    deps: PluginDeps,
}

impl PluginDepsBuilder {
    fn new(config_dir: PathBuf) -> Self {
        Self {
            deps: PluginDeps {
                logger: Arc::new(TracingLogger),
                events: Arc::new(NullEventBus),
                audit: Arc::new(NullAuditSink),
                storage: inert(),
                db: inert(),
                http: inert(),
                cache: inert(),
                metrics: inert(),
                config_dir,
                extras: HashMap::new(),
            },
        }
    }

    pub fn logger(mut self, logger: Arc<dyn PluginLogger>) -> Self {
        self.deps.logger = logger;
        self
    }

    pub fn events(mut self, events: Arc<dyn EventBus>) -> Self {
        self.deps.events = events;
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.deps.audit = audit;
        self
    }

    pub fn storage(mut self, handle: HostHandle) -> Self {
        self.deps.storage = handle;
        self
    }

    pub fn db(mut self, handle: HostHandle) -> Self {
        self.deps.db = handle;
        self
    }

    pub fn http(mut self, handle: HostHandle) -> Self {
        self.deps.http = handle;
        self
    }

    pub fn cache(mut self, handle: HostHandle) -> Self {
        self.deps.cache = handle;
        self
    }

    pub fn metrics(mut self, handle: HostHandle) -> Self {
        self.deps.metrics = handle;
        self
    }

    pub fn extra(mut self, name: impl Into<String>, handle: HostHandle) -> Self {
        self.deps.extras.insert(name.into(), handle);
        self
    }

    pub fn build(self) -> PluginDeps {
        self.deps
    }
}
