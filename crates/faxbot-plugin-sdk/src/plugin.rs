use std::{collections::HashMap, path::Path};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

use crate::{
    deps::PluginDeps,
    error::{PluginError, PluginResult},
    manifest::PluginManifest,
    types::{HealthReport, HealthState, JsonMap, SendResult, StatusResult},
};

/// Per-instance state every plugin carries: the injected dependencies, the
/// configuration accepted by `initialize`, and the initialized flag.
#[derive(Debug)]
pub struct PluginContext {
    deps: PluginDeps,
    config: Value,
    initialized: bool,
}

impl PluginContext {
    pub fn new(deps: PluginDeps) -> Self {
        Self {
            deps,
            config: Value::Null,
            initialized: false,
        }
    }

    pub fn deps(&self) -> &PluginDeps {
        &self.deps
    }

    /// `Null` until `mark_initialized` runs.
    pub fn config(&self) -> &Value {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn mark_initialized(&mut self, config: Value) {
        self.config = config;
        self.initialized = true;
    }

    /// Clears the initialized flag; returns whether it was set.
    pub fn mark_shutdown(&mut self) -> bool {
        std::mem::replace(&mut self.initialized, false)
    }
}

/// Lifecycle shared by every plugin kind.
///
/// The host constructs a plugin with [`Plugin::new`], checks configuration
/// with [`Plugin::validate_config`], then drives `initialize`, any number of
/// capability calls, and `shutdown`. `shutdown` must tolerate an instance
/// that was never initialized.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn new(deps: PluginDeps) -> Self
    where
        Self: Sized;

    fn context(&self) -> &PluginContext;

    fn manifest(&self) -> PluginManifest;

    /// Pure shape check of `config`. No I/O.
    fn validate_config(&self, config: &Value) -> PluginResult<()>;

    async fn initialize(&mut self, config: Value) -> PluginResult<()>;

    async fn shutdown(&mut self) -> PluginResult<()>;

    fn is_initialized(&self) -> bool {
        self.context().is_initialized()
    }

    /// Backend-specific liveness check, only run on initialized instances.
    async fn probe(&self) -> PluginResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> HealthReport {
        let manifest = self.manifest();
        let (status, error) = if !self.is_initialized() {
            (HealthState::NotInitialized, None)
        } else {
            match self.probe().await {
                Ok(()) => (HealthState::Healthy, None),
                Err(err) => (HealthState::Unhealthy, Some(err.to_string())),
            }
        };
        HealthReport {
            status,
            plugin: manifest.id,
            version: manifest.version,
            error,
        }
    }

    async fn handle_webhook(
        &self,
        _headers: &HashMap<String, String>,
        _body: &[u8],
    ) -> PluginResult<Value> {
        Ok(json!({ "status": "not_implemented" }))
    }
}

/// Outbound fax transmission.
#[async_trait]
pub trait FaxPlugin: Plugin {
    async fn send_fax(
        &self,
        to_number: &str,
        file_path: &Path,
        options: &JsonMap,
    ) -> PluginResult<SendResult>;

    async fn get_status(&self, job_id: &str) -> PluginResult<StatusResult>;

    /// Returns `true` when the backend accepted the cancellation.
    async fn cancel_fax(&self, _job_id: &str) -> PluginResult<bool> {
        Ok(false)
    }

    async fn fax_details(&self, job_id: &str) -> PluginResult<Value> {
        Ok(self.get_status(job_id).await?.to_value())
    }
}

/// Document storage backend.
#[async_trait]
pub trait StoragePlugin: Plugin {
    /// Stores `data` and returns the storage-assigned path or identifier.
    async fn put(&self, path: &str, data: Bytes, metadata: &JsonMap) -> PluginResult<String>;

    /// Fails with [`PluginError::NotFound`] when nothing is stored at `path`.
    async fn get(&self, path: &str) -> PluginResult<Bytes>;

    async fn delete(&self, path: &str) -> PluginResult<bool>;

    async fn exists(&self, path: &str) -> PluginResult<bool>;

    async fn list(&self, prefix: &str) -> PluginResult<Vec<String>>;

    async fn signed_url(&self, _path: &str, _expires_in_secs: u64) -> PluginResult<String> {
        Err(PluginError::unsupported("signed URLs"))
    }
}

/// Identity provider.
#[async_trait]
pub trait AuthPlugin: Plugin {
    async fn authenticate(&self, credentials: &JsonMap) -> PluginResult<JsonMap>;

    async fn validate_token(&self, token: &str) -> PluginResult<bool>;

    /// Fails with [`PluginError::Auth`] for an invalid or expired token.
    async fn refresh_token(&self, refresh_token: &str) -> PluginResult<JsonMap>;

    async fn user_info(&self, _token: &str) -> PluginResult<JsonMap> {
        Ok(JsonMap::new())
    }
}

/// Non-fax messaging channel (SMS, email, ...).
#[async_trait]
pub trait MessagingPlugin: Plugin {
    async fn send_message(&self, to: &str, content: &JsonMap) -> PluginResult<JsonMap>;

    async fn get_message_status(&self, message_id: &str) -> PluginResult<JsonMap>;
}
