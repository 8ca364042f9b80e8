//! Contract and tooling for writing fax-gateway plugins.
//!
//! A plugin implements [`Plugin`] plus one or more capability traits
//! ([`FaxPlugin`], [`StoragePlugin`], [`AuthPlugin`], [`MessagingPlugin`])
//! and ships a [`PluginManifest`] describing what it provides.

pub mod deps;
pub mod error;
pub mod manifest;
pub mod plugin;
pub mod testing;
pub mod types;
pub mod utils;

pub use deps::{AuditSink, EventBus, HostHandle, PluginDeps, PluginLogger, TracingLogger};
pub use error::{PluginError, PluginResult};
pub use manifest::{Category, PluginManifest, MANIFEST_FILE};
pub use plugin::{AuthPlugin, FaxPlugin, MessagingPlugin, Plugin, PluginContext, StoragePlugin};
pub use types::{FaxStatus, HealthReport, HealthState, JsonMap, SendResult, StatusResult};
