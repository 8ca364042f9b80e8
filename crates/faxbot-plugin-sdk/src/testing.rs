//! Disposable host stand-ins for exercising a plugin without a gateway.

use std::{
    collections::HashMap,
    io,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde_json::Value;
use tempfile::TempDir;
use tracing::Level;

use crate::{
    deps::{EventBus, PluginDeps, PluginLogger},
    error::PluginResult,
    plugin::Plugin,
    types::JsonMap,
    utils::{contains_phi, redact_text},
};

const CONFIG_DIR_PREFIX: &str = "faxbot_plugin_";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Event bus that remembers every emission, grouped by event name in
/// insertion order.
#[derive(Debug, Default)]
pub struct RecordingEventBus {
    events: Mutex<HashMap<String, Vec<Value>>>,
}

impl RecordingEventBus {
    pub fn events(&self, event: &str) -> Vec<Value> {
        lock(&self.events).get(event).cloned().unwrap_or_default()
    }

    pub fn count(&self, event: &str) -> usize {
        lock(&self.events).get(event).map_or(0, Vec::len)
    }
}

impl EventBus for RecordingEventBus {
    fn emit(&self, event: &str, payload: Value) {
        lock(&self.events)
            .entry(event.to_string())
            .or_default()
            .push(payload);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub fields: JsonMap,
}

impl LogRecord {
    /// Message plus every field value, as checked for PHI.
    fn texts(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.message.clone()).chain(self.fields.values().map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }
}

/// Logger that keeps every call so tests can inspect what a plugin logged.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl RecordingLogger {
    pub fn records(&self) -> Vec<LogRecord> {
        lock(&self.records).clone()
    }
}

impl PluginLogger for RecordingLogger {
    fn log(&self, level: Level, message: &str, fields: &JsonMap) {
        lock(&self.records).push(LogRecord {
            level,
            message: message.to_string(),
            fields: fields.clone(),
        });
    }
}

/// Mock dependency bundle. Only the event bus and logger record anything;
/// every other handle is inert. `config_dir` is a fresh temporary directory
/// removed when the bundle is dropped.
pub struct MockDeps {
    pub deps: PluginDeps,
    pub events: Arc<RecordingEventBus>,
    pub logger: Arc<RecordingLogger>,
    pub config_dir: TempDir,
}

pub fn create_mock_deps() -> io::Result<MockDeps> {
    let config_dir = tempfile::Builder::new()
        .prefix(CONFIG_DIR_PREFIX)
        .tempdir()?;
    let events = Arc::new(RecordingEventBus::default());
    let logger = Arc::new(RecordingLogger::default());
    let deps = PluginDeps::builder(config_dir.path())
        .events(events.clone())
        .logger(logger.clone())
        .build();
    Ok(MockDeps {
        deps,
        events,
        logger,
        config_dir,
    })
}

/// Fixture wrapping one plugin instance built against [`MockDeps`].
pub struct PluginTestHarness<P: Plugin> {
    plugin: P,
    deps: PluginDeps,
    events: Arc<RecordingEventBus>,
    logger: Arc<RecordingLogger>,
    config_dir: Option<TempDir>,
}

impl<P: Plugin> PluginTestHarness<P> {
    /// Builds the plugin against fresh mocks. With a config, runs
    /// `validate_config` then `initialize`, returning the first failure.
    pub async fn setup(config: Option<Value>) -> PluginResult<Self> {
        let MockDeps {
            deps,
            events,
            logger,
            config_dir,
        } = create_mock_deps()?;
        let mut plugin = P::new(deps.clone());
        if let Some(config) = config {
            plugin.validate_config(&config)?;
            plugin.initialize(config).await?;
        }
        Ok(Self {
            plugin,
            deps,
            events,
            logger,
            config_dir: Some(config_dir),
        })
    }

    /// Shuts the plugin down and removes the temporary config directory.
    /// Never fails; problems are logged.
    pub async fn teardown(mut self) {
        if let Err(err) = self.plugin.shutdown().await {
            tracing::warn!(error = %err, "plugin shutdown failed during teardown");
        }
        if let Some(dir) = self.config_dir.take() {
            if let Err(err) = dir.close() {
                tracing::debug!(error = %err, "could not remove plugin config dir");
            }
        }
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    pub fn plugin_mut(&mut self) -> &mut P {
        &mut self.plugin
    }

    pub fn deps(&self) -> &PluginDeps {
        &self.deps
    }

    pub fn config_dir(&self) -> &Path {
        self.deps.config_dir()
    }

    pub fn events(&self, event: &str) -> Vec<Value> {
        self.events.events(event)
    }

    pub fn log_records(&self) -> Vec<LogRecord> {
        self.logger.records()
    }

    /// Panics unless `event` was emitted at least once.
    pub fn assert_event_emitted(&self, event: &str) {
        assert!(
            self.events.count(event) > 0,
            "Event {event} was not emitted"
        );
    }

    /// Panics if any logged message or field value contains an SSN (dashed,
    /// dotted or bare) or a run of ten or more digits.
    pub fn assert_no_phi_logged(&self) {
        for record in self.logger.records() {
            for text in record.texts() {
                let redacted = redact_text(&text);
                assert!(
                    !contains_phi(&text),
                    "possible PHI logged at {}: {redacted}",
                    record.level
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::{
        error::PluginError,
        manifest::PluginManifest,
        plugin::PluginContext,
        utils::mask_phone_number,
    };

    struct Notifier {
        ctx: PluginContext,
    }

    impl Notifier {
        fn notify(&self, to: &str, mask: bool) {
            let shown = if mask {
                mask_phone_number(to)
            } else {
                to.to_string()
            };
            self.ctx
                .deps()
                .logger()
                .log(Level::INFO, &format!("notifying {shown}"), &JsonMap::new());
        }
    }

    #[async_trait]
    impl Plugin for Notifier {
        fn new(deps: PluginDeps) -> Self {
            Self {
                ctx: PluginContext::new(deps),
            }
        }

        fn context(&self) -> &PluginContext {
            &self.ctx
        }

        fn manifest(&self) -> PluginManifest {
            PluginManifest {
                id: "notifier".into(),
                version: "1.0.0".into(),
                ..Default::default()
            }
        }

        fn validate_config(&self, config: &Value) -> PluginResult<()> {
            if config.get("channel").is_none() {
                return Err(PluginError::validation("channel is required"));
            }
            Ok(())
        }

        async fn initialize(&mut self, config: Value) -> PluginResult<()> {
            if config["channel"] == "down" {
                return Err(PluginError::initialization("channel unavailable"));
            }
            self.ctx.deps().emit("notifier.ready", json!({"channel": config["channel"]}));
            self.ctx.mark_initialized(config);
            Ok(())
        }

        async fn shutdown(&mut self) -> PluginResult<()> {
            if self.ctx.mark_shutdown() {
                self.ctx.deps().emit("notifier.stopped", json!({}));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn setup_with_config_initializes_and_records_events() {
        let harness = PluginTestHarness::<Notifier>::setup(Some(json!({"channel": "sms"})))
            .await
            .unwrap();
        assert!(harness.plugin().is_initialized());
        harness.assert_event_emitted("notifier.ready");
        assert_eq!(harness.events("notifier.ready"), vec![json!({"channel": "sms"})]);
        harness.teardown().await;
    }

    #[tokio::test]
    async fn setup_surfaces_validation_failure() {
        let err = PluginTestHarness::<Notifier>::setup(Some(json!({})))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::Validation(_)));
    }

    #[tokio::test]
    async fn setup_surfaces_initialization_failure() {
        let err = PluginTestHarness::<Notifier>::setup(Some(json!({"channel": "down"})))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, PluginError::Initialization(_)));
    }

    #[tokio::test]
    async fn teardown_without_initialize_removes_config_dir() {
        let harness = PluginTestHarness::<Notifier>::setup(None).await.unwrap();
        let dir = harness.config_dir().to_path_buf();
        assert!(dir.is_dir());
        assert!(dir
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(CONFIG_DIR_PREFIX)));
        assert!(!harness.plugin().is_initialized());
        harness.teardown().await;
        assert!(!dir.exists());
    }

    #[tokio::test]
    #[should_panic(expected = "Event notifier.ready was not emitted")]
    async fn assert_event_emitted_fails_for_missing_event() {
        let harness = PluginTestHarness::<Notifier>::setup(None).await.unwrap();
        harness.assert_event_emitted("notifier.ready");
    }

    #[tokio::test]
    async fn masked_numbers_pass_phi_check() {
        let harness = PluginTestHarness::<Notifier>::setup(None).await.unwrap();
        harness.plugin().notify("5551234567", true);
        assert_eq!(harness.log_records().len(), 1);
        harness.assert_no_phi_logged();
    }

    #[tokio::test]
    #[should_panic(expected = "possible PHI logged")]
    async fn raw_numbers_fail_phi_check() {
        let harness = PluginTestHarness::<Notifier>::setup(None).await.unwrap();
        harness.plugin().notify("5551234567", false);
        harness.assert_no_phi_logged();
    }

    #[tokio::test]
    #[should_panic(expected = "possible PHI logged")]
    async fn dotted_ssn_fails_phi_check() {
        let harness = PluginTestHarness::<Notifier>::setup(None).await.unwrap();
        harness
            .deps()
            .logger()
            .log(Level::WARN, "member 123.45.6789 rejected", &JsonMap::new());
        harness.assert_no_phi_logged();
    }

    #[test]
    fn recording_bus_groups_by_event_in_order() {
        let bus = RecordingEventBus::default();
        bus.emit("a", json!(1));
        bus.emit("b", json!(2));
        bus.emit("a", json!(3));
        assert_eq!(bus.events("a"), vec![json!(1), json!(3)]);
        assert_eq!(bus.count("b"), 1);
        assert!(bus.events("c").is_empty());
    }
}
