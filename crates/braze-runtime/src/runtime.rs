//! Main runtime orchestration.
//!
//! The runtime wires configuration, logging, the engine, and the plugin
//! registry together, then pumps an inbound event channel into the engine
//! until the channel closes or a shutdown signal arrives. The adapter side
//! (decoding wire payloads into [`Event`] values and sending them on the
//! channel) lives outside this crate.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use braze_runtime::BrazeRuntime;
//!
//! // Simplest way - auto-loads config from the current directory
//! let runtime = BrazeRuntime::new();
//!
//! // Custom configuration path
//! let runtime = BrazeRuntime::builder()
//!     .config_file("config/braze.toml")
//!     .build()?;
//!
//! runtime.register_plugin(Box::new(Echo)).await?;
//! runtime.run(events).await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::signal;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use braze_core::{Bot, Engine, Event, HookSet};

use crate::config::{ConfigLoader, ConfigResult, RuntimeConfig};
use crate::error::RuntimeResult;
use crate::logging;
use crate::plugin::{Plugin, PluginInfo};
use crate::registry::PluginRegistry;

/// How long shutdown waits for in-flight dispatches to finish.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle hooks owned by the runtime.
///
/// Built on the same [`HookSet`] primitive as the engine's dispatch hooks.
#[derive(Clone, Default)]
pub struct RuntimeHooks {
    /// Fires once at startup, before any plugin loads.
    pub engine_created: HookSet<Arc<Engine>>,
    /// Fires after the event pump stops, before `run` returns.
    pub engine_will_terminate: HookSet<Arc<Engine>>,
    /// Fires immediately before each plugin's init.
    pub plugin_will_load: HookSet<PluginInfo>,
    /// Fires after each plugin's init succeeds.
    pub plugin_loaded: HookSet<PluginInfo>,
}

/// The main Braze runtime.
///
/// # Example
///
/// ```rust,ignore
/// use braze_runtime::BrazeRuntime;
///
/// let runtime = BrazeRuntime::new();
/// runtime.register_plugin(Box::new(Echo)).await?;
///
/// let (tx, rx) = tokio::sync::mpsc::channel(64);
/// // hand `tx` to the adapter ...
/// runtime.run(rx).await?;
/// ```
pub struct BrazeRuntime {
    /// The loaded configuration.
    config: RuntimeConfig,
    /// The shared dispatch engine.
    engine: Arc<Engine>,
    /// Plugins to load at startup.
    plugins: PluginRegistry,
    /// Lifecycle hooks.
    hooks: RuntimeHooks,
    /// Whether the event pump is running.
    running: Arc<RwLock<bool>>,
    /// Keeps the file log writer alive for the life of the runtime.
    _log_guard: Option<WorkerGuard>,
}

impl BrazeRuntime {
    /// Creates a new runtime with automatic configuration loading.
    ///
    /// Searches for `braze.toml` in the current directory and initializes
    /// logging from the result. If no configuration file is found, default
    /// settings are used.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                RuntimeConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a new runtime from an already loaded configuration.
    ///
    /// Initializes logging from the configuration (a no-op if a subscriber
    /// is already installed) and builds the engine with the bot settings.
    pub fn from_config(config: &RuntimeConfig) -> Self {
        let log_guard = logging::init_from_config(&config.logging);
        let engine = Arc::new(Engine::new(config.bot.clone()));

        info!(
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            engine,
            plugins: PluginRegistry::new(),
            hooks: RuntimeHooks::default(),
            running: Arc::new(RwLock::new(false)),
            _log_guard: log_guard,
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The shared dispatch engine.
    pub fn engine(&self) -> Arc<Engine> {
        Arc::clone(&self.engine)
    }

    /// The runtime's lifecycle hooks.
    pub fn hooks(&self) -> &RuntimeHooks {
        &self.hooks
    }

    /// Attaches the bot used for outbound API calls.
    pub fn set_bot(&self, bot: Arc<dyn Bot>) {
        self.engine.set_bot(bot);
    }

    /// Registers a plugin; it is loaded when the runtime starts.
    pub async fn register_plugin(&self, plugin: Box<dyn Plugin>) -> RuntimeResult<()> {
        self.plugins.register(plugin).await
    }

    /// Returns whether the event pump is currently running.
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Fires the startup hooks and loads all registered plugins.
    pub async fn init(&self) -> RuntimeResult<()> {
        self.hooks.engine_created.emit(&self.engine);
        self.plugins.load_all(&self.engine, &self.hooks).await?;

        let plugins = self.plugins.count().await;
        info!(plugins, "Runtime initialized");
        Ok(())
    }

    /// Runs the runtime until the event channel closes or a shutdown signal
    /// (Ctrl+C or SIGTERM) is received.
    pub async fn run(&self, events: mpsc::Receiver<Arc<dyn Event>>) -> RuntimeResult<()> {
        info!("Press Ctrl+C to stop");
        self.run_until(events, wait_for_shutdown()).await
    }

    /// Runs the runtime until the event channel closes or the given future
    /// completes.
    pub async fn run_until<F>(
        &self,
        mut events: mpsc::Receiver<Arc<dyn Event>>,
        shutdown: F,
    ) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        {
            let mut running = self.running.write().await;
            if *running {
                warn!("Runtime is already running");
                return Ok(());
            }
            *running = true;
        }

        if let Err(e) = self.init().await {
            *self.running.write().await = false;
            return Err(e);
        }

        info!("Braze runtime is now running");

        tokio::pin!(shutdown);
        let mut in_flight: Vec<JoinHandle<bool>> = Vec::new();

        loop {
            tokio::select! {
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => {
                        in_flight.retain(|handle| !handle.is_finished());
                        in_flight.push(self.engine.dispatch(event));
                    }
                    None => {
                        info!("Event channel closed, shutting down");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    break;
                }
            }
        }

        self.drain(in_flight).await;
        self.stop().await;

        Ok(())
    }

    /// Waits briefly for in-flight dispatches before shutdown.
    async fn drain(&self, in_flight: Vec<JoinHandle<bool>>) {
        let pending: Vec<_> = in_flight
            .into_iter()
            .filter(|handle| !handle.is_finished())
            .collect();
        if pending.is_empty() {
            return;
        }

        debug!("Draining {} in-flight dispatch(es)", pending.len());
        if tokio::time::timeout(DRAIN_TIMEOUT, join_all(pending))
            .await
            .is_err()
        {
            warn!("Shutting down with dispatches still in flight");
        }
    }

    async fn stop(&self) {
        *self.running.write().await = false;
        self.hooks.engine_will_terminate.emit(&self.engine);
        info!("Runtime stopped");
    }
}

impl Default for BrazeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C, shutting down");
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`BrazeRuntime`] with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = BrazeRuntime::builder()
///     .config_file("config/braze.toml")
///     .profile("production")
///     .bot(my_bot)
///     .plugin(Box::new(Echo))
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    bot: Option<Arc<dyn Bot>>,
    plugins: Vec<Box<dyn Plugin>>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            bot: None,
            plugins: Vec::new(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: RuntimeConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Sets the bot used for outbound API calls.
    pub fn bot(mut self, bot: Arc<dyn Bot>) -> Self {
        self.bot = Some(bot);
        self
    }

    /// Adds a plugin to load at startup.
    pub fn plugin(mut self, plugin: Box<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> ConfigResult<BrazeRuntime> {
        let config = self.config_loader.load()?;
        let mut runtime = BrazeRuntime::from_config(&config);
        runtime.plugins = PluginRegistry::from_plugins(self.plugins);
        if let Some(bot) = self.bot {
            runtime.engine.set_bot(bot);
        }
        Ok(runtime)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use braze_core::{Context, EventName};

    use super::*;
    use crate::error::RuntimeError;
    use crate::model::PrivateMessage;
    use crate::plugin::PluginResult;

    struct RecordingPlugin {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl Plugin for RecordingPlugin {
        fn info(&self) -> PluginInfo {
            PluginInfo {
                name: "recording",
                version: "0.1.0",
                description: "records message text",
            }
        }

        fn init(&self, engine: &Engine) -> PluginResult {
            let seen = Arc::clone(&self.seen);
            engine
                .new_handler(&[EventName::MESSAGE])
                .handle(move |ctx: Arc<Context>| {
                    let seen = Arc::clone(&seen);
                    async move {
                        seen.lock().unwrap().push(ctx.event().plain_text());
                    }
                });
            Ok(())
        }
    }

    struct FailingPlugin;

    impl Plugin for FailingPlugin {
        fn info(&self) -> PluginInfo {
            PluginInfo {
                name: "failing",
                version: "0.1.0",
                description: "",
            }
        }

        fn init(&self, _engine: &Engine) -> PluginResult {
            Err("missing data file".into())
        }
    }

    fn event(message_id: i64, text: &str) -> Arc<dyn Event> {
        Arc::new(PrivateMessage::new(7, message_id, text))
    }

    #[tokio::test]
    async fn test_run_pumps_events_until_channel_closes() {
        let runtime = BrazeRuntime::from_config(&RuntimeConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        runtime
            .register_plugin(Box::new(RecordingPlugin {
                seen: Arc::clone(&seen),
            }))
            .await
            .unwrap();

        let (tx, rx) = mpsc::channel(8);
        tx.send(event(1, "hello")).await.unwrap();
        tx.send(event(2, "again")).await.unwrap();
        drop(tx);

        runtime.run_until(rx, std::future::pending()).await.unwrap();

        let mut got = seen.lock().unwrap().clone();
        got.sort();
        assert_eq!(got, vec!["again".to_string(), "hello".to_string()]);
        assert!(!runtime.is_running().await);
    }

    #[tokio::test]
    async fn test_run_until_stops_on_shutdown_future() {
        let runtime = BrazeRuntime::from_config(&RuntimeConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        runtime
            .register_plugin(Box::new(RecordingPlugin {
                seen: Arc::clone(&seen),
            }))
            .await
            .unwrap();

        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        tx.send(event(1, "hello")).await.unwrap();
        let watched = Arc::clone(&seen);
        tokio::spawn(async move {
            // Keep the channel open; only the shutdown future ends the run.
            let _tx = tx;
            while watched.lock().unwrap().is_empty() {
                tokio::task::yield_now().await;
            }
            let _ = stop_tx.send(());
        });

        runtime
            .run_until(rx, async {
                let _ = stop_rx.await;
            })
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_duplicate_plugin_is_rejected() {
        let runtime = BrazeRuntime::from_config(&RuntimeConfig::default());
        runtime
            .register_plugin(Box::new(FailingPlugin))
            .await
            .unwrap();

        let result = runtime.register_plugin(Box::new(FailingPlugin)).await;
        assert!(matches!(result, Err(RuntimeError::DuplicatePlugin(_))));
    }

    #[tokio::test]
    async fn test_plugin_init_failure_aborts_startup() {
        let runtime = BrazeRuntime::from_config(&RuntimeConfig::default());
        runtime
            .register_plugin(Box::new(FailingPlugin))
            .await
            .unwrap();

        let (_tx, rx) = mpsc::channel(1);
        let result = runtime.run_until(rx, std::future::pending()).await;

        assert!(matches!(
            result,
            Err(RuntimeError::PluginInit { plugin, .. }) if plugin == "failing"
        ));
        assert!(!runtime.is_running().await);
    }

    #[tokio::test]
    async fn test_lifecycle_hooks_fire_in_order() {
        let runtime = BrazeRuntime::from_config(&RuntimeConfig::default());
        let order = Arc::new(Mutex::new(Vec::<String>::new()));

        {
            let order = Arc::clone(&order);
            runtime.hooks().engine_created.add(move |_: &Arc<Engine>| {
                order.lock().unwrap().push("engine_created".to_string());
            });
        }
        {
            let order = Arc::clone(&order);
            runtime.hooks().plugin_will_load.add(move |info: &PluginInfo| {
                order.lock().unwrap().push(format!("will_load {}", info.name));
            });
        }
        {
            let order = Arc::clone(&order);
            runtime.hooks().plugin_loaded.add(move |info: &PluginInfo| {
                order.lock().unwrap().push(format!("loaded {}", info.name));
            });
        }
        {
            let order = Arc::clone(&order);
            runtime
                .hooks()
                .engine_will_terminate
                .add(move |_: &Arc<Engine>| {
                    order.lock().unwrap().push("engine_will_terminate".to_string());
                });
        }

        runtime
            .register_plugin(Box::new(RecordingPlugin {
                seen: Arc::new(Mutex::new(Vec::new())),
            }))
            .await
            .unwrap();

        let (tx, rx) = mpsc::channel::<Arc<dyn Event>>(1);
        drop(tx);
        runtime.run_until(rx, std::future::pending()).await.unwrap();

        assert_eq!(
            *order.lock().unwrap(),
            vec![
                "engine_created".to_string(),
                "will_load recording".to_string(),
                "loaded recording".to_string(),
                "engine_will_terminate".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_builder_merges_config() {
        let mut overrides = RuntimeConfig::default();
        overrides.bot.superusers = vec![42];
        overrides.bot.command_prefixes = vec!["!".to_string()];

        let runtime = BrazeRuntime::builder()
            .without_env()
            .merge(overrides)
            .build()
            .unwrap();

        let config = runtime.engine().config();
        assert_eq!(config.superusers, vec![42]);
        assert_eq!(config.command_prefixes, vec!["!".to_string()]);
    }
}
