//! Event intake and lifecycle.
//!
//! [`WardenRuntime`] owns an [`EventListenerManager`] and feeds it events
//! from any number of producers. Each submitted event gets its own task that
//! dispatches it and drains the lazy result stream. A semaphore bounds how
//! many events are in flight at once, and one shutdown token is shared (as
//! child tokens) by every dispatch, so shutting down cancels in-flight
//! listeners cooperatively.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use warden_runtime::WardenRuntime;
//!
//! // Auto-loads warden.toml from the current directory
//! let runtime = WardenRuntime::new();
//! runtime.register_listener(ban_listener);
//!
//! let handle = runtime.submit(event);
//! let summary = handle.await?;
//!
//! runtime.run().await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::RwLock;
use tokio::signal;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};
use warden_core::{
    BoxedEvent, DispatchError, DispatchResult, EventResult, ListenerError, ListenerResult,
};
use warden_framework::{
    EventListenerManager, EventResults, Listener, ListenerInterceptor, ProcessingInterceptor,
};

use crate::config::{ConfigLoader, ConfigResult, WardenConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

// =============================================================================
// DispatchSummary
// =============================================================================

/// How a submitted event's dispatch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every listener in line was walked, or propagation was stopped.
    Completed,
    /// The runtime shut down before or during the dispatch.
    Cancelled,
    /// A processing interceptor aborted the dispatch.
    Failed(String),
}

/// Per-kind counts of the results one event produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    pub event_name: &'static str,
    pub outcome: DispatchOutcome,
    pub values: usize,
    pub empty: usize,
    pub invalid: usize,
    pub errors: usize,
}

impl DispatchSummary {
    fn new(event_name: &'static str) -> Self {
        Self {
            event_name,
            outcome: DispatchOutcome::Completed,
            values: 0,
            empty: 0,
            invalid: 0,
            errors: 0,
        }
    }

    /// Total number of listener results.
    pub fn results(&self) -> usize {
        self.values + self.empty + self.invalid + self.errors
    }

    fn record(&mut self, result: &EventResult) {
        match result {
            EventResult::Value(_) => self.values += 1,
            EventResult::Empty => self.empty += 1,
            EventResult::Invalid => self.invalid += 1,
            EventResult::Error(err) => {
                self.errors += 1;
                if matches!(err, ListenerError::Cancelled) {
                    self.outcome = DispatchOutcome::Cancelled;
                }
            }
        }
    }
}

// =============================================================================
// WardenRuntime
// =============================================================================

/// The Warden runtime: listener registry, bounded event intake and shutdown.
///
/// Register listeners and interceptors before submitting events. Each
/// dispatch works on a snapshot of the registrations taken when its event
/// was submitted.
pub struct WardenRuntime {
    config: WardenConfig,
    manager: RwLock<EventListenerManager>,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl WardenRuntime {
    /// Creates a new runtime with automatic configuration loading.
    ///
    /// Searches for `warden.toml` in the current directory, then applies
    /// `WARDEN_*` environment variables. If loading fails, default settings
    /// are used.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                WardenConfig::default()
            });

        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a new runtime from configuration and initializes logging.
    pub fn from_config(config: &WardenConfig) -> Self {
        logging::init_from_config(&config.logging);

        let permits = config
            .dispatch
            .max_concurrent_events
            .clamp(1, Semaphore::MAX_PERMITS);

        info!(
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            max_concurrent_events = permits,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            manager: RwLock::new(EventListenerManager::new()),
            permits: Arc::new(Semaphore::new(permits)),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    pub fn register_listener(&self, listener: Listener) {
        self.manager.write().register_listener(listener);
    }

    /// Registers multiple listeners at once.
    pub fn register_listeners(&self, listeners: impl IntoIterator<Item = Listener>) {
        let mut manager = self.manager.write();
        for listener in listeners {
            manager.register_listener(listener);
        }
    }

    pub fn add_processing_interceptor(
        &self,
        interceptor: impl ProcessingInterceptor + 'static,
        priority: i32,
    ) {
        self.manager
            .write()
            .add_processing_interceptor(interceptor, priority);
    }

    pub fn add_listener_interceptor(
        &self,
        interceptor: impl ListenerInterceptor + 'static,
        priority: i32,
    ) {
        self.manager
            .write()
            .add_listener_interceptor(interceptor, priority);
    }

    pub fn listener_count(&self) -> usize {
        self.manager.read().listener_count()
    }

    /// Returns a snapshot of the current registrations.
    pub fn manager(&self) -> EventListenerManager {
        self.manager.read().clone()
    }

    // =========================================================================
    // Event intake
    // =========================================================================

    /// Dispatches an event directly and hands the lazy results to the caller.
    ///
    /// Not bounded by `max_concurrent_events`, but still cancelled by
    /// [`shutdown`](Self::shutdown).
    pub async fn dispatch(&self, event: BoxedEvent) -> DispatchResult<EventResults> {
        let manager = self.manager();
        manager
            .dispatch_with_cancel(event, self.shutdown.child_token())
            .await
    }

    /// Submits an event for background dispatch.
    ///
    /// The event waits for a free slot, then its results are drained and
    /// summarized. Listener errors are logged. Must be called from within a
    /// tokio runtime.
    pub fn submit(&self, event: BoxedEvent) -> JoinHandle<DispatchSummary> {
        let manager = self.manager();
        let permits = Arc::clone(&self.permits);
        let cancel = self.shutdown.child_token();
        let log_results = self.config.dispatch.log_results;

        self.tasks
            .spawn(drain(manager, event, permits, cancel, log_results))
    }

    /// Number of submitted events not yet fully drained.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Cancels every in-flight dispatch and waits for their tasks to finish.
    ///
    /// Events submitted afterwards finish immediately as cancelled.
    pub async fn shutdown(&self) {
        info!(in_flight = self.tasks.len(), "Stopping Warden runtime");
        self.shutdown.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        info!("Runtime stopped");
    }

    /// Runs until Ctrl+C, SIGTERM or [`shutdown`](Self::shutdown), then shuts down.
    pub async fn run(&self) -> RuntimeResult<()> {
        info!(
            listeners = self.listener_count(),
            "Warden runtime is now running. Press Ctrl+C to stop."
        );

        let signal = tokio::select! {
            result = wait_for_signal() => result,
            _ = self.shutdown.cancelled() => Ok(()),
        };

        self.shutdown().await;
        signal
    }

    /// Runs until `shutdown` completes, then shuts down.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = shutdown => {}
            _ = self.shutdown.cancelled() => {}
        }
        self.shutdown().await;
    }
}

impl Default for WardenRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WardenRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WardenRuntime")
            .field("manager", &*self.manager.read())
            .field("available_permits", &self.permits.available_permits())
            .field("in_flight", &self.tasks.len())
            .field("shutting_down", &self.shutdown.is_cancelled())
            .finish()
    }
}

/// Dispatches one event and drains its results.
async fn drain(
    manager: EventListenerManager,
    event: BoxedEvent,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    log_results: bool,
) -> DispatchSummary {
    let mut summary = DispatchSummary::new(event.event_name());

    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        permit = permits.acquire_owned() => permit.ok(),
    };
    let Some(_permit) = permit else {
        summary.outcome = DispatchOutcome::Cancelled;
        return summary;
    };

    let mut results = match manager.dispatch_with_cancel(event, cancel.clone()).await {
        Ok(results) => results,
        Err(DispatchError::Cancelled) => {
            summary.outcome = DispatchOutcome::Cancelled;
            return summary;
        }
        Err(err) => {
            error!(event = summary.event_name, error = %err, "Dispatch aborted");
            summary.outcome = DispatchOutcome::Failed(err.to_string());
            return summary;
        }
    };

    while let Some(item) = results.next().await {
        log_result(summary.event_name, &item, log_results);
        summary.record(&item.result);
    }
    // The walk ends silently when cancelled between listeners or mid-filter.
    if cancel.is_cancelled() {
        summary.outcome = DispatchOutcome::Cancelled;
    }

    debug!(
        event = summary.event_name,
        results = summary.results(),
        errors = summary.errors,
        outcome = ?summary.outcome,
        "Event drained"
    );
    summary
}

fn log_result(event: &'static str, item: &ListenerResult, verbose: bool) {
    match &item.result {
        EventResult::Error(ListenerError::Cancelled) => {
            debug!(event, listener = item.listener_id(), "Listener cancelled");
        }
        EventResult::Error(err) => {
            error!(event, listener = item.listener_id(), error = %err, "Listener failed");
        }
        result if verbose => {
            debug!(event, listener = item.listener_id(), kind = ?result.kind(), "Listener result");
        }
        _ => {}
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_signal() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(RuntimeError::Signal)?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.map_err(RuntimeError::Signal)?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map_err(RuntimeError::Signal)?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a `WardenRuntime` with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = WardenRuntime::builder()
///     .config_file("config/warden.toml")
///     .profile("production")
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: WardenConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    pub fn build(self) -> ConfigResult<WardenRuntime> {
        let config = self.config_loader.load()?;
        Ok(WardenRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
