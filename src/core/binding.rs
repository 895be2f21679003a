//! Data binding: keeps one widget's data in sync with its data source
//!
//! A [`DataBinding`] owns the adapter for the source it is bound to, fetches
//! on start and on every refresh interval, retries failed fetches and reports
//! `{data, is_loading, error}` through a watch channel.
//!
//! Every bind bumps a generation counter. Fetches run as their own tasks and
//! carry the generation and a sequence number; a result is applied only if
//! its generation is still current and nothing newer has been applied.

use chrono::{DateTime, Utc};
use log::{debug, trace, warn};
use multidash_core::{AdapterProvider, ApiError, DataSourceAdapter, DataSourceError, RenderInput};
use multidash_types::DataSource;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Upper bound for the exponential retry delay
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingOptions {
    /// Rebinding the same source within this window does not refetch
    pub stale_time: Duration,
    /// Retries after a failed fetch
    pub retry: u32,
    /// Delay before the first retry; doubles on each further attempt
    pub retry_delay: Duration,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            retry: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Observable state of a binding
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingState {
    /// Last good data; kept when a later fetch fails
    pub data: Option<Value>,
    pub is_loading: bool,
    pub error: Option<ApiError>,
    pub last_updated: Option<DateTime<Utc>>,
    /// False when the widget has no data source
    pub has_source: bool,
}

impl BindingState {
    pub fn render_input(&self) -> RenderInput<'_> {
        RenderInput {
            data: self.data.as_ref(),
            is_loading: self.is_loading,
            error: self.error.as_ref(),
        }
    }
}

struct Inner {
    source: Option<DataSource>,
    adapter: Option<Arc<dyn DataSourceAdapter>>,
    generation: u64,
    next_seq: u64,
    applied_seq: u64,
    in_flight: usize,
    fetched_at: Option<Instant>,
    driver: Option<JoinHandle<()>>,
    running: bool,
}

struct Shared {
    provider: Arc<dyn AdapterProvider>,
    options: BindingOptions,
    inner: Mutex<Inner>,
    state: watch::Sender<BindingState>,
}

pub struct DataBinding {
    shared: Arc<Shared>,
}

impl DataBinding {
    pub fn new(provider: Arc<dyn AdapterProvider>, options: BindingOptions) -> Self {
        let (state, _) = watch::channel(BindingState::default());
        Self {
            shared: Arc::new(Shared {
                provider,
                options,
                inner: Mutex::new(Inner {
                    source: None,
                    adapter: None,
                    generation: 0,
                    next_seq: 0,
                    applied_seq: 0,
                    in_flight: 0,
                    fetched_at: None,
                    driver: None,
                    running: false,
                }),
                state,
            }),
        }
    }

    /// Bind to a data source, or to nothing.
    ///
    /// A different source (config or transform) drops the cached data and
    /// replaces the adapter. The same source refetches only once the cached
    /// result is older than the stale time.
    pub fn bind(&self, source: Option<DataSource>) {
        let Some(mut inner) = self.shared.lock() else {
            return;
        };

        if inner.source == source {
            if inner.running && inner.source.is_some() && inner.adapter.is_none() {
                self.shared.teardown(&mut inner);
                Shared::activate(&self.shared, &mut inner);
            } else if inner.running && inner.source.is_some() && !self.shared.is_fresh(&inner) {
                let generation = inner.generation;
                self.shared.spawn_fetch(&mut inner, generation);
            }
            return;
        }

        self.shared.teardown(&mut inner);
        inner.source = source;
        let has_source = inner.source.is_some();
        debug!(
            "Bound to {} (generation {})",
            inner
                .source
                .as_ref()
                .map(|s| s.config.source_type().as_str())
                .unwrap_or("no source"),
            inner.generation
        );
        self.shared.state.send_replace(BindingState {
            has_source,
            ..Default::default()
        });

        if inner.running {
            Shared::activate(&self.shared, &mut inner);
        }
    }

    /// Start fetching. Must be called within a tokio runtime.
    pub fn start(&self) {
        let Some(mut inner) = self.shared.lock() else {
            return;
        };
        if inner.running {
            return;
        }
        inner.running = true;
        Shared::activate(&self.shared, &mut inner);
    }

    /// Stop all fetching and release the adapter. Cached data is kept.
    pub fn stop(&self) {
        let Some(mut inner) = self.shared.lock() else {
            return;
        };
        if !inner.running {
            return;
        }
        inner.running = false;
        self.shared.teardown(&mut inner);
        self.shared.state.send_modify(|s| s.is_loading = false);
    }

    /// Force a fetch now, first retrying adapter creation if it failed.
    /// False if the binding is stopped, has no source or still has no adapter.
    pub fn refresh(&self) -> bool {
        let Some(mut inner) = self.shared.lock() else {
            return false;
        };
        if !inner.running || inner.source.is_none() {
            return false;
        }
        if inner.adapter.is_none() {
            self.shared.teardown(&mut inner);
            Shared::activate(&self.shared, &mut inner);
            return inner.adapter.is_some();
        }
        let generation = inner.generation;
        self.shared.spawn_fetch(&mut inner, generation);
        true
    }

    pub fn state(&self) -> BindingState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BindingState> {
        self.shared.state.subscribe()
    }

    pub fn source(&self) -> Option<DataSource> {
        self.shared.lock().and_then(|inner| inner.source.clone())
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().map(|inner| inner.running).unwrap_or(false)
    }
}

impl Drop for DataBinding {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn lock(&self) -> Option<MutexGuard<'_, Inner>> {
        match self.inner.lock() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!("Binding lock poisoned: {}", e);
                None
            }
        }
    }

    fn is_fresh(&self, inner: &Inner) -> bool {
        inner.in_flight > 0
            || inner
                .fetched_at
                .map(|at| at.elapsed() < self.options.stale_time)
                .unwrap_or(false)
    }

    /// Invalidate the current generation and release its adapter
    fn teardown(&self, inner: &mut Inner) {
        inner.generation += 1;
        inner.in_flight = 0;
        inner.fetched_at = None;
        if let Some(driver) = inner.driver.take() {
            driver.abort();
        }
        if let Some(adapter) = inner.adapter.take() {
            adapter.cancel();
            adapter.cleanup();
        }
    }

    /// Create the adapter for the bound source and start the fetch driver
    fn activate(this: &Arc<Self>, inner: &mut Inner) {
        let Some(source) = inner.source.as_ref() else {
            return;
        };
        let interval = source
            .config
            .refresh_interval_ms()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        match this.provider.adapter_for(source) {
            Ok(adapter) => {
                inner.adapter = Some(Arc::from(adapter));
            }
            Err(e) => {
                warn!("Failed to create {} adapter: {}", source.config.source_type(), e);
                this.state.send_modify(|s| {
                    s.is_loading = false;
                    s.error = Some(ApiError::from(&e));
                });
                return;
            }
        }

        let generation = inner.generation;
        let shared = this.clone();
        inner.driver = Some(tokio::spawn(async move {
            shared.tick(generation);
            let Some(interval) = interval else {
                return;
            };
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                shared.tick(generation);
            }
        }));
    }

    fn tick(self: &Arc<Self>, generation: u64) {
        if let Some(mut inner) = self.lock() {
            self.spawn_fetch(&mut inner, generation);
        }
    }

    fn spawn_fetch(self: &Arc<Self>, inner: &mut Inner, generation: u64) {
        if inner.generation != generation {
            return;
        }
        let Some(adapter) = inner.adapter.clone() else {
            return;
        };
        inner.next_seq += 1;
        inner.in_flight += 1;
        let seq = inner.next_seq;
        self.state.send_modify(|s| s.is_loading = true);

        let shared = self.clone();
        tokio::spawn(async move {
            let result = fetch_with_retry(adapter.as_ref(), &shared.options).await;
            shared.complete(generation, seq, result);
        });
    }

    fn complete(&self, generation: u64, seq: u64, result: Result<Value, DataSourceError>) {
        let Some(mut inner) = self.lock() else {
            return;
        };
        if inner.generation != generation {
            trace!("Discarding result of superseded generation {}", generation);
            return;
        }
        inner.in_flight = inner.in_flight.saturating_sub(1);
        let is_loading = inner.in_flight > 0;

        if seq < inner.applied_seq {
            trace!("Discarding out-of-order fetch {} (applied {})", seq, inner.applied_seq);
            self.state.send_modify(|s| s.is_loading = is_loading);
            return;
        }
        inner.applied_seq = seq;

        match result {
            Ok(data) => {
                inner.fetched_at = Some(Instant::now());
                self.state.send_modify(|s| {
                    s.data = Some(data);
                    s.error = None;
                    s.is_loading = is_loading;
                    s.last_updated = Some(Utc::now());
                });
            }
            Err(e) => {
                debug!("Fetch failed: {}", e);
                self.state.send_modify(|s| {
                    s.error = Some(ApiError::from(&e));
                    s.is_loading = is_loading;
                });
            }
        }
    }
}

async fn fetch_with_retry(
    adapter: &dyn DataSourceAdapter,
    options: &BindingOptions,
) -> Result<Value, DataSourceError> {
    let mut attempt = 0u32;
    loop {
        match adapter.fetch().await {
            Ok(data) => return Ok(data),
            Err(e) if attempt < options.retry && e.is_transient() => {
                let delay = options
                    .retry_delay
                    .saturating_mul(2u32.saturating_pow(attempt))
                    .min(MAX_RETRY_DELAY);
                debug!("Fetch attempt {} failed ({}), retrying in {:?}", attempt + 1, e, delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use multidash_core::BoxedAdapter;
    use multidash_types::{DataSourceConfig, DataSourceType, StaticSourceConfig, Transformer};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Adapter driven by its static payload: `{"value", "delay", "fail"}`
    struct ScriptedAdapter {
        script: Value,
        fetches: Arc<AtomicUsize>,
        cleanups: Arc<AtomicUsize>,
        failed: AtomicUsize,
    }

    #[async_trait]
    impl DataSourceAdapter for ScriptedAdapter {
        fn source_type(&self) -> DataSourceType {
            DataSourceType::Static
        }

        async fn fetch(&self) -> Result<Value, DataSourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let delay = self.script["delay"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let fail = self.script["fail"].as_u64().unwrap_or(0) as usize;
            if self.failed.load(Ordering::SeqCst) < fail {
                self.failed.fetch_add(1, Ordering::SeqCst);
                return Err(DataSourceError::fetch("HTTP 503: Service Unavailable"));
            }
            Ok(self.script["value"].clone())
        }

        fn cleanup(&self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct ScriptedProvider {
        fetches: Arc<AtomicUsize>,
        cleanups: Arc<AtomicUsize>,
        /// Adapter creations left to refuse
        unavailable: AtomicUsize,
    }

    impl AdapterProvider for ScriptedProvider {
        fn adapter_for(&self, source: &DataSource) -> Result<BoxedAdapter, DataSourceError> {
            if self
                .unavailable
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(DataSourceError::fetch("backend unavailable"));
            }
            let DataSourceConfig::Static(config) = &source.config else {
                return Err(DataSourceError::UnsupportedSourceType(
                    source.config.source_type().to_string(),
                ));
            };
            Ok(Box::new(ScriptedAdapter {
                script: config.data.clone().unwrap_or(Value::Null),
                fetches: self.fetches.clone(),
                cleanups: self.cleanups.clone(),
                failed: AtomicUsize::new(0),
            }))
        }
    }

    fn scripted(script: Value) -> DataSource {
        DataSource::new(DataSourceConfig::Static(StaticSourceConfig::new(script)))
    }

    fn binding(provider: Arc<ScriptedProvider>, options: BindingOptions) -> DataBinding {
        DataBinding::new(provider, options)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_on_start() {
        let provider = Arc::new(ScriptedProvider::default());
        let binding = binding(provider.clone(), BindingOptions::default());
        binding.bind(Some(scripted(json!({"value": {"value": 42}}))));
        assert!(binding.state().has_source);
        assert!(binding.state().data.is_none());

        binding.start();
        assert!(binding.state().is_loading);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let state = binding.state();
        assert_eq!(state.data, Some(json!({"value": 42})));
        assert!(!state.is_loading);
        assert!(state.error.is_none());
        assert!(state.last_updated.is_some());
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_source() {
        let provider = Arc::new(ScriptedProvider::default());
        let binding = binding(provider.clone(), BindingOptions::default());
        binding.start();
        binding.bind(None);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let state = binding.state();
        assert!(!state.has_source);
        assert!(!state.is_loading);
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 0);
        assert!(!binding.refresh());
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_result_is_discarded() {
        let provider = Arc::new(ScriptedProvider::default());
        let binding = binding(provider.clone(), BindingOptions::default());
        binding.start();

        binding.bind(Some(scripted(json!({"value": "x", "delay": 500}))));
        tokio::time::sleep(Duration::from_millis(100)).await;
        binding.bind(Some(scripted(json!({"value": "y", "delay": 10}))));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(binding.state().data, Some(json!("y")));
        // The first adapter was released on rebind
        assert_eq!(provider.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_backoff() {
        let provider = Arc::new(ScriptedProvider::default());
        let binding = binding(provider.clone(), BindingOptions::default());
        binding.bind(Some(scripted(json!({"value": 1, "fail": 2}))));
        binding.start();

        // Retries after 1s and then 2s
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(binding.state().data.is_none());
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(binding.state().data, Some(json!(1)));
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_transform_rebinds() {
        let provider = Arc::new(ScriptedProvider::default());
        let binding = binding(provider.clone(), BindingOptions::default());
        let plain = scripted(json!({"value": 5}));
        binding.bind(Some(plain.clone()));
        binding.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(binding.state().data, Some(json!(5)));

        // Same config with a transform is a different source
        let shaped = plain.with_transformer(Transformer::new(Ok));
        binding.bind(Some(shaped));
        assert!(binding.state().data.is_none());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(provider.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reports_error() {
        let provider = Arc::new(ScriptedProvider::default());
        let options = BindingOptions {
            retry: 0,
            ..Default::default()
        };
        let binding = DataBinding::new(provider.clone(), options);
        binding.bind(Some(scripted(json!({"value": 9, "fail": 1}))));
        binding.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let state = binding.state();
        assert!(state.data.is_none());
        assert!(!state.is_loading);
        let error = state.error.unwrap();
        assert_eq!(error.message, "HTTP 503: Service Unavailable");
        assert_eq!(error.code.as_deref(), Some("FETCH_ERROR"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_failure_keeps_data() {
        let provider = Arc::new(ScriptedProvider::default());
        let options = BindingOptions {
            retry: 0,
            ..Default::default()
        };
        let binding = DataBinding::new(provider.clone(), options);
        binding.bind(Some(scripted(json!({"value": 3}))));
        binding.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(binding.state().data, Some(json!(3)));

        // Next fetch from the same generation fails
        {
            let mut inner = binding.shared.inner.lock().unwrap();
            inner.adapter = Some(Arc::new(ScriptedAdapter {
                script: json!({"value": 4, "fail": 1}),
                fetches: provider.fetches.clone(),
                cleanups: provider.cleanups.clone(),
                failed: AtomicUsize::new(0),
            }));
        }
        assert!(binding.refresh());
        tokio::time::sleep(Duration::from_millis(10)).await;

        let state = binding.state();
        assert_eq!(state.data, Some(json!(3)));
        assert!(state.error.is_some());
        assert!(!state.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_source_within_stale_time() {
        let provider = Arc::new(ScriptedProvider::default());
        let binding = binding(provider.clone(), BindingOptions::default());
        let source = scripted(json!({"value": 1}));
        binding.bind(Some(source.clone()));
        binding.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        binding.bind(Some(source.clone()));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(25)).await;
        binding.bind(Some(source));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_interval() {
        let provider = Arc::new(ScriptedProvider::default());
        let binding = binding(provider.clone(), BindingOptions::default());
        let config = DataSourceConfig::Static(StaticSourceConfig::new(json!({"value": 1})))
            .with_refresh_interval(Some(1000));
        binding.bind(Some(DataSource::new(config)));
        binding.start();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 4);

        binding.stop();
        assert_eq!(provider.cleanups.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 4);
        assert_eq!(binding.state().data, Some(json!(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_adapter_creation_error() {
        let provider = Arc::new(ScriptedProvider::default());
        let binding = binding(provider, BindingOptions::default());
        binding.bind(Some(DataSource::new(DataSourceConfig::Rest(
            multidash_types::RestSourceConfig::new("/api"),
        ))));
        binding.start();

        let state = binding.state();
        assert!(!state.is_loading);
        assert_eq!(
            state.error.and_then(|e| e.code),
            Some("UNSUPPORTED_SOURCE".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_adapter_creation_retried() {
        let provider = Arc::new(ScriptedProvider {
            unavailable: AtomicUsize::new(2),
            ..Default::default()
        });
        let binding = binding(provider.clone(), BindingOptions::default());
        let source = scripted(json!({"value": 5}));
        binding.bind(Some(source.clone()));
        binding.start();
        assert_eq!(binding.state().error.unwrap().message, "backend unavailable");

        // Same source again retries creation; this one still fails
        binding.bind(Some(source));
        assert!(binding.state().error.is_some());

        assert!(binding.refresh());
        tokio::time::sleep(Duration::from_millis(10)).await;
        let state = binding.state();
        assert_eq!(state.data, Some(json!(5)));
        assert!(state.error.is_none());
        assert_eq!(provider.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_releases_adapter() {
        let provider = Arc::new(ScriptedProvider::default());
        {
            let binding = binding(provider.clone(), BindingOptions::default());
            binding.bind(Some(scripted(json!({"value": 1}))));
            binding.start();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(provider.cleanups.load(Ordering::SeqCst), 1);
    }
}
