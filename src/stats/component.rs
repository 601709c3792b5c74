//! Component wiring: the view-manager seam, the in-memory and no-op
//! variants, and the process-wide [`Stats`] handle.
//!
//! Implementation selection is explicit constructor injection. A process
//! constructs one `Stats` handle at startup — [`Stats::in_memory`] when it
//! wants real collection, [`Stats::noop`] (the default) when it does not —
//! and passes clones to producers and exporters.

use crate::core::{Config, Result, SightlineError};
use crate::stats::recorder::{
    MeasurementBatch, NoopStatsRecorder, RegistryRecorder, StatsRecorder,
};
use crate::stats::registry::ViewRegistry;
use crate::stats::state::{CollectionState, CurrentState};
use crate::stats::view::{
    AggregationWindow, View, ViewData, ViewName, WindowData,
};
use crate::tags::TagContext;
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

/// The abstract registry surface exporters and producers are written
/// against.
pub trait ViewManager: Send + Sync {
    /// Registers a view for collection.
    fn register_view(&self, view: View) -> Result<()>;

    /// Returns a snapshot for a registered view, `None` when unregistered.
    fn view_data(&self, name: &ViewName) -> Result<Option<ViewData>>;

    /// Returns the registered views served by the general export path.
    fn exported_views(&self) -> Arc<HashSet<View>>;
}

impl ViewManager for ViewRegistry {
    fn register_view(&self, view: View) -> Result<()> {
        self.register(view)
    }

    fn view_data(&self, name: &ViewName) -> Result<Option<ViewData>> {
        ViewRegistry::view_data(self, name)
    }

    fn exported_views(&self) -> Arc<HashSet<View>> {
        ViewRegistry::exported_views(self)
    }
}

/// View manager that keeps the view map but never aggregates: snapshots are
/// always empty with epoch window bounds. Registration rules (idempotency,
/// name uniqueness) are enforced identically to the real registry so code
/// developed against the no-op fails the same way.
#[derive(Default)]
pub struct NoopViewManager {
    views: Mutex<HashMap<ViewName, View>>,
    exported: ArcSwapOption<HashSet<View>>,
}

impl NoopViewManager {
    /// Creates an empty no-op view manager.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ViewManager for NoopViewManager {
    fn register_view(&self, view: View) -> Result<()> {
        let mut views = self.views.lock();
        self.exported.store(None);
        match views.get(view.name()) {
            Some(existing) if *existing == view => Ok(()),
            Some(_) => Err(SightlineError::ViewAlreadyExists(view.name().to_string())),
            None => {
                views.insert(view.name().clone(), view);
                Ok(())
            }
        }
    }

    fn view_data(&self, name: &ViewName) -> Result<Option<ViewData>> {
        let views = self.views.lock();
        let view = match views.get(name) {
            Some(view) => view.clone(),
            None => return Ok(None),
        };
        let window = match view.window() {
            AggregationWindow::Cumulative => WindowData::Cumulative {
                start: UNIX_EPOCH,
                end: UNIX_EPOCH,
            },
            AggregationWindow::Interval(duration) => WindowData::Interval {
                end: UNIX_EPOCH,
                duration: *duration,
            },
        };
        ViewData::new(view, window, HashMap::new()).map(Some)
    }

    fn exported_views(&self) -> Arc<HashSet<View>> {
        if let Some(cached) = self.exported.load_full() {
            return cached;
        }
        let views = self.views.lock();
        if let Some(cached) = self.exported.load_full() {
            return cached;
        }
        let set: HashSet<View> = views
            .values()
            .filter(|view| matches!(view.window(), AggregationWindow::Cumulative))
            .cloned()
            .collect();
        let set = Arc::new(set);
        self.exported.store(Some(Arc::clone(&set)));
        set
    }
}

/// One concrete stats implementation: view manager, recorder and the
/// collection-state gate.
pub trait StatsComponent: Send + Sync {
    /// Returns the view manager of this component.
    fn view_manager(&self) -> &dyn ViewManager;

    /// Returns the measurement recorder of this component.
    fn recorder(&self) -> &dyn StatsRecorder;

    /// Returns the collection state, marking it as read.
    fn state(&self) -> CollectionState;

    /// Sets the collection state.
    ///
    /// Fails once [`StatsComponent::state`] has been called. A real
    /// transition to Disabled clears all accumulated view data; a
    /// transition back to Enabled restarts aggregation windows.
    fn set_state(&self, state: CollectionState) -> Result<()>;

    /// Clears accumulated data ahead of process shutdown.
    fn shutdown(&self);
}

/// Full in-memory implementation.
pub struct InMemoryStats {
    registry: Arc<ViewRegistry>,
    recorder: RegistryRecorder,
    state: Arc<CurrentState>,
}

impl InMemoryStats {
    /// Creates a component collecting into an in-memory registry. Initial
    /// collection state is Enabled.
    pub fn new(config: &Config) -> Self {
        let state = Arc::new(CurrentState::new(CollectionState::Enabled));
        let registry = Arc::new(ViewRegistry::new(&config.registry, Arc::clone(&state)));
        let recorder = RegistryRecorder::new(Arc::clone(&registry));
        InMemoryStats {
            registry,
            recorder,
            state,
        }
    }
}

impl StatsComponent for InMemoryStats {
    fn view_manager(&self) -> &dyn ViewManager {
        self.registry.as_ref()
    }

    fn recorder(&self) -> &dyn StatsRecorder {
        &self.recorder
    }

    fn state(&self) -> CollectionState {
        self.state.get()
    }

    fn set_state(&self, state: CollectionState) -> Result<()> {
        let changed = self.state.set(state)?;
        if changed {
            match state {
                CollectionState::Disabled => {
                    tracing::info!("stats collection disabled, clearing view data");
                    self.registry.clear();
                }
                CollectionState::Enabled => {
                    tracing::info!("stats collection enabled");
                    self.registry.resume();
                }
            }
        }
        Ok(())
    }

    fn shutdown(&self) {
        tracing::info!("stats component shutting down, clearing view data");
        self.registry.clear();
    }
}

/// No-op implementation used when no real backend is linked in. Collection
/// state is always Disabled.
pub struct NoopStats {
    views: NoopViewManager,
    recorder: NoopStatsRecorder,
    state: CurrentState,
}

impl NoopStats {
    /// Creates a no-op component.
    pub fn new() -> Self {
        NoopStats {
            views: NoopViewManager::new(),
            recorder: NoopStatsRecorder,
            state: CurrentState::new(CollectionState::Disabled),
        }
    }
}

impl Default for NoopStats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsComponent for NoopStats {
    fn view_manager(&self) -> &dyn ViewManager {
        &self.views
    }

    fn recorder(&self) -> &dyn StatsRecorder {
        &self.recorder
    }

    fn state(&self) -> CollectionState {
        self.state.get()
    }

    fn set_state(&self, _state: CollectionState) -> Result<()> {
        // The gate still applies, but the state never leaves Disabled.
        self.state.set(CollectionState::Disabled)?;
        Ok(())
    }

    fn shutdown(&self) {}
}

/// The process-wide stats handle.
///
/// Cheap to clone; all clones share the same component. Construct once at
/// startup and pass to producers and exporters explicitly.
#[derive(Clone)]
pub struct Stats {
    component: Arc<dyn StatsComponent>,
}

impl Stats {
    /// Wraps an explicitly constructed component.
    pub fn new(component: Arc<dyn StatsComponent>) -> Self {
        Stats { component }
    }

    /// Creates a handle backed by the full in-memory implementation.
    pub fn in_memory(config: &Config) -> Self {
        Self::new(Arc::new(InMemoryStats::new(config)))
    }

    /// Creates a handle backed by the no-op implementation.
    pub fn noop() -> Self {
        Self::new(Arc::new(NoopStats::new()))
    }

    /// Returns the view manager surface.
    pub fn view_manager(&self) -> &dyn ViewManager {
        self.component.view_manager()
    }

    /// Returns the recording surface.
    pub fn recorder(&self) -> &dyn StatsRecorder {
        self.component.recorder()
    }

    /// Registers a view for collection.
    pub fn register_view(&self, view: View) -> Result<()> {
        self.component.view_manager().register_view(view)
    }

    /// Returns a snapshot for a registered view.
    pub fn view_data(&self, name: &ViewName) -> Result<Option<ViewData>> {
        self.component.view_manager().view_data(name)
    }

    /// Returns the views served by the general export path.
    pub fn exported_views(&self) -> Arc<HashSet<View>> {
        self.component.view_manager().exported_views()
    }

    /// Records a batch of measurements against a tag context.
    pub fn record(&self, context: &TagContext, batch: MeasurementBatch) -> Result<()> {
        self.component.recorder().record(context, batch)
    }

    /// Returns the collection state, marking it as read.
    pub fn state(&self) -> CollectionState {
        self.component.state()
    }

    /// Sets the collection state; fails after the state has been read.
    pub fn set_state(&self, state: CollectionState) -> Result<()> {
        self.component.set_state(state)
    }

    /// Clears accumulated data ahead of process shutdown.
    pub fn shutdown(&self) {
        self.component.shutdown()
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::stats::aggregation::Aggregation;
    use crate::stats::measure::Measure;
    use std::time::Duration;

    fn latency() -> Measure {
        Measure::f64("rpc/latency", "request latency", "ms").unwrap()
    }

    fn sum_view(name: &str, window: AggregationWindow) -> View {
        View::new(
            ViewName::new(name).unwrap(),
            "sum",
            latency(),
            Aggregation::Sum,
            vec![],
            window,
        )
        .unwrap()
    }

    #[test]
    fn test_noop_view_data_is_empty_with_epoch_window() {
        let stats = Stats::noop();
        stats
            .register_view(sum_view("v", AggregationWindow::Cumulative))
            .unwrap();

        let batch = MeasurementBatch::new().put_f64(&latency(), 5.0);
        stats.record(&TagContext::empty(), batch).unwrap();

        let data = stats
            .view_data(&ViewName::new("v").unwrap())
            .unwrap()
            .unwrap();
        assert!(data.rows().is_empty());
        assert_eq!(
            data.window(),
            &WindowData::Cumulative {
                start: UNIX_EPOCH,
                end: UNIX_EPOCH,
            }
        );
    }

    #[test]
    fn test_noop_enforces_name_uniqueness() {
        let stats = Stats::noop();
        stats
            .register_view(sum_view("v", AggregationWindow::Cumulative))
            .unwrap();
        stats
            .register_view(sum_view("v", AggregationWindow::Cumulative))
            .unwrap();

        let err = stats
            .register_view(sum_view(
                "v",
                AggregationWindow::Interval(Duration::from_secs(5)),
            ))
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_noop_exported_views_excludes_interval() {
        let stats = Stats::noop();
        stats
            .register_view(sum_view("a", AggregationWindow::Cumulative))
            .unwrap();
        stats
            .register_view(sum_view(
                "b",
                AggregationWindow::Interval(Duration::from_secs(5)),
            ))
            .unwrap();

        let exported = stats.exported_views();
        assert_eq!(exported.len(), 1);
    }

    #[test]
    fn test_noop_state_is_disabled_and_gated() {
        let stats = Stats::noop();
        assert_eq!(stats.state(), CollectionState::Disabled);

        let err = stats.set_state(CollectionState::Enabled).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    }

    #[test]
    fn test_in_memory_disable_clears_data() {
        let stats = Stats::in_memory(&Config::default());
        stats
            .register_view(sum_view("v", AggregationWindow::Cumulative))
            .unwrap();
        let batch = MeasurementBatch::new().put_f64(&latency(), 5.0);
        stats.record(&TagContext::empty(), batch).unwrap();

        stats.set_state(CollectionState::Disabled).unwrap();

        // View stays registered with an empty aggregation map.
        let data = stats
            .view_data(&ViewName::new("v").unwrap())
            .unwrap()
            .unwrap();
        assert!(data.rows().is_empty());

        // Recording while disabled is dropped.
        let batch = MeasurementBatch::new().put_f64(&latency(), 5.0);
        stats.record(&TagContext::empty(), batch).unwrap();
        let data = stats
            .view_data(&ViewName::new("v").unwrap())
            .unwrap()
            .unwrap();
        assert!(data.rows().is_empty());
    }

    #[test]
    fn test_in_memory_reenable_resumes() {
        let stats = Stats::in_memory(&Config::default());
        stats
            .register_view(sum_view("v", AggregationWindow::Cumulative))
            .unwrap();

        stats.set_state(CollectionState::Disabled).unwrap();
        stats.set_state(CollectionState::Enabled).unwrap();

        let batch = MeasurementBatch::new().put_f64(&latency(), 2.0);
        stats.record(&TagContext::empty(), batch).unwrap();

        let data = stats
            .view_data(&ViewName::new("v").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(data.rows().len(), 1);
    }

    #[test]
    fn test_in_memory_state_gate() {
        let stats = Stats::in_memory(&Config::default());
        assert_eq!(stats.state(), CollectionState::Enabled);

        let err = stats.set_state(CollectionState::Disabled).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
    }

    #[test]
    fn test_default_handle_is_noop() {
        let stats = Stats::default();
        assert_eq!(stats.state(), CollectionState::Disabled);
    }

    #[test]
    fn test_shutdown_clears_data() {
        let stats = Stats::in_memory(&Config::default());
        stats
            .register_view(sum_view("v", AggregationWindow::Cumulative))
            .unwrap();
        let batch = MeasurementBatch::new().put_f64(&latency(), 5.0);
        stats.record(&TagContext::empty(), batch).unwrap();

        stats.shutdown();

        let data = stats
            .view_data(&ViewName::new("v").unwrap())
            .unwrap()
            .unwrap();
        assert!(data.rows().is_empty());
    }
}
