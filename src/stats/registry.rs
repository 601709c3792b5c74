//! The view registry: registration, measurement fan-out and consistent
//! snapshots.
//!
//! Concurrency layout:
//! - per-view row maps behind a `parking_lot::Mutex`, so a reader observes
//!   a fully-applied fold or none
//! - registration and clearing serialized by one registration lock
//! - the exported-views set cached in an `ArcSwapOption`, invalidated on
//!   every registration and recomputed lazily under the registration lock

use crate::core::config::RegistryConfig;
use crate::core::{Result, SightlineError};
use crate::stats::data::AggregationData;
use crate::stats::measure::{Measure, MeasureValue};
use crate::stats::state::{CollectionState, CurrentState};
use crate::stats::view::{
    AggregationWindow, TagValues, View, ViewData, ViewName, WindowData,
};
use crate::tags::TagContext;
use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

/// How many dropped rows between repeated cardinality warnings.
const DROP_WARN_EVERY: u64 = 1_000;

#[derive(Debug)]
struct ViewEntry {
    view: View,
    /// Start of the current aggregation run; reset when collection resumes.
    start: Mutex<SystemTime>,
    rows: Mutex<HashMap<TagValues, AggregationData>>,
}

impl ViewEntry {
    fn new(view: View) -> Self {
        ViewEntry {
            view,
            start: Mutex::new(SystemTime::now()),
            rows: Mutex::new(HashMap::new()),
        }
    }
}

/// Owns the mapping from view name to view definition and live accumulator
/// state.
pub struct ViewRegistry {
    views: DashMap<ViewName, ViewEntry>,
    /// Serializes register/clear/resume against each other and against
    /// exported-cache rebuilds.
    registration: Mutex<()>,
    exported: ArcSwapOption<HashSet<View>>,
    state: Arc<CurrentState>,
    max_rows_per_view: usize,
    dropped_rows: AtomicU64,
}

impl ViewRegistry {
    /// Creates a registry sharing the given collection-state gate.
    pub fn new(config: &RegistryConfig, state: Arc<CurrentState>) -> Self {
        ViewRegistry {
            views: DashMap::new(),
            registration: Mutex::new(()),
            exported: ArcSwapOption::from(None),
            state,
            max_rows_per_view: config.max_rows_per_view,
            dropped_rows: AtomicU64::new(0),
        }
    }

    /// Registers a view.
    ///
    /// Re-registering an identical view is a no-op; registering a
    /// structurally different view under an existing name is rejected and
    /// leaves the original view and its data intact.
    pub fn register(&self, view: View) -> Result<()> {
        let _guard = self.registration.lock();
        self.exported.store(None);

        if let Some(existing) = self.views.get(view.name()) {
            if existing.view == view {
                return Ok(());
            }
            return Err(SightlineError::ViewAlreadyExists(view.name().to_string()));
        }

        tracing::debug!(view = %view.name(), aggregation = %view.aggregation(), "registering view");
        self.views.insert(view.name().clone(), ViewEntry::new(view));
        Ok(())
    }

    /// Returns a point-in-time snapshot for a registered view, or `None`
    /// when the name is unknown.
    ///
    /// The snapshot is a defensive copy; later folds never alter it.
    pub fn view_data(&self, name: &ViewName) -> Result<Option<ViewData>> {
        let entry = match self.views.get(name) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let rows = entry.rows.lock().clone();
        let start = *entry.start.lock();
        let end = SystemTime::now();
        let window = match entry.view.window() {
            AggregationWindow::Cumulative => WindowData::Cumulative { start, end },
            AggregationWindow::Interval(duration) => WindowData::Interval {
                end,
                duration: *duration,
            },
        };

        ViewData::new(entry.view.clone(), window, rows).map(Some)
    }

    /// Returns the set of registered views that the general export path
    /// serves: every cumulative-window view. The set is shared and
    /// immutable; it is rebuilt lazily after registrations invalidate it.
    pub fn exported_views(&self) -> Arc<HashSet<View>> {
        if let Some(cached) = self.exported.load_full() {
            return cached;
        }

        let _guard = self.registration.lock();
        // Double-checked: another thread may have rebuilt while we waited.
        if let Some(cached) = self.exported.load_full() {
            return cached;
        }

        let set: HashSet<View> = self
            .views
            .iter()
            .filter(|entry| matches!(entry.view.window(), AggregationWindow::Cumulative))
            .map(|entry| entry.view.clone())
            .collect();
        let set = Arc::new(set);
        self.exported.store(Some(Arc::clone(&set)));
        set
    }

    /// Folds one observation into every registered view watching the
    /// measure.
    ///
    /// The context is projected onto each view's columns, with `None`
    /// marking dimensions absent from the context. Dropped silently while
    /// collection is disabled. Fails if the value's numeric kind does not
    /// match the measure.
    pub fn record(
        &self,
        context: &TagContext,
        measure: &Measure,
        value: MeasureValue,
    ) -> Result<()> {
        if !value.matches(measure) {
            return Err(SightlineError::MeasureKindMismatch {
                measure: measure.name().to_string(),
                expected: measure.kind().as_str(),
            });
        }
        if self.state.peek() == CollectionState::Disabled {
            tracing::debug!(measure = measure.name(), "collection disabled, dropping measurement");
            return Ok(());
        }

        for entry in self.views.iter() {
            if entry.view.measure().name() != measure.name() {
                continue;
            }

            let tag_values: TagValues = entry
                .view
                .columns()
                .iter()
                .map(|key| context.get(key).cloned())
                .collect();

            let mut rows = entry.rows.lock();
            match rows.get_mut(&tag_values) {
                Some(data) => data.add(value),
                None => {
                    if rows.len() >= self.max_rows_per_view {
                        drop(rows);
                        self.note_dropped_row(&entry.view);
                        continue;
                    }
                    let mut data = AggregationData::empty(
                        entry.view.aggregation(),
                        entry.view.measure().kind(),
                    );
                    data.add(value);
                    rows.insert(tag_values, data);
                }
            }
        }
        Ok(())
    }

    /// Wipes every view's accumulator map. Views stay registered.
    pub fn clear(&self) {
        let _guard = self.registration.lock();
        for entry in self.views.iter() {
            entry.rows.lock().clear();
        }
    }

    /// Restarts the aggregation window of every view. Called when
    /// collection re-enables after a disabled period.
    pub fn resume(&self) {
        let _guard = self.registration.lock();
        let now = SystemTime::now();
        for entry in self.views.iter() {
            *entry.start.lock() = now;
        }
    }

    /// Returns the number of registered views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Returns true if no views are registered.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    fn note_dropped_row(&self, view: &View) {
        let dropped = self.dropped_rows.fetch_add(1, Ordering::Relaxed) + 1;
        if dropped == 1 || dropped % DROP_WARN_EVERY == 0 {
            tracing::warn!(
                view = %view.name(),
                cap = self.max_rows_per_view,
                total_dropped = dropped,
                "view at tag cardinality cap, dropping new rows"
            );
        }
    }
}
