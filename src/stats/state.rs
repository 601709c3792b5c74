//! The collection-state gate: a two-state switch that becomes immutable
//! once observed.

use crate::core::{Result, SightlineError};
use parking_lot::Mutex;

/// Whether measurements are being folded into view accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    /// Measurements fold into registered views.
    Enabled,
    /// Measurements are dropped; accumulated data has been cleared.
    Disabled,
}

#[derive(Debug)]
struct Inner {
    state: CollectionState,
    read: bool,
}

/// Read-once-observable state holder.
///
/// Downstream consumers may cache the result of [`CurrentState::get`], so
/// once any caller has observed the state, further mutation is rejected.
/// The record path uses [`CurrentState::peek`], which does not count as an
/// observation.
#[derive(Debug)]
pub struct CurrentState {
    inner: Mutex<Inner>,
}

impl CurrentState {
    /// Creates a state holder with the given initial state.
    pub fn new(initial: CollectionState) -> Self {
        CurrentState {
            inner: Mutex::new(Inner {
                state: initial,
                read: false,
            }),
        }
    }

    /// Returns the current state and marks it as read.
    pub fn get(&self) -> CollectionState {
        let mut inner = self.inner.lock();
        inner.read = true;
        inner.state
    }

    /// Returns the current state without tripping the read gate.
    pub(crate) fn peek(&self) -> CollectionState {
        self.inner.lock().state
    }

    /// Sets the state, returning whether it actually changed.
    ///
    /// Fails once the state has been read through [`CurrentState::get`].
    pub fn set(&self, next: CollectionState) -> Result<bool> {
        let mut inner = self.inner.lock();
        if inner.read {
            return Err(SightlineError::StateAlreadyRead);
        }
        let changed = inner.state != next;
        inner.state = next;
        Ok(changed)
    }
}
