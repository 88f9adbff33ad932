//! Fault injection for the in-memory store
//!
//! Each store operation consults the injector at a [`FaultPoint`] before
//! doing any work. Scripted injections are consumed one per call, in the
//! order they were queued; a persistent injection fires on every call
//! once the script for that point is empty.
//!
//! ```ignore
//! store.faults().fail_next(FaultPoint::Get, StoreFault::Timeout, 2);
//! // first two reads time out, the third goes through
//! ```

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use playerdb_core::StoreFault;

/// Store operation at which an injection can fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// `try_get_collection`
    OpenCollection,
    /// `Collection::try_get`
    Get,
    /// `Collection::try_add`
    Add,
    /// `Collection::try_update`
    Update,
    /// `Transaction::commit`
    Commit,
}

/// What happens when an injection fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Injection {
    /// The operation fails with this fault
    Fail(StoreFault),
    /// The operation reports `false` (add/update lost to another writer)
    Reject,
}

#[derive(Debug, Default)]
struct FaultState {
    scripted: HashMap<FaultPoint, VecDeque<Injection>>,
    persistent: HashMap<FaultPoint, Injection>,
    calls: HashMap<FaultPoint, usize>,
}

/// Scripted faults and per-point call counters
#[derive(Debug, Default)]
pub struct FaultInjector {
    state: Mutex<FaultState>,
}

impl FaultInjector {
    /// Create an injector with nothing scheduled
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls at `point` with `fault`.
    pub fn fail_next(&self, point: FaultPoint, fault: StoreFault, times: usize) {
        let mut state = self.state.lock();
        let queue = state.scripted.entry(point).or_default();
        queue.extend(std::iter::repeat(Injection::Fail(fault)).take(times));
    }

    /// Make the next `times` add/update calls at `point` report `false`.
    pub fn reject_next(&self, point: FaultPoint, times: usize) {
        let mut state = self.state.lock();
        let queue = state.scripted.entry(point).or_default();
        queue.extend(std::iter::repeat(Injection::Reject).take(times));
    }

    /// Fail every call at `point` with `fault` until cleared.
    pub fn fail_always(&self, point: FaultPoint, fault: StoreFault) {
        self.state
            .lock()
            .persistent
            .insert(point, Injection::Fail(fault));
    }

    /// Drop every scheduled injection. Call counters are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.scripted.clear();
        state.persistent.clear();
    }

    /// Number of calls that reached `point`.
    pub fn calls(&self, point: FaultPoint) -> usize {
        self.state.lock().calls.get(&point).copied().unwrap_or(0)
    }

    /// Record a call at `point` and return the injection to apply, if any.
    pub(crate) fn hit(&self, point: FaultPoint) -> Option<Injection> {
        let mut state = self.state.lock();
        *state.calls.entry(point).or_insert(0) += 1;
        if let Some(injection) = state.scripted.get_mut(&point).and_then(VecDeque::pop_front) {
            tracing::debug!(?point, ?injection, "injected store fault");
            return Some(injection);
        }
        state.persistent.get(&point).cloned()
    }

    /// Like [`hit`](Self::hit) for operations that have no `false` outcome.
    pub(crate) fn check(&self, point: FaultPoint) -> Result<(), StoreFault> {
        match self.hit(point) {
            Some(Injection::Fail(fault)) => Err(fault),
            _ => Ok(()),
        }
    }
}
