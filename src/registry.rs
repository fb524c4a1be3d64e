//! The process-wide clock slot.
//!
//! A single shared slot holds the currently active [`Clock`]; [`now`] reads
//! it on every call and falls back to the raw system clock while the slot is
//! empty. The slot is mutated only through [`install`] / [`uninstall`], so
//! every mutation path is auditable.
//!
//! Reads are always synchronized - there is no unsynchronized fast path for
//! the never-mocked case. A lazily-upgraded fast path would itself race with
//! readers on the very first install, so the slot trades a small constant
//! read overhead for eliminating that hazard class entirely.

use parking_lot::RwLock;

use std::sync::Arc;

use crate::clock::Clock;
use crate::utc::UtcTime;

static ACTIVE: RwLock<Option<Arc<dyn Clock>>> = RwLock::new(None);

/// The current time according to the active clock, or the raw system clock
/// (monotonic reading preserved) while no clock is installed.
///
/// Safe to call from any number of threads at any time, including while an
/// install is in flight; every read observes either the fully-old or
/// fully-new clock.
pub(crate) fn now() -> UtcTime {
    // clone the Arc out so the active clock runs without holding the lock
    let active = ACTIVE.read().clone();
    match active {
        Some(clock) => clock.now(),
        None => UtcTime::system_now(),
    }
}

/// Install `clock` as the process-wide clock, returning the previously
/// active one (`None` if the slot held the implicit system default).
///
/// The replaced clock is notified via [`Clock::deactivated`] after the new
/// clock has become visible to readers, so a superseded test clock observes
/// its own demotion even when it is never explicitly deregistered.
pub fn install(clock: Arc<dyn Clock>) -> Option<Arc<dyn Clock>> {
    let previous = {
        let mut slot = ACTIVE.write();
        slot.replace(clock)
    };
    if let Some(prev) = &previous {
        prev.deactivated();
    }
    previous
}

/// Restore the implicit system default, returning (and notifying) whatever
/// clock was active.
pub fn uninstall() -> Option<Arc<dyn Clock>> {
    let previous = { ACTIVE.write().take() };
    if let Some(prev) = &previous {
        prev.deactivated();
    }
    previous
}
