use chrono::TimeDelta;
use parking_lot::Mutex;

use std::sync::Arc;

use crate::clock::{Clock, ClockPolicy};
use crate::utc::UtcTime;

/// The state machine shared by [`SettableClock`] and
/// [`TestClock`](crate::TestClock): a sampling policy plus an optional
/// overridden instant.
///
/// The zero value and "nothing recorded" are unified into a single unset
/// state, so `set(zero)` is the designated way back to passthrough.
pub(crate) struct SettableState {
    policy: ClockPolicy,
    slot: Mutex<Option<UtcTime>>,
}

impl SettableState {
    pub(crate) fn new(policy: ClockPolicy, initial: Option<UtcTime>) -> Self {
        let state = Self {
            policy,
            slot: Mutex::new(None),
        };
        if let Some(u) = initial {
            state.set(u);
        }
        state
    }

    /// The recorded instant, or the zero value while unset. Never falls back
    /// to the real clock.
    pub(crate) fn get(&self) -> UtcTime {
        self.slot.lock().unwrap_or_else(UtcTime::zero)
    }

    /// The recorded instant, or the policy clock's current reading while
    /// unset.
    pub(crate) fn now(&self) -> UtcTime {
        match *self.slot.lock() {
            Some(u) if !u.is_zero() => u,
            _ => self.policy.now(),
        }
    }

    /// Record `u` (normalized per the policy) and return the previously
    /// recorded instant, or the zero value if there was none. Setting the
    /// zero value transitions back to the unset state.
    pub(crate) fn set(&self, u: UtcTime) -> UtcTime {
        let next = if u.is_zero() {
            None
        } else {
            Some(self.policy.apply(u))
        };
        let mut slot = self.slot.lock();
        std::mem::replace(&mut *slot, next).unwrap_or_else(UtcTime::zero)
    }

    /// Equivalent to `set(zero)`.
    pub(crate) fn unset(&self) -> UtcTime {
        self.set(UtcTime::zero())
    }

    /// Add `delta` on top of `now()`, record the result and return it. If
    /// previously unset this pins the clock to "real now + delta"; it no
    /// longer tracks the real clock afterwards.
    pub(crate) fn add(&self, delta: TimeDelta) -> UtcTime {
        let mut slot = self.slot.lock();
        let current = match *slot {
            Some(u) if !u.is_zero() => u,
            _ => self.policy.now(),
        };
        let next = self.policy.apply(current + delta);
        *slot = if next.is_zero() { None } else { Some(next) };
        next
    }

    /// Freeze at the policy clock's present reading; returns the previously
    /// recorded instant.
    pub(crate) fn set_now(&self) -> UtcTime {
        self.set(self.policy.now())
    }
}

/// A settable clock held directly as an injected dependency.
///
/// Unlike [`TestClock`](crate::TestClock) it never touches the global clock
/// slot; code under test receives it (as a value or an `Arc<dyn Clock>`) and
/// queries it through [`Clock::now`]. Clones share the same state.
///
/// While no instant is recorded, `now()` passes through to the real system
/// clock under the configured policy; `set` freezes it, `set(zero)` /
/// `unset` resume passthrough.
///
/// ```rust
/// use utc_clock::{SettableClock, UtcTime};
///
/// let clock = SettableClock::wall_ms(None);
/// clock.set(UtcTime::must_parse("2020-01-01T00:00:00.000Z"));
/// assert_eq!(clock.now().to_string(), "2020-01-01T00:00:00.000Z");
/// ```
#[derive(Clone)]
pub struct SettableClock {
    state: Arc<SettableState>,
}

impl SettableClock {
    /// A settable clock whose passthrough readings keep the monotonic
    /// reading. `initial` pre-sets the recorded instant; pass `None` (or the
    /// zero value) to start unset.
    pub fn mono(initial: impl Into<Option<UtcTime>>) -> Self {
        Self::new(ClockPolicy::Mono, initial.into())
    }

    /// A settable clock that strips the monotonic reading from everything it
    /// reports.
    pub fn wall(initial: impl Into<Option<UtcTime>>) -> Self {
        Self::new(ClockPolicy::Wall, initial.into())
    }

    /// Like [`wall`](Self::wall), additionally rounding to the millisecond.
    pub fn wall_ms(initial: impl Into<Option<UtcTime>>) -> Self {
        Self::new(ClockPolicy::WallMs, initial.into())
    }

    fn new(policy: ClockPolicy, initial: Option<UtcTime>) -> Self {
        Self {
            state: Arc::new(SettableState::new(policy, initial)),
        }
    }

    /// The recorded instant, or the zero value while unset.
    pub fn get(&self) -> UtcTime {
        self.state.get()
    }

    /// The recorded instant, or the real clock's reading (under this clock's
    /// policy) while unset.
    pub fn now(&self) -> UtcTime {
        self.state.now()
    }

    /// Record `instant` and return the previously recorded one (zero if
    /// none). Setting the zero value is equivalent to [`unset`](Self::unset).
    pub fn set(&self, instant: UtcTime) -> UtcTime {
        self.state.set(instant)
    }

    /// Go back to passthrough; returns the previously recorded instant.
    pub fn unset(&self) -> UtcTime {
        self.state.unset()
    }

    /// Add `delta` on top of [`now`](Self::now), record and return the
    /// result.
    pub fn add(&self, delta: TimeDelta) -> UtcTime {
        self.state.add(delta)
    }

    /// Freeze at the present real moment; returns the previously recorded
    /// instant.
    pub fn set_now(&self) -> UtcTime {
        self.state.set_now()
    }
}

impl Clock for SettableClock {
    fn now(&self) -> UtcTime {
        self.state.now()
    }
}

impl std::fmt::Debug for SettableClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettableClock")
            .field("set", &self.get())
            .finish()
    }
}
