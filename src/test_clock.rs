use chrono::TimeDelta;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clock::{Clock, ClockPolicy};
use crate::registry;
use crate::settable::SettableState;
use crate::utc::UtcTime;

struct TestClockInner {
    state: SettableState,
    mocking: AtomicBool,
}

impl Clock for TestClockInner {
    fn now(&self) -> UtcTime {
        self.state.now()
    }

    fn deactivated(&self) {
        self.mocking.store(false, Ordering::SeqCst);
    }
}

/// A settable clock meant to be registered as *the* global clock, so that
/// ordinary code calling [`crate::now`] observes it.
///
/// It shares the [`SettableClock`](crate::SettableClock) state machine:
/// while no instant is recorded, [`now`](Self::now) passes through to the
/// real system clock under the configured policy, and setting the zero value
/// resumes passthrough. On top of that it tracks whether it is currently the
/// globally installed clock ([`is_mocking`](Self::is_mocking)); installing a
/// different clock - anyone's, via [`register`](Self::register) or
/// [`registry::install`] - lowers the flag of the clock it supersedes.
///
/// Clones share the same state and flag.
///
/// ```rust
/// use utc_clock::{TestClock, UtcTime};
///
/// let clock = TestClock::wall(UtcTime::must_parse("2020-01-01T00:00:00.000Z"));
/// let _guard = clock.register_guard();
/// assert_eq!(utc_clock::now().to_string(), "2020-01-01T00:00:00.000Z");
/// // dropping the guard restores the real clock
/// ```
#[derive(Clone)]
pub struct TestClock {
    inner: Arc<TestClockInner>,
}

impl TestClock {
    /// A test clock whose passthrough readings keep the monotonic reading.
    /// `initial` pre-sets the recorded instant; pass `None` (or the zero
    /// value) to start unset.
    pub fn mono(initial: impl Into<Option<UtcTime>>) -> Self {
        Self::new(ClockPolicy::Mono, initial.into())
    }

    /// A test clock that strips the monotonic reading from everything it
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
            inner: Arc::new(TestClockInner {
                state: SettableState::new(policy, initial),
                mocking: AtomicBool::new(false),
            }),
        }
    }

    /// Install this clock as the global clock. Afterwards [`crate::now`]
    /// returns whatever [`now`](Self::now) returns.
    pub fn register(&self) {
        registry::install(self.inner.clone());
        self.inner.mocking.store(true, Ordering::SeqCst);
    }

    /// [`register`](Self::register), returning a guard that deregisters this
    /// clock when dropped.
    #[must_use = "the clock is deregistered as soon as the guard is dropped"]
    pub fn register_guard(&self) -> MockGuard {
        self.register();
        MockGuard {
            clock: self.clone(),
        }
    }

    /// Restore the real clock as the global clock and lower this clock's
    /// mocking flag.
    ///
    /// Idempotent, and safe to call even when another clock has since
    /// superseded this one: the registry is reset to the default regardless
    /// of who is active.
    pub fn deregister(&self) {
        registry::uninstall();
        self.inner.mocking.store(false, Ordering::SeqCst);
    }

    /// True iff this clock is currently the globally installed clock. Only
    /// register/deregister (or being superseded) toggle this; `set` and
    /// `unset` do not.
    pub fn is_mocking(&self) -> bool {
        self.inner.mocking.load(Ordering::SeqCst)
    }

    /// The recorded instant, or the zero value while unset.
    pub fn get(&self) -> UtcTime {
        self.inner.state.get()
    }

    /// The recorded instant, or the real clock's reading (under this clock's
    /// policy) while unset.
    pub fn now(&self) -> UtcTime {
        self.inner.state.now()
    }

    /// Record `instant` and return the previously recorded one (zero if
    /// none). Setting the zero value is equivalent to [`unset`](Self::unset).
    pub fn set(&self, instant: UtcTime) -> UtcTime {
        self.inner.state.set(instant)
    }

    /// Go back to passthrough; returns the previously recorded instant.
    pub fn unset(&self) -> UtcTime {
        self.inner.state.unset()
    }

    /// Add `delta` on top of [`now`](Self::now), record and return the
    /// result.
    pub fn add(&self, delta: TimeDelta) -> UtcTime {
        self.inner.state.add(delta)
    }

    /// Freeze at the present real moment; returns the previously recorded
    /// instant.
    pub fn set_now(&self) -> UtcTime {
        self.inner.state.set_now()
    }
}

impl std::fmt::Debug for TestClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClock")
            .field("set", &self.get())
            .field("is_mocking", &self.is_mocking())
            .finish()
    }
}

/// Deregisters the associated [`TestClock`] on drop - the RAII equivalent of
/// restoring the real clock in test teardown.
pub struct MockGuard {
    clock: TestClock,
}

impl Drop for MockGuard {
    fn drop(&mut self) {
        self.clock.deregister();
    }
}
