use chrono::TimeDelta;

use crate::utc::UtcTime;

/// A source of "now".
///
/// The built-in implementers are [`MonoClock`], [`WallClock`] and
/// [`WallClockMs`]; closures returning [`UtcTime`] implement `Clock` as well.
/// A `Clock` can be installed process-wide via
/// [`registry::install`](crate::registry::install).
pub trait Clock: Send + Sync {
    /// Produce the current time under this clock's policy.
    fn now(&self) -> UtcTime;

    /// Called when this clock stops being the globally installed clock,
    /// after its replacement has become visible to readers.
    fn deactivated(&self) {}
}

impl<F> Clock for F
where
    F: Fn() -> UtcTime + Send + Sync,
{
    fn now(&self) -> UtcTime {
        self()
    }
}

/// The raw system clock: samples preserve their monotonic reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonoClock;

impl Clock for MonoClock {
    fn now(&self) -> UtcTime {
        ClockPolicy::Mono.now()
    }
}

/// The system clock with the monotonic reading stripped, for callers that
/// need calendar-identity comparisons unaffected by measurement readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn now(&self) -> UtcTime {
        ClockPolicy::Wall.now()
    }
}

/// Like [`WallClock`], additionally rounded to the millisecond - useful
/// where timestamps are serialized and compared, since a round trip through
/// text loses sub-millisecond precision anyway.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClockMs;

impl Clock for WallClockMs {
    fn now(&self) -> UtcTime {
        ClockPolicy::WallMs.now()
    }
}

/// The closed set of sampling policies shared by the built-in clocks and the
/// settable test clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClockPolicy {
    Mono,
    Wall,
    WallMs,
}

impl ClockPolicy {
    /// Sample the real system clock under this policy. This never consults
    /// the global registry, so settable clocks can fall through to it even
    /// while they are installed as the global clock.
    pub(crate) fn now(self) -> UtcTime {
        match self {
            ClockPolicy::Mono => UtcTime::system_now(),
            ClockPolicy::Wall => UtcTime::system_now().strip_mono(),
            ClockPolicy::WallMs => UtcTime::system_now().round(TimeDelta::milliseconds(1)),
        }
    }

    /// Normalize an instant the way this policy's clock would report it.
    pub(crate) fn apply(self, u: UtcTime) -> UtcTime {
        match self {
            ClockPolicy::Mono => u,
            ClockPolicy::Wall => u.strip_mono(),
            ClockPolicy::WallMs => u.round(TimeDelta::milliseconds(1)),
        }
    }
}
