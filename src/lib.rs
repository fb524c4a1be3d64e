//! UTC time values with monotonic readings and mockable clocks.
//!
//! This crate provides a single, process-wide notion of "current time" that
//! production code reads through [`now`], and that tests can atomically
//! replace with a deterministic, controllable source.
//!
//! # Overview
//!
//! The main type is [`UtcTime`], an immutable UTC instant that carries both:
//! - a **wall** reading for formatting, calendar comparison and
//!   serialization (ISO 8601 with fixed milliseconds, JSON, and a compact
//!   9-byte binary form), and
//! - a **monotonic** reading for duration measurement, so that durations
//!   between two [`now`] samples are immune to wall-clock adjustments.
//!
//! # Clock Types
//!
//! - [`MonoClock`]: raw system clock, monotonic reading preserved
//! - [`WallClock`]: system clock with the monotonic reading stripped
//! - [`WallClockMs`]: as [`WallClock`], rounded to the millisecond
//! - [`SettableClock`]: settable, held directly as an injected dependency
//! - [`TestClock`]: settable, registrable as the process-wide clock
//!
//! # Example
//!
//! ```rust
//! use chrono::TimeDelta;
//! use utc_clock::{TestClock, UtcTime};
//!
//! // Production: read the global clock
//! let _started_at = utc_clock::now();
//!
//! // Testing: drive time by hand
//! let clock = TestClock::wall_ms(None);
//! let _guard = clock.register_guard();
//!
//! clock.set(UtcTime::must_parse("2020-01-01T00:00:00.000Z"));
//! assert_eq!(utc_clock::now().to_string(), "2020-01-01T00:00:00.000Z");
//!
//! clock.add(TimeDelta::hours(1));
//! assert_eq!(utc_clock::now().to_string(), "2020-01-01T01:00:00.000Z");
//! ```

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![cfg_attr(feature = "fail-on-warnings", deny(clippy::all))]
#![forbid(unsafe_code)]

mod clock;
mod codec;
mod error;
pub mod registry;
mod settable;
mod test_clock;
mod utc;

pub use clock::{Clock, MonoClock, WallClock, WallClockMs};
pub use error::TimeError;
pub use settable::SettableClock;
pub use test_clock::{MockGuard, TestClock};
pub use utc::UtcTime;

use chrono::TimeDelta;

/// The current time according to the process-wide clock.
///
/// Equivalent to sampling [`MonoClock`] unless a clock has been installed
/// via [`registry::install`] or [`TestClock::register`].
pub fn now() -> UtcTime {
    registry::now()
}

/// The duration elapsed since `t`, measured against [`now`].
pub fn since(t: UtcTime) -> TimeDelta {
    now() - t
}

/// The duration remaining until `t`, measured against [`now`].
pub fn until(t: UtcTime) -> TimeDelta {
    t - now()
}
