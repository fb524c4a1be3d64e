use chrono::{DateTime, Datelike, TimeDelta, Utc};

use std::ops::{Add, Sub};
use std::time::Instant;

use crate::error::TimeError;

/// Seconds between 0000-01-01T00:00:00Z and the Unix epoch. Added to unix
/// seconds in the binary encoding so the earliest valid year maps to a
/// non-negative value.
pub(crate) const YEAR_ZERO_OFFSET_SECS: i64 = 62_167_219_200;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Unix seconds of the zero value, 0001-01-01T00:00:00Z.
const ZERO_UNIX_SECS: i64 = -62_135_596_800;

/// An instant in time, always normalized to UTC.
///
/// A `UtcTime` carries two readings:
///
/// - a **wall** reading (`DateTime<Utc>`) used for formatting, calendar
///   comparison and serialization, and
/// - an optional **monotonic** reading (`std::time::Instant`) used for
///   duration measurement.
///
/// Values sampled via [`UtcTime::system_now`] carry both readings, so
/// durations between two samples are immune to wall-clock adjustments (NTP
/// slew, leap seconds). The monotonic reading is process-local and collapses
/// (duration arithmetic falls back to the wall reading) once a value has
/// passed through parsing, decoding, rounding or truncation.
///
/// Comparison with `==` / `<` considers the wall reading only; use
/// [`after`](UtcTime::after) / [`before`](UtcTime::before) for
/// measurement-based ordering.
///
/// The textual form is ISO 8601 / RFC 3339 with fixed milliseconds:
/// `2006-01-02T15:04:05.000Z`. Years outside `[0, 9999]` cannot be marshaled
/// to text, JSON or binary.
#[derive(Clone, Copy, Debug)]
pub struct UtcTime {
    pub(crate) wall: DateTime<Utc>,
    pub(crate) mono: Option<Instant>,
}

impl UtcTime {
    /// Sample the system clock once, pairing the wall reading with a
    /// monotonic reading taken at the same moment.
    ///
    /// This always reads the real system clock. Use [`crate::now`] for the
    /// mockable, process-wide notion of "now".
    pub fn system_now() -> Self {
        Self {
            wall: Utc::now(),
            mono: Some(Instant::now()),
        }
    }

    /// 0001-01-01T00:00:00.000000000Z - the zero (default) value.
    pub fn zero() -> Self {
        Self::at_unix(ZERO_UNIX_SECS, 0)
    }

    /// 0000-01-01T00:00:00.000000000Z - one year before [`zero`](Self::zero),
    /// the earliest instant that passes ISO 8601 validation.
    pub fn min() -> Self {
        Self::at_unix(-YEAR_ZERO_OFFSET_SECS, 0)
    }

    /// 9999-12-31T23:59:59.999999999Z - the latest instant that passes
    /// ISO 8601 validation.
    pub fn max() -> Self {
        Self::at_unix(253_402_300_799, 999_999_999)
    }

    fn at_unix(secs: i64, nanos: u32) -> Self {
        Self {
            wall: DateTime::from_timestamp(secs, nanos).expect("in range"),
            mono: None,
        }
    }

    /// Construct from unix seconds and nanoseconds. `nanos` may lie outside
    /// `[0, 999_999_999]` and is normalized into `secs`.
    ///
    /// Inputs beyond chrono's representable range saturate at its bounds;
    /// such values fail [`validate_iso8601`](Self::validate_iso8601) anyway.
    pub fn from_unix(secs: i64, nanos: i64) -> Self {
        let secs = secs.saturating_add(nanos.div_euclid(NANOS_PER_SEC));
        let nanos = nanos.rem_euclid(NANOS_PER_SEC) as u32;
        let wall = DateTime::from_timestamp(secs, nanos).unwrap_or(if secs < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });
        Self { wall, mono: None }
    }

    /// Construct from unix milliseconds; the reverse of
    /// [`unix_milli`](Self::unix_milli) for millisecond-granularity values.
    pub fn from_unix_milli(millis: i64) -> Self {
        match DateTime::from_timestamp_millis(millis) {
            Some(wall) => Self { wall, mono: None },
            None if millis < 0 => Self {
                wall: DateTime::<Utc>::MIN_UTC,
                mono: None,
            },
            None => Self {
                wall: DateTime::<Utc>::MAX_UTC,
                mono: None,
            },
        }
    }

    /// The wall reading.
    pub fn datetime(&self) -> DateTime<Utc> {
        self.wall
    }

    /// The monotonic reading, if this value still carries one.
    pub fn monotonic(&self) -> Option<Instant> {
        self.mono
    }

    /// Whether this value still carries a genuine monotonic reading.
    pub fn has_monotonic(&self) -> bool {
        self.mono.is_some()
    }

    /// A copy with the monotonic reading removed, so all further arithmetic
    /// uses the wall reading.
    pub fn strip_mono(self) -> Self {
        Self {
            wall: self.wall,
            mono: None,
        }
    }

    /// True for the default value (0001-01-01T00:00:00Z).
    pub fn is_zero(&self) -> bool {
        self.wall == Self::zero().wall
    }

    /// Unix seconds since 1970-01-01T00:00:00Z.
    pub fn unix(&self) -> i64 {
        self.wall.timestamp()
    }

    /// Unix milliseconds since 1970-01-01T00:00:00.000Z.
    pub fn unix_milli(&self) -> i64 {
        self.wall.timestamp_millis()
    }

    /// Nanosecond-of-second of the wall reading, in `[0, 999_999_999]`.
    pub fn nanosecond(&self) -> u32 {
        self.wall.timestamp_subsec_nanos()
    }

    /// Calendar year of the wall reading.
    pub fn year(&self) -> i32 {
        self.wall.year()
    }

    /// Fails with [`TimeError::YearOutOfRange`] unless the calendar year is
    /// in `[0, 9999]`. ISO 8601 / RFC 3339 years are exactly 4 digits.
    pub fn validate_iso8601(&self) -> Result<(), TimeError> {
        let year = self.wall.year();
        if !(0..=9999).contains(&year) {
            return Err(TimeError::YearOutOfRange { year });
        }
        Ok(())
    }

    /// The signed duration `self - earlier`.
    ///
    /// When both values carry genuine monotonic readings the difference is
    /// taken between those readings and is unaffected by wall-clock
    /// adjustments; otherwise it is the difference of the wall readings.
    pub fn signed_duration_since(self, earlier: UtcTime) -> TimeDelta {
        match (self.mono, earlier.mono) {
            (Some(a), Some(b)) => {
                if a >= b {
                    TimeDelta::from_std(a.duration_since(b)).unwrap_or(TimeDelta::MAX)
                } else {
                    -TimeDelta::from_std(b.duration_since(a)).unwrap_or(TimeDelta::MAX)
                }
            }
            _ => self.wall.signed_duration_since(earlier.wall),
        }
    }

    /// Whether `self` is later than `other`, preferring the monotonic
    /// readings when both are present.
    pub fn after(self, other: UtcTime) -> bool {
        match (self.mono, other.mono) {
            (Some(a), Some(b)) => a > b,
            _ => self.wall > other.wall,
        }
    }

    /// Whether `self` is earlier than `other`, preferring the monotonic
    /// readings when both are present.
    pub fn before(self, other: UtcTime) -> bool {
        match (self.mono, other.mono) {
            (Some(a), Some(b)) => a < b,
            _ => self.wall < other.wall,
        }
    }

    /// Round the wall reading to the nearest multiple of `resolution`
    /// (counted since the zero value), ties rounding up. The result carries
    /// no monotonic reading; a non-positive `resolution` only strips it.
    pub fn round(self, resolution: TimeDelta) -> Self {
        let Some(res) = resolution_nanos(resolution) else {
            return self.strip_mono();
        };
        let rel = self.nanos_since_zero();
        let rem = rel.rem_euclid(res);
        let rel = if rem * 2 >= res { rel - rem + res } else { rel - rem };
        Self::from_nanos_since_zero(rel)
    }

    /// Truncate the wall reading down to a multiple of `resolution` (counted
    /// since the zero value). The result carries no monotonic reading; a
    /// non-positive `resolution` only strips it.
    pub fn truncate(self, resolution: TimeDelta) -> Self {
        let Some(res) = resolution_nanos(resolution) else {
            return self.strip_mono();
        };
        let rel = self.nanos_since_zero();
        Self::from_nanos_since_zero(rel.div_euclid(res) * res)
    }

    /// Nanoseconds between the zero value and this instant. i128 so the
    /// whole valid year range is exact; chrono's own rounding helpers only
    /// cover timestamps that fit nanoseconds in an i64.
    fn nanos_since_zero(&self) -> i128 {
        (self.unix() as i128 - ZERO_UNIX_SECS as i128) * NANOS_PER_SEC as i128
            + self.nanosecond() as i128
    }

    fn from_nanos_since_zero(rel: i128) -> Self {
        let unix = rel + ZERO_UNIX_SECS as i128 * NANOS_PER_SEC as i128;
        Self::from_unix(
            unix.div_euclid(NANOS_PER_SEC as i128) as i64,
            unix.rem_euclid(NANOS_PER_SEC as i128) as i64,
        )
    }
}

fn resolution_nanos(resolution: TimeDelta) -> Option<i128> {
    if resolution <= TimeDelta::zero() {
        return None;
    }
    Some(resolution.num_seconds() as i128 * NANOS_PER_SEC as i128 + resolution.subsec_nanos() as i128)
}

impl Default for UtcTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl<Tz: chrono::TimeZone> From<DateTime<Tz>> for UtcTime {
    fn from(t: DateTime<Tz>) -> Self {
        Self {
            wall: t.with_timezone(&Utc),
            mono: None,
        }
    }
}

impl From<std::time::SystemTime> for UtcTime {
    fn from(t: std::time::SystemTime) -> Self {
        Self {
            wall: t.into(),
            mono: None,
        }
    }
}

impl PartialEq for UtcTime {
    fn eq(&self, other: &Self) -> bool {
        self.wall == other.wall
    }
}

impl Eq for UtcTime {}

impl PartialOrd for UtcTime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UtcTime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.wall.cmp(&other.wall)
    }
}

impl Add<TimeDelta> for UtcTime {
    type Output = UtcTime;

    /// Shifts both readings, so a value sampled from the system clock keeps
    /// its monotonic basis across additions. Saturates at chrono's bounds.
    fn add(self, rhs: TimeDelta) -> UtcTime {
        let wall = self.wall.checked_add_signed(rhs).unwrap_or(if rhs < TimeDelta::zero() {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });
        let mono = self.mono.and_then(|at| {
            if rhs >= TimeDelta::zero() {
                at.checked_add(rhs.to_std().ok()?)
            } else {
                at.checked_sub((-rhs).to_std().ok()?)
            }
        });
        UtcTime { wall, mono }
    }
}

impl Sub<TimeDelta> for UtcTime {
    type Output = UtcTime;

    fn sub(self, rhs: TimeDelta) -> UtcTime {
        self + -rhs
    }
}

impl Sub<UtcTime> for UtcTime {
    type Output = TimeDelta;

    fn sub(self, rhs: UtcTime) -> TimeDelta {
        self.signed_duration_since(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn zero_value() {
        let zero = UtcTime::zero();
        assert_eq!(zero, UtcTime::default());
        assert!(zero.is_zero());
        assert_eq!(zero.year(), 1);
        assert_eq!(zero.datetime().month(), 1);
        assert_eq!(zero.datetime().day(), 1);
        assert_eq!(zero.datetime().hour(), 0);
        assert_eq!(zero.nanosecond(), 0);
    }

    #[test]
    fn min_value() {
        let min = UtcTime::min();
        assert_eq!(min.year(), 0);
        assert_eq!(min.unix(), -YEAR_ZERO_OFFSET_SECS);
        assert_eq!(min.nanosecond(), 0);
        assert!(!min.is_zero());
        // Min is exactly one year before Zero
        assert_eq!(
            UtcTime::zero().unix() - min.unix(),
            366 * 24 * 3600 // year 0 is a leap year
        );
    }

    #[test]
    fn max_value() {
        let max = UtcTime::max();
        assert_eq!(max.year(), 9999);
        assert_eq!(max.datetime().month(), 12);
        assert_eq!(max.datetime().day(), 31);
        assert_eq!(max.nanosecond(), 999_999_999);
        assert!(max.validate_iso8601().is_ok());
    }

    #[test]
    fn validation_bounds() {
        assert!(UtcTime::zero().validate_iso8601().is_ok());
        assert!(UtcTime::min().validate_iso8601().is_ok());
        assert!(UtcTime::max().validate_iso8601().is_ok());

        let too_small = UtcTime::min() - TimeDelta::hours(1);
        let too_large = UtcTime::max() + TimeDelta::hours(1);
        assert!(matches!(
            too_small.validate_iso8601(),
            Err(TimeError::YearOutOfRange { year: -1 })
        ));
        assert!(matches!(
            too_large.validate_iso8601(),
            Err(TimeError::YearOutOfRange { year: 10000 })
        ));
    }

    #[test]
    fn system_now_carries_monotonic() {
        let now = UtcTime::system_now();
        assert!(now.has_monotonic());
        assert!(!now.strip_mono().has_monotonic());
        assert!(!now.truncate(TimeDelta::zero()).has_monotonic());
        // Stripping does not change the wall reading
        assert_eq!(now, now.strip_mono());
    }

    #[test]
    fn add_preserves_monotonic() {
        let now = UtcTime::system_now();
        let later = now + TimeDelta::hours(1);
        assert!(later.has_monotonic());
        assert_eq!(later.signed_duration_since(now), TimeDelta::hours(1));
        assert!(later.after(now));
        assert!(now.before(later));
    }

    #[test]
    fn monotonic_difference_is_exact() {
        let a = UtcTime::system_now();
        let b = a + TimeDelta::milliseconds(1500);
        assert_eq!(b - a, TimeDelta::milliseconds(1500));
        assert_eq!(a - b, TimeDelta::milliseconds(-1500));
    }

    #[test]
    fn wall_difference_without_monotonic() {
        let a = UtcTime::from_unix(1_000_000_000, 0);
        let b = UtcTime::from_unix(1_000_000_060, 0);
        assert!(!a.has_monotonic());
        assert_eq!(b - a, TimeDelta::seconds(60));
        assert!(b.after(a));
        assert!(a.before(b));
    }

    #[test]
    fn mixed_difference_falls_back_to_wall() {
        let real = UtcTime::system_now();
        let parsed = real.strip_mono() + TimeDelta::minutes(1);
        assert_eq!(parsed - real, TimeDelta::minutes(1));
    }

    #[test]
    fn unix_milli_round_trip() {
        let cases: &[i64] = &[
            0,
            1,
            -1,
            1_000_000_000_000,
            -62_135_596_800_000, // zero value
            UtcTime::min().unix_milli(),
            UtcTime::max().unix_milli(),
        ];
        for &millis in cases {
            let t = UtcTime::from_unix_milli(millis);
            assert_eq!(t.unix_milli(), millis, "millis={millis}");
            assert_eq!(UtcTime::from_unix_milli(t.unix_milli()), t);
        }
    }

    #[test]
    fn from_unix_normalizes_nanos() {
        let t = UtcTime::from_unix(10, 2_500_000_000);
        assert_eq!(t.unix(), 12);
        assert_eq!(t.nanosecond(), 500_000_000);

        let t = UtcTime::from_unix(0, -1);
        assert_eq!(t.unix(), -1);
        assert_eq!(t.nanosecond(), 999_999_999);
    }

    #[test]
    fn truncate_and_round() {
        let t = UtcTime::from_unix(1_000_000_000, 0) + TimeDelta::nanoseconds(1_600_000);
        assert_eq!(
            t.truncate(TimeDelta::milliseconds(1)).nanosecond(),
            1_000_000
        );
        assert_eq!(t.round(TimeDelta::milliseconds(1)).nanosecond(), 2_000_000);
    }

    #[test]
    fn calendar_ordering_ignores_monotonic() {
        let now = UtcTime::system_now();
        assert_eq!(now, now.strip_mono());
        assert!(UtcTime::min() < UtcTime::zero());
        assert!(UtcTime::zero() < UtcTime::max());
    }
}
