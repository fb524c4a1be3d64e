//! Textual (ISO 8601 with fixed milliseconds), JSON and compact binary
//! encodings for [`UtcTime`].
//!
//! The textual form is always `YYYY-MM-DDThh:mm:ss.mmmZ` - unlike chrono's
//! default rendering, milliseconds are never omitted, even when zero. The
//! zero value marshals to the empty string (text, JSON) and to an empty
//! payload (binary), and unmarshals back from them.

use chrono::format::{parse as parse_items, Parsed, StrftimeItems};
use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use std::fmt;
use std::str::FromStr;

use crate::error::TimeError;
use crate::utc::{UtcTime, YEAR_ZERO_OFFSET_SECS};

#[derive(Clone, Copy)]
enum LayoutKind {
    /// Date, time and offset ("Z" or `+hh:mm`).
    Zoned,
    /// Date and time without a zone, interpreted as UTC.
    Local,
    /// Date and offset only; time of day is midnight.
    DateZoned,
    /// Date only, interpreted as UTC midnight.
    DateLocal,
}

struct Layout {
    fmt: &'static str,
    kind: LayoutKind,
}

/// Accepted parse layouts, tried in order; the first match wins.
const LAYOUTS: &[Layout] = &[
    Layout { fmt: "%Y-%m-%dT%H:%M:%S%.f%#z", kind: LayoutKind::Zoned },
    Layout { fmt: "%Y-%m-%d", kind: LayoutKind::DateLocal },
    Layout { fmt: "%Y-%m-%d%#z", kind: LayoutKind::DateZoned },
    Layout { fmt: "%Y-%m-%dT%H:%M:%S%#z", kind: LayoutKind::Zoned },
    Layout { fmt: "%Y-%m-%dT%H:%M%#z", kind: LayoutKind::Zoned },
    Layout { fmt: "%Y-%m-%dT%H:%M:%S%.f", kind: LayoutKind::Local },
    Layout { fmt: "%Y-%m-%dT%H:%M", kind: LayoutKind::Local },
];

impl Layout {
    fn parse(&self, s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        match self.kind {
            LayoutKind::Zoned => {
                DateTime::parse_from_str(s, self.fmt).map(|dt| dt.with_timezone(&Utc))
            }
            LayoutKind::Local => {
                NaiveDateTime::parse_from_str(s, self.fmt).map(|ndt| ndt.and_utc())
            }
            LayoutKind::DateLocal => chrono::NaiveDate::parse_from_str(s, self.fmt)
                .map(|d| d.and_time(NaiveTime::MIN).and_utc()),
            LayoutKind::DateZoned => {
                let mut parsed = Parsed::new();
                parse_items(&mut parsed, s, StrftimeItems::new(self.fmt))?;
                parsed.set_hour(0)?;
                parsed.set_minute(0)?;
                // to_datetime range-checks the offset projection, so a date
                // at chrono's extremes shifted out of range fails as a parse
                // error rather than panicking
                parsed.to_datetime().map(|dt| dt.with_timezone(&Utc))
            }
        }
    }
}

impl UtcTime {
    /// Parse using a caller-supplied chrono format string instead of the
    /// built-in layout table. A format without a zone is interpreted as UTC.
    pub fn parse_with(fmt: &str, s: &str) -> Result<Self, TimeError> {
        DateTime::parse_from_str(s, fmt)
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|_| NaiveDateTime::parse_from_str(s, fmt).map(|ndt| ndt.and_utc()))
            .map(UtcTime::from)
            .map_err(|source| TimeError::Parse {
                input: s.to_owned(),
                source,
            })
    }

    /// Parse, panicking on failure. Reserved for literals that are known to
    /// be valid, typically constants in code or tests.
    pub fn must_parse(s: &str) -> Self {
        match s.parse() {
            Ok(t) => t,
            Err(err) => panic!("must_parse: {err}"),
        }
    }

    /// The textual encoding: empty string for the zero value, otherwise the
    /// validated `YYYY-MM-DDThh:mm:ss.mmmZ` form.
    pub fn to_text(&self) -> Result<String, TimeError> {
        if self.is_zero() {
            return Ok(String::new());
        }
        self.validate_iso8601()?;
        Ok(self.to_string())
    }

    /// The binary encoding: an empty payload for the zero value, otherwise
    /// exactly 9 bytes - a 5-byte big-endian `unix_seconds +
    /// 62_167_219_200` followed by a 4-byte big-endian nanosecond-of-second.
    ///
    /// This is a narrowed form of the generic 15-byte time encoding: the
    /// valid year range fits in 5 bytes once offset past year 0.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TimeError> {
        if self.is_zero() {
            return Ok(Vec::new());
        }
        self.validate_iso8601()?;
        let sec = (self.unix() + YEAR_ZERO_OFFSET_SECS) as u64;
        let mut enc = Vec::with_capacity(9);
        enc.extend_from_slice(&sec.to_be_bytes()[3..8]);
        enc.extend_from_slice(&self.nanosecond().to_be_bytes());
        Ok(enc)
    }

    /// Decode the binary encoding produced by [`to_bytes`](Self::to_bytes).
    /// An empty payload decodes to the zero value; any other length except 9
    /// fails with [`TimeError::InvalidLength`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, TimeError> {
        if data.is_empty() {
            return Ok(UtcTime::zero());
        }
        if data.len() != 9 {
            return Err(TimeError::InvalidLength { len: data.len() });
        }
        let mut sec = [0u8; 8];
        sec[3..].copy_from_slice(&data[..5]);
        let secs = u64::from_be_bytes(sec) as i64 - YEAR_ZERO_OFFSET_SECS;
        let nanos = u32::from_be_bytes(data[5..9].try_into().expect("length checked"));
        Ok(UtcTime::from_unix(secs, i64::from(nanos)))
    }
}

impl FromStr for UtcTime {
    type Err = TimeError;

    /// Tries the fixed layout table in order; the empty string parses to the
    /// zero value. The parsed value carries no monotonic reading.
    ///
    /// Years outside `[0, 9999]` fail with [`TimeError::YearOutOfRange`],
    /// matching the 4-digit years of the textual form.
    fn from_str(s: &str) -> Result<Self, TimeError> {
        if s.is_empty() {
            return Ok(UtcTime::zero());
        }
        let mut last_err = None;
        for layout in LAYOUTS {
            match layout.parse(s) {
                Ok(wall) => {
                    let parsed = UtcTime::from(wall);
                    parsed.validate_iso8601()?;
                    return Ok(parsed);
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(TimeError::Parse {
            input: s.to_owned(),
            source: last_err.expect("layout table is non-empty"),
        })
    }
}

impl fmt::Display for UtcTime {
    /// Renders `YYYY-MM-DDThh:mm:ss.mmmZ` with exactly 3 millisecond digits.
    ///
    /// Years outside `[0, 9999]` are clamped here for rendering only;
    /// marshaling such values fails validation instead.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = *b"0000-00-00T00:00:00.000Z";
        let wall = self.wall;
        write_digits(&mut buf[0..4], wall.year().clamp(0, 9999) as u32);
        write_digits(&mut buf[5..7], wall.month());
        write_digits(&mut buf[8..10], wall.day());
        write_digits(&mut buf[11..13], wall.hour());
        write_digits(&mut buf[14..16], wall.minute());
        write_digits(&mut buf[17..19], wall.second());
        write_digits(&mut buf[20..23], wall.timestamp_subsec_millis().min(999));
        f.write_str(std::str::from_utf8(&buf).expect("buffer is ascii"))
    }
}

fn write_digits(buf: &mut [u8], mut val: u32) {
    for slot in buf.iter_mut().rev() {
        *slot = b'0' + (val % 10) as u8;
        val /= 10;
    }
}

impl Serialize for UtcTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_zero() {
            return serializer.serialize_str("");
        }
        self.validate_iso8601().map_err(serde::ser::Error::custom)?;
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UtcTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UtcTimeVisitor;

        impl serde::de::Visitor<'_> for UtcTimeVisitor {
            type Value = UtcTime;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an ISO 8601 timestamp string")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<UtcTime, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(UtcTimeVisitor)
    }
}
