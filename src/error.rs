//! Error types produced by parsing, validation and decoding.

use thiserror::Error;

/// Error type for all fallible operations on [`UtcTime`](crate::UtcTime).
///
/// Every failure is returned as an explicit `Result`; the only panicking
/// entry point is [`UtcTime::must_parse`](crate::UtcTime::must_parse), which
/// is reserved for literals that are known to be valid.
#[derive(Error, Debug)]
pub enum TimeError {
    /// None of the accepted ISO 8601 layouts matched the input.
    #[error("TimeError - Parse: no layout matched {input:?}: {source}")]
    Parse {
        input: String,
        #[source]
        source: chrono::ParseError,
    },
    /// The calendar year is outside `[0, 9999]` and cannot be represented
    /// in the fixed 4-digit ISO 8601 form.
    #[error("TimeError - YearOutOfRange: year {year} outside of range [0, 9999]")]
    YearOutOfRange { year: i32 },
    /// A binary payload had a length other than 0 or 9 bytes.
    #[error("TimeError - InvalidLength: invalid length {len} (expected 9)")]
    InvalidLength { len: usize },
}
