//! # Temporal Profile — ISO 8601 Extended Date-Time Strings
//!
//! Timestamp-shaped fields (`dateTime`, `fromDateTime`, `dateCreated`,
//! `startTime`, ...) are carried as strings so that ranges compare
//! lexicographically on their wire form. This module decides whether such
//! a string conforms to the catalog's profile:
//!
//! ```text
//! [-]CCYY-MM-DDThh:mm:ss[Z|(+|-)hh:mm]
//! ```
//!
//! The zone designator is optional. Fractional seconds are not part of the
//! profile and are rejected. Beyond the shape, the date and time must
//! exist on the calendar (`2024-02-30` is rejected), which is delegated
//! to `chrono`.

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

/// The profile as a regular expression, for schema-mirror documents.
///
/// The shape check below is the authoritative one; this pattern cannot
/// express calendar validity.
pub const TIMESTAMP_PATTERN: &str =
    r"^-?[0-9]{4}-[0-9]{2}-[0-9]{2}T[0-9]{2}:[0-9]{2}:[0-9]{2}(Z|[+-][0-9]{2}:[0-9]{2})?$";

/// Why a string is not a profile-conforming timestamp.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// The string does not have the `CCYY-MM-DDThh:mm:ss` layout.
    #[error("{0:?} does not match [-]CCYY-MM-DDThh:mm:ss[Z|(+|-)hh:mm]")]
    Shape(String),

    /// The zone designator is neither `Z` nor a valid `±hh:mm` offset.
    #[error("{0:?} has an invalid zone designator")]
    Zone(String),

    /// Well-shaped, but not a real date or time of day.
    #[error("{0:?} is not a valid calendar date-time")]
    Calendar(String),
}

/// Check a string against the timestamp profile.
///
/// # Errors
///
/// Returns the first [`TimestampError`] encountered: shape, then zone,
/// then calendar validity.
pub fn check_timestamp(s: &str) -> Result<(), TimestampError> {
    let shape = || TimestampError::Shape(s.to_string());

    if !s.is_ascii() {
        return Err(shape());
    }
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let bytes = body.as_bytes();
    if bytes.len() < 19 {
        return Err(shape());
    }

    const SEPARATORS: [(usize, u8); 5] = [(4, b'-'), (7, b'-'), (10, b'T'), (13, b':'), (16, b':')];
    for (pos, byte) in bytes[..19].iter().enumerate() {
        let expected = SEPARATORS.iter().find(|(p, _)| *p == pos).map(|(_, b)| *b);
        let ok = match expected {
            Some(sep) => *byte == sep,
            None => byte.is_ascii_digit(),
        };
        if !ok {
            return Err(shape());
        }
    }

    check_zone(&body[19..]).map_err(|()| TimestampError::Zone(s.to_string()))?;

    let field = |range: std::ops::Range<usize>| -> u32 {
        body[range]
            .bytes()
            .fold(0u32, |acc, b| acc * 10 + u32::from(b - b'0'))
    };
    let year = field(0..4) as i32;
    let year = if negative { -year } else { year };

    let calendar = || TimestampError::Calendar(s.to_string());
    NaiveDate::from_ymd_opt(year, field(5..7), field(8..10)).ok_or_else(calendar)?;
    NaiveTime::from_hms_opt(field(11..13), field(14..16), field(17..19)).ok_or_else(calendar)?;
    Ok(())
}

/// Whether a string conforms to the timestamp profile.
pub fn is_timestamp(s: &str) -> bool {
    check_timestamp(s).is_ok()
}

fn check_zone(zone: &str) -> Result<(), ()> {
    match zone.as_bytes() {
        [] | [b'Z'] => Ok(()),
        [sign, h1, h2, b':', m1, m2] if (*sign == b'+' || *sign == b'-') => {
            let digits = [h1, h2, m1, m2];
            if !digits.iter().all(|d| d.is_ascii_digit()) {
                return Err(());
            }
            let hours = (h1 - b'0') * 10 + (h2 - b'0');
            let minutes = (m1 - b'0') * 10 + (m2 - b'0');
            if hours <= 23 && minutes <= 59 {
                Ok(())
            } else {
                Err(())
            }
        }
        _ => Err(()),
    }
}
