//! Wire-format constants and timestamp conversion
//!
//! Header layout (little-endian, 50 bytes):
//!
//! ```text
//! offset  size  field
//!      0     4  unique_id            (i32)
//!      4     1  priority             (u8)
//!      5     8  creation_date        (i64, UTC ticks)
//!     13    24  destination + source (6 x i32: type, module, function each)
//!     37     1  response_status      (u8)
//!     38    12  section sizes        (3 x i32: text, request, response)
//! ```

use chrono::{DateTime, Utc};

use crate::error::{ParseError, ParseResult};

/// Size of the fixed envelope header in bytes.
pub const HEADER_SIZE: usize = 50;

/// Upper bound on any single variable section, mirroring the transport's
/// maximum message size.
pub const MAX_SECTION_SIZE: usize = 16 * 1024 * 1024;

/// Ticks per second: a tick is 100ns.
pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Tick count of the Unix epoch (ticks count from 0001-01-01T00:00:00Z).
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Convert a UTC timestamp to wire ticks, truncating below 100ns resolution.
pub fn datetime_to_ticks(value: DateTime<Utc>) -> i64 {
    UNIX_EPOCH_TICKS
        + value.timestamp() * TICKS_PER_SECOND
        + i64::from(value.timestamp_subsec_nanos()) / 100
}

/// Convert wire ticks back to a UTC timestamp.
pub fn ticks_to_datetime(ticks: i64) -> ParseResult<DateTime<Utc>> {
    let delta = ticks - UNIX_EPOCH_TICKS;
    let secs = delta.div_euclid(TICKS_PER_SECOND);
    let nanos = (delta.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(secs, nanos).ok_or(ParseError::InvalidTimestamp { ticks })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_epoch_ticks() {
        let epoch = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(datetime_to_ticks(epoch), UNIX_EPOCH_TICKS);
        assert_eq!(ticks_to_datetime(UNIX_EPOCH_TICKS).unwrap(), epoch);
    }

    #[test]
    fn test_tick_round_trip_at_100ns_resolution() {
        let value = DateTime::from_timestamp(1_700_000_000, 123_456_700).unwrap();
        let ticks = datetime_to_ticks(value);
        assert_eq!(ticks_to_datetime(ticks).unwrap(), value);
    }

    #[test]
    fn test_sub_tick_precision_truncates() {
        let value = DateTime::from_timestamp(1_700_000_000, 123_456_789).unwrap();
        let truncated = ticks_to_datetime(datetime_to_ticks(value)).unwrap();
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_456_700);
    }

    #[test]
    fn test_out_of_range_ticks_rejected() {
        assert!(matches!(
            ticks_to_datetime(i64::MAX),
            Err(ParseError::InvalidTimestamp { .. })
        ));
    }
}
