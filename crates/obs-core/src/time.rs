//! Julian-day conversion for vendor timestamps.

use chrono::{DateTime, Duration, Utc};

/// Julian day of the Unix epoch, 1970-01-01T00:00:00Z.
pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;

const MICROS_PER_DAY: f64 = 86_400_000_000.0;

/// Convert a Julian day number into a UTC timestamp, to microsecond precision.
///
/// Out-of-range values saturate.
pub fn datetime_from_jd(jd: f64) -> DateTime<Utc> {
    let micros = ((jd - UNIX_EPOCH_JD) * MICROS_PER_DAY).round() as i64;
    DateTime::<Utc>::UNIX_EPOCH
        .checked_add_signed(Duration::microseconds(micros))
        .unwrap_or(if micros < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Inverse of [`datetime_from_jd`].
pub fn jd_from_datetime(t: DateTime<Utc>) -> f64 {
    let micros = (t - DateTime::<Utc>::UNIX_EPOCH).num_microseconds().unwrap_or(i64::MAX);
    UNIX_EPOCH_JD + micros as f64 / MICROS_PER_DAY
}
