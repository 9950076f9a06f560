//! Virtual simulation time.
//!
//! Time is counted in integer nanoseconds so that ordering and equality are
//! exact. Floating point only appears at the edges (`from_secs_f64`,
//! `as_secs_f64`) where models express rates and distances.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A point in virtual time, in nanoseconds since simulation start.
///
/// Never negative. Observed time only moves forward: every event callback
/// sees a value greater than or equal to the one seen by the previous event.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimTime(u64);

impl SimTime {
    /// Simulation start.
    pub const ZERO: Self = SimTime(0);

    /// Largest representable time.
    pub const MAX: Self = SimTime(u64::MAX);

    pub const fn from_nanos(nanos: u64) -> Self {
        SimTime(nanos)
    }

    pub const fn from_micros(micros: u64) -> Self {
        SimTime(micros.saturating_mul(NANOS_PER_MICRO))
    }

    pub const fn from_millis(millis: u64) -> Self {
        SimTime(millis.saturating_mul(NANOS_PER_MILLI))
    }

    pub const fn from_secs(secs: u64) -> Self {
        SimTime(secs.saturating_mul(NANOS_PER_SEC))
    }

    /// Create from fractional seconds, rounding to the nearest nanosecond.
    ///
    /// Negative and NaN inputs clamp to [`SimTime::ZERO`].
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            return Self::ZERO;
        }
        // `as` saturates at u64::MAX for out-of-range floats.
        SimTime((secs * NANOS_PER_SEC as f64).round() as u64)
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    /// Add a (possibly negative) duration.
    ///
    /// Returns `None` if the result would be negative or overflow.
    pub fn checked_add(self, delta: SimDuration) -> Option<Self> {
        let nanos = delta.as_nanos();
        if nanos >= 0 {
            self.0.checked_add(nanos as u64).map(SimTime)
        } else {
            self.0.checked_sub(nanos.unsigned_abs()).map(SimTime)
        }
    }

    /// Subtract a (possibly negative) duration.
    pub fn checked_sub(self, delta: SimDuration) -> Option<Self> {
        delta
            .as_nanos()
            .checked_neg()
            .and_then(|n| self.checked_add(SimDuration::from_nanos(n)))
    }

    /// Signed distance from `earlier` to `self`, saturating at the `i64` range.
    pub fn duration_since(self, earlier: SimTime) -> SimDuration {
        let diff = self.0 as i128 - earlier.0 as i128;
        SimDuration::from_nanos(diff.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "+{}.{:09}s",
            self.0 / NANOS_PER_SEC,
            self.0 % NANOS_PER_SEC
        )
    }
}

impl From<Duration> for SimTime {
    fn from(d: Duration) -> Self {
        SimTime(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }
}

/// A signed span of virtual time, in nanoseconds.
///
/// Signed so that callers computing a delay can hand a negative value to the
/// scheduler and get `NegativeDelay` back rather than a silent wrap.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimDuration(i64);

impl SimDuration {
    pub const ZERO: Self = SimDuration(0);

    pub const fn from_nanos(nanos: i64) -> Self {
        SimDuration(nanos)
    }

    pub const fn from_micros(micros: i64) -> Self {
        SimDuration(micros.saturating_mul(NANOS_PER_MICRO as i64))
    }

    pub const fn from_millis(millis: i64) -> Self {
        SimDuration(millis.saturating_mul(NANOS_PER_MILLI as i64))
    }

    pub const fn from_secs(secs: i64) -> Self {
        SimDuration(secs.saturating_mul(NANOS_PER_SEC as i64))
    }

    /// Create from fractional seconds, rounding to the nearest nanosecond.
    /// NaN maps to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_nan() {
            return Self::ZERO;
        }
        SimDuration((secs * NANOS_PER_SEC as f64).round() as i64)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn saturating_add(self, other: SimDuration) -> Self {
        SimDuration(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for SimDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{}{}.{:09}s",
            sign,
            abs / NANOS_PER_SEC,
            abs % NANOS_PER_SEC
        )
    }
}

impl From<Duration> for SimDuration {
    fn from(d: Duration) -> Self {
        SimDuration(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }
}
