//! Per-device filtering of RuuviTag measurements.
//!
//! Tags broadcast several times a second while the data changes slowly, so
//! each device gets its own strategy deciding which readings are worth
//! storing. Two policies exist:
//!
//! - [`TimeGated`] accepts at most one reading per update interval.
//! - [`MotionSensitive`] follows the same gate but additionally accepts the
//!   reading where the acceleration jumps past a threshold and the first
//!   reading after it settles again.

use crate::measurement::Measurement;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Default minimum interval between stored readings of one device.
pub const DEFAULT_UPDATE_LIMIT: Duration = Duration::from_millis(9900);
/// Default acceleration change (in g) treated as motion.
pub const DEFAULT_THRESHOLD: f64 = 0.05;
/// Default number of readings kept for motion detection.
pub const DEFAULT_HISTORY_SIZE: NonZeroUsize = match NonZeroUsize::new(3) {
    Some(n) => n,
    None => unreachable!(),
};

/// Available filtering policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StrategyKind {
    /// Accept at most one reading per update interval
    TimeGated,
    /// Time gated, but always accept the start and end of a motion event
    #[default]
    MotionSensitive,
}

/// Validated configuration shared by every device's strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    pub update_limit: Duration,
    /// Whether a reading exactly `update_limit` after the last accepted one
    /// is accepted.
    pub inclusive_boundary: bool,
    pub threshold: f64,
    pub history_size: NonZeroUsize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            kind: StrategyKind::default(),
            update_limit: DEFAULT_UPDATE_LIMIT,
            inclusive_boundary: true,
            threshold: DEFAULT_THRESHOLD,
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

/// Accepts a reading when at least `update_limit` has passed since the last
/// accepted one. The first reading is always accepted.
#[derive(Debug, Clone)]
pub struct TimeGated {
    update_limit: Duration,
    inclusive_boundary: bool,
    last_accepted: Option<Instant>,
}

impl TimeGated {
    pub fn new(update_limit: Duration, inclusive_boundary: bool) -> Self {
        TimeGated {
            update_limit,
            inclusive_boundary,
            last_accepted: None,
        }
    }

    /// Decide for a reading arriving at `now`, restarting the interval when
    /// it is accepted.
    pub fn should_accept(&mut self, now: Instant) -> bool {
        let accept = match self.last_accepted {
            None => true,
            Some(last) => {
                let elapsed = now.saturating_duration_since(last);
                if self.inclusive_boundary {
                    elapsed >= self.update_limit
                } else {
                    elapsed > self.update_limit
                }
            }
        };
        if accept {
            self.last_accepted = Some(now);
        }
        accept
    }

    pub fn apply(&mut self, measurement: Measurement, now: Instant) -> Option<Measurement> {
        self.should_accept(now).then_some(measurement)
    }
}

/// Per-axis acceleration; an invalid axis is `None`.
type Acceleration = [Option<f64>; 3];

/// [`TimeGated`] with a motion override.
///
/// Keeps the acceleration of the last `history_size` readings. When the gate
/// discards a reading whose acceleration differs from the previous reading by
/// more than `threshold` on any axis valid in both, the reading is accepted
/// and the device is marked as moving. The first reading that no longer breaches the
/// threshold is accepted as well and clears the mark.
#[derive(Debug, Clone)]
pub struct MotionSensitive {
    gate: TimeGated,
    threshold: f64,
    history_size: NonZeroUsize,
    history: VecDeque<Acceleration>,
    outside_threshold: bool,
}

impl MotionSensitive {
    pub fn new(gate: TimeGated, threshold: f64, history_size: NonZeroUsize) -> Self {
        MotionSensitive {
            gate,
            threshold,
            history_size,
            history: VecDeque::with_capacity(history_size.get()),
            outside_threshold: false,
        }
    }

    /// Whether the latest reading left the threshold and the return to rest
    /// has not been recorded yet.
    #[allow(dead_code)] // Used in tests
    pub(crate) fn in_motion(&self) -> bool {
        self.outside_threshold
    }

    pub fn apply(&mut self, measurement: Measurement, now: Instant) -> Option<Measurement> {
        self.history.push_back(measurement.acceleration());
        if self.history.len() > self.history_size.get() {
            self.history.pop_front();
        }

        // The gate always runs so its clock follows every reading.
        if self.gate.should_accept(now) {
            return Some(measurement);
        }

        let previous = match self.history.len() {
            n if n >= 2 => self.history[n - 2],
            _ => return None,
        };

        if self.breaches_threshold(measurement.acceleration(), previous) {
            self.outside_threshold = true;
            Some(measurement)
        } else if self.outside_threshold {
            self.outside_threshold = false;
            Some(measurement)
        } else {
            None
        }
    }

    fn breaches_threshold(&self, current: Acceleration, previous: Acceleration) -> bool {
        current
            .iter()
            .zip(previous.iter())
            .any(|pair| match pair {
                (Some(c), Some(p)) => (c - p).abs() > self.threshold,
                _ => false,
            })
    }
}

/// A device's filtering policy, fixed when the device is first seen.
#[derive(Debug, Clone)]
pub enum Strategy {
    TimeGated(TimeGated),
    MotionSensitive(MotionSensitive),
}

impl Strategy {
    pub fn from_config(config: &StrategyConfig) -> Self {
        let gate = TimeGated::new(config.update_limit, config.inclusive_boundary);
        match config.kind {
            StrategyKind::TimeGated => Strategy::TimeGated(gate),
            StrategyKind::MotionSensitive => Strategy::MotionSensitive(MotionSensitive::new(
                gate,
                config.threshold,
                config.history_size,
            )),
        }
    }

    /// Returns the measurement if it should be stored.
    pub fn apply(&mut self, measurement: Measurement, now: Instant) -> Option<Measurement> {
        match self {
            Strategy::TimeGated(s) => s.apply(measurement, now),
            Strategy::MotionSensitive(s) => s.apply(measurement, now),
        }
    }
}

/// Parse a duration from a human-readable string.
///
/// Supports the following suffixes:
/// - `s` or no suffix: seconds
/// - `m`: minutes
/// - `h`: hours
/// - `ms`: milliseconds
///
/// # Examples
/// ```
/// use ruuvitag_collector::strategy::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
/// assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration("9900ms").unwrap(), Duration::from_millis(9900));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();

    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    let parse = |num: &str, unit: &str| -> Result<u64, String> {
        num.trim()
            .parse()
            .map_err(|_| format!("invalid {unit}: {num}"))
    };

    if let Some(num) = src.strip_suffix("ms") {
        return Ok(Duration::from_millis(parse(num, "milliseconds")?));
    }
    if let Some(num) = src.strip_suffix('h') {
        return parse(num, "hours")?
            .checked_mul(3600)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration too large: {src}"));
    }
    if let Some(num) = src.strip_suffix('m') {
        return parse(num, "minutes")?
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration too large: {src}"));
    }
    if let Some(num) = src.strip_suffix('s') {
        return Ok(Duration::from_secs(parse(num, "seconds")?));
    }

    // No suffix, treat as seconds
    Ok(Duration::from_secs(parse(src, "duration")?))
}
