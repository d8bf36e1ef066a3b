use chrono::{DateTime, Duration, Utc};

/// Number of readings in a run: `ceil(duration_hours * 3600 / stride_seconds)`.
///
/// Callers must have validated `stride_seconds > 0`.
pub fn sample_count(stride_seconds: u64, duration_hours: u64) -> u64 {
    debug_assert!(stride_seconds > 0, "stride must be validated before use");
    let duration_seconds = duration_hours * 3_600;
    duration_seconds.div_ceil(stride_seconds)
}

/// Finite schedule of simulated timestamps.
///
/// Yields `start_time + i * stride` for `i` in `[0, sample_count)`, lazily
/// and exactly once; the sequence is not restartable. Pacing is not this
/// type's concern — the engine awaits a wall-clock interval between draws.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    next_timestamp: DateTime<Utc>,
    stride: Duration,
    remaining: u64,
}

impl SimulationClock {
    /// Schedules a run of `duration_hours` starting at `start_time` with one
    /// timestamp every `stride_seconds`.
    pub fn new(start_time: DateTime<Utc>, stride_seconds: u64, duration_hours: u64) -> Self {
        Self {
            next_timestamp: start_time,
            stride: Duration::seconds(stride_seconds as i64),
            remaining: sample_count(stride_seconds, duration_hours),
        }
    }

    /// Timestamps not yet drawn.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for SimulationClock {
    type Item = DateTime<Utc>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next_timestamp;
        self.next_timestamp = current + self.stride;
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SimulationClock {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 21, 6, 0, 0).unwrap()
    }

    #[test]
    fn one_hour_at_five_second_stride_yields_720_timestamps() {
        assert_eq!(SimulationClock::new(start(), 5, 1).count(), 720);
    }

    #[test]
    fn one_day_at_hourly_stride_yields_24_timestamps() {
        assert_eq!(SimulationClock::new(start(), 3_600, 24).count(), 24);
    }

    #[test]
    fn a_stride_that_does_not_divide_the_duration_rounds_up() {
        // 3600 s / 7 s = 514.3 ticks, so one extra covers the remainder.
        assert_eq!(sample_count(7, 1), 515);
        assert_eq!(SimulationClock::new(start(), 7, 1).count(), 515);
    }

    #[test]
    fn timestamps_start_at_start_time_and_step_by_the_stride() {
        let timestamps: Vec<DateTime<Utc>> = SimulationClock::new(start(), 5, 1).collect();
        assert_eq!(timestamps[0], start());
        for (i, window) in timestamps.windows(2).enumerate() {
            assert!(window[0] < window[1], "not increasing at index {}", i);
            assert_eq!((window[1] - window[0]).num_seconds(), 5);
        }
    }

    #[test]
    fn the_schedule_is_exhausted_exactly_once() {
        let mut clock = SimulationClock::new(start(), 3_600, 1);
        assert_eq!(clock.remaining(), 1);
        assert!(clock.next().is_some());
        assert_eq!(clock.remaining(), 0);
        assert!(clock.next().is_none());
        assert!(clock.next().is_none());
    }
}
