use chrono::{DateTime, NaiveTime, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Upper bound of simulated power output in watt.
pub const DEFAULT_PEAK_POWER_WATTS: f64 = 3_500.0;

// Daylight window in fractional hours from midnight.
const DAWN_HOUR: f64 = 5.0;
const DUSK_HOUR: f64 = 21.0;

// Clear-sky curve parameters: a Kumaraswamy bell over the daylight window,
// scaled so the maximum lands near 3300 W around 14:00.
const CURVE_SHAPE_A: f64 = 2.8;
const CURVE_SHAPE_B: f64 = 3.3;
const CURVE_SCALING_WATTS: f64 = 1_650.0;

// Weather variance: multiplicative jitter within +/- 1 %.
const JITTER_FRACTION: f64 = 0.01;

/// Simulated photovoltaic component.
///
/// [`PvPanel::power_at`] is a pure function of the panel's seed and the
/// queried timestamp: the jitter is drawn from an RNG seeded per timestamp,
/// so the same seed and timestamp always produce the same value regardless
/// of call order. No I/O, no failure modes.
#[derive(Debug, Clone)]
pub struct PvPanel {
    peak_power_watts: f64,
    seed: u64,
}

impl PvPanel {
    pub fn new(peak_power_watts: f64, seed: u64) -> Self {
        Self {
            peak_power_watts,
            seed,
        }
    }

    pub fn peak_power_watts(&self) -> f64 {
        self.peak_power_watts
    }

    /// Simulated power output in watt at the given instant, always within
    /// `[0, peak_power_watts]` and exactly zero outside the daylight window.
    pub fn power_at(&self, timestamp: DateTime<Utc>) -> f64 {
        let clear_sky = clear_sky_output(timestamp.time());
        if clear_sky == 0.0 {
            return 0.0;
        }
        (clear_sky * self.jitter_at(timestamp)).clamp(0.0, self.peak_power_watts)
    }

    fn jitter_at(&self, timestamp: DateTime<Utc>) -> f64 {
        let mut rng = StdRng::seed_from_u64(self.seed ^ timestamp.timestamp_millis() as u64);
        rng.gen_range(1.0 - JITTER_FRACTION..1.0 + JITTER_FRACTION)
    }
}

impl Default for PvPanel {
    fn default() -> Self {
        Self::new(DEFAULT_PEAK_POWER_WATTS, 0)
    }
}

/// Idealized cloudless output for a time of day.
fn clear_sky_output(time_of_day: NaiveTime) -> f64 {
    let hour = fractional_hour(time_of_day);
    if hour <= DAWN_HOUR || hour >= DUSK_HOUR {
        return 0.0;
    }
    let x = (hour - DAWN_HOUR) / (DUSK_HOUR - DAWN_HOUR);
    kumaraswamy_pdf(CURVE_SHAPE_A, CURVE_SHAPE_B, x) * CURVE_SCALING_WATTS
}

/// Probability density of the Kumaraswamy distribution on `(0, 1)`.
fn kumaraswamy_pdf(a: f64, b: f64, x: f64) -> f64 {
    a * b * x.powf(a - 1.0) * (1.0 - x.powf(a)).powf(b - 1.0)
}

fn fractional_hour(time: NaiveTime) -> f64 {
    f64::from(time.hour())
        + f64::from(time.minute()) / 60.0
        + f64::from(time.second()) / 3_600.0
        + f64::from(time.nanosecond()) / 3_600_000_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 21, hour, minute, 0).unwrap()
    }

    fn panel() -> PvPanel {
        PvPanel::new(DEFAULT_PEAK_POWER_WATTS, 42)
    }

    /// Reference values read off the expected production curve, with 10 %
    /// relative tolerance to absorb the curve shape and jitter.
    fn roughly(actual: f64, expected: f64) -> bool {
        (1.0 - actual / expected).abs() <= 0.1
    }

    #[test]
    fn dark_hours_produce_no_power() {
        assert_eq!(panel().power_at(at(0, 0)), 0.0);
        assert_eq!(panel().power_at(at(4, 59)), 0.0);
        assert_eq!(panel().power_at(at(21, 0)), 0.0);
        assert_eq!(panel().power_at(at(22, 30)), 0.0);
    }

    #[test]
    fn output_rises_towards_an_afternoon_peak() {
        assert!(roughly(panel().power_at(at(10, 0)), 1_750.0));
        assert!(roughly(panel().power_at(at(14, 0)), 3_300.0));
        assert!(roughly(panel().power_at(at(18, 0)), 1_750.0));
    }

    #[test]
    fn output_stays_within_bounds_across_the_day() {
        let panel = panel();
        for minute_of_day in 0..(24 * 60) {
            let power = panel.power_at(at(minute_of_day / 60, minute_of_day % 60));
            assert!(power >= 0.0);
            assert!(power <= panel.peak_power_watts());
        }
    }

    #[test]
    fn same_seed_and_timestamp_give_the_same_value() {
        let first = PvPanel::new(DEFAULT_PEAK_POWER_WATTS, 7);
        let second = PvPanel::new(DEFAULT_PEAK_POWER_WATTS, 7);
        let timestamp = at(14, 0);
        assert_eq!(first.power_at(timestamp), second.power_at(timestamp));
        // Call order must not matter either.
        let _ = first.power_at(at(10, 0));
        assert_eq!(first.power_at(timestamp), second.power_at(timestamp));
    }

    #[test]
    fn different_seeds_vary_the_jitter() {
        let timestamp = at(14, 0);
        let baseline = PvPanel::new(DEFAULT_PEAK_POWER_WATTS, 0).power_at(timestamp);
        let differing = (1..20)
            .map(|seed| PvPanel::new(DEFAULT_PEAK_POWER_WATTS, seed).power_at(timestamp))
            .filter(|power| (power - baseline).abs() > f64::EPSILON)
            .count();
        assert!(differing > 0);
    }

    #[test]
    fn peak_power_caps_the_output() {
        let capped = PvPanel::new(1_000.0, 42);
        for hour in 5..21 {
            assert!(capped.power_at(at(hour, 30)) <= 1_000.0);
        }
    }
}
