use crate::reading::Reading;

/// Ordered accumulation of confirmed readings.
///
/// The engine appends a reading only after the broker has confirmed its
/// delivery, so the collected sequence reflects exactly what was delivered.
/// Single owner, no concurrent writers; handed to the output writer only
/// once the schedule is exhausted.
#[derive(Debug, Default)]
pub struct ReadingCollector {
    readings: Vec<Reading>,
}

impl ReadingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a confirmed reading. Readings must arrive in generation
    /// order; timestamps are strictly increasing.
    pub fn record(&mut self, reading: Reading) {
        if let Some(last) = self.readings.last() {
            debug_assert!(
                last.timestamp < reading.timestamp,
                "readings must be recorded in strictly increasing timestamp order"
            );
        }
        self.readings.push(reading);
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Final sequence, in generation order.
    pub fn into_readings(self) -> Vec<Reading> {
        self.readings
    }
}
