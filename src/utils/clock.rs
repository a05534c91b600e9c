use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Server clock for stamping outbound events.
///
/// Stamps are wall-clock UTC at microsecond resolution, but never repeat and
/// never go backwards: if the wall clock stalls or steps back, the next stamp
/// is the previous one plus a microsecond.
#[derive(Debug, Default)]
pub struct EventClock {
    last_micros: AtomicI64,
}

impl EventClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&self) -> DateTime<Utc> {
        self.stamp_from(Utc::now())
    }

    fn stamp_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now_micros = now.timestamp_micros();
        let previous = self
            .last_micros
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now_micros.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        let issued = now_micros.max(previous + 1);
        DateTime::from_timestamp_micros(issued).unwrap_or(now)
    }
}
