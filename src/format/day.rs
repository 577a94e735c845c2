use crate::error::ParserError;
use crate::format::{Formatter, RecordInfo};
use crate::models::RecordStack;
use crate::sink::SerialWriter;
use bytes::Bytes;
use chrono::Timelike;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hour-of-day histogram over record timestamps (UTC). Counting is
/// lock-free; the 24 lines are emitted at summary time.
pub struct DayFormatter {
    hours: [AtomicU64; 24],
    out: Arc<SerialWriter>,
}

impl DayFormatter {
    pub fn new(out: Arc<SerialWriter>) -> Self {
        DayFormatter {
            hours: std::array::from_fn(|_| AtomicU64::new(0)),
            out,
        }
    }
}

impl Formatter for DayFormatter {
    fn format(&self, record: &RecordStack, _info: &RecordInfo) -> Result<Option<Bytes>, ParserError> {
        let hour = record.timestamp().hour() as usize;
        self.hours[hour].fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    fn summarize(&self) {
        for (hour, count) in self.hours.iter().enumerate() {
            let line = format!("{} {}\n", hour, count.load(Ordering::Relaxed));
            let _ = self.out.write_str(&line);
        }
    }
}
