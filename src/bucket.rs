//! Time bucketing: maps record timestamps to dense, stable indices of
//! contiguous fixed-width UTC intervals.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

pub trait Bucketer: Send + Sync {
    fn bucket(&self, t: DateTime<Utc>) -> usize;
}

/// A growing table of Δ-spaced bucket start instants. The first
/// observation seeds bucket 0; later observations beyond the end extend
/// the table with contiguous buckets. Indices are never re-numbered and
/// buckets are never removed or re-seeded; instants earlier than the
/// seed clamp to bucket 0.
pub struct BucketTable {
    interval: Duration,
    buckets: Mutex<Vec<DateTime<Utc>>>,
}

impl BucketTable {
    pub fn new(interval_mins: i64) -> Self {
        BucketTable {
            interval: Duration::minutes(interval_mins),
            buckets: Mutex::new(Vec::new()),
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().unwrap().len()
    }

    /// Snapshot of the bucket start instants, for summary emitters.
    pub fn starts(&self) -> Vec<DateTime<Utc>> {
        self.buckets.lock().unwrap().clone()
    }
}

impl Bucketer for BucketTable {
    fn bucket(&self, t: DateTime<Utc>) -> usize {
        let mut buckets = self.buckets.lock().unwrap();

        if buckets.is_empty() {
            buckets.push(t);
            return 0;
        }
        if t < buckets[0] {
            return 0;
        }

        let last = *buckets.last().unwrap();
        if t >= last + self.interval {
            // extend with contiguous buckets up to and including t's
            let mut next = last + self.interval;
            while t >= next + self.interval {
                buckets.push(next);
                next = next + self.interval;
            }
            buckets.push(next);
            return buckets.len() - 1;
        }

        // greatest i with buckets[i] <= t
        buckets.partition_point(|start| *start <= t) - 1
    }
}

/// Degenerate bucketer collapsing everything into bucket 0, used when a
/// run does not want a time series.
pub struct ZeroBucketer;

impl Bucketer for ZeroBucketer {
    fn bucket(&self, _t: DateTime<Utc>) -> usize {
        0
    }
}
