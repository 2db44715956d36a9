//! Time-derived filenames for new files

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Hands out `<seconds>.<nanoseconds>` names from the wall clock
///
/// The underlying nanosecond stamp is strictly increasing across every
/// caller, so two creators asking in the same clock tick (or across a clock
/// step backwards) still get distinct names.
#[derive(Debug, Default)]
pub struct NameGenerator {
    last: AtomicU64,
}

impl NameGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let mut prev = self.last.load(Ordering::Relaxed);
        let stamp = loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break candidate,
                Err(actual) => prev = actual,
            }
        };

        format!("{}.{:09}", stamp / NANOS_PER_SEC, stamp % NANOS_PER_SEC)
    }
}
