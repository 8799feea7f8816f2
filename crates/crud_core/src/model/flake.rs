//! Time-ordered 64-bit id generator.
//!
//! # Responsibility
//! - Produce surrogate keys for employees, phone numbers and addresses
//!   before they reach storage, so relations can be wired in memory.
//!
//! # Invariants
//! - Ids from one generator are strictly increasing.
//! - Ids are always positive (`bit 63` is never set).
//!
//! Layout: 41 bits of milliseconds since [`FLAKE_EPOCH_MS`], 10 bits node,
//! 12 bits per-millisecond sequence.

use chrono::Utc;
use once_cell::sync::Lazy;
use std::sync::Mutex;

/// 2020-01-01T00:00:00Z in epoch milliseconds.
pub const FLAKE_EPOCH_MS: i64 = 1_577_836_800_000;

const NODE_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_NODE_ID: u16 = (1 << NODE_BITS) - 1;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;

static DEFAULT_GENERATOR: Lazy<Mutex<FlakeIdGenerator>> =
    Lazy::new(|| Mutex::new(FlakeIdGenerator::new(0)));

/// Stateful flake id generator bound to one node id.
#[derive(Debug)]
pub struct FlakeIdGenerator {
    node_id: i64,
    last_timestamp: i64,
    sequence: i64,
}

impl FlakeIdGenerator {
    /// Creates a generator. Node ids above 1023 are masked into range.
    pub fn new(node_id: u16) -> Self {
        Self {
            node_id: i64::from(node_id & MAX_NODE_ID),
            last_timestamp: -1,
            sequence: 0,
        }
    }

    /// Returns the next id.
    pub fn next_id(&mut self) -> i64 {
        self.next_id_with(current_millis)
    }

    /// Same as [`Self::next_id`] with an explicit millisecond clock.
    fn next_id_with(&mut self, clock: impl Fn() -> i64) -> i64 {
        // A clock that went backwards keeps the last timestamp.
        let mut timestamp = clock().max(self.last_timestamp);

        if timestamp == self.last_timestamp {
            self.sequence = (self.sequence + 1) & SEQUENCE_MASK;
            if self.sequence == 0 {
                // Sequence exhausted for this millisecond.
                timestamp = wait_next_millis(self.last_timestamp, &clock);
            }
        } else {
            self.sequence = 0;
        }

        self.last_timestamp = timestamp;
        compose(timestamp, self.node_id, self.sequence)
    }
}

/// Returns the next id from the process-wide generator (node `0`).
pub fn next_id() -> i64 {
    match DEFAULT_GENERATOR.lock() {
        Ok(mut generator) => generator.next_id(),
        Err(poisoned) => poisoned.into_inner().next_id(),
    }
}

/// Extracts the creation timestamp (epoch ms) embedded in a flake id.
pub fn timestamp_of(id: i64) -> i64 {
    (id >> (NODE_BITS + SEQUENCE_BITS)) + FLAKE_EPOCH_MS
}

fn compose(timestamp: i64, node_id: i64, sequence: i64) -> i64 {
    ((timestamp - FLAKE_EPOCH_MS) << (NODE_BITS + SEQUENCE_BITS))
        | (node_id << SEQUENCE_BITS)
        | sequence
}

fn wait_next_millis(last_timestamp: i64, clock: &impl Fn() -> i64) -> i64 {
    let mut timestamp = clock();
    while timestamp <= last_timestamp {
        std::hint::spin_loop();
        timestamp = clock();
    }
    timestamp
}

fn current_millis() -> i64 {
    Utc::now().timestamp_millis().max(FLAKE_EPOCH_MS)
}

#[cfg(test)]
mod tests {
    use super::{next_id, timestamp_of, FlakeIdGenerator, FLAKE_EPOCH_MS, SEQUENCE_MASK};
    use std::cell::Cell;

    const FIXED_MS: i64 = FLAKE_EPOCH_MS + 1_000;

    #[test]
    fn ids_are_positive_and_strictly_increasing() {
        let mut generator = FlakeIdGenerator::new(7);
        let mut previous = generator.next_id();
        assert!(previous > 0);
        for _ in 0..10_000 {
            let current = generator.next_id();
            assert!(current > previous, "{current} should be > {previous}");
            previous = current;
        }
    }

    #[test]
    fn node_id_is_embedded() {
        let mut generator = FlakeIdGenerator::new(5);
        let id = generator.next_id();
        assert_eq!((id >> 12) & 0x3ff, 5);
    }

    #[test]
    fn timestamp_roundtrips_through_id() {
        let id = next_id();
        assert!(timestamp_of(id) >= FLAKE_EPOCH_MS);
    }

    #[test]
    fn clock_regression_keeps_last_timestamp() {
        let mut generator = FlakeIdGenerator::new(1);
        let first = generator.next_id_with(|| FIXED_MS);
        let second = generator.next_id_with(|| FIXED_MS - 5);

        assert!(second > first);
        assert_eq!(timestamp_of(second), FIXED_MS);
        assert_eq!(second & SEQUENCE_MASK, 1);
    }

    #[test]
    fn sequence_overflow_waits_for_next_millisecond() {
        let calls = Cell::new(0_i64);
        // 4096 ids fill the millisecond; the 4097th call still sees it.
        let clock = || {
            calls.set(calls.get() + 1);
            if calls.get() <= SEQUENCE_MASK + 2 {
                FIXED_MS
            } else {
                FIXED_MS + 1
            }
        };

        let mut generator = FlakeIdGenerator::new(2);
        let mut previous = generator.next_id_with(clock);
        for _ in 0..SEQUENCE_MASK {
            let current = generator.next_id_with(clock);
            assert_eq!(timestamp_of(current), FIXED_MS);
            assert!(current > previous);
            previous = current;
        }
        assert_eq!(previous & SEQUENCE_MASK, SEQUENCE_MASK);

        let rolled = generator.next_id_with(clock);
        assert!(rolled > previous);
        assert_eq!(timestamp_of(rolled), FIXED_MS + 1);
        assert_eq!(rolled & SEQUENCE_MASK, 0);
    }
}
