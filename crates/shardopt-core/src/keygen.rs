//! # Key Generators
//!
//! A key generator produces surrogate primary-key values for inserts that omit the
//! key column. Generators are the only stateful collaborator of the optimize layer;
//! each one owns the atomicity of its own counter so that concurrent optimizations
//! can share a generator behind `Arc` without extra locking.
//!
//! ## Snowflake Layout
//!
//! ```text
//! | 1 bit sign | 41 bits ms since 2016-11-01 | 10 bits worker id | 12 bits sequence |
//! ```
//!
//! The sequence restarts every millisecond. If it overflows within one millisecond
//! the generator waits for the clock to advance. If the clock moves backwards the
//! generator keeps using the last timestamp it issued.

use crate::function::now_millis;
use crate::value::ScalarValue;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// Produces surrogate key values.
pub trait KeyGenerator: Send + Sync {
    fn next_key(&self) -> ScalarValue;
}

/// Sequential integer keys, starting at a configured value.
#[derive(Debug)]
pub struct IncrementKeyGenerator {
    next: AtomicI64,
}

impl IncrementKeyGenerator {
    pub fn new(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }
}

impl Default for IncrementKeyGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl KeyGenerator for IncrementKeyGenerator {
    fn next_key(&self) -> ScalarValue {
        ScalarValue::Int64(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

/// Random v4 UUIDs rendered without dashes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidKeyGenerator;

impl KeyGenerator for UuidKeyGenerator {
    fn next_key(&self) -> ScalarValue {
        ScalarValue::Utf8(uuid::Uuid::new_v4().simple().to_string())
    }
}

/// 2016-11-01T00:00:00Z in ms since the Unix epoch.
pub const SNOWFLAKE_EPOCH_MS: i64 = 1_477_958_400_000;

const WORKER_ID_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;
pub const MAX_WORKER_ID: u16 = (1 << WORKER_ID_BITS) - 1;

#[derive(Debug, Default)]
struct SnowflakeState {
    last_ms: i64,
    sequence: i64,
}

/// Time-ordered 64-bit keys (see the module docs for the bit layout).
#[derive(Debug)]
pub struct SnowflakeKeyGenerator {
    worker_id: i64,
    state: Mutex<SnowflakeState>,
}

impl SnowflakeKeyGenerator {
    /// Worker ids above [`MAX_WORKER_ID`] are masked to 10 bits.
    pub fn new(worker_id: u16) -> Self {
        Self {
            worker_id: i64::from(worker_id & MAX_WORKER_ID),
            state: Mutex::new(SnowflakeState::default()),
        }
    }

    pub fn worker_id(&self) -> i64 {
        self.worker_id
    }

    fn next_id(&self) -> i64 {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut now = now_millis().max(state.last_ms);
        if now == state.last_ms {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                while now <= state.last_ms {
                    std::hint::spin_loop();
                    now = now_millis();
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_ms = now;
        ((now - SNOWFLAKE_EPOCH_MS) << (WORKER_ID_BITS + SEQUENCE_BITS))
            | (self.worker_id << SEQUENCE_BITS)
            | state.sequence
    }
}

impl Default for SnowflakeKeyGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl KeyGenerator for SnowflakeKeyGenerator {
    fn next_key(&self) -> ScalarValue {
        ScalarValue::Int64(self.next_id())
    }
}
