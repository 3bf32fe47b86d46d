//! Snowflake-style ID generation.
//!
//! ```text
//! | 42 bits: timestamp (ms since epoch) | 12 bits: worker | 10 bits: sequence |
//! ```
//!
//! - **Timestamp**: milliseconds since 2024-01-01 00:00:00 UTC
//! - **Worker**: per-source identifier (4096 values), random unless configured
//! - **Sequence**: counter within each millisecond (1024 IDs/ms per worker)
//!
//! State lives in the [`SnowflakeIdSource`] value itself, so two sources never share a
//! sequence and tests can build as many independent generators as they need.

use std::{
    sync::Mutex,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use rand::Rng;

use super::IdSource;
use crate::{error::id::IdError, model::id::Id};

/// Custom epoch: 2024-01-01 00:00:00 UTC (milliseconds since Unix epoch).
const EPOCH_MS: u64 = 1_704_067_200_000;

const WORKER_BITS: u32 = 12;
const SEQUENCE_BITS: u32 = 10;
const WORKER_MASK: u64 = (1 << WORKER_BITS) - 1;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

struct SnowflakeState {
    /// Last timestamp used for ID generation.
    last_timestamp: u64,
    /// Sequence counter within the current millisecond.
    sequence: u64,
}

pub struct SnowflakeIdSource {
    worker: u64,
    state: Mutex<SnowflakeState>,
}

impl Default for SnowflakeIdSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SnowflakeIdSource {
    /// Creates a source with a random worker ID mixed with the process ID.
    pub fn new() -> Self {
        let pid = u64::from(std::process::id());
        Self::with_worker(rand::rng().random::<u64>() ^ pid)
    }

    /// Creates a source with a fixed worker ID, truncated to 12 bits.
    pub fn with_worker(worker: u64) -> Self {
        Self {
            worker: worker & WORKER_MASK,
            state: Mutex::new(SnowflakeState {
                last_timestamp: 0,
                sequence: 0,
            }),
        }
    }

    pub fn worker(&self) -> u64 {
        self.worker
    }

    /// Returns the next ID, or `None` when the sequence for the current millisecond is
    /// exhausted.
    fn try_generate(&self, now_ms: u64) -> Option<u64> {
        let timestamp = now_ms.saturating_sub(EPOCH_MS);
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if timestamp > state.last_timestamp {
            state.last_timestamp = timestamp;
            state.sequence = 0;
        } else {
            // Same millisecond, or the clock went backwards and the last timestamp is kept
            if state.sequence >= SEQUENCE_MASK {
                return None;
            }
            state.sequence += 1;
        }

        Some(
            (state.last_timestamp << (WORKER_BITS + SEQUENCE_BITS))
                | (self.worker << SEQUENCE_BITS)
                | state.sequence,
        )
    }
}

#[async_trait]
impl IdSource for SnowflakeIdSource {
    async fn next_id(&self) -> Result<Id, IdError> {
        loop {
            let now_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_err(|_| IdError::SystemClock)?
                .as_millis() as u64;

            match self.try_generate(now_ms) {
                Some(id) => return Ok(Id::new(id)),
                // Over 1024 IDs within one millisecond, wait for the next one
                None => tokio::time::sleep(Duration::from_millis(1)).await,
            }
        }
    }
}

/// Milliseconds since the Unix epoch encoded in a snowflake ID.
pub fn extract_unix_millis(id: Id) -> u64 {
    (id.value() >> (WORKER_BITS + SEQUENCE_BITS)) + EPOCH_MS
}

/// Worker portion of a snowflake ID.
pub fn extract_worker(id: Id) -> u64 {
    (id.value() >> SEQUENCE_BITS) & WORKER_MASK
}
