//! Snowflake ids for messages the server sent without a `msg_id`.
//!
//! Layout (63 bits used): `(ts - EPOCH_MS) << 22 | machine << 12 | sequence`.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{DyCastError, Result};
use crate::long::Long;

/// Custom epoch, 2001-09-09T01:46:40Z.
pub const EPOCH_MS: i64 = 1_000_000_000_000;
pub const MACHINE_ID_BITS: u32 = 10;
pub const SEQUENCE_BITS: u32 = 12;
pub const MAX_MACHINE_ID: u16 = (1 << MACHINE_ID_BITS) - 1;
const MAX_SEQUENCE: i64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_SHIFT: u32 = MACHINE_ID_BITS + SEQUENCE_BITS;

type Clock = Box<dyn Fn() -> i64 + Send + Sync>;

#[derive(Debug)]
struct State {
    last_ts: i64,
    sequence: i64,
}

pub struct SnowflakeId {
    machine_id: u16,
    clock: Clock,
    state: Mutex<State>,
}

impl std::fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("machine_id", &self.machine_id)
            .finish()
    }
}

fn system_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

impl SnowflakeId {
    /// `machine_id` must be in `0..=1023`.
    pub fn new(machine_id: u16) -> Result<Self> {
        Self::with_clock(machine_id, system_ms)
    }

    /// Same as `new` with an injected millisecond clock.
    pub fn with_clock<F>(machine_id: u16, clock: F) -> Result<Self>
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        if machine_id > MAX_MACHINE_ID {
            return Err(DyCastError::InvalidNumber(format!(
                "machine id {machine_id} not in 0..={MAX_MACHINE_ID}"
            )));
        }
        Ok(Self {
            machine_id,
            clock: Box::new(clock),
            state: Mutex::new(State {
                last_ts: -1,
                sequence: 0,
            }),
        })
    }

    pub fn next_id(&self) -> Result<String> {
        let mut st = self
            .state
            .lock()
            .map_err(|_| DyCastError::Internal("snowflake state poisoned".into()))?;

        let mut ts = (self.clock)();
        if ts < st.last_ts {
            return Err(DyCastError::ClockMovedBackwards);
        }

        if ts == st.last_ts {
            st.sequence = (st.sequence + 1) & MAX_SEQUENCE;
            if st.sequence == 0 {
                // Sequence exhausted for this millisecond.
                while ts <= st.last_ts {
                    ts = (self.clock)();
                }
            }
        } else {
            st.sequence = 0;
        }
        st.last_ts = ts;

        let id = Long::from_i64(ts - EPOCH_MS)
            .shl(TIMESTAMP_SHIFT)
            .or(Long::from_int(i32::from(self.machine_id), false).shl(SEQUENCE_BITS))
            .or(Long::from_i64(st.sequence));
        Ok(id.to_string())
    }

    pub fn next_ids(&self, count: usize) -> Result<Vec<String>> {
        (0..count).map(|_| self.next_id()).collect()
    }
}
