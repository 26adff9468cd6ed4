//! Workshop clock and state hashing.
//!
//! Time only moves when the host calls
//! [`Workshop::advance`](crate::workshop::Workshop::advance). Every zone
//! event, pickup and completion is stamped with the current tick.

use crate::fixed::Ticks;
use crate::id::EntityId;
use slotmap::Key;
use std::hash::Hasher;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SimState {
    /// Ticks advanced since the workshop was created.
    pub tick: Ticks,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// What one `Workshop::advance()` call did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AdvanceResult {
    /// Zero when the workshop is paused.
    pub steps_run: u64,
    /// Pipelines force-failed by their timeout during this advance.
    pub timeouts: u32,
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// 64-bit FNV-1a over a stream of workshop fields. Two workshops fed the
/// same signals produce the same value; not for adversarial input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(u64);

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

impl StateHash {
    pub fn new() -> Self {
        Self(FNV_OFFSET)
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    /// `None` hashes as the null key.
    pub fn write_entity(&mut self, v: Option<EntityId>) {
        self.write_u64(v.unwrap_or_default().data().as_ffi());
    }
}

impl Hasher for StateHash {
    fn write(&mut self, bytes: &[u8]) {
        self.0 = bytes
            .iter()
            .fold(self.0, |h, &b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME));
    }

    // Fixed byte order so hashes match across targets.
    fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
