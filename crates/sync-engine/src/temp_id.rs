// crates/sync-engine/src/temp_id.rs
//! Temporary identity allocation for records created offline

use carlot_core::VehicleId;

/// Issues locally unique placeholder ids
///
/// Each id is the temporary marker followed by the current counter value.
/// The counter only moves on [`next`](Self::next) and goes back to zero on
/// [`reset`](Self::reset), which the coordinator calls once the pending
/// queue has been fully flushed.
#[derive(Debug, Default)]
pub struct TempIdAllocator {
    counter: u64,
}

impl TempIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next placeholder and advances the counter by one
    pub fn next(&mut self) -> VehicleId {
        let id = VehicleId::temporary(self.counter);
        self.counter += 1;
        id
    }

    /// Returns the value the next placeholder will carry
    pub fn peek(&self) -> u64 {
        self.counter
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}
