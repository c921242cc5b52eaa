//! Single-slot gain mailbox
//!
//! The transport posts gain tuples from its receive context; the control
//! loop drains at most one per cycle. Posting overwrites any tuple not yet
//! taken, so only the latest update is ever applied.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::controller::Gains;

pub struct GainMailbox {
    slot: Signal<CriticalSectionRawMutex, Gains>,
}

impl GainMailbox {
    pub const fn new() -> Self {
        Self {
            slot: Signal::new(),
        }
    }

    /// Store `gains`, replacing any pending tuple
    pub fn post(&self, gains: Gains) {
        if self.slot.signaled() {
            debug!("Pending gains overwritten before being applied");
        }
        self.slot.signal(gains);
    }

    /// Remove and return the pending tuple, if any (never blocks)
    pub fn take(&self) -> Option<Gains> {
        self.slot.try_take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.signaled()
    }

    /// Drop any pending tuple
    pub fn clear(&self) {
        self.slot.reset();
    }
}

impl Default for GainMailbox {
    fn default() -> Self {
        Self::new()
    }
}
