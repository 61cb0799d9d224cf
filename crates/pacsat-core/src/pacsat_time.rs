use core::fmt;

use crate::UnixTime;

/// Router ticks per second of wall-clock time
pub const TICKS_PER_SECOND: u64 = 10;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PacsatTime {
    /// Unix time at which tick 0 happened
    pub epoch: UnixTime,
    /// Ticks elapsed since the epoch
    pub tick: u64,
}

impl Default for PacsatTime {
    /// Returns tick 0 at the unix epoch. Deterministic, for tests
    fn default() -> PacsatTime {
        PacsatTime { epoch: 0, tick: 0 }
    }
}

impl PacsatTime {
    pub fn new(epoch: UnixTime) -> Self {
        Self { epoch, tick: 0 }
    }

    /// Add a number of ticks
    pub fn add_ticks(self, num_ticks: u64) -> PacsatTime {
        PacsatTime { epoch: self.epoch, tick: self.tick + num_ticks }
    }

    /// Tick count `secs` seconds after this time
    pub fn add_secs(self, secs: u64) -> PacsatTime {
        self.add_ticks(secs * TICKS_PER_SECOND)
    }

    /// Ticks elapsed since `earlier`. Saturates at 0 if `earlier` is in the future.
    pub fn ticks_since(self, earlier: PacsatTime) -> u64 {
        self.tick.saturating_sub(earlier.tick)
    }

    /// Age of this time compared to now, in whole seconds
    #[inline(always)]
    pub fn age_secs(self, now: PacsatTime) -> u64 {
        now.ticks_since(self) / TICKS_PER_SECOND
    }

    /// Wall-clock seconds for this tick
    pub fn unix_secs(self) -> UnixTime {
        self.epoch.wrapping_add((self.tick / TICKS_PER_SECOND) as u32)
    }
}

impl fmt::Display for PacsatTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:8}.{}", self.tick / TICKS_PER_SECOND, self.tick % TICKS_PER_SECOND)
    }
}

impl fmt::Debug for PacsatTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
