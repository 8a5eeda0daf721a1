//! One-shot deferred timing.
//!
//! The animation sequencer never sleeps; it arms a hardware one-shot timer
//! and is called back through its fire entry point. Arming again before the
//! fire replaces the pending expiry; there is no cancellation beyond that.
//!
//! The prescaler model mirrors the 16-bit hardware timer: five divider
//! tiers off an 8 MHz clock, and a conversion from a requested interval to
//! the finest tier that can represent it. Interval arithmetic keeps the
//! firmware's historical unit convention (see `Prescaler::max_interval`).

use embassy_time::Duration;

/// One-shot deferred callback primitive.
pub trait DeferredTimer {
    /// Schedule a single future fire after `delay`, replacing any pending
    /// one.
    fn arm(&mut self, delay: Duration);
}

impl<T: DeferredTimer> DeferredTimer for &mut T {
    fn arm(&mut self, delay: Duration) {
        T::arm(self, delay);
    }
}

/// Timer input clock.
pub const TIMER_CLOCK_HZ: u32 = 8_000_000;
/// Clock ticks per microsecond.
const TICKS_PER_MICRO: u32 = TIMER_CLOCK_HZ / 1_000_000;
/// Widest count the 16-bit counter can hold.
pub const TICK_MAX: u32 = u16::MAX as u32;

/// Hardware prescaler tiers, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prescaler {
    Div1,
    Div8,
    Div64,
    Div256,
    Div1024,
}

impl Prescaler {
    const TIERS: [Prescaler; 5] = [
        Prescaler::Div1,
        Prescaler::Div8,
        Prescaler::Div64,
        Prescaler::Div256,
        Prescaler::Div1024,
    ];

    pub const fn divisor(self) -> u32 {
        match self {
            Prescaler::Div1 => 1,
            Prescaler::Div8 => 8,
            Prescaler::Div64 => 64,
            Prescaler::Div256 => 256,
            Prescaler::Div1024 => 1024,
        }
    }

    /// Longest interval this tier can represent.
    ///
    /// The unit is the firmware's historical "nanoseconds": the scale factor
    /// is ticks-per-microsecond, so a requested 1 000 000 actually spans one
    /// second at ÷256. Kept as-is because every arming site counts in the
    /// same unit.
    pub const fn max_interval(self) -> u32 {
        TICK_MAX * self.divisor() / TICKS_PER_MICRO
    }

    /// Finest tier whose range covers `interval`, if any tier does.
    pub fn for_interval(interval: u32) -> Option<Self> {
        Self::TIERS
            .iter()
            .copied()
            .find(|tier| interval <= tier.max_interval())
    }

    /// Counter value programming this tier for `interval`.
    pub const fn ticks(self, interval: u32) -> u16 {
        ((TICKS_PER_MICRO as u64 * interval as u64) / self.divisor() as u64) as u16
    }
}
