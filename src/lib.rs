#![no_std]

//! Firmware core for a USB keyboard-tester board.
//!
//! The crate scans nothing and owns no hardware: the key matrix scan, the
//! USB stack and the two-wire bus are external collaborators reached through
//! small traits. What lives here is everything between them: the persistent
//! keystate and HID report building, the IS31FL3733 backlight driver with its
//! page-selected command-register protocol and write-through shadow state,
//! and the key-driven animation sequencer with its one-shot deferred timer.
//!
//! Interrupt handlers push [`matrix::KeyEvent`]s into a [`channel::Channel`];
//! the foreground loop drains them through [`tester::KeyboardTester`], which
//! also receives the deferred-timer fire and produces HID reports on demand.

pub mod bitset;
pub mod bus;
pub mod channel;
pub mod color;
pub mod is3733;
pub mod matrix;
pub mod sequencer;
pub mod tester;
pub mod timer;

#[cfg(test)]
pub(crate) mod test_utils;

pub use bus::{BUS_TIMEOUT_TICKS, BusError, TwoWireBus};
pub use color::LedColor;
pub use is3733::{Backlight, EnablePattern, Half};
pub use matrix::{KeyEvent, KeyMatrix, KeyboardReport};
pub use sequencer::{Sequence, Sequencer};
pub use tester::KeyboardTester;
pub use timer::DeferredTimer;

pub use embassy_time::Duration;

/// Errors reported by the backlight and sequencing layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bus transaction failed (start, byte transfer or timeout; the
    /// transport does not distinguish).
    Bus,
    /// An operation addressed an LED channel that is not enabled in the
    /// driver's on/off state.
    Addressing,
    /// Malformed higher-level sequencing, e.g. a key action index outside
    /// the dispatch table.
    Protocol,
}

impl From<BusError> for Error {
    fn from(_: BusError) -> Self {
        Error::Bus
    }
}
