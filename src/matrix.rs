//! Key matrix state and HID report building.
//!
//! The electrical scan lives in board code and runs from a periodic timer
//! interrupt; it reports edges as [`KeyEvent`]s. This module keeps the
//! persistent per-cell keystate those events describe and turns it into
//! boot-protocol keyboard reports on demand.

use embassy_time::Duration;
use log::{debug, warn};

use crate::bitset::Bitset;
use crate::channel::Channel;

/// Electrical rows of the key matrix.
pub const KEYBOARD_ROWS: u8 = 2;
/// Electrical columns of the key matrix.
pub const KEYBOARD_COLUMNS: u8 = 3;
/// Total number of keys.
pub const KEY_COUNT: usize = (KEYBOARD_ROWS * KEYBOARD_COLUMNS) as usize;

/// Period of the external matrix scan timer.
pub const SCAN_INTERVAL: Duration = Duration::from_millis(5);

/// Key slots in a boot-protocol input report.
pub const REPORT_SLOTS: usize = 6;

/// HID usage IDs in cell-index order: the letters A through F.
pub const SCAN_CODES: [u8; KEY_COUNT] = [0x04, 0x05, 0x06, 0x07, 0x08, 0x09];

/// Row-major index of a matrix cell.
pub const fn key_index(row: u8, col: u8) -> usize {
    row as usize * KEYBOARD_COLUMNS as usize + col as usize
}

/// One press or release observed by the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub row: u8,
    pub col: u8,
    pub pressed: bool,
}

/// Queue carrying [`KeyEvent`]s out of scan-interrupt context.
pub type KeyEventChannel<const SIZE: usize> = Channel<KeyEvent, SIZE>;

/// Boot-protocol keyboard input report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardReport {
    pub modifier: u8,
    pub reserved: u8,
    pub keycodes: [u8; REPORT_SLOTS],
}

/// Persistent keystate of the matrix.
pub struct KeyMatrix {
    keystate: Bitset<1>,
}

impl KeyMatrix {
    pub const fn new() -> Self {
        Self {
            keystate: Bitset::new(),
        }
    }

    /// Forget every held key.
    pub fn reset(&mut self) {
        self.keystate.clear_all();
    }

    /// Fold one event into the keystate.
    ///
    /// Returns `true` on an edge, i.e. when the event actually changed the
    /// stored state; repeats of the same level return `false`.
    pub fn apply(&mut self, event: KeyEvent) -> bool {
        let index = key_index(event.row, event.col);
        if index >= KEY_COUNT {
            warn!("key event outside the matrix: [{}, {}]", event.row, event.col);
            return false;
        }

        let was_pressed = self.keystate.get(index);
        if event.pressed {
            if !was_pressed {
                debug!("button [{}, {}] pressed", event.row, event.col);
            }
            self.keystate.set(index);
        } else {
            if was_pressed {
                debug!("button [{}, {}] released", event.row, event.col);
            }
            self.keystate.clear(index);
        }
        was_pressed != event.pressed
    }

    /// Whether a key is currently held.
    pub fn pressed(&self, row: u8, col: u8) -> bool {
        let index = key_index(row, col);
        index < KEY_COUNT && self.keystate.get(index)
    }

    /// Fill `report` with the scan codes of the held keys.
    ///
    /// At most [`REPORT_SLOTS`] keys fit; anything beyond is dropped and
    /// reported as a rollover condition through the return value.
    pub fn fill_report(&self, report: &mut KeyboardReport) -> bool {
        *report = KeyboardReport::default();

        let mut next = 0;
        for index in self.keystate.ones() {
            if next == REPORT_SLOTS {
                warn!("key rollover - too many keys pressed");
                return true;
            }
            report.keycodes[next] = SCAN_CODES[index];
            next += 1;
        }
        false
    }
}

impl Default for KeyMatrix {
    fn default() -> Self {
        Self::new()
    }
}
