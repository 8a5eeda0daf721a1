//! Top-level device glue.
//!
//! Wires the pieces together the way the firmware main loop uses them: the
//! scan interrupt pushes [`KeyEvent`]s into a channel, the foreground loop
//! calls [`KeyboardTester::service`] to drain it, the deferred-timer
//! interrupt lands in [`KeyboardTester::handle_timer`], and the USB side
//! asks for reports with [`KeyboardTester::fill_report`].
//!
//! Backlight and sequencing failures are logged here and never propagate:
//! a broken LED chip must not stop key reporting.

use log::warn;

use crate::bus::TwoWireBus;
use crate::channel::Receiver;
use crate::is3733::{Backlight, EnablePattern};
use crate::matrix::{KeyEvent, KeyMatrix, KeyboardReport, key_index};
use crate::sequencer::Sequencer;
use crate::timer::DeferredTimer;

/// The keyboard tester core: persistent keystate plus the animation
/// sequencer with its backlight driver.
pub struct KeyboardTester<B, T> {
    matrix: KeyMatrix,
    sequencer: Sequencer<B, T>,
}

impl<B: TwoWireBus, T: DeferredTimer> KeyboardTester<B, T> {
    pub fn new(bus: B, timer: T, bus_addr: u8, pattern: EnablePattern) -> Self {
        Self {
            matrix: KeyMatrix::new(),
            sequencer: Sequencer::new(Backlight::new(bus, bus_addr), timer, pattern),
        }
    }

    pub fn matrix(&self) -> &KeyMatrix {
        &self.matrix
    }

    pub fn sequencer(&self) -> &Sequencer<B, T> {
        &self.sequencer
    }

    /// Drain every queued key event.
    pub fn service<const SIZE: usize>(&mut self, events: Receiver<'_, KeyEvent, SIZE>) {
        while let Ok(event) = events.try_receive() {
            self.handle_key_event(event);
        }
    }

    /// Fold one key event into the keystate; release edges drive the
    /// animation sequencer.
    pub fn handle_key_event(&mut self, event: KeyEvent) {
        let edge = self.matrix.apply(event);
        if edge && !event.pressed {
            let index = key_index(event.row, event.col);
            if let Err(err) = self.sequencer.on_key_release(index) {
                warn!("key action {index} failed: {err:?}");
            }
        }
    }

    /// Deferred-timer interrupt entry point.
    pub fn handle_timer(&mut self) {
        if let Err(err) = self.sequencer.on_timer_fired() {
            warn!("animation step failed: {err:?}");
        }
    }

    /// Build the next HID input report; returns whether keys were dropped to
    /// rollover.
    pub fn fill_report(&self, report: &mut KeyboardReport) -> bool {
        self.matrix.fill_report(report)
    }
}
