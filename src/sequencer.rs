//! Key-driven LED animation sequencing.
//!
//! One sequence runs at a time, advanced by a single one-shot deferred
//! timer. Key releases pick the sequence; every state carries its own fire
//! transition in [`Sequencer::on_timer_fired`], and a state that wants to
//! continue re-arms the timer explicitly. Until the open/short diagnostic
//! has run once, the only accepted action is the one that runs it.

use embassy_time::Duration;
use log::{debug, warn};

use crate::Error;
use crate::bus::TwoWireBus;
use crate::color::{self, LedColor, breathe_step};
use crate::is3733::{Backlight, EnablePattern, Half, MATRIX_COLS, MATRIX_ROWS};
use crate::timer::DeferredTimer;

/// Delay between triggering open/short detection and reading the result.
pub const DIAGNOSTIC_CHECK_DELAY: Duration = Duration::from_micros(1_000);
/// Delay before a deferred rotate-select step runs.
pub const SELECT_STEP_DELAY: Duration = Duration::from_micros(1_000);
/// Interval between breathe color steps.
pub const BREATHE_STEP_INTERVAL: Duration = Duration::from_millis(40);

/// Row value marking "no LED selected". Rows 2 and 3 of the grid are not
/// wired on this board, which is what makes the sentinel safe.
pub const NO_SELECTION_ROW: u8 = 2;

/// The active animation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    /// Nothing armed.
    Idle,
    /// Diagnostic triggered, check runs on the next fire.
    DiagnosticPending,
    /// A selection advance runs on the next fire; single-shot.
    RotateSelect,
    /// The selected LED sweeps through the breathe colors until the sweep
    /// wraps.
    BreatheSingle,
    /// Like [`Sequence::BreatheSingle`] but over a whole keypad half, then
    /// the other one.
    BreatheAll { half: Half },
}

/// Animation state machine over the backlight and the deferred timer.
///
/// Owns everything the animations touch: the driver with its shadow state,
/// the current selection, the fade color and the diagnostic latch. There is
/// exactly one writer for each piece of state.
pub struct Sequencer<B, T> {
    backlight: Backlight<B>,
    timer: T,
    pattern: EnablePattern,
    sequence: Sequence,
    selection: (u8, u8),
    fade: LedColor,
    diagnosed: bool,
}

impl<B: TwoWireBus, T: DeferredTimer> Sequencer<B, T> {
    pub fn new(backlight: Backlight<B>, timer: T, pattern: EnablePattern) -> Self {
        Self {
            backlight,
            timer,
            pattern,
            sequence: Sequence::Idle,
            selection: (NO_SELECTION_ROW, 0),
            fade: color::BLACK,
            diagnosed: false,
        }
    }

    pub fn backlight(&self) -> &Backlight<B> {
        &self.backlight
    }

    pub fn sequence(&self) -> Sequence {
        self.sequence
    }

    /// Whether the open/short diagnostic has completed since power-up.
    pub fn diagnosed(&self) -> bool {
        self.diagnosed
    }

    /// The currently selected LED cell, if any.
    pub fn selection(&self) -> Option<(u8, u8)> {
        (self.selection.0 != NO_SELECTION_ROW).then_some(self.selection)
    }

    /// Dispatch a key release at the given matrix cell index.
    pub fn on_key_release(&mut self, index: usize) -> Result<(), Error> {
        match index {
            0 => {
                if self.diagnosed {
                    self.start_breathe_all()
                } else {
                    self.start_diagnostic()
                }
            }
            2 if self.diagnosed => self.apply_demo_pattern(),
            3 if self.diagnosed => {
                self.sequence = Sequence::RotateSelect;
                self.timer.arm(SELECT_STEP_DELAY);
                Ok(())
            }
            4 if self.diagnosed => self.start_breathe_single(),
            5 if self.diagnosed => self.backlight.brightness(0),
            2..=5 => {
                debug!("key {index} ignored until diagnostics have run");
                Ok(())
            }
            _ => {
                warn!("no action for key {index}");
                Err(Error::Protocol)
            }
        }
    }

    /// Run the fire transition of the active sequence.
    ///
    /// Called from the one-shot timer interrupt. A sequence that wants
    /// another step re-arms the timer before returning; on a failed step the
    /// sequencer drops back to [`Sequence::Idle`] instead.
    pub fn on_timer_fired(&mut self) -> Result<(), Error> {
        let result = match self.sequence {
            Sequence::Idle => {
                warn!("timer fired with no sequence active");
                return Ok(());
            }
            Sequence::DiagnosticPending => self.finish_diagnostic(),
            Sequence::RotateSelect => self.rotate_step(),
            Sequence::BreatheSingle => self.breathe_single_step(),
            Sequence::BreatheAll { half } => self.breathe_all_step(half),
        };
        if result.is_err() {
            self.sequence = Sequence::Idle;
        }
        result
    }

    fn start_diagnostic(&mut self) -> Result<(), Error> {
        debug!("start open/short diagnostics");
        self.selection = (NO_SELECTION_ROW, 0);
        self.backlight.reset(&self.pattern)?;
        self.backlight.check_trigger()?;
        self.sequence = Sequence::DiagnosticPending;
        self.timer.arm(DIAGNOSTIC_CHECK_DELAY);
        Ok(())
    }

    fn finish_diagnostic(&mut self) -> Result<(), Error> {
        self.backlight.check()?;
        self.diagnosed = true;
        self.sequence = Sequence::Idle;
        Ok(())
    }

    fn start_breathe_all(&mut self) -> Result<(), Error> {
        debug!("start breathing, both halves");
        self.fade = color::BLACK;
        self.sequence = Sequence::BreatheAll { half: Half::Left };
        self.timer.arm(BREATHE_STEP_INTERVAL);
        Ok(())
    }

    fn start_breathe_single(&mut self) -> Result<(), Error> {
        let Some((row, col)) = self.selection() else {
            warn!("no LED selected to breathe");
            return Err(Error::Addressing);
        };
        debug!("start breathing ({row}, {col})");
        self.sequence = Sequence::BreatheSingle;
        self.timer.arm(BREATHE_STEP_INTERVAL);
        Ok(())
    }

    fn breathe_single_step(&mut self) -> Result<(), Error> {
        let done = breathe_step(&mut self.fade);
        let (row, col) = self.selection;
        self.backlight.set(row, col, self.fade)?;
        if done {
            self.sequence = Sequence::Idle;
        } else {
            self.timer.arm(BREATHE_STEP_INTERVAL);
        }
        Ok(())
    }

    fn breathe_all_step(&mut self, half: Half) -> Result<(), Error> {
        let done = breathe_step(&mut self.fade);
        self.backlight.set_all(half, self.fade)?;
        if !done {
            self.timer.arm(BREATHE_STEP_INTERVAL);
            return Ok(());
        }
        if half == Half::Left {
            // first half swept: blank it and run the second one
            self.backlight.set_all(half, color::BLACK)?;
            self.fade = color::BLACK;
            self.sequence = Sequence::BreatheAll { half: half.other() };
            self.timer.arm(BREATHE_STEP_INTERVAL);
        } else {
            self.sequence = Sequence::Idle;
        }
        Ok(())
    }

    fn apply_demo_pattern(&mut self) -> Result<(), Error> {
        const PATTERN: [LedColor; 5] = [
            color::RED,
            color::GREEN,
            color::BLUE,
            color::YELLOW,
            color::MAGENTA,
        ];

        debug!("apply demo color pattern");
        for half in [Half::Left, Half::Right] {
            for (&(row, col), &lc) in half.cells().iter().zip(PATTERN.iter()) {
                self.backlight.set(row, col, lc)?;
            }
        }
        Ok(())
    }

    fn rotate_step(&mut self) -> Result<(), Error> {
        if let Some((row, col)) = self.selection() {
            self.backlight.set(row, col, color::BLACK)?;
        }
        match self.next_enabled() {
            Some((row, col)) => {
                debug!("select LED ({row}, {col})");
                self.selection = (row, col);
                self.fade = color::WHITE;
                self.backlight.set(row, col, color::WHITE)?;
            }
            None => {
                self.selection = (NO_SELECTION_ROW, 0);
                warn!("no enabled LED to select");
            }
        }
        self.sequence = Sequence::Idle;
        Ok(())
    }

    /// Next enabled cell after the current selection, row-major with wrap.
    /// Skips unwired cells and the selection sentinel row.
    fn next_enabled(&self) -> Option<(u8, u8)> {
        let total = MATRIX_ROWS as usize * MATRIX_COLS as usize;
        let start = match self.selection() {
            Some((row, col)) => row as usize * MATRIX_COLS as usize + col as usize + 1,
            None => 0,
        };
        (0..total)
            .map(|step| {
                let cell = (start + step) % total;
                (
                    (cell / MATRIX_COLS as usize) as u8,
                    (cell % MATRIX_COLS as usize) as u8,
                )
            })
            .find(|&(row, col)| row != NO_SELECTION_ROW && self.backlight.cell_enabled(row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is3733::regs::{BUS_ADDRESS, CONF_OSD, CONF_SSD, FunctionRegister};
    use crate::test_utils::{FakeBus, FakeTimer};

    fn queue_diagnostic_reads(bus: &mut FakeBus) {
        bus.queue_reads(&[0x00]); // reset register
        bus.queue_reads(&[0u8; 0x30]); // open/short zones
    }

    fn sequencer<'a>(
        bus: &'a mut FakeBus,
        timer: &'a mut FakeTimer,
    ) -> Sequencer<&'a mut FakeBus, &'a mut FakeTimer> {
        let backlight = Backlight::new(bus, BUS_ADDRESS);
        Sequencer::new(backlight, timer, EnablePattern::REFERENCE)
    }

    fn diagnose(seq: &mut Sequencer<&mut FakeBus, &mut FakeTimer>) {
        seq.on_key_release(0).unwrap();
        seq.on_timer_fired().unwrap();
        assert!(seq.diagnosed());
    }

    #[test]
    fn diagnostic_flow_then_breathe_all() {
        let mut bus = FakeBus::new();
        queue_diagnostic_reads(&mut bus);
        let mut timer = FakeTimer::new();
        {
            let mut seq = sequencer(&mut bus, &mut timer);

            assert!(!seq.diagnosed());
            seq.on_key_release(0).unwrap();
            assert_eq!(seq.sequence(), Sequence::DiagnosticPending);
            assert_eq!(
                seq.backlight()
                    .state()
                    .command
                    .func_reg(FunctionRegister::Configuration),
                CONF_SSD | CONF_OSD
            );

            seq.on_timer_fired().unwrap();
            assert!(seq.diagnosed());
            assert_eq!(seq.sequence(), Sequence::Idle);

            // second release starts the all-halves breathe instead
            seq.on_key_release(0).unwrap();
            assert_eq!(seq.sequence(), Sequence::BreatheAll { half: Half::Left });
        }
        assert_eq!(
            timer.armed.as_slice(),
            &[DIAGNOSTIC_CHECK_DELAY, BREATHE_STEP_INTERVAL]
        );
    }

    #[test]
    fn actions_before_diagnosis_are_ignored() {
        let mut bus = FakeBus::new();
        let mut timer = FakeTimer::new();
        {
            let mut seq = sequencer(&mut bus, &mut timer);
            for index in 2..=5 {
                seq.on_key_release(index).unwrap();
                assert_eq!(seq.sequence(), Sequence::Idle);
            }
        }
        assert!(bus.events.is_empty());
        assert!(timer.armed.is_empty());
    }

    #[test]
    fn unknown_key_index_is_rejected() {
        let mut bus = FakeBus::new();
        let mut timer = FakeTimer::new();
        let mut seq = sequencer(&mut bus, &mut timer);
        assert_eq!(seq.on_key_release(1), Err(Error::Protocol));
        assert_eq!(seq.on_key_release(6), Err(Error::Protocol));
    }

    #[test]
    fn spurious_fire_is_ignored() {
        let mut bus = FakeBus::new();
        let mut timer = FakeTimer::new();
        {
            let mut seq = sequencer(&mut bus, &mut timer);
            seq.on_timer_fired().unwrap();
            assert_eq!(seq.sequence(), Sequence::Idle);
        }
        assert!(bus.events.is_empty());
    }

    #[test]
    fn rotation_visits_every_enabled_cell_once() {
        const EXPECTED: [(u8, u8); 10] = [
            (0, 3),
            (0, 4),
            (0, 5),
            (0, 11),
            (0, 12),
            (0, 13),
            (1, 3),
            (1, 4),
            (1, 11),
            (1, 12),
        ];

        let mut bus = FakeBus::new();
        queue_diagnostic_reads(&mut bus);
        let mut timer = FakeTimer::new();
        let mut seq = sequencer(&mut bus, &mut timer);
        diagnose(&mut seq);

        let mut visited: heapless::Vec<(u8, u8), 16> = heapless::Vec::new();
        for _ in 0..EXPECTED.len() {
            seq.on_key_release(3).unwrap();
            assert_eq!(seq.sequence(), Sequence::RotateSelect);
            seq.on_timer_fired().unwrap();
            assert_eq!(seq.sequence(), Sequence::Idle);

            let selected = seq.selection().unwrap();
            assert_ne!(selected.0, NO_SELECTION_ROW);
            visited.push(selected).unwrap();
        }
        assert_eq!(visited.as_slice(), &EXPECTED);

        // one more advance wraps around to the first cell
        seq.on_key_release(3).unwrap();
        seq.on_timer_fired().unwrap();
        assert_eq!(seq.selection().unwrap(), EXPECTED[0]);
    }

    #[test]
    fn selected_cell_is_lit_white() {
        let mut bus = FakeBus::new();
        queue_diagnostic_reads(&mut bus);
        let mut timer = FakeTimer::new();
        let mut seq = sequencer(&mut bus, &mut timer);
        diagnose(&mut seq);

        seq.on_key_release(3).unwrap();
        seq.on_timer_fired().unwrap();
        assert_eq!(seq.selection(), Some((0, 3)));

        let pwm = &seq.backlight().state().command.pwm;
        assert_eq!(pwm[0x03], color::WHITE.b);
        assert_eq!(pwm[0x13], color::WHITE.g);
        assert_eq!(pwm[0x23], color::WHITE.r);
    }

    #[test]
    fn breathe_single_runs_one_sweep_from_white() {
        let mut bus = FakeBus::new();
        queue_diagnostic_reads(&mut bus);
        let mut timer = FakeTimer::new();
        let mut seq = sequencer(&mut bus, &mut timer);
        diagnose(&mut seq);

        seq.on_key_release(3).unwrap();
        seq.on_timer_fired().unwrap(); // selects (0, 3), fade = white

        seq.on_key_release(4).unwrap();
        assert_eq!(seq.sequence(), Sequence::BreatheSingle);

        // from (0x80, 0x80, 0x80): green wraps on step 28, blue lands at
        // 0xA0 >= 0x80 and the sweep ends
        for _ in 0..27 {
            seq.on_timer_fired().unwrap();
            assert_eq!(seq.sequence(), Sequence::BreatheSingle);
        }
        seq.on_timer_fired().unwrap();
        assert_eq!(seq.sequence(), Sequence::Idle);

        let pwm = &seq.backlight().state().command.pwm;
        assert_eq!(pwm[0x03], 0xA0); // blue
        assert_eq!(pwm[0x13], 0x00); // green
        assert_eq!(pwm[0x23], 0x00); // red
    }

    #[test]
    fn breathe_single_without_selection_fails() {
        let mut bus = FakeBus::new();
        queue_diagnostic_reads(&mut bus);
        let mut timer = FakeTimer::new();
        let mut seq = sequencer(&mut bus, &mut timer);
        diagnose(&mut seq);

        assert_eq!(seq.on_key_release(4), Err(Error::Addressing));
        assert_eq!(seq.sequence(), Sequence::Idle);
    }

    #[test]
    fn breathe_all_sweeps_both_halves() {
        let mut bus = FakeBus::new();
        queue_diagnostic_reads(&mut bus);
        let mut timer = FakeTimer::new();
        let mut seq = sequencer(&mut bus, &mut timer);
        diagnose(&mut seq);

        seq.on_key_release(0).unwrap();
        assert_eq!(seq.sequence(), Sequence::BreatheAll { half: Half::Left });

        // 64 steps from black complete the left half
        for _ in 0..64 {
            assert_eq!(
                seq.sequence(),
                Sequence::BreatheAll { half: Half::Left },
                "left sweep ended early"
            );
            seq.on_timer_fired().unwrap();
        }
        assert_eq!(seq.sequence(), Sequence::BreatheAll { half: Half::Right });

        // the left half was blanked for the handover
        let pwm = &seq.backlight().state().command.pwm;
        assert_eq!(pwm[0x03], 0x00);

        for _ in 0..64 {
            seq.on_timer_fired().unwrap();
        }
        assert_eq!(seq.sequence(), Sequence::Idle);

        // the right half keeps its final sweep color (blue 0x20)
        let pwm = &seq.backlight().state().command.pwm;
        assert_eq!(pwm[0x0B], 0x20);
    }

    #[test]
    fn brightness_off_key() {
        let mut bus = FakeBus::new();
        queue_diagnostic_reads(&mut bus);
        let mut timer = FakeTimer::new();
        let mut seq = sequencer(&mut bus, &mut timer);
        diagnose(&mut seq);

        seq.on_key_release(5).unwrap();
        assert_eq!(seq.sequence(), Sequence::Idle);
        assert_eq!(
            seq.backlight()
                .state()
                .command
                .func_reg(FunctionRegister::GlobalCurrent),
            0x00
        );
    }

    #[test]
    fn demo_pattern_paints_both_halves() {
        let mut bus = FakeBus::new();
        queue_diagnostic_reads(&mut bus);
        let mut timer = FakeTimer::new();
        let mut seq = sequencer(&mut bus, &mut timer);
        diagnose(&mut seq);

        seq.on_key_release(2).unwrap();
        assert_eq!(seq.sequence(), Sequence::Idle);

        let pwm = &seq.backlight().state().command.pwm;
        // first cell of each half is red
        assert_eq!(pwm[0x23], 0xFF);
        assert_eq!(pwm[0x2B], 0xFF);
        // second cell of each half is green
        assert_eq!(pwm[0x14], 0xFF);
        assert_eq!(pwm[0x1C], 0xFF);
    }

    #[test]
    fn failed_step_drops_to_idle() {
        let mut bus = FakeBus::new();
        queue_diagnostic_reads(&mut bus);
        // diagnosis consumes 491 fallible phases (266 reset + 27 trigger +
        // 198 check); land the failure inside the first breathe step
        bus.fail_at(500);
        let mut timer = FakeTimer::new();
        let mut seq = sequencer(&mut bus, &mut timer);
        diagnose(&mut seq);

        seq.on_key_release(0).unwrap();
        assert_eq!(seq.on_timer_fired(), Err(Error::Bus));
        assert_eq!(seq.sequence(), Sequence::Idle);
    }
}
