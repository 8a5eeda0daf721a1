//! IS31FL3733 RGB backlight driver.
//!
//! The chip drives a 12×16 grid of LED channels; this board wires it as a
//! 4×16 logical matrix where each cell owns three consecutive switch rows
//! (blue, green, red). [`Backlight`] layers the matrix operations on top of
//! the [`protocol::CommandPort`] engine and keeps the [`state::DriverState`]
//! shadow in sync write-through, so enable checks and the open/short report
//! never touch the bus.

pub mod protocol;
pub mod regs;
pub mod state;

pub use protocol::CommandPort;
pub use regs::{AbmChannel, Page};
pub use state::{CommandRegisterState, DriverState};

use log::{debug, warn};

use crate::Error;
use crate::bus::TwoWireBus;
use crate::color::LedColor;

use self::regs::{
    CONF_OSD, CONF_SSD, CS_PULLDOWN_DEFAULT, FunctionRegister, LED_CTRL_END, ONOFF_BASE,
    OPEN_BASE, OSD_DETECT_CURRENT, PWM_SIZE, SHORT_BASE, SW_PULLUP_DEFAULT,
};

/// Logical matrix rows (each spans three switch rows on the chip).
pub const MATRIX_ROWS: u8 = 4;
/// Logical matrix columns.
pub const MATRIX_COLS: u8 = 16;

/// Switch-row groups covered by the enable pattern (three per logical row,
/// two logical rows populated on this board).
pub const ENABLE_ZONES: usize = 6;

/// On/off enable mask written by [`Backlight::reset`]: one byte per column
/// bank for each switch-row group. The values depend on how a hardware
/// revision wires the keypads into the grid, so board code supplies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnablePattern {
    pub zones: [[u8; 2]; ENABLE_ZONES],
}

impl EnablePattern {
    /// Reference revision: keypad halves on columns 3–5 and 11–13, with the
    /// bottom-right cell of each half unpopulated.
    pub const REFERENCE: Self = Self {
        zones: [
            [0x38, 0x38],
            [0x38, 0x38],
            [0x38, 0x38],
            [0x18, 0x18],
            [0x18, 0x18],
            [0x18, 0x18],
        ],
    };

    /// The pattern as it is laid out in the on/off zone.
    pub const fn bytes(&self) -> [u8; ENABLE_ZONES * 2] {
        let mut out = [0u8; ENABLE_ZONES * 2];
        let mut zone = 0;
        while zone < ENABLE_ZONES {
            out[zone * 2] = self.zones[zone][0];
            out[zone * 2 + 1] = self.zones[zone][1];
            zone += 1;
        }
        out
    }
}

impl Default for EnablePattern {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// One physical half of the key layout, five LED cells each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    Left,
    Right,
}

const LEFT_CELLS: [(u8, u8); 5] = [(0, 3), (0, 4), (0, 5), (1, 3), (1, 4)];
const RIGHT_CELLS: [(u8, u8); 5] = [(0, 11), (0, 12), (0, 13), (1, 11), (1, 12)];

impl Half {
    /// The matrix cells belonging to this half.
    pub const fn cells(self) -> &'static [(u8, u8); 5] {
        match self {
            Half::Left => &LEFT_CELLS,
            Half::Right => &RIGHT_CELLS,
        }
    }

    pub const fn other(self) -> Self {
        match self {
            Half::Left => Half::Right,
            Half::Right => Half::Left,
        }
    }
}

/// Backlight operations for one driver chip.
///
/// Board code must drive the chip's hardware shutdown pin (SDB) high and
/// bring up the bus peripheral before the first operation; neither is
/// reachable from here.
pub struct Backlight<B> {
    port: CommandPort<B>,
    state: DriverState,
}

impl<B: TwoWireBus> Backlight<B> {
    /// Fresh driver with zeroed shadow state.
    pub fn new(bus: B, bus_addr: u8) -> Self {
        Self {
            port: CommandPort::new(bus),
            state: DriverState::new(bus_addr),
        }
    }

    /// Reassemble a driver around previously captured state, e.g. after
    /// releasing a shared bus.
    pub fn from_parts(bus: B, state: DriverState) -> Self {
        Self {
            port: CommandPort::new(bus),
            state,
        }
    }

    /// Split the driver back into the bus and the shadow state.
    pub fn into_parts(self) -> (B, DriverState) {
        (self.port.release(), self.state)
    }

    /// Shadow of the chip's register space.
    pub fn state(&self) -> &DriverState {
        &self.state
    }

    /// Bring the chip to a known configuration: read the reset register,
    /// leave software shutdown, zero the global current, configure the
    /// pull-up/pull-down banks, enable the wired matrix zones and clear the
    /// whole PWM page. A failed step aborts the rest; earlier steps stay
    /// applied.
    pub fn reset(&mut self, pattern: &EnablePattern) -> Result<(), Error> {
        self.state.clear();
        let addr = self.state.bus_addr;
        debug!("reset backlight driver @{addr:#04x}");

        let value = self
            .port
            .read_byte(addr, Page::Function, FunctionRegister::Reset.offset())
            .inspect_err(|_| warn!("cannot read reset register"))?;
        self.state.command.set_func_reg(FunctionRegister::Reset, value);

        self.write_func(FunctionRegister::Configuration, CONF_SSD)
            .inspect_err(|_| warn!("cannot clear software shutdown"))?;
        self.write_func(FunctionRegister::GlobalCurrent, 0x00)
            .inspect_err(|_| warn!("cannot reset global current control"))?;
        self.write_func(FunctionRegister::SwPullUp, SW_PULLUP_DEFAULT)
            .inspect_err(|_| warn!("cannot configure SW pull-ups"))?;
        self.write_func(FunctionRegister::CsPullDown, CS_PULLDOWN_DEFAULT)
            .inspect_err(|_| warn!("cannot configure CS pull-downs"))?;

        let enable = pattern.bytes();
        self.port
            .write_burst(addr, Page::LedControl, ONOFF_BASE, &enable)
            .inspect_err(|_| warn!("cannot enable LED matrix zones"))?;
        self.state.command.onoff[..enable.len()].copy_from_slice(&enable);

        self.port
            .write_burst(addr, Page::Pwm, 0x00, &[0; PWM_SIZE])
            .inspect_err(|_| warn!("cannot clear LED PWM page"))?;
        // shadow PWM page is already zero after clear()

        Ok(())
    }

    /// Set the global current control.
    pub fn brightness(&mut self, value: u8) -> Result<(), Error> {
        self.write_func(FunctionRegister::GlobalCurrent, value)
            .inspect_err(|_| warn!("cannot set backlight brightness to {value:#04x}"))
    }

    /// Whether all three channels of a matrix cell are enabled in the shadow
    /// on/off state.
    pub fn cell_enabled(&self, row: u8, col: u8) -> bool {
        if row >= MATRIX_ROWS || col >= MATRIX_COLS {
            return false;
        }
        let (bank, col_index) = split_column(col);
        let sw = row * 3;
        (0..3).all(|k| self.state.channel_enabled(sw + k, bank, col_index))
    }

    /// Light one matrix cell. Fails with an addressing error, without
    /// touching the bus, unless all three channels are enabled.
    ///
    /// The channel writes go out one at a time (blue, green, red); a bus
    /// failure mid-way leaves the earlier channels applied.
    pub fn set(&mut self, row: u8, col: u8, color: LedColor) -> Result<(), Error> {
        if row >= MATRIX_ROWS || col >= MATRIX_COLS {
            warn!("LED ({row}, {col}) outside the matrix");
            return Err(Error::Addressing);
        }
        if !self.cell_enabled(row, col) {
            debug!("LED ({row}, {col}) is not enabled");
            return Err(Error::Addressing);
        }

        let sw = row as usize * 3;
        let col = col as usize;
        self.write_pwm(sw * 0x10 + col, color.b)?;
        self.write_pwm((sw + 1) * 0x10 + col, color.g)?;
        self.write_pwm((sw + 2) * 0x10 + col, color.r)?;
        Ok(())
    }

    /// Apply one color to the five cells of a keypad half.
    pub fn set_all(&mut self, half: Half, color: LedColor) -> Result<(), Error> {
        for &(row, col) in half.cells() {
            self.set(row, col, color)?;
        }
        Ok(())
    }

    /// Assign the auto-breath mode of one matrix cell's channels.
    pub fn abm_set(&mut self, row: u8, col: u8, channel: AbmChannel) -> Result<(), Error> {
        if row >= MATRIX_ROWS || col >= MATRIX_COLS {
            warn!("LED ({row}, {col}) outside the matrix");
            return Err(Error::Addressing);
        }
        if !self.cell_enabled(row, col) {
            debug!("LED ({row}, {col}) is not enabled");
            return Err(Error::Addressing);
        }

        // TODO: program the ABM timing registers and honour `channel`; until
        // then every channel is pinned to ABM-1.
        let _ = channel;
        let sw = row as usize * 3;
        let col = col as usize;
        for k in 0..3 {
            self.write_abm((sw + k) * 0x10 + col, AbmChannel::Channel1 as u8)?;
        }
        Ok(())
    }

    /// Latch a new open/short detection cycle: diagnostic current, then the
    /// OSD configuration bit off and on again. Results are not ready until
    /// the chip has had time to scan; defer before calling
    /// [`Backlight::check`].
    pub fn check_trigger(&mut self) -> Result<(), Error> {
        debug!("trigger open/short detection");

        self.write_func(FunctionRegister::GlobalCurrent, OSD_DETECT_CURRENT)
            .inspect_err(|_| warn!("cannot set detection current"))?;

        let mut conf = self.state.command.func_reg(FunctionRegister::Configuration);
        conf &= !CONF_OSD;
        self.write_func(FunctionRegister::Configuration, conf)
            .inspect_err(|_| warn!("cannot clear open-short-detect bit {conf:#04x}"))?;

        conf |= CONF_OSD;
        self.write_func(FunctionRegister::Configuration, conf)
            .inspect_err(|_| warn!("cannot set open-short-detect bit {conf:#04x}"))?;

        Ok(())
    }

    /// Pull the open-detect and short-detect zones into the shadow and dump
    /// them to the log.
    pub fn check(&mut self) -> Result<(), Error> {
        debug!("read open/short detection result");
        let addr = self.state.bus_addr;

        let mut results = [0u8; (LED_CTRL_END - OPEN_BASE) as usize];
        self.port
            .read_burst(addr, Page::LedControl, OPEN_BASE, &mut results)
            .inspect_err(|_| warn!("cannot read open/short detect zones"))?;
        self.state.command.onoff[OPEN_BASE as usize..].copy_from_slice(&results);

        let zone_len = (SHORT_BASE - OPEN_BASE) as usize;
        debug!("LED open region:");
        for (i, group) in results[..zone_len].chunks(4).enumerate() {
            debug!(
                "[{:#04x}] {:02x} {:02x} {:02x} {:02x}",
                OPEN_BASE as usize + i * 4,
                group[0],
                group[1],
                group[2],
                group[3]
            );
        }
        debug!("LED short region:");
        for (i, group) in results[zone_len..].chunks(4).enumerate() {
            debug!(
                "[{:#04x}] {:02x} {:02x} {:02x} {:02x}",
                SHORT_BASE as usize + i * 4,
                group[0],
                group[1],
                group[2],
                group[3]
            );
        }

        Ok(())
    }

    fn write_func(&mut self, reg: FunctionRegister, value: u8) -> Result<(), Error> {
        self.port
            .write_byte(self.state.bus_addr, Page::Function, reg.offset(), value)?;
        self.state.command.set_func_reg(reg, value);
        Ok(())
    }

    fn write_pwm(&mut self, index: usize, value: u8) -> Result<(), Error> {
        self.port
            .write_byte(self.state.bus_addr, Page::Pwm, index as u8, value)?;
        self.state.command.pwm[index] = value;
        Ok(())
    }

    fn write_abm(&mut self, index: usize, value: u8) -> Result<(), Error> {
        self.port
            .write_byte(self.state.bus_addr, Page::AutoBreath, index as u8, value)?;
        self.state.command.abm[index] = value;
        Ok(())
    }
}

/// Map a column to its bank and the bit index within the bank.
const fn split_column(col: u8) -> (u8, u8) {
    if col > 7 { (1, col - 8) } else { (0, col) }
}
