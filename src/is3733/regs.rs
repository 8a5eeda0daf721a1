//! IS31FL3733 register map.
//!
//! The chip exposes four pages behind a single command register. Selecting a
//! page requires unlocking the command register first; the lock re-engages
//! after every page write.

/// Bus address of the driver, write form. The low bit is the R/W
/// discriminator (`0b1010_000x`).
pub const BUS_ADDRESS: u8 = 0xA0;

/// Command (page select) register.
pub const COMMAND_REGISTER: u8 = 0xFD;
/// Command register write lock.
pub const COMMAND_WRITE_LOCK: u8 = 0xFE;
/// Value written to [`COMMAND_WRITE_LOCK`] to permit the next page write.
pub const WRITE_UNLOCK_MAGIC: u8 = 0xC5;
/// Interrupt mask register.
pub const INTERRUPT_MASK_REGISTER: u8 = 0xF0;
/// Interrupt status register.
pub const INTERRUPT_STATUS_REGISTER: u8 = 0xF1;

/// Pages reachable through the command register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Page {
    /// LED on/off control plus the read-only open/short detect zones.
    LedControl = 0x00,
    /// One PWM duty byte per LED channel.
    Pwm = 0x01,
    /// Auto-breath-mode channel assignment per LED channel.
    AutoBreath = 0x02,
    /// Global function registers.
    Function = 0x03,
}

/// On/off control zone of the LED control page (writable).
pub const ONOFF_BASE: u8 = 0x00;
/// Open-detect result zone (read-only).
pub const OPEN_BASE: u8 = 0x18;
/// Short-detect result zone (read-only).
pub const SHORT_BASE: u8 = 0x30;
/// End of the LED control page.
pub const LED_CTRL_END: u8 = 0x48;

/// Shadowed page sizes.
pub const ONOFF_SIZE: usize = 0x48;
pub const PWM_SIZE: usize = 0xC0;
pub const ABM_SIZE: usize = 0xC0;
pub const FUNC_SIZE: usize = 0x12;

/// Offsets within the function page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FunctionRegister {
    Configuration = 0x00,
    GlobalCurrent = 0x01,
    Abm1Control1 = 0x02,
    Abm1Control2 = 0x03,
    Abm1Control3 = 0x04,
    Abm1Control4 = 0x05,
    Abm2Control1 = 0x06,
    Abm2Control2 = 0x07,
    Abm2Control3 = 0x08,
    Abm2Control4 = 0x09,
    Abm3Control1 = 0x0A,
    Abm3Control2 = 0x0B,
    Abm3Control3 = 0x0C,
    Abm3Control4 = 0x0D,
    TimeUpdate = 0x0E,
    SwPullUp = 0x0F,
    CsPullDown = 0x10,
    Reset = 0x11,
}

impl FunctionRegister {
    pub const fn offset(self) -> u8 {
        self as u8
    }
}

/// Configuration register bits (function page, offset 0x00).
pub const CONF_SSD: u8 = 1; // software shutdown disable (normal operation)
pub const CONF_B_EN: u8 = 1 << 1; // auto-breath enable
pub const CONF_OSD: u8 = 1 << 2; // open/short detect trigger
pub const CONF_SYNC_MASTER: u8 = 1 << 6;
pub const CONF_SYNC_SLAVE: u8 = 1 << 7;

/// Global current value the datasheet prescribes while open/short detection
/// runs.
pub const OSD_DETECT_CURRENT: u8 = 0x01;

/// Board defaults for the SW pull-up / CS pull-down resistor banks.
pub const SW_PULLUP_DEFAULT: u8 = 0x07;
pub const CS_PULLDOWN_DEFAULT: u8 = 0x07;

/// Auto-breath-mode assignment for one LED channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AbmChannel {
    /// Plain PWM, no auto-breath.
    Pwm = 0x00,
    Channel1 = 0x01,
    Channel2 = 0x02,
    Channel3 = 0x03,
}
