//! Command-register protocol engine.
//!
//! Translates `(device address, page, offset)` tuples into the transaction
//! sequences the chip expects. Every paged operation begins with exactly one
//! unlock + page-select pair (each its own start/stop transaction); the
//! unlock and page registers themselves are reached directly, outside the
//! page mechanism.
//!
//! Reads are two-phase: a write transaction selects the offset, a separate
//! read transaction fetches the byte. A burst read repeats that pair once per
//! byte; the chip does not auto-increment on reads. A burst write is a
//! single transaction carrying the offset and the whole payload.
//!
//! Any failed phase terminates the current transaction with `stop` and
//! surfaces as [`Error::Bus`]; nothing is retried.

use log::debug;

use crate::Error;
use crate::bus::{BUS_TIMEOUT_TICKS, BusError, RW_READ, TwoWireBus};

use super::regs::{COMMAND_REGISTER, COMMAND_WRITE_LOCK, Page, WRITE_UNLOCK_MAGIC};

/// Register protocol engine over a raw two-wire bus.
pub struct CommandPort<B> {
    bus: B,
}

impl<B: TwoWireBus> CommandPort<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Give the bus back, e.g. to share it with another device.
    pub fn release(self) -> B {
        self.bus
    }

    /// Run one write transaction; `stop` is issued no matter how it ends.
    fn transact(
        &mut self,
        addr: u8,
        body: impl FnOnce(&mut B) -> Result<(), BusError>,
    ) -> Result<(), Error> {
        let res = self
            .bus
            .start(addr, BUS_TIMEOUT_TICKS)
            .and_then(|()| body(&mut self.bus));
        self.bus.stop();
        res.map_err(Error::from)
    }

    /// Run one single-byte read transaction; `stop` is issued no matter how
    /// it ends.
    fn receive_one(&mut self, addr: u8) -> Result<u8, Error> {
        let res = self
            .bus
            .start(addr | RW_READ, BUS_TIMEOUT_TICKS)
            .and_then(|()| self.bus.receive_byte());
        self.bus.stop();
        res.map_err(Error::from)
    }

    /// Write a register directly, bypassing the page mechanism.
    ///
    /// Only the unlock and page-select registers are legal targets; this is
    /// how unlocking itself avoids recursing into page selection.
    pub fn write_reg(&mut self, addr: u8, offset: u8, value: u8) -> Result<(), Error> {
        self.transact(addr, |bus| {
            bus.send_byte(offset)?;
            bus.send_byte(value)
        })
    }

    /// Read a register directly: offset-select write, then a one-byte read.
    pub fn read_reg(&mut self, addr: u8, offset: u8) -> Result<u8, Error> {
        self.transact(addr, |bus| bus.send_byte(offset))?;
        self.receive_one(addr)
    }

    fn unlock(&mut self, addr: u8) -> Result<(), Error> {
        self.write_reg(addr, COMMAND_WRITE_LOCK, WRITE_UNLOCK_MAGIC)
    }

    fn select_page(&mut self, addr: u8, page: Page) -> Result<(), Error> {
        self.unlock(addr)?;
        self.write_reg(addr, COMMAND_REGISTER, page as u8)
    }

    /// Read one byte from `page:offset`.
    pub fn read_byte(&mut self, addr: u8, page: Page, offset: u8) -> Result<u8, Error> {
        self.select_page(addr, page)?;
        let value = self.read_reg(addr, offset).inspect_err(|_| {
            debug!("cmd read failed {addr:#04x}:{}:{offset:#04x}", page as u8);
        })?;
        Ok(value)
    }

    /// Read `buf.len()` bytes starting at `page:offset`, one offset-select +
    /// read pair per byte, page-selected once up front.
    pub fn read_burst(
        &mut self,
        addr: u8,
        page: Page,
        offset: u8,
        buf: &mut [u8],
    ) -> Result<(), Error> {
        self.select_page(addr, page)?;
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.read_reg(addr, offset + i as u8).inspect_err(|_| {
                debug!(
                    "cmd burst read failed {addr:#04x}:{}:{:#04x}",
                    page as u8,
                    offset + i as u8
                );
            })?;
        }
        Ok(())
    }

    /// Write one byte to `page:offset`.
    pub fn write_byte(&mut self, addr: u8, page: Page, offset: u8, value: u8) -> Result<(), Error> {
        self.select_page(addr, page)?;
        self.write_reg(addr, offset, value).inspect_err(|_| {
            debug!("cmd write failed {addr:#04x}:{}:{offset:#04x}", page as u8);
        })
    }

    /// Write `data` contiguously starting at `page:offset` in a single
    /// transaction.
    pub fn write_burst(
        &mut self,
        addr: u8,
        page: Page,
        offset: u8,
        data: &[u8],
    ) -> Result<(), Error> {
        self.select_page(addr, page)?;
        self.transact(addr, |bus| {
            bus.send_byte(offset)?;
            data.iter().try_for_each(|&byte| bus.send_byte(byte))
        })
        .inspect_err(|_| {
            debug!("cmd burst write failed {addr:#04x}:{}:{offset:#04x}", page as u8);
        })
    }
}
