//! Two-wire bus transaction primitive.
//!
//! The bit-banged bus driver lives in board code; the crate only needs the
//! transaction surface. A transaction is bracketed by [`TwoWireBus::start`]
//! and [`TwoWireBus::stop`], with the read/write direction encoded in the low
//! bit of the address byte.

/// Fixed timeout, in bus-clock ticks, used for every transaction phase.
pub const BUS_TIMEOUT_TICKS: u8 = 10;

/// Low bit of the address byte: set for a read transaction, clear for write.
pub const RW_READ: u8 = 0x01;

/// A failed bus phase.
///
/// Deliberately carries no detail: a timeout, a NACK and a lost line are all
/// handled the same way (terminate the transaction, report the operation as
/// failed, never retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusError;

/// Blocking two-wire transaction primitive.
pub trait TwoWireBus {
    /// Begin a transaction with the device at `address` (R/W bit included).
    fn start(&mut self, address: u8, timeout_ticks: u8) -> Result<(), BusError>;

    /// Send one byte inside the current transaction.
    fn send_byte(&mut self, byte: u8) -> Result<(), BusError>;

    /// Receive one byte inside the current (read) transaction.
    fn receive_byte(&mut self) -> Result<u8, BusError>;

    /// Terminate the current transaction. Always safe to call.
    fn stop(&mut self);
}

impl<T: TwoWireBus> TwoWireBus for &mut T {
    fn start(&mut self, address: u8, timeout_ticks: u8) -> Result<(), BusError> {
        T::start(self, address, timeout_ticks)
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), BusError> {
        T::send_byte(self, byte)
    }

    fn receive_byte(&mut self) -> Result<u8, BusError> {
        T::receive_byte(self)
    }

    fn stop(&mut self) {
        T::stop(self);
    }
}
