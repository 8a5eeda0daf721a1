//! Test doubles: a transcript-recording bus and a deferred-timer recorder.

use embassy_time::Duration;

use crate::bus::{BusError, TwoWireBus};
use crate::timer::DeferredTimer;

/// One recorded bus phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BusEvent {
    Start(u8),
    Send(u8),
    Recv(u8),
    Stop,
}

/// Bus double that records a full transaction transcript.
///
/// Bytes for read transactions are scripted up front; an optional failure
/// point makes the n-th fallible phase (start/send/receive) error, which is
/// how partial-write behavior gets exercised.
pub(crate) struct FakeBus {
    pub(crate) events: heapless::Vec<BusEvent, 32768>,
    read_data: heapless::Deque<u8, 256>,
    fail_at: Option<usize>,
    ops: usize,
}

impl FakeBus {
    pub(crate) fn new() -> Self {
        Self {
            events: heapless::Vec::new(),
            read_data: heapless::Deque::new(),
            fail_at: None,
            ops: 0,
        }
    }

    pub(crate) fn with_read_data(data: &[u8]) -> Self {
        let mut bus = Self::new();
        bus.queue_reads(data);
        bus
    }

    /// Script bytes to be returned by subsequent read transactions.
    pub(crate) fn queue_reads(&mut self, data: &[u8]) {
        for &byte in data {
            self.read_data.push_back(byte).unwrap();
        }
    }

    /// Make the fallible phase with index `op` fail, counting from 0 since
    /// construction or the last [`FakeBus::clear_events`].
    pub(crate) fn fail_at(&mut self, op: usize) {
        self.fail_at = Some(op);
    }

    /// Forget the transcript so far and restart the phase counter; scripted
    /// reads are kept.
    pub(crate) fn clear_events(&mut self) {
        self.events.clear();
        self.ops = 0;
    }

    fn step(&mut self) -> Result<(), BusError> {
        let op = self.ops;
        self.ops += 1;
        if self.fail_at == Some(op) {
            return Err(BusError);
        }
        Ok(())
    }

    fn record(&mut self, event: BusEvent) {
        self.events.push(event).unwrap();
    }
}

impl Default for FakeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl TwoWireBus for FakeBus {
    fn start(&mut self, address: u8, _timeout_ticks: u8) -> Result<(), BusError> {
        self.step()?;
        self.record(BusEvent::Start(address));
        Ok(())
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), BusError> {
        self.step()?;
        self.record(BusEvent::Send(byte));
        Ok(())
    }

    fn receive_byte(&mut self) -> Result<u8, BusError> {
        self.step()?;
        let byte = self.read_data.pop_front().ok_or(BusError)?;
        self.record(BusEvent::Recv(byte));
        Ok(byte)
    }

    fn stop(&mut self) {
        self.record(BusEvent::Stop);
    }
}

/// Deferred-timer double recording every armed delay.
pub(crate) struct FakeTimer {
    pub(crate) armed: heapless::Vec<Duration, 256>,
}

impl FakeTimer {
    pub(crate) fn new() -> Self {
        Self {
            armed: heapless::Vec::new(),
        }
    }
}

impl Default for FakeTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl DeferredTimer for FakeTimer {
    fn arm(&mut self, delay: Duration) {
        self.armed.push(delay).unwrap();
    }
}
