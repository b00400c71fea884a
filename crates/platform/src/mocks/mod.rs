//! Wire-level mocks for testing
//!
//! Every mock records into one shared [`WireLog`], so a test can look at the
//! exact interleaving of chip-select edges, bus writes, busy reads and delays
//! across the whole panel, not just per peripheral.
//!
//! The expectation-driven mocks from `embedded-hal-mock` are still the tool
//! for byte-exact unit tests. These recorders are meant for full update
//! cycles, where the frame alone is 188 bus writes.

#![cfg(any(test, feature = "std"))]

use std::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::digital::{self, PinState};
use embedded_hal::spi;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::SpiBus;

use crate::{SpiClock, SpiFrequency};

/// Logical output line of the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// Chip select
    Cs,
    /// Data/command
    Dc,
    /// Controller reset
    Reset,
    /// High-voltage rail enable
    Rail,
}

/// One observable action on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    /// An output line was driven.
    Set(Line, PinState),
    /// Bytes written on the bus.
    Write(Vec<u8>),
    /// Bus flushed.
    Flush,
    /// Busy line sampled; `true` means the panel reported busy.
    BusyRead(bool),
    /// Delay requested, in nanoseconds.
    Delay(u64),
    /// SPI clock changed.
    Frequency(u32),
}

/// Shared, ordered event log.
#[derive(Debug, Clone, Default)]
pub struct WireLog(Rc<RefCell<Vec<WireEvent>>>);

impl WireLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: WireEvent) {
        self.0.borrow_mut().push(event);
    }

    /// Snapshot of all events so far.
    pub fn events(&self) -> Vec<WireEvent> {
        self.0.borrow().clone()
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Number of times `line` was driven.
    pub fn set_count(&self, line: Line) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|e| matches!(e, WireEvent::Set(l, _) if *l == line))
            .count()
    }

    /// Last level `line` was driven to, if ever.
    pub fn last_level(&self, line: Line) -> Option<PinState> {
        self.0.borrow().iter().rev().find_map(|e| match e {
            WireEvent::Set(l, level) if *l == line => Some(*level),
            _ => None,
        })
    }

    /// Every bus write, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                WireEvent::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of busy-line samples.
    pub fn busy_reads(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|e| matches!(e, WireEvent::BusyRead(_)))
            .count()
    }

    /// Sum of all requested delays, in milliseconds.
    pub fn total_delay_ms(&self) -> u64 {
        let ns: u64 = self
            .0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                WireEvent::Delay(ns) => Some(*ns),
                _ => None,
            })
            .fold(0, u64::saturating_add);
        ns / 1_000_000
    }
}

/// Error produced by a mock when told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockFault;

impl spi::Error for MockFault {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

impl digital::Error for MockFault {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

/// Recording output pin.
#[derive(Debug, Clone)]
pub struct MockOutput {
    line: Line,
    log: WireLog,
    fail: bool,
}

impl MockOutput {
    /// Output that records writes as `line`.
    pub fn new(line: Line, log: &WireLog) -> Self {
        Self {
            line,
            log: log.clone(),
            fail: false,
        }
    }

    /// Output whose every write fails without being recorded.
    pub fn failing(line: Line, log: &WireLog) -> Self {
        Self {
            fail: true,
            ..Self::new(line, log)
        }
    }

    fn drive(&mut self, level: PinState) -> Result<(), MockFault> {
        if self.fail {
            return Err(MockFault);
        }
        self.log.push(WireEvent::Set(self.line, level));
        Ok(())
    }
}

impl digital::ErrorType for MockOutput {
    type Error = MockFault;
}

impl digital::OutputPin for MockOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(PinState::Low)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(PinState::High)
    }
}

/// Scripted busy line (active low).
///
/// Reports busy for the first `busy_reads` samples, then idle forever. A
/// stuck line reports busy forever.
#[derive(Debug, Clone)]
pub struct MockBusy {
    log: WireLog,
    remaining: Option<usize>,
}

impl MockBusy {
    /// Busy for `busy_reads` samples, then idle.
    pub fn idle_after(busy_reads: usize, log: &WireLog) -> Self {
        Self {
            log: log.clone(),
            remaining: Some(busy_reads),
        }
    }

    /// Busy line that never releases.
    pub fn stuck(log: &WireLog) -> Self {
        Self {
            log: log.clone(),
            remaining: None,
        }
    }

    fn sample_busy(&mut self) -> bool {
        let busy = match self.remaining.as_mut() {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n = n.saturating_sub(1);
                true
            }
        };
        self.log.push(WireEvent::BusyRead(busy));
        busy
    }
}

impl digital::ErrorType for MockBusy {
    type Error = MockFault;
}

impl digital::InputPin for MockBusy {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.sample_busy())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.sample_busy())
    }
}

/// Recording SPI bus.
#[derive(Debug, Clone)]
pub struct MockBus {
    log: WireLog,
    fail_at: Option<usize>,
    writes: usize,
}

impl MockBus {
    /// Bus that accepts every transfer.
    pub fn new(log: &WireLog) -> Self {
        Self {
            log: log.clone(),
            fail_at: None,
            writes: 0,
        }
    }

    /// Bus whose write number `index` (zero-based) fails, along with every
    /// write after it.
    pub fn failing_at(index: usize, log: &WireLog) -> Self {
        Self {
            fail_at: Some(index),
            ..Self::new(log)
        }
    }

    fn record_write(&mut self, bytes: &[u8]) -> Result<(), MockFault> {
        let index = self.writes;
        self.writes = self.writes.saturating_add(1);
        if self.fail_at.is_some_and(|at| index >= at) {
            return Err(MockFault);
        }
        self.log.push(WireEvent::Write(bytes.to_vec()));
        Ok(())
    }
}

impl spi::ErrorType for MockBus {
    type Error = MockFault;
}

impl SpiBus<u8> for MockBus {
    async fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        words.fill(0);
        Ok(())
    }

    async fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.record_write(words)
    }

    async fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        read.fill(0);
        self.record_write(write)
    }

    async fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let written = words.to_vec();
        words.fill(0);
        self.record_write(&written)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.log.push(WireEvent::Flush);
        Ok(())
    }
}

impl SpiClock for MockBus {
    fn set_frequency(&mut self, frequency: SpiFrequency) -> Result<(), Self::Error> {
        self.log.push(WireEvent::Frequency(frequency.hz()));
        Ok(())
    }
}

/// Delay that returns immediately and records the requested duration.
#[derive(Debug, Clone)]
pub struct MockDelay {
    log: WireLog,
}

impl MockDelay {
    /// Delay recording into `log`.
    pub fn new(log: &WireLog) -> Self {
        Self { log: log.clone() }
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.log.push(WireEvent::Delay(u64::from(ns)));
    }

    async fn delay_us(&mut self, us: u32) {
        self.log
            .push(WireEvent::Delay(u64::from(us).saturating_mul(1_000)));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.log
            .push(WireEvent::Delay(u64::from(ms).saturating_mul(1_000_000)));
    }
}
