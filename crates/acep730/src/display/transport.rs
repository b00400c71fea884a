//! SPI framing for the ACeP730 controller
//!
//! Every [`SpiTransport::write_command`] / [`SpiTransport::write_data`] call
//! is one chip-select frame:
//!
//! ```text
//! CS ‾‾‾‾\____________________/‾‾‾‾
//! DC ----< low=cmd / high=data >----
//! SCK        ||||||||||||  flush
//! ```
//!
//! CS is driven directly rather than through an `SpiDevice` so the frame
//! boundaries stay under driver control and can be observed in tests. A drop
//! guard raises CS on every exit path, including a future cancelled
//! mid-transfer.

use embedded_hal::digital::{OutputPin, PinState};
use embedded_hal_async::spi::SpiBus;

use platform::{SpiClock, SpiFrequency};

use super::DriverError;

/// Byte-level transport over an SPI bus with discrete CS and DC lines.
pub struct SpiTransport<BUS, CS, DC> {
    bus: BUS,
    cs: CS,
    dc: DC,
}

impl<BUS, CS, DC> SpiTransport<BUS, CS, DC>
where
    BUS: SpiBus,
    CS: OutputPin,
    DC: OutputPin,
{
    /// Wrap a bus and its CS / DC lines. No pins are touched until the
    /// first transfer or [`SpiTransport::release_cs`].
    pub fn new(bus: BUS, cs: CS, dc: DC) -> Self {
        Self { bus, cs, dc }
    }

    /// Drive CS high (inactive).
    pub fn release_cs(&mut self) -> Result<(), DriverError> {
        self.cs.set_high().map_err(|_| DriverError::Gpio)
    }

    /// Send one command byte with DC low.
    pub async fn write_command(&mut self, cmd: u8) -> Result<(), DriverError> {
        self.frame(PinState::Low, &[cmd]).await
    }

    /// Send data bytes with DC high. An empty slice is a no-op.
    pub async fn write_data(&mut self, data: &[u8]) -> Result<(), DriverError> {
        if data.is_empty() {
            return Ok(());
        }
        self.frame(PinState::High, data).await
    }

    async fn frame(&mut self, dc: PinState, bytes: &[u8]) -> Result<(), DriverError> {
        let Self {
            bus,
            cs,
            dc: dc_pin,
        } = self;
        let guard = CsGuard::select(cs)?;
        dc_pin.set_state(dc).map_err(|_| DriverError::Gpio)?;
        bus.write(bytes).await.map_err(|_| DriverError::Transport)?;
        bus.flush().await.map_err(|_| DriverError::Transport)?;
        guard.deselect()
    }

    /// Give back the bus and pins.
    pub fn release(self) -> (BUS, CS, DC) {
        (self.bus, self.cs, self.dc)
    }
}

impl<BUS, CS, DC> SpiTransport<BUS, CS, DC>
where
    BUS: SpiBus + SpiClock,
{
    /// Change the SCK frequency for subsequent transfers.
    pub fn set_frequency(&mut self, frequency: SpiFrequency) -> Result<(), DriverError> {
        self.bus
            .set_frequency(frequency)
            .map_err(|_| DriverError::Transport)
    }
}

/// Holds CS low for the lifetime of one frame.
struct CsGuard<'a, CS: OutputPin> {
    cs: &'a mut CS,
    armed: bool,
}

impl<'a, CS: OutputPin> CsGuard<'a, CS> {
    fn select(cs: &'a mut CS) -> Result<Self, DriverError> {
        cs.set_low().map_err(|_| DriverError::Gpio)?;
        Ok(Self { cs, armed: true })
    }

    /// Raise CS and report whether that succeeded.
    fn deselect(mut self) -> Result<(), DriverError> {
        self.armed = false;
        self.cs.set_high().map_err(|_| DriverError::Gpio)
    }
}

impl<CS: OutputPin> Drop for CsGuard<'_, CS> {
    fn drop(&mut self) {
        if self.armed {
            // The error that unwound the frame is the one worth reporting.
            let _ = self.cs.set_high();
        }
    }
}
