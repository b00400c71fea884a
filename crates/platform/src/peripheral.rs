//! SPI clock configuration
//!
//! `embedded-hal-async` leaves bus configuration to each HAL. The panel
//! driver needs exactly one knob, the SCK frequency, so it is expressed as a
//! small trait the hardware binary and the test mocks both implement.

use core::num::NonZeroU32;

use embedded_hal_async::spi::ErrorType;

use crate::ConfigError;

/// SPI clock frequency in Hz, guaranteed non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SpiFrequency(NonZeroU32);

impl SpiFrequency {
    /// 4 MHz, safe for the ACeP730 controller over short ribbon cables.
    pub const DEFAULT: Self = match NonZeroU32::new(4_000_000) {
        Some(hz) => Self(hz),
        None => Self(NonZeroU32::MIN),
    };

    /// Create a `SpiFrequency`, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroFrequency`] if `hz == 0`.
    pub const fn try_new(hz: u32) -> Result<Self, ConfigError> {
        match NonZeroU32::new(hz) {
            Some(hz) => Ok(Self(hz)),
            None => Err(ConfigError::ZeroFrequency),
        }
    }

    /// Return the frequency in Hz.
    pub const fn hz(self) -> u32 {
        self.0.get()
    }
}

impl Default for SpiFrequency {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SpiFrequency {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "{=u32} Hz", self.hz());
    }
}

/// Bus whose SCK frequency can be changed at runtime.
pub trait SpiClock: ErrorType {
    /// Apply `frequency` to subsequent transfers.
    fn set_frequency(&mut self, frequency: SpiFrequency) -> Result<(), Self::Error>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_is_four_megahertz() {
        assert_eq!(SpiFrequency::default().hz(), 4_000_000);
    }

    #[test]
    fn zero_is_rejected() {
        assert_eq!(SpiFrequency::try_new(0), Err(ConfigError::ZeroFrequency));
    }

    #[test]
    fn positive_value_round_trips() {
        assert_eq!(SpiFrequency::try_new(2_000_000).unwrap().hz(), 2_000_000);
    }
}
