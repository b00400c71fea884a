//! Panel configuration and timing
//!
//! [`PanelConfig`] is fixed once the driver is initialized. The `timing`
//! constants come from the controller datasheet and are not configurable.

use platform::{ConfigError, SpiFrequency};

/// Fixed delays of the update cycle, in milliseconds.
pub mod timing {
    /// Rail-enable to first reset edge.
    pub const RAIL_SETTLE_MS: u32 = 120;
    /// Reset held high before the pulse.
    pub const RESET_LEAD_MS: u32 = 20;
    /// Reset pulse width (low).
    pub const RESET_PULSE_MS: u32 = 2;
    /// Reset held high after the pulse.
    pub const RESET_RECOVERY_MS: u32 = 20;
    /// Controller boot time after reset, before the first command.
    pub const POST_RESET_SETTLE_MS: u32 = 30;
    /// Charge-pump start after PON, before the refresh is triggered.
    pub const POWER_ON_SETTLE_MS: u32 = 100;
    /// Controller power-down to rail release.
    pub const POWER_OFF_SETTLE_MS: u32 = 50;
}

/// Default busy-wait bound. A full seven-color refresh takes 20-30 s.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 40_000;

/// Default busy-line poll interval.
pub const DEFAULT_BUSY_POLL_MS: u32 = 10;

/// Driver configuration.
///
/// ```
/// use acep730::PanelConfig;
///
/// let config = PanelConfig::default()
///     .with_power_off_after_update(true)
///     .with_busy_timeout_ms(30_000);
/// assert_eq!(config.spi_frequency.hz(), 4_000_000);
/// assert_eq!(config.max_busy_polls(), 3_000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelConfig {
    /// SPI clock applied at initialize
    pub spi_frequency: SpiFrequency,
    /// Deep-sleep the controller and release the rail (if any) after each refresh
    pub power_off_after_update: bool,
    /// Upper bound on the busy-wait after a refresh
    pub busy_timeout_ms: u32,
    /// Delay between busy-line samples
    pub busy_poll_ms: u32,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            spi_frequency: SpiFrequency::DEFAULT,
            power_off_after_update: false,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            busy_poll_ms: DEFAULT_BUSY_POLL_MS,
        }
    }
}

impl PanelConfig {
    /// Set the SPI clock in Hz.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroFrequency`] if `hz == 0`.
    pub fn with_spi_hz(mut self, hz: u32) -> Result<Self, ConfigError> {
        self.spi_frequency = SpiFrequency::try_new(hz)?;
        Ok(self)
    }

    /// Set the SPI clock.
    pub fn with_spi_frequency(mut self, frequency: SpiFrequency) -> Self {
        self.spi_frequency = frequency;
        self
    }

    /// Enable or disable power-down after each refresh.
    pub fn with_power_off_after_update(mut self, enabled: bool) -> Self {
        self.power_off_after_update = enabled;
        self
    }

    /// Set the busy-wait bound.
    pub fn with_busy_timeout_ms(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// Set the busy-line poll interval. Zero is treated as 1 ms.
    pub fn with_busy_poll_ms(mut self, ms: u32) -> Self {
        self.busy_poll_ms = ms.max(1);
        self
    }

    /// Number of busy samples that fit in the timeout, at least one.
    pub fn max_busy_polls(&self) -> u32 {
        self.busy_timeout_ms
            .div_ceil(self.busy_poll_ms.max(1))
            .max(1)
    }
}
