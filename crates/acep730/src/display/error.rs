//! Driver error type

use platform::ConfigError;

/// Error returned by the ACeP730 driver and its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// Invalid configuration value
    Configuration(ConfigError),
    /// SPI bus write or flush failed
    Transport,
    /// GPIO read or write failed
    Gpio,
    /// Busy line did not release within the configured bound
    Timeout,
    /// `update()` called before `initialize()`
    NotInitialized,
    /// Frame storage does not match the panel resolution
    InvalidBuffer,
}

impl DriverError {
    /// True for failures a caller may reasonably retry: the panel stayed busy
    /// or the bus glitched.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport)
    }
}

impl From<ConfigError> for DriverError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DriverError {}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Configuration(err) => write!(f, "Configuration error: {err}"),
            Self::Transport => write!(f, "SPI transport error"),
            Self::Gpio => write!(f, "GPIO error"),
            Self::Timeout => write!(f, "Panel busy timeout"),
            Self::NotInitialized => write!(f, "Driver not initialized"),
            Self::InvalidBuffer => write!(f, "Frame buffer size does not match panel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(DriverError::Timeout.to_string(), "Panel busy timeout");
        assert_eq!(DriverError::Transport.to_string(), "SPI transport error");
        assert_eq!(
            DriverError::from(ConfigError::ZeroFrequency).to_string(),
            "Configuration error: SPI frequency must be greater than zero"
        );
    }

    #[test]
    fn only_timeout_and_transport_are_transient() {
        assert!(DriverError::Timeout.is_transient());
        assert!(DriverError::Transport.is_transient());
        assert!(!DriverError::Gpio.is_transient());
        assert!(!DriverError::NotInitialized.is_transient());
        assert!(!DriverError::InvalidBuffer.is_transient());
    }
}
