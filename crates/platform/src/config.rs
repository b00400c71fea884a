//! Configuration validation errors
//!
//! Pin identifiers and the SPI clock arrive as plain integers from whatever
//! configuration surface hosts the panel. Validating them produces these
//! errors before any hardware is touched.

/// Invalid or missing configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A required pin was given as a negative identifier.
    MissingPin(&'static str),
    /// A pin identifier is outside the representable range.
    InvalidPin(i32),
    /// The same pin identifier was assigned to two roles.
    DuplicatePin(u8),
    /// SPI clock frequency must be a positive number of Hz.
    ZeroFrequency,
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::MissingPin(role) => write!(f, "Required pin '{role}' is not assigned"),
            Self::InvalidPin(raw) => write!(f, "Pin identifier {raw} is out of range"),
            Self::DuplicatePin(id) => write!(f, "Pin {id} is assigned to more than one role"),
            Self::ZeroFrequency => write!(f, "SPI frequency must be greater than zero"),
        }
    }
}
