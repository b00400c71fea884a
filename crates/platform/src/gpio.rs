//! GPIO helpers for the panel wiring
//!
//! Pin *types* come from `embedded-hal` 1.0. This module adds the pieces the
//! trait family does not cover: a placeholder for an unwired rail-enable
//! line, and validation of the raw pin numbers a host configuration supplies.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::ConfigError;

/// Raw identifier meaning "rail-enable pin not wired".
pub const RAIL_ABSENT: i32 = -1;

/// Output pin that is not connected to anything.
///
/// Used as the `RAIL` type parameter when the panel has no switchable
/// high-voltage supply. Writes always succeed and do nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoPin;

impl ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Validated GPIO number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct PinId(u8);

impl PinId {
    /// Return the GPIO number.
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Pin numbers for the five panel lines, validated.
///
/// Four lines are required. The rail-enable line is optional and is given as
/// [`RAIL_ABSENT`] (−1) when the panel supply is not switchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinAssignment {
    /// SPI chip select (output, active low)
    pub cs: PinId,
    /// Data/command select (output, low = command)
    pub dc: PinId,
    /// Controller reset (output, active low)
    pub reset: PinId,
    /// Busy sense (input, low = busy)
    pub busy: PinId,
    /// Rail enable (output, high = panel supply on)
    pub rail_en: Option<PinId>,
}

impl PinAssignment {
    /// Validate raw pin numbers.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingPin`] if a required pin is negative
    /// - [`ConfigError::InvalidPin`] if a pin is above 255, or the rail is
    ///   negative but not [`RAIL_ABSENT`]
    /// - [`ConfigError::DuplicatePin`] if two roles share a pin
    pub fn from_raw(
        cs: i32,
        dc: i32,
        reset: i32,
        busy: i32,
        rail_en: i32,
    ) -> Result<Self, ConfigError> {
        let rail_en = match rail_en {
            RAIL_ABSENT => None,
            raw if raw < 0 => return Err(ConfigError::InvalidPin(raw)),
            raw => Some(pin_id(raw)?),
        };

        let pins = Self {
            cs: required("cs", cs)?,
            dc: required("dc", dc)?,
            reset: required("reset", reset)?,
            busy: required("busy", busy)?,
            rail_en,
        };
        pins.check_unique()?;
        Ok(pins)
    }

    fn check_unique(&self) -> Result<(), ConfigError> {
        let all = [self.cs, self.dc, self.reset, self.busy]
            .into_iter()
            .chain(self.rail_en);
        for (i, pin) in all.clone().enumerate() {
            if all.clone().skip(i.saturating_add(1)).any(|other| other == pin) {
                return Err(ConfigError::DuplicatePin(pin.get()));
            }
        }
        Ok(())
    }
}

fn required(role: &'static str, raw: i32) -> Result<PinId, ConfigError> {
    if raw < 0 {
        return Err(ConfigError::MissingPin(role));
    }
    pin_id(raw)
}

fn pin_id(raw: i32) -> Result<PinId, ConfigError> {
    u8::try_from(raw)
        .map(PinId)
        .map_err(|_| ConfigError::InvalidPin(raw))
}
