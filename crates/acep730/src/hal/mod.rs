//! Hardware Abstraction Layer for the panel
//!
//! The update loop in [`crate::task`] drives any [`Panel`], so it can be
//! exercised on the host with a scripted panel instead of real hardware.

use platform::UpdateState;

use crate::display::{DriverError, FrameBuffer};

/// A full-refresh color panel.
pub trait Panel {
    /// Put every control line at its idle level and apply the bus clock.
    fn initialize(&mut self) -> Result<(), DriverError>;

    /// Run one complete refresh cycle showing `frame`.
    ///
    /// Implementations return with the panel idle whatever the outcome.
    async fn update(&mut self, frame: &FrameBuffer<'_>) -> Result<(), DriverError>;

    /// Current refresh-cycle state.
    fn state(&self) -> UpdateState;
}
