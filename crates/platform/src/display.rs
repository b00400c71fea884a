//! Panel refresh-cycle state

/// Phase of a full-refresh update cycle.
///
/// A cycle always starts and ends in [`UpdateState::Idle`]:
///
/// ```text
/// Idle → (PoweringOn) → Resetting → Sending → WaitingBusy → (PoweringOff) → Idle
/// ```
///
/// `PoweringOn` only appears when a rail-enable pin is wired. `PoweringOff`
/// only appears when the rail is wired and power-off-after-update is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateState {
    /// No cycle in progress
    #[default]
    Idle,
    /// High-voltage rail asserted, waiting for it to settle
    PoweringOn,
    /// Hardware reset pulse on the controller
    Resetting,
    /// Init sequence and pixel data on the SPI bus
    Sending,
    /// Refresh running, polling the busy line
    WaitingBusy,
    /// Controller powered down, rail being released
    PoweringOff,
}

impl UpdateState {
    /// Short lowercase name, for log lines.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::PoweringOn => "powering-on",
            Self::Resetting => "resetting",
            Self::Sending => "sending",
            Self::WaitingBusy => "waiting-busy",
            Self::PoweringOff => "powering-off",
        }
    }

    /// True for every state except [`UpdateState::Idle`].
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl core::fmt::Display for UpdateState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
