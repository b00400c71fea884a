//! ACeP730 controller command set
//!
//! Opcodes and the power-on register sequence for the 7.3" six-pigment
//! controller. The byte values are fixed by the panel vendor and must not be
//! derived from configuration.

/// Controller command codes.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// PSR: panel setting, 2 data bytes.
    PanelSetting = 0x00,
    /// PWR: power setting, 1 data byte.
    PowerSetting = 0x01,
    /// POF: power off, 1 data byte. Charge pumps stop after the refresh.
    PowerOff = 0x02,
    /// POFS: power-off sequence timing, 4 data bytes.
    PowerOffSequence = 0x03,
    /// PON: power on, no data. Charge pumps start.
    PowerOn = 0x04,
    /// BTST1: booster soft start phase 1, 4 data bytes.
    BoosterSoftStart1 = 0x05,
    /// BTST2: booster soft start phase 2, 4 data bytes.
    BoosterSoftStart2 = 0x06,
    /// DSLP: deep sleep, 1 check byte ([`DEEP_SLEEP_CHECK`]). Wake needs a
    /// hardware reset.
    DeepSleep = 0x07,
    /// BTST3: booster soft start phase 3, 4 data bytes.
    BoosterSoftStart3 = 0x08,
    /// DTM: data start transmission, followed by the packed frame.
    DataStartTransmission = 0x10,
    /// DRF: display refresh, 1 data byte. BUSY goes low until done.
    DisplayRefresh = 0x12,
    /// PLL: frame rate control, 1 data byte.
    PllControl = 0x30,
    /// CDI: VCOM and data interval, 1 data byte.
    VcomDataInterval = 0x50,
    /// TCON: gate/source non-overlap, 2 data bytes.
    TconSetting = 0x60,
    /// TRES: resolution, 4 data bytes (HRES hi/lo, VRES hi/lo).
    ResolutionSetting = 0x61,
    /// T_VDCS: VCOM DC setting, 1 data byte.
    VcomDcSetting = 0x84,
    /// PWS: power saving, 1 data byte.
    PowerSaving = 0xE3,
    /// CMDH: command header unlock, 6 data bytes.
    CommandHeader = 0xAA,
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> Self {
        cmd as u8
    }
}

/// Data byte sent with [`Command::DisplayRefresh`].
pub const REFRESH_NORMAL: u8 = 0x00;

/// Data byte sent with [`Command::PowerOff`].
pub const POWER_OFF_NORMAL: u8 = 0x00;

/// Check code the controller requires before entering deep sleep.
pub const DEEP_SLEEP_CHECK: u8 = 0xA5;

/// Register writes issued after every hardware reset, in order.
///
/// `ResolutionSetting` encodes 800 (0x0320) × 480 (0x01E0).
pub const INIT_SEQUENCE: &[(Command, &[u8])] = &[
    (Command::CommandHeader, &[0x49, 0x55, 0x20, 0x08, 0x09, 0x18]),
    (Command::PowerSetting, &[0x3F]),
    (Command::PanelSetting, &[0x5F, 0x69]),
    (Command::PowerOffSequence, &[0x00, 0x54, 0x00, 0x44]),
    (Command::BoosterSoftStart1, &[0x40, 0x1F, 0x1F, 0x2C]),
    (Command::BoosterSoftStart2, &[0x6F, 0x1F, 0x17, 0x49]),
    (Command::BoosterSoftStart3, &[0x6F, 0x1F, 0x1F, 0x22]),
    (Command::PllControl, &[0x03]),
    (Command::VcomDataInterval, &[0x3F]),
    (Command::TconSetting, &[0x02, 0x00]),
    (Command::ResolutionSetting, &[0x03, 0x20, 0x01, 0xE0]),
    (Command::VcomDcSetting, &[0x01]),
    (Command::PowerSaving, &[0x2F]),
];
