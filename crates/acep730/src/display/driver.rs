//! ACeP730 Hardware Driver
//!
//! Async full-refresh driver for the 7.3" ACeP six-pigment panel (800×480).
//!
//! # Wiring (STM32H743ZI example)
//!
//! | Signal  | STM32 pin            | Direction      |
//! |---------|----------------------|----------------|
//! | SCK     | PA5 (SPI1_SCK)       | Host → Display |
//! | MOSI    | PA7 (SPI1_MOSI)      | Host → Display |
//! | CS      | PB1 (GPIO)           | Host → Display |
//! | DC      | PB0 (GPIO)           | Host → Display |
//! | RST     | PB2 (GPIO)           | Host → Display |
//! | BUSY    | PE3 (GPIO)           | Display → Host |
//! | RAIL_EN | PB4 (GPIO, optional) | Host → Supply  |
//!
//! # Update cycle
//!
//! ```text
//! Idle ─► PoweringOn ─► Resetting ─► Sending ─► WaitingBusy ─► PoweringOff ─► Idle
//!          (rail only)                                          (power-off flag)
//! ```
//!
//! - **PoweringOn**: rail high, 120 ms settle.
//! - **Resetting**: RST high 20 ms → low 2 ms → high 20 ms, then 30 ms boot.
//! - **Sending**: init registers, DTM + packed frame in 1 KiB frames,
//!   PON + 100 ms, DRF.
//! - **WaitingBusy**: poll BUSY (low = busy) every `busy_poll_ms` until idle
//!   or `busy_timeout_ms` elapses, then POF unless powering off follows.
//! - **PoweringOff**: POF, DSLP, 50 ms, rail low (if any).
//!
//! The charge pumps are switched off (POF) after every completed refresh.
//! Bus traffic happens in `Sending`, `PoweringOff` and the closing POF of
//! `WaitingBusy`. BUSY is sampled
//! only in `WaitingBusy`. The rail is raised only in `PoweringOn` and lowered
//! only in `PoweringOff` (plus its idle level at [`Acep730::initialize`]).
//!
//! On any error the driver returns to `Idle` and leaves the rail as it was.

use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal_async::{delay::DelayNs, spi::SpiBus};

use platform::{SpiClock, SpiFrequency, UpdateState};

use super::command::{
    Command, DEEP_SLEEP_CHECK, INIT_SEQUENCE, POWER_OFF_NORMAL, REFRESH_NORMAL,
};
use super::config::timing;
use super::{color::pack_into, DriverError, FrameBuffer, PanelConfig, SpiTransport};

/// Packed bytes per data frame while streaming pixels.
pub const PIXEL_CHUNK_BYTES: usize = 1024;

/// Longest possible cycle: all six states plus the closing `Idle`.
const TRACE_CAPACITY: usize = 7;

/// States visited by the most recent update cycle, in order.
pub type CycleTrace = heapless::Vec<UpdateState, TRACE_CAPACITY>;

/// ACeP730 display driver.
///
/// Generic over:
/// - `BUS`   - async [`SpiBus`] that also implements [`SpiClock`].
/// - `CS`    - chip select [`OutputPin`] (active low).
/// - `DC`    - data/command [`OutputPin`].
/// - `RST`   - reset [`OutputPin`] (active low).
/// - `BUSY`  - busy [`InputPin`] (LOW while refreshing).
/// - `RAIL`  - rail-enable [`OutputPin`]; pass `None` (with
///   [`platform::NoPin`] as the type) when the supply is not switchable.
/// - `DELAY` - [`DelayNs`] for timing.
///
/// On the STM32H743 target supply `embassy_time::Delay` for `DELAY`. In host
/// tests supply `embedded_hal_mock::eh1::delay::NoopDelay` or
/// `platform::mocks::MockDelay`.
pub struct Acep730<BUS, CS, DC, RST, BUSY, RAIL, DELAY> {
    transport: SpiTransport<BUS, CS, DC>,
    reset: RST,
    busy: BUSY,
    rail: Option<RAIL>,
    delay: DELAY,
    config: PanelConfig,
    state: UpdateState,
    initialized: bool,
    trace: CycleTrace,
}

impl<BUS, CS, DC, RST, BUSY, RAIL, DELAY> Acep730<BUS, CS, DC, RST, BUSY, RAIL, DELAY>
where
    BUS: SpiBus + SpiClock,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    RAIL: OutputPin,
    DELAY: DelayNs,
{
    /// Create a driver. No pins are driven until [`Acep730::initialize`].
    pub fn new(
        transport: SpiTransport<BUS, CS, DC>,
        reset: RST,
        busy: BUSY,
        rail: Option<RAIL>,
        delay: DELAY,
        config: PanelConfig,
    ) -> Self {
        Self {
            transport,
            reset,
            busy,
            rail,
            delay,
            config,
            state: UpdateState::Idle,
            initialized: false,
            trace: CycleTrace::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Set the SPI clock. Only effective before [`Acep730::initialize`].
    ///
    /// # Errors
    ///
    /// [`DriverError::Configuration`] if `hz == 0`, whether or not the
    /// driver is initialized.
    pub fn set_spi_frequency(&mut self, hz: u32) -> Result<(), DriverError> {
        let frequency = SpiFrequency::try_new(hz)?;
        if self.initialized {
            #[cfg(feature = "defmt")]
            defmt::warn!("acep730: set_spi_frequency after initialize ignored");
            return Ok(());
        }
        self.config.spi_frequency = frequency;
        Ok(())
    }

    /// Enable or disable power-down after each refresh. Only effective
    /// before [`Acep730::initialize`].
    pub fn set_power_off_after_update(&mut self, enabled: bool) {
        if self.initialized {
            #[cfg(feature = "defmt")]
            defmt::warn!("acep730: set_power_off_after_update after initialize ignored");
            return;
        }
        self.config.power_off_after_update = enabled;
    }

    // -----------------------------------------------------------------------
    // Public operations
    // -----------------------------------------------------------------------

    /// Put every line at its idle level and apply the SPI clock.
    ///
    /// CS goes high, the rail (if any) goes low. Safe to call again; later
    /// calls re-apply the idle levels.
    pub fn initialize(&mut self) -> Result<(), DriverError> {
        self.transport.release_cs()?;
        if let Some(rail) = self.rail.as_mut() {
            rail.set_low().map_err(|_| DriverError::Gpio)?;
        }
        self.transport.set_frequency(self.config.spi_frequency)?;

        self.state = UpdateState::Idle;
        self.initialized = true;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "acep730: initialized, spi={}, rail={=bool}, power_off={=bool}",
            self.config.spi_frequency,
            self.rail.is_some(),
            self.config.power_off_after_update
        );
        Ok(())
    }

    /// Run one full refresh cycle showing `frame`.
    ///
    /// Always returns with the driver in [`UpdateState::Idle`] and CS high.
    ///
    /// # Errors
    ///
    /// - [`DriverError::NotInitialized`] before [`Acep730::initialize`]
    /// - [`DriverError::Timeout`] if BUSY never releases. The rail stays as
    ///   it was.
    /// - [`DriverError::Transport`] / [`DriverError::Gpio`] on I/O failure
    pub async fn update(&mut self, frame: &FrameBuffer<'_>) -> Result<(), DriverError> {
        if !self.initialized {
            return Err(DriverError::NotInitialized);
        }
        // A previous update future dropped mid-cycle leaves a stale state.
        #[cfg(feature = "defmt")]
        if self.state.is_active() {
            defmt::warn!("acep730: recovering from interrupted cycle in {}", self.state);
        }
        self.state = UpdateState::Idle;
        self.trace.clear();
        self.record(UpdateState::Idle);

        let result = self.run_cycle(frame).await;
        self.enter(UpdateState::Idle);

        #[cfg(feature = "defmt")]
        if let Err(e) = result {
            defmt::warn!("acep730: update failed: {}", e);
        }
        result
    }

    /// Current state. `Idle` whenever no update is in flight.
    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// States visited by the most recent [`Acep730::update`], starting and
    /// ending with `Idle`. Empty before the first update.
    pub fn last_cycle(&self) -> &[UpdateState] {
        &self.trace
    }

    /// Active configuration.
    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// True once [`Acep730::initialize`] has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Give back the owned peripherals.
    #[allow(clippy::type_complexity)]
    pub fn release(self) -> (SpiTransport<BUS, CS, DC>, RST, BUSY, Option<RAIL>, DELAY) {
        (self.transport, self.reset, self.busy, self.rail, self.delay)
    }

    // -----------------------------------------------------------------------
    // Cycle phases
    // -----------------------------------------------------------------------

    async fn run_cycle(&mut self, frame: &FrameBuffer<'_>) -> Result<(), DriverError> {
        if self.rail.is_some() {
            self.enter(UpdateState::PoweringOn);
            self.power_on().await?;
        }

        self.enter(UpdateState::Resetting);
        self.hardware_reset().await?;

        self.enter(UpdateState::Sending);
        self.send_frame(frame).await?;

        self.enter(UpdateState::WaitingBusy);
        self.wait_busy().await?;

        if self.config.power_off_after_update {
            self.enter(UpdateState::PoweringOff);
            self.power_off().await
        } else {
            self.command(Command::PowerOff, &[POWER_OFF_NORMAL]).await
        }
    }

    async fn power_on(&mut self) -> Result<(), DriverError> {
        if let Some(rail) = self.rail.as_mut() {
            rail.set_high().map_err(|_| DriverError::Gpio)?;
        }
        self.delay.delay_ms(timing::RAIL_SETTLE_MS).await;
        Ok(())
    }

    /// RST HIGH 20 ms → LOW 2 ms → HIGH 20 ms, then controller boot time.
    async fn hardware_reset(&mut self) -> Result<(), DriverError> {
        self.reset.set_high().map_err(|_| DriverError::Gpio)?;
        self.delay.delay_ms(timing::RESET_LEAD_MS).await;
        self.reset.set_low().map_err(|_| DriverError::Gpio)?;
        self.delay.delay_ms(timing::RESET_PULSE_MS).await;
        self.reset.set_high().map_err(|_| DriverError::Gpio)?;
        self.delay.delay_ms(timing::RESET_RECOVERY_MS).await;
        self.delay.delay_ms(timing::POST_RESET_SETTLE_MS).await;
        Ok(())
    }

    async fn send_frame(&mut self, frame: &FrameBuffer<'_>) -> Result<(), DriverError> {
        for &(cmd, data) in INIT_SEQUENCE {
            self.command(cmd, data).await?;
        }

        self.transport
            .write_command(Command::DataStartTransmission.into())
            .await?;
        let mut chunk = [0u8; PIXEL_CHUNK_BYTES];
        for pixels in frame.chunks(PIXEL_CHUNK_BYTES) {
            let len = pack_into(pixels, &mut chunk);
            self.transport
                .write_data(chunk.get(..len).unwrap_or_default())
                .await?;
        }

        self.transport.write_command(Command::PowerOn.into()).await?;
        self.delay.delay_ms(timing::POWER_ON_SETTLE_MS).await;

        self.command(Command::DisplayRefresh, &[REFRESH_NORMAL]).await
    }

    /// Poll BUSY until it reads HIGH (idle) or the poll budget runs out.
    ///
    /// BUSY is active LOW on this controller.
    async fn wait_busy(&mut self) -> Result<(), DriverError> {
        // The field is public; a zero interval would spin without yielding.
        let poll_ms = self.config.busy_poll_ms.max(1);
        for _ in 0..self.config.max_busy_polls() {
            let is_busy = self.busy.is_low().map_err(|_| DriverError::Gpio)?;
            if !is_busy {
                return Ok(());
            }
            self.delay.delay_ms(poll_ms).await;
        }

        #[cfg(feature = "defmt")]
        defmt::warn!(
            "acep730: BUSY still low after {=u32} ms",
            self.config.busy_timeout_ms
        );
        Err(DriverError::Timeout)
    }

    async fn power_off(&mut self) -> Result<(), DriverError> {
        self.command(Command::PowerOff, &[POWER_OFF_NORMAL]).await?;
        self.command(Command::DeepSleep, &[DEEP_SLEEP_CHECK]).await?;
        self.delay.delay_ms(timing::POWER_OFF_SETTLE_MS).await;
        if let Some(rail) = self.rail.as_mut() {
            rail.set_low().map_err(|_| DriverError::Gpio)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn command(&mut self, cmd: Command, data: &[u8]) -> Result<(), DriverError> {
        self.transport.write_command(cmd.into()).await?;
        self.transport.write_data(data).await
    }

    fn enter(&mut self, next: UpdateState) {
        #[cfg(feature = "defmt")]
        defmt::trace!("acep730: {} -> {}", self.state, next);
        self.state = next;
        self.record(next);
    }

    fn record(&mut self, state: UpdateState) {
        // Capacity covers the longest cycle; overflow would mean a bug in
        // run_cycle, not a reason to fail the update.
        let _ = self.trace.push(state);
    }
}

impl<BUS, CS, DC, RST, BUSY, RAIL, DELAY> crate::hal::Panel
    for Acep730<BUS, CS, DC, RST, BUSY, RAIL, DELAY>
where
    BUS: SpiBus + SpiClock,
    CS: OutputPin,
    DC: OutputPin,
    RST: OutputPin,
    BUSY: InputPin,
    RAIL: OutputPin,
    DELAY: DelayNs,
{
    fn initialize(&mut self) -> Result<(), DriverError> {
        Self::initialize(self)
    }

    async fn update(&mut self, frame: &FrameBuffer<'_>) -> Result<(), DriverError> {
        Self::update(self, frame).await
    }

    fn state(&self) -> UpdateState {
        Self::state(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;

    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use embedded_hal_mock::eh1::MockError;

    use platform::mocks::{Line, MockBus, MockOutput, WireLog};
    use platform::NoPin;

    use crate::display::{Color, PIXEL_COUNT};

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Driver with recording bus / CS / DC, embedded-hal-mock RST, BUSY, RAIL.
    type TestDriver<RAIL> =
        Acep730<MockBus, MockOutput, MockOutput, PinMock, PinMock, RAIL, NoopDelay>;

    fn white_pixels() -> Vec<Color> {
        vec![Color::White; PIXEL_COUNT]
    }

    /// A BUSY pin that returns LOW (busy) for `busy_count` polls then HIGH once.
    fn busy_pin_sequence(busy_count: usize) -> PinMock {
        let mut txns = vec![];
        for _ in 0..busy_count {
            txns.push(PinTransaction::get(PinState::Low));
        }
        txns.push(PinTransaction::get(PinState::High));
        PinMock::new(&txns)
    }

    /// RST pin mock that expects the hardware_reset sequence:
    /// set_high, set_low, set_high.
    fn rst_reset_sequence() -> PinMock {
        PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ])
    }

    fn driver<RAIL: OutputPin>(
        log: &WireLog,
        reset: PinMock,
        busy: PinMock,
        rail: Option<RAIL>,
        config: PanelConfig,
    ) -> TestDriver<RAIL> {
        let transport = SpiTransport::new(
            MockBus::new(log),
            MockOutput::new(Line::Cs, log),
            MockOutput::new(Line::Dc, log),
        );
        Acep730::new(transport, reset, busy, rail, NoopDelay::new(), config)
    }

    fn finish<RAIL: OutputPin>(driver: TestDriver<RAIL>) -> Option<RAIL> {
        let (_, mut reset, mut busy, rail, _) = driver.release();
        reset.done();
        busy.done();
        rail
    }

    // -----------------------------------------------------------------------
    // State sequence
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn trace_without_rail_skips_power_states() {
        let log = WireLog::new();
        let mut d = driver::<NoPin>(
            &log,
            rst_reset_sequence(),
            busy_pin_sequence(3),
            None,
            PanelConfig::default(),
        );
        d.initialize().unwrap();

        let mut pixels = white_pixels();
        let frame = FrameBuffer::new(&mut pixels).unwrap();
        d.update(&frame).await.unwrap();

        assert_eq!(
            d.last_cycle(),
            [
                UpdateState::Idle,
                UpdateState::Resetting,
                UpdateState::Sending,
                UpdateState::WaitingBusy,
                UpdateState::Idle,
            ]
        );
        assert_eq!(d.state(), UpdateState::Idle);
        finish(d);
    }

    #[tokio::test]
    async fn trace_with_rail_and_power_off_visits_every_state() {
        let log = WireLog::new();
        let rail = PinMock::new(&[
            PinTransaction::set(PinState::Low),  // initialize
            PinTransaction::set(PinState::High), // PoweringOn
            PinTransaction::set(PinState::Low),  // PoweringOff
        ]);
        let mut d = driver(
            &log,
            rst_reset_sequence(),
            busy_pin_sequence(0),
            Some(rail),
            PanelConfig::default().with_power_off_after_update(true),
        );
        d.initialize().unwrap();

        let mut pixels = white_pixels();
        let frame = FrameBuffer::new(&mut pixels).unwrap();
        d.update(&frame).await.unwrap();

        assert_eq!(
            d.last_cycle(),
            [
                UpdateState::Idle,
                UpdateState::PoweringOn,
                UpdateState::Resetting,
                UpdateState::Sending,
                UpdateState::WaitingBusy,
                UpdateState::PoweringOff,
                UpdateState::Idle,
            ]
        );
        finish(d).expect("rail present").done();
    }

    #[tokio::test]
    async fn rail_without_power_off_stays_asserted() {
        let log = WireLog::new();
        let rail = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let mut d = driver(
            &log,
            rst_reset_sequence(),
            busy_pin_sequence(1),
            Some(rail),
            PanelConfig::default(),
        );
        d.initialize().unwrap();

        let mut pixels = white_pixels();
        let frame = FrameBuffer::new(&mut pixels).unwrap();
        d.update(&frame).await.unwrap();

        assert!(!d.last_cycle().contains(&UpdateState::PoweringOff));
        assert!(d.last_cycle().contains(&UpdateState::PoweringOn));
        finish(d).expect("rail present").done();
    }

    #[tokio::test]
    async fn power_off_without_rail_still_sleeps_controller() {
        let log = WireLog::new();
        let mut d = driver::<NoPin>(
            &log,
            rst_reset_sequence(),
            busy_pin_sequence(0),
            None,
            PanelConfig::default().with_power_off_after_update(true),
        );
        d.initialize().unwrap();

        let mut pixels = white_pixels();
        let frame = FrameBuffer::new(&mut pixels).unwrap();
        d.update(&frame).await.unwrap();

        assert_eq!(
            d.last_cycle(),
            [
                UpdateState::Idle,
                UpdateState::Resetting,
                UpdateState::Sending,
                UpdateState::WaitingBusy,
                UpdateState::PoweringOff,
                UpdateState::Idle,
            ]
        );
        let writes = log.writes();
        assert_eq!(writes[writes.len() - 4..], [vec![0x02], vec![0x00], vec![0x07], vec![0xA5]]);
        finish(d);
    }

    // -----------------------------------------------------------------------
    // Busy wait
    // -----------------------------------------------------------------------

    /// A BUSY line stuck LOW yields Timeout after `max_busy_polls` samples.
    #[tokio::test]
    async fn stuck_busy_times_out() {
        let log = WireLog::new();
        let config = PanelConfig::default()
            .with_busy_timeout_ms(200)
            .with_busy_poll_ms(10);
        let busy_txns: Vec<_> = (0..20).map(|_| PinTransaction::get(PinState::Low)).collect();
        let mut d = driver::<NoPin>(
            &log,
            rst_reset_sequence(),
            PinMock::new(&busy_txns),
            None,
            config,
        );
        d.initialize().unwrap();

        let mut pixels = white_pixels();
        let frame = FrameBuffer::new(&mut pixels).unwrap();
        assert_eq!(d.update(&frame).await, Err(DriverError::Timeout));
        assert_eq!(d.state(), UpdateState::Idle);
        assert_eq!(d.last_cycle().last(), Some(&UpdateState::Idle));
        assert_eq!(log.last_level(Line::Cs), Some(embedded_hal::digital::PinState::High));
        finish(d);
    }

    #[tokio::test]
    async fn timeout_leaves_rail_asserted() {
        let log = WireLog::new();
        let rail = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let config = PanelConfig::default()
            .with_power_off_after_update(true)
            .with_busy_timeout_ms(30)
            .with_busy_poll_ms(10);
        let busy_txns: Vec<_> = (0..3).map(|_| PinTransaction::get(PinState::Low)).collect();
        let mut d = driver(
            &log,
            rst_reset_sequence(),
            PinMock::new(&busy_txns),
            Some(rail),
            config,
        );
        d.initialize().unwrap();

        let mut pixels = white_pixels();
        let frame = FrameBuffer::new(&mut pixels).unwrap();
        assert_eq!(d.update(&frame).await, Err(DriverError::Timeout));
        assert!(!d.last_cycle().contains(&UpdateState::PoweringOff));
        // No third rail transaction: the mock would fail done() otherwise.
        finish(d).expect("rail present").done();
    }

    /// A GPIO error reading BUSY surfaces as `DriverError::Gpio`.
    #[tokio::test]
    async fn busy_read_error_propagated() {
        let log = WireLog::new();
        let busy = PinMock::new(&[PinTransaction::get(PinState::Low)
            .with_error(MockError::Io(std::io::ErrorKind::NotConnected))]);
        let mut d = driver::<NoPin>(
            &log,
            rst_reset_sequence(),
            busy,
            None,
            PanelConfig::default(),
        );
        d.initialize().unwrap();

        let mut pixels = white_pixels();
        let frame = FrameBuffer::new(&mut pixels).unwrap();
        assert_eq!(d.update(&frame).await, Err(DriverError::Gpio));
        assert_eq!(d.state(), UpdateState::Idle);
        finish(d);
    }

    // -----------------------------------------------------------------------
    // Configuration and lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn update_before_initialize_is_rejected() {
        let log = WireLog::new();
        let mut d = driver::<NoPin>(
            &log,
            PinMock::new(&[]),
            PinMock::new(&[]),
            None,
            PanelConfig::default(),
        );
        let mut pixels = white_pixels();
        let frame = FrameBuffer::new(&mut pixels).unwrap();
        assert_eq!(d.update(&frame).await, Err(DriverError::NotInitialized));
        assert!(log.events().is_empty());
        finish(d);
    }

    #[test]
    fn setters_apply_before_initialize_only() {
        let log = WireLog::new();
        let mut d = driver::<NoPin>(
            &log,
            PinMock::new(&[]),
            PinMock::new(&[]),
            None,
            PanelConfig::default(),
        );

        d.set_spi_frequency(2_000_000).unwrap();
        d.set_power_off_after_update(true);
        assert_eq!(d.config().spi_frequency.hz(), 2_000_000);
        assert!(d.config().power_off_after_update);

        d.initialize().unwrap();
        d.set_spi_frequency(8_000_000).unwrap();
        d.set_power_off_after_update(false);
        assert_eq!(d.config().spi_frequency.hz(), 2_000_000);
        assert!(d.config().power_off_after_update);
        finish(d);
    }

    #[test]
    fn zero_frequency_is_a_configuration_error() {
        let log = WireLog::new();
        let mut d = driver::<NoPin>(
            &log,
            PinMock::new(&[]),
            PinMock::new(&[]),
            None,
            PanelConfig::default(),
        );
        assert_eq!(
            d.set_spi_frequency(0),
            Err(DriverError::Configuration(platform::ConfigError::ZeroFrequency))
        );
        assert_eq!(d.config().spi_frequency.hz(), 4_000_000);
        finish(d);
    }

    #[test]
    fn initialize_sets_idle_levels_and_clock() {
        use platform::mocks::WireEvent;

        let log = WireLog::new();
        let rail = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let mut d = driver(
            &log,
            PinMock::new(&[]),
            PinMock::new(&[]),
            Some(rail),
            PanelConfig::default(),
        );
        d.initialize().unwrap();

        assert!(d.is_initialized());
        assert_eq!(
            log.events(),
            vec![
                WireEvent::Set(Line::Cs, embedded_hal::digital::PinState::High),
                WireEvent::Frequency(4_000_000),
            ]
        );
        finish(d).expect("rail present").done();
    }

    #[test]
    fn rail_failure_at_initialize_is_gpio_error() {
        let log = WireLog::new();
        let rail = PinMock::new(&[PinTransaction::set(PinState::Low)
            .with_error(MockError::Io(std::io::ErrorKind::NotConnected))]);
        let mut d = driver(
            &log,
            PinMock::new(&[]),
            PinMock::new(&[]),
            Some(rail),
            PanelConfig::default(),
        );
        assert_eq!(d.initialize(), Err(DriverError::Gpio));
        assert!(!d.is_initialized());
        finish(d).expect("rail present").done();
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    /// Delay whose first call never completes.
    struct HangOnce {
        hung: bool,
    }

    impl DelayNs for HangOnce {
        async fn delay_ns(&mut self, _ns: u32) {
            if !self.hung {
                self.hung = true;
                core::future::pending::<()>().await;
            }
        }
    }

    #[tokio::test]
    async fn dropped_update_is_recovered_on_next_call() {
        use platform::mocks::MockBusy;

        let log = WireLog::new();
        let transport = SpiTransport::new(
            MockBus::new(&log),
            MockOutput::new(Line::Cs, &log),
            MockOutput::new(Line::Dc, &log),
        );
        let mut d = Acep730::new(
            transport,
            MockOutput::new(Line::Reset, &log),
            MockBusy::idle_after(0, &log),
            None::<NoPin>,
            HangOnce { hung: false },
            PanelConfig::default(),
        );
        d.initialize().unwrap();

        let mut pixels = white_pixels();
        let frame = FrameBuffer::new(&mut pixels).unwrap();

        let cancelled =
            tokio::time::timeout(std::time::Duration::from_millis(10), d.update(&frame)).await;
        assert!(cancelled.is_err());
        assert_eq!(d.state(), UpdateState::Resetting);

        d.update(&frame).await.unwrap();
        assert_eq!(d.state(), UpdateState::Idle);
        assert_eq!(
            d.last_cycle(),
            [
                UpdateState::Idle,
                UpdateState::Resetting,
                UpdateState::Sending,
                UpdateState::WaitingBusy,
                UpdateState::Idle,
            ]
        );
    }
}
