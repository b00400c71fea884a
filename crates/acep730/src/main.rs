//! ACeP730 Panel Firmware - Main Entry Point
//!
//! Hardware-only entry point for STM32H743ZI.

#![no_std]
#![no_main]

use embassy_embedded_hal::SetConfig;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::spi::{Config as SpiConfig, Spi};
use embassy_stm32::time::Hertz;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Delay, Duration, Ticker, Timer};
use embedded_hal_async::spi::{ErrorKind, ErrorType, SpiBus};
use static_cell::StaticCell;

use acep730::task::update_loop;
use acep730::ui::{ColorTextLines, SixStripes};
use acep730::{
    Acep730, Color, FrameBuffer, PanelConfig, RetryPolicy, SpiTransport,
    DEFAULT_UPDATE_INTERVAL, PIXEL_COUNT,
};
use platform::{PinAssignment, SpiClock, SpiFrequency};

// Panic handler
use panic_probe as _;
// RTT transport for defmt
use defmt_rtt as _;

// Board wiring. The peripherals below are bound to these pins directly; the
// numbers are validated at boot and RAIL_EN_PIN decides whether the rail is
// switched. Set it to platform::RAIL_ABSENT on boards whose panel supply is
// always on.
const CS_PIN: i32 = 1; // PB1
const DC_PIN: i32 = 0; // PB0
const RST_PIN: i32 = 2; // PB2
const BUSY_PIN: i32 = 3; // PE3
const RAIL_EN_PIN: i32 = 4; // PB4

/// Time each test scene stays up before the next one is drawn.
const SCENE_PERIOD: Duration = Duration::from_secs(120);

type SharedFrame = Mutex<CriticalSectionRawMutex, FrameBuffer<'static>>;

// 384 000 color entries; lives in AXI SRAM (see memory.x).
static mut PIXELS: [Color; PIXEL_COUNT] = [Color::White; PIXEL_COUNT];

static FRAME: StaticCell<SharedFrame> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    defmt::info!("ACeP730 Panel Firmware v{=str}", env!("CARGO_PKG_VERSION"));

    let p = embassy_stm32::init(embassy_stm32::Config::default());

    let pins = match PinAssignment::from_raw(CS_PIN, DC_PIN, RST_PIN, BUSY_PIN, RAIL_EN_PIN) {
        Ok(pins) => pins,
        Err(e) => halt("pin assignment", e).await,
    };
    let config = PanelConfig::default().with_power_off_after_update(pins.rail_en.is_some());

    // Configure SPI1 for the panel
    // PA5 (SPI1_SCK), PA7 (SPI1_MOSI)
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = Hertz(config.spi_frequency.hz());

    let spi = Spi::new(
        p.SPI1, p.PA5,      // SCK
        p.PA7,      // MOSI
        p.PA6,      // MISO (not used but required by HAL)
        p.DMA1_CH0, // TX DMA
        p.DMA1_CH1, // RX DMA
        spi_config,
    );

    let dc = Output::new(p.PB0, Level::Low, Speed::VeryHigh); // Data/Command
    let cs = Output::new(p.PB1, Level::High, Speed::VeryHigh); // Chip Select (active low)
    let rst = Output::new(p.PB2, Level::High, Speed::VeryHigh); // Reset (active low)
    let busy = Input::new(p.PE3, Pull::None); // Busy (active low)
    let rail = pins
        .rail_en
        .map(|_| Output::new(p.PB4, Level::Low, Speed::Low)); // Panel supply

    let transport = SpiTransport::new(ClockedBus::new(spi, spi_config), cs, dc);
    let mut panel = Acep730::new(transport, rst, busy, rail, Delay, config);

    if let Err(e) = panel.initialize() {
        halt("panel initialize", e).await;
    }
    defmt::info!(
        "Panel ready: 800x480 ACeP, SPI @ {=u32}Hz, rail={=bool}",
        config.spi_frequency.hz(),
        pins.rail_en.is_some()
    );

    // SAFETY: `main` runs once and this is the only place PIXELS is named,
    // so the returned reference is the sole access for the program's lifetime.
    let pixels: &'static mut [Color] = unsafe { &mut *core::ptr::addr_of_mut!(PIXELS) };
    let mut frame = match FrameBuffer::new(pixels) {
        Ok(frame) => frame,
        Err(e) => halt("frame buffer", e).await,
    };
    draw_scene(&mut frame, 0);
    let frame: &'static SharedFrame = FRAME.init(Mutex::new(frame));

    if spawner.spawn(scene_task(frame)).is_err() {
        defmt::warn!("Scene task not spawned; showing first scene only");
    }

    defmt::info!(
        "Entering update loop, interval={=u64}s",
        DEFAULT_UPDATE_INTERVAL.as_secs()
    );
    update_loop(&mut panel, frame, DEFAULT_UPDATE_INTERVAL, RetryPolicy::default()).await
}

/// Alternate between the test scenes every [`SCENE_PERIOD`].
#[embassy_executor::task]
async fn scene_task(frame: &'static SharedFrame) {
    let mut ticker = Ticker::every(SCENE_PERIOD);
    let mut scene = 0u32;
    loop {
        ticker.next().await;
        scene = scene.wrapping_add(1);
        draw_scene(&mut *frame.lock().await, scene);
        defmt::debug!("Scene {=u32} drawn", scene);
    }
}

fn draw_scene(frame: &mut FrameBuffer<'_>, scene: u32) {
    let drawn = if scene & 1 == 0 {
        SixStripes::render(frame)
    } else {
        ColorTextLines::render(frame)
    };
    match drawn {
        Ok(()) => {}
        Err(never) => match never {},
    }
}

/// Log a fatal setup error and park the firmware.
async fn halt<E: defmt::Format>(stage: &str, error: E) -> ! {
    defmt::error!("{=str} failed: {}", stage, error);
    loop {
        Timer::after(Duration::from_secs(1)).await;
    }
}

// ---------------------------------------------------------------------------
// SPI clock control
// ---------------------------------------------------------------------------

/// Error from [`ClockedBus`].
#[derive(Debug)]
enum BusError<E> {
    /// Transfer failed
    Spi(E),
    /// Peripheral rejected the new clock
    Config,
}

impl<E: embedded_hal_async::spi::Error> embedded_hal_async::spi::Error for BusError<E> {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Spi(e) => e.kind(),
            Self::Config => ErrorKind::Other,
        }
    }
}

/// An async SPI bus that can change its own SCK frequency.
struct ClockedBus<S> {
    spi: S,
    config: SpiConfig,
}

impl<S> ClockedBus<S> {
    fn new(spi: S, config: SpiConfig) -> Self {
        Self { spi, config }
    }
}

impl<S: ErrorType> ErrorType for ClockedBus<S> {
    type Error = BusError<S::Error>;
}

impl<S: SpiBus> SpiBus for ClockedBus<S> {
    async fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.spi.read(words).await.map_err(BusError::Spi)
    }

    async fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        self.spi.write(words).await.map_err(BusError::Spi)
    }

    async fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.spi.transfer(read, write).await.map_err(BusError::Spi)
    }

    async fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.spi.transfer_in_place(words).await.map_err(BusError::Spi)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.spi.flush().await.map_err(BusError::Spi)
    }
}

impl<S> SpiClock for ClockedBus<S>
where
    S: SpiBus + SetConfig<Config = SpiConfig>,
{
    fn set_frequency(&mut self, frequency: SpiFrequency) -> Result<(), Self::Error> {
        self.config.frequency = Hertz(frequency.hz());
        self.spi
            .set_config(&self.config)
            .map_err(|_| BusError::Config)
    }
}
