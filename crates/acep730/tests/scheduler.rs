//! Scheduler integration tests: the update loop driving a real `Acep730`.
//!
//! Run with: cargo test -p acep730 --test scheduler
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal::digital::PinState;

use acep730::task::{run_cycle, update_loop};
use acep730::ui::SixStripes;
use acep730::{
    Acep730, Color, DriverError, FrameBuffer, Panel, PanelConfig, RetryPolicy, SpiTransport,
    UpdateState, PIXEL_COUNT,
};
use platform::mocks::{Line, MockBus, MockBusy, MockDelay, MockOutput, WireLog};
use platform::NoPin;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type TestPanel = Acep730<MockBus, MockOutput, MockOutput, MockOutput, MockBusy, NoPin, MockDelay>;

/// Panel without a rail whose busy-wait allows five polls.
fn short_timeout_panel(log: &WireLog, busy: MockBusy) -> TestPanel {
    let transport = SpiTransport::new(
        MockBus::new(log),
        MockOutput::new(Line::Cs, log),
        MockOutput::new(Line::Dc, log),
    );
    let config = PanelConfig::default()
        .with_busy_timeout_ms(50)
        .with_busy_poll_ms(10);
    let mut panel = Acep730::new(
        transport,
        MockOutput::new(Line::Reset, log),
        busy,
        None,
        MockDelay::new(log),
        config,
    );
    Panel::initialize(&mut panel).unwrap();
    panel
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// A refresh that outlasts the busy bound once is retried and succeeds.
#[tokio::test]
async fn transient_timeout_is_retried() {
    let log = WireLog::new();
    // Five busy samples exhaust the first attempt; the second reads two more busy, then idle.
    let mut panel = short_timeout_panel(&log, MockBusy::idle_after(7, &log));

    let mut pixels = vec![Color::White; PIXEL_COUNT];
    let frame: Mutex<NoopRawMutex, _> = Mutex::new(FrameBuffer::new(&mut pixels).unwrap());

    run_cycle(&mut panel, &frame, RetryPolicy::default())
        .await
        .unwrap();

    assert_eq!(log.busy_reads(), 5 + 3);
    assert_eq!(panel.state(), UpdateState::Idle);
    assert_eq!(log.last_level(Line::Cs), Some(PinState::High));
}

#[tokio::test]
async fn stuck_panel_exhausts_the_policy() {
    let log = WireLog::new();
    let mut panel = short_timeout_panel(&log, MockBusy::stuck(&log));

    let mut pixels = vec![Color::White; PIXEL_COUNT];
    let frame: Mutex<NoopRawMutex, _> = Mutex::new(FrameBuffer::new(&mut pixels).unwrap());

    let result = run_cycle(&mut panel, &frame, RetryPolicy { max_attempts: 2 }).await;

    assert_eq!(result, Err(DriverError::Timeout));
    assert_eq!(log.busy_reads(), 2 * 5);
    assert_eq!(panel.last_cycle().last(), Some(&UpdateState::Idle));
}

/// The loop refreshes immediately and keeps going after a fault.
#[tokio::test]
async fn loop_refreshes_repeatedly_with_rendered_scene() {
    let log = WireLog::new();
    let mut panel = short_timeout_panel(&log, MockBusy::idle_after(0, &log));

    let mut pixels = vec![Color::White; PIXEL_COUNT];
    let mut frame = FrameBuffer::new(&mut pixels).unwrap();
    SixStripes::render(&mut frame).unwrap();
    let frame: Mutex<NoopRawMutex, _> = Mutex::new(frame);

    let ran = tokio::time::timeout(
        std::time::Duration::from_millis(200),
        update_loop(
            &mut panel,
            &frame,
            embassy_time::Duration::from_millis(20),
            RetryPolicy::default(),
        ),
    )
    .await;
    assert!(ran.is_err(), "update_loop never returns");

    // One DTM per completed or started cycle.
    let refreshes = log.writes().iter().filter(|w| w.as_slice() == [0x10]).count();
    assert!(refreshes >= 2, "only {refreshes} refreshes");
    assert_eq!(frame.lock().await.pixel(0, 0), Some(Color::Black));
}
