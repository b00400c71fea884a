//! Update-cycle integration tests: full refreshes through the public API,
//! recorded by the wire-level mocks in `platform::mocks`.
//!
//! Every CS edge, DC level, bus write, busy sample and delay lands in one
//! ordered log, so these tests check the cycle as the panel would see it.
//!
//! Run with: cargo test -p acep730 --test update_cycle
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use embedded_hal::digital::PinState;

use acep730::display::command::INIT_SEQUENCE;
use acep730::{
    Acep730, Color, DriverError, FrameBuffer, PanelConfig, SpiTransport, UpdateState,
    PACKED_FRAME_SIZE, PIXEL_COUNT,
};
use platform::mocks::{Line, MockBus, MockBusy, MockDelay, MockOutput, WireEvent, WireLog};
use platform::PinAssignment;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

type TestPanel = Acep730<MockBus, MockOutput, MockOutput, MockOutput, MockBusy, MockOutput, MockDelay>;

/// Build a panel whose every line records into `log`.
fn panel(log: &WireLog, bus: MockBus, busy: MockBusy, rail: bool, config: PanelConfig) -> TestPanel {
    let transport = SpiTransport::new(
        bus,
        MockOutput::new(Line::Cs, log),
        MockOutput::new(Line::Dc, log),
    );
    Acep730::new(
        transport,
        MockOutput::new(Line::Reset, log),
        busy,
        rail.then(|| MockOutput::new(Line::Rail, log)),
        MockDelay::new(log),
        config,
    )
}

/// Initialized panel with a healthy bus, then an empty log.
fn ready_panel(log: &WireLog, busy: MockBusy, rail: bool, config: PanelConfig) -> TestPanel {
    let mut p = panel(log, MockBus::new(log), busy, rail, config);
    p.initialize().unwrap();
    log.clear();
    p
}

fn white_storage() -> Vec<Color> {
    vec![Color::White; PIXEL_COUNT]
}

/// Command opcodes (writes made while DC was low), in order.
fn commands(events: &[WireEvent]) -> Vec<u8> {
    let mut dc = PinState::High;
    let mut out = Vec::new();
    for event in events {
        match event {
            WireEvent::Set(Line::Dc, level) => dc = *level,
            WireEvent::Write(bytes) if dc == PinState::Low => out.extend_from_slice(bytes),
            _ => {}
        }
    }
    out
}

/// Data bytes written between the DTM opcode and the next command.
fn frame_writes(events: &[WireEvent]) -> Vec<Vec<u8>> {
    let mut dc = PinState::High;
    let mut in_frame = false;
    let mut out = Vec::new();
    for event in events {
        match event {
            WireEvent::Set(Line::Dc, level) => dc = *level,
            WireEvent::Write(bytes) if dc == PinState::Low => in_frame = bytes == &[0x10],
            WireEvent::Write(bytes) if in_frame => out.push(bytes.clone()),
            _ => {}
        }
    }
    out
}

fn expected_commands(power_off: bool) -> Vec<u8> {
    let mut opcodes: Vec<u8> = INIT_SEQUENCE.iter().map(|(c, _)| u8::from(*c)).collect();
    opcodes.extend([0x10, 0x04, 0x12, 0x02]);
    if power_off {
        opcodes.push(0x07);
    }
    opcodes
}

// ---------------------------------------------------------------------------
// Test: state trace
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trace_matches_rail_and_power_off_configuration() {
    use UpdateState::{Idle, PoweringOff, PoweringOn, Resetting, Sending, WaitingBusy};

    let cases: [(bool, bool, &[UpdateState]); 4] = [
        (false, false, &[Idle, Resetting, Sending, WaitingBusy, Idle]),
        (false, true, &[Idle, Resetting, Sending, WaitingBusy, PoweringOff, Idle]),
        (true, false, &[Idle, PoweringOn, Resetting, Sending, WaitingBusy, Idle]),
        (
            true,
            true,
            &[Idle, PoweringOn, Resetting, Sending, WaitingBusy, PoweringOff, Idle],
        ),
    ];

    for (rail, power_off, expected) in cases {
        let log = WireLog::new();
        let config = PanelConfig::default().with_power_off_after_update(power_off);
        let mut p = ready_panel(&log, MockBusy::idle_after(2, &log), rail, config);

        let mut pixels = white_storage();
        let frame = FrameBuffer::new(&mut pixels).unwrap();
        p.update(&frame).await.unwrap();

        assert_eq!(
            p.last_cycle(),
            expected,
            "rail={rail} power_off={power_off}"
        );
        assert_eq!(p.state(), Idle);
        assert_eq!(
            commands(&log.events()),
            expected_commands(power_off),
            "rail={rail} power_off={power_off}"
        );
    }
}

// ---------------------------------------------------------------------------
// Test: chip-select framing
// ---------------------------------------------------------------------------

/// CS is low for every bus write and high between frames and at the end.
#[tokio::test]
async fn cs_is_low_only_during_transfers() {
    let log = WireLog::new();
    let config = PanelConfig::default().with_power_off_after_update(true);
    let mut p = ready_panel(&log, MockBusy::idle_after(5, &log), true, config);

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();
    p.update(&frame).await.unwrap();

    let mut cs = PinState::High;
    let mut frames = 0;
    for event in log.events() {
        match event {
            WireEvent::Set(Line::Cs, PinState::Low) => {
                assert_eq!(cs, PinState::High, "CS asserted twice");
                cs = PinState::Low;
                frames += 1;
            }
            WireEvent::Set(Line::Cs, PinState::High) => cs = PinState::High,
            WireEvent::Write(_) | WireEvent::Flush => {
                assert_eq!(cs, PinState::Low, "bus activity with CS high");
            }
            WireEvent::BusyRead(_) | WireEvent::Delay(_) => {
                assert_eq!(cs, PinState::High, "CS held across a wait");
            }
            _ => {}
        }
    }
    assert_eq!(cs, PinState::High);
    assert_eq!(frames, log.writes().len(), "one CS frame per write");
}

#[tokio::test]
async fn cs_released_after_mid_frame_bus_failure() {
    let log = WireLog::new();
    let mut p = panel(
        &log,
        MockBus::failing_at(40, &log),
        MockBusy::idle_after(0, &log),
        false,
        PanelConfig::default(),
    );
    p.initialize().unwrap();

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();
    assert_eq!(p.update(&frame).await, Err(DriverError::Transport));

    assert_eq!(p.state(), UpdateState::Idle);
    assert_eq!(p.last_cycle().last(), Some(&UpdateState::Idle));
    assert_eq!(log.last_level(Line::Cs), Some(PinState::High));
    assert_eq!(log.writes().len(), 40);
    assert_eq!(log.busy_reads(), 0, "no busy wait after a failed send");
}

// ---------------------------------------------------------------------------
// Test: frame data
// ---------------------------------------------------------------------------

#[tokio::test]
async fn all_white_frame_streams_index_one_pairs() {
    let log = WireLog::new();
    let mut p = ready_panel(&log, MockBusy::idle_after(0, &log), false, PanelConfig::default());

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();
    p.update(&frame).await.unwrap();

    let chunks = frame_writes(&log.events());
    assert_eq!(chunks.len(), 188);
    assert!(chunks.iter().all(|c| c.len() <= 1024));
    let bytes: Vec<u8> = chunks.concat();
    assert_eq!(bytes.len(), PACKED_FRAME_SIZE);
    assert!(bytes.iter().all(|&b| b == 0x11));
}

#[tokio::test]
async fn frame_bytes_match_packed_buffer() {
    let log = WireLog::new();
    let mut p = ready_panel(&log, MockBusy::idle_after(0, &log), false, PanelConfig::default());

    let mut pixels = white_storage();
    let mut frame = FrameBuffer::new(&mut pixels).unwrap();
    frame.set_pixel(0, 0, Color::Black);
    frame.set_pixel(1, 0, Color::Yellow);
    frame.set_pixel(799, 479, Color::Red);
    p.update(&frame).await.unwrap();

    let bytes: Vec<u8> = frame_writes(&log.events()).concat();
    assert_eq!(bytes[0], 0x02);
    assert_eq!(bytes[PACKED_FRAME_SIZE - 1], 0x13);
    assert_eq!(bytes, frame.packed().collect::<Vec<u8>>());
}

// ---------------------------------------------------------------------------
// Test: busy wait
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stuck_busy_times_out_after_poll_budget() {
    let log = WireLog::new();
    let config = PanelConfig::default()
        .with_busy_timeout_ms(500)
        .with_busy_poll_ms(25);
    let mut p = ready_panel(&log, MockBusy::stuck(&log), false, config);

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();
    assert_eq!(p.update(&frame).await, Err(DriverError::Timeout));

    assert_eq!(log.busy_reads(), 20);
    assert_eq!(p.state(), UpdateState::Idle);
    assert_eq!(log.last_level(Line::Cs), Some(PinState::High));
    // Reset + PON settle, then 20 polls of 25 ms.
    assert_eq!(log.total_delay_ms(), 172 + 500);
}

/// A zero poll interval set on the public field still sleeps between samples.
#[tokio::test]
async fn zero_poll_interval_still_waits_between_samples() {
    let log = WireLog::new();
    let mut config = PanelConfig::default().with_busy_timeout_ms(40);
    config.busy_poll_ms = 0;
    let mut p = ready_panel(&log, MockBusy::stuck(&log), false, config);

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();
    assert_eq!(p.update(&frame).await, Err(DriverError::Timeout));

    assert_eq!(log.busy_reads(), 40);
    assert_eq!(log.total_delay_ms(), 172 + 40);
    assert!(log.events().iter().all(|e| *e != WireEvent::Delay(0)));
}

#[tokio::test]
async fn default_config_powers_down_after_refresh() {
    let log = WireLog::new();
    let mut p = ready_panel(&log, MockBusy::idle_after(1, &log), true, PanelConfig::default());

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();
    p.update(&frame).await.unwrap();

    let events = log.events();
    let refresh = events.iter().position(|e| *e == WireEvent::Write(vec![0x12])).unwrap();
    let pof = events.iter().position(|e| *e == WireEvent::Write(vec![0x02])).unwrap();
    let last_busy = events.iter().rposition(|e| matches!(e, WireEvent::BusyRead(_))).unwrap();
    assert!(refresh < last_busy && last_busy < pof, "POF follows the busy wait");
    assert!(!commands(&events).contains(&0x07), "no deep sleep without the flag");
    assert_eq!(log.last_level(Line::Rail), Some(PinState::High));
}

#[tokio::test]
async fn busy_release_ends_wait_early() {
    let log = WireLog::new();
    let mut p = ready_panel(&log, MockBusy::idle_after(3, &log), false, PanelConfig::default());

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();
    p.update(&frame).await.unwrap();

    assert_eq!(log.busy_reads(), 4);
    assert_eq!(log.total_delay_ms(), 172 + 3 * 10);
}

#[tokio::test]
async fn rail_and_power_off_add_their_settle_times() {
    let log = WireLog::new();
    let config = PanelConfig::default().with_power_off_after_update(true);
    let mut p = ready_panel(&log, MockBusy::idle_after(0, &log), true, config);

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();
    p.update(&frame).await.unwrap();

    assert_eq!(log.total_delay_ms(), 120 + 172 + 50);
    assert_eq!(log.last_level(Line::Rail), Some(PinState::Low));
}

// ---------------------------------------------------------------------------
// Test: rail handling
// ---------------------------------------------------------------------------

/// Rail sentinel -1 resolves to no rail pin, and no rail write ever happens.
/// The controller is still powered down and put to sleep.
#[tokio::test]
async fn absent_rail_is_never_driven() {
    let pins = PinAssignment::from_raw(1, 0, 2, 3, platform::RAIL_ABSENT).unwrap();
    assert!(pins.rail_en.is_none());

    let log = WireLog::new();
    let config = PanelConfig::default().with_power_off_after_update(true);
    let mut p = panel(
        &log,
        MockBus::new(&log),
        MockBusy::idle_after(1, &log),
        pins.rail_en.is_some(),
        config,
    );
    p.initialize().unwrap();

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();
    p.update(&frame).await.unwrap();
    p.update(&frame).await.unwrap();

    assert_eq!(log.set_count(Line::Rail), 0);
    let tail: Vec<u8> = commands(&log.events()).iter().rev().take(3).rev().copied().collect();
    assert_eq!(tail, [0x12, 0x02, 0x07]);
}

#[tokio::test]
async fn rail_rises_before_reset_and_falls_after_deep_sleep() {
    let log = WireLog::new();
    let config = PanelConfig::default().with_power_off_after_update(true);
    let mut p = ready_panel(&log, MockBusy::idle_after(0, &log), true, config);

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();
    p.update(&frame).await.unwrap();

    let events = log.events();
    let position = |wanted: &WireEvent| events.iter().position(|e| e == wanted).unwrap();
    let rail_up = position(&WireEvent::Set(Line::Rail, PinState::High));
    let first_reset = position(&WireEvent::Set(Line::Reset, PinState::High));
    let deep_sleep = position(&WireEvent::Write(vec![0x07]));
    let rail_down = position(&WireEvent::Set(Line::Rail, PinState::Low));

    assert_eq!(rail_up, 0);
    assert!(rail_up < first_reset);
    assert!(deep_sleep < rail_down);
    assert_eq!(rail_down, events.len() - 1);
}

#[tokio::test]
async fn timeout_leaves_rail_on() {
    let log = WireLog::new();
    let config = PanelConfig::default()
        .with_power_off_after_update(true)
        .with_busy_timeout_ms(30);
    let mut p = ready_panel(&log, MockBusy::stuck(&log), true, config);

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();
    assert_eq!(p.update(&frame).await, Err(DriverError::Timeout));

    assert_eq!(log.last_level(Line::Rail), Some(PinState::High));
    assert!(!p.last_cycle().contains(&UpdateState::PoweringOff));
}

// ---------------------------------------------------------------------------
// Test: sequencing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn back_to_back_updates_each_start_from_idle() {
    let log = WireLog::new();
    let mut p = ready_panel(&log, MockBusy::idle_after(0, &log), false, PanelConfig::default());

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();

    p.update(&frame).await.unwrap();
    let first = log.events();
    log.clear();
    p.update(&frame).await.unwrap();
    let second = log.events();

    assert_eq!(first, second, "identical frames give identical wire traffic");
    assert_eq!(second[0], WireEvent::Set(Line::Reset, PinState::High));
    assert_eq!(p.last_cycle()[0], UpdateState::Idle);
}

#[tokio::test]
async fn update_before_initialize_touches_nothing() {
    let log = WireLog::new();
    let mut p = panel(
        &log,
        MockBus::new(&log),
        MockBusy::idle_after(0, &log),
        true,
        PanelConfig::default(),
    );

    let mut pixels = white_storage();
    let frame = FrameBuffer::new(&mut pixels).unwrap();
    assert_eq!(p.update(&frame).await, Err(DriverError::NotInitialized));
    assert!(log.events().is_empty());
}

#[tokio::test]
async fn initialize_drives_idle_levels() {
    let log = WireLog::new();
    let config = PanelConfig::default().with_spi_hz(2_000_000).unwrap();
    let mut p = panel(
        &log,
        MockBus::new(&log),
        MockBusy::idle_after(0, &log),
        true,
        config,
    );
    p.initialize().unwrap();

    assert_eq!(
        log.events(),
        vec![
            WireEvent::Set(Line::Cs, PinState::High),
            WireEvent::Set(Line::Rail, PinState::Low),
            WireEvent::Frequency(2_000_000),
        ]
    );
}
