//! Periodic refresh task
//!
//! Pulls the shared frame on a fixed [`Ticker`] and pushes it to the panel.
//! The frame mutex is held for the whole refresh, so a renderer can only
//! swap content between cycles.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Ticker};

use crate::display::{DriverError, FrameBuffer};
use crate::hal::Panel;

/// Refresh period when the caller has no preference.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(60);

/// How many times one scheduled update is attempted.
///
/// Only transient failures ([`DriverError::is_transient`]) are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves like one.
    pub max_attempts: u8,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

/// Run one scheduled update, retrying transient failures.
///
/// Returns the last error once the policy is exhausted or a non-transient
/// error occurs.
pub async fn run_cycle<P, M>(
    panel: &mut P,
    frame: &Mutex<M, FrameBuffer<'_>>,
    policy: RetryPolicy,
) -> Result<(), DriverError>
where
    P: Panel,
    M: RawMutex,
{
    let frame = frame.lock().await;
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match panel.update(&frame).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transient() && attempt < attempts => {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "update attempt {=u8}/{=u8} failed: {}, retrying",
                    attempt,
                    attempts,
                    e
                );
                attempt = attempt.saturating_add(1);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Refresh the panel every `interval`, forever.
///
/// The first refresh starts immediately. A failed cycle is logged and the
/// loop waits for the next tick.
pub async fn update_loop<P, M>(
    panel: &mut P,
    frame: &Mutex<M, FrameBuffer<'_>>,
    interval: Duration,
    policy: RetryPolicy,
) -> !
where
    P: Panel,
    M: RawMutex,
{
    let mut ticker = Ticker::every(interval);
    loop {
        match run_cycle(panel, frame, policy).await {
            Ok(()) => {
                #[cfg(feature = "defmt")]
                defmt::info!("panel refreshed");
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::error!("panel fault: {}, state={}", _e, panel.state());
            }
        }
        ticker.next().await;
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
mod tests {
    use super::*;

    use std::collections::VecDeque;

    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use platform::UpdateState;

    use crate::display::{Color, PIXEL_COUNT};

    /// Panel that replays scripted results and remembers what it was shown.
    struct ScriptedPanel {
        results: VecDeque<Result<(), DriverError>>,
        updates: usize,
        first_pixel: Vec<Color>,
    }

    impl ScriptedPanel {
        fn new(results: &[Result<(), DriverError>]) -> Self {
            Self {
                results: results.iter().copied().collect(),
                updates: 0,
                first_pixel: Vec::new(),
            }
        }
    }

    impl Panel for ScriptedPanel {
        fn initialize(&mut self) -> Result<(), DriverError> {
            Ok(())
        }

        async fn update(&mut self, frame: &FrameBuffer<'_>) -> Result<(), DriverError> {
            self.updates += 1;
            self.first_pixel.push(frame.pixels()[0]);
            self.results.pop_front().unwrap_or(Ok(()))
        }

        fn state(&self) -> UpdateState {
            UpdateState::Idle
        }
    }

    fn shared(pixels: &mut [Color]) -> Mutex<NoopRawMutex, FrameBuffer<'_>> {
        Mutex::new(FrameBuffer::new(pixels).unwrap())
    }

    #[tokio::test]
    async fn success_needs_one_attempt() {
        let mut pixels = vec![Color::White; PIXEL_COUNT];
        let frame = shared(&mut pixels);
        let mut panel = ScriptedPanel::new(&[Ok(())]);

        run_cycle(&mut panel, &frame, RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(panel.updates, 1);
    }

    #[tokio::test]
    async fn timeout_is_retried_until_success() {
        let mut pixels = vec![Color::White; PIXEL_COUNT];
        let frame = shared(&mut pixels);
        let mut panel = ScriptedPanel::new(&[Err(DriverError::Timeout), Ok(())]);

        run_cycle(&mut panel, &frame, RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(panel.updates, 2);
    }

    #[tokio::test]
    async fn exhausted_policy_returns_last_error() {
        let mut pixels = vec![Color::White; PIXEL_COUNT];
        let frame = shared(&mut pixels);
        let mut panel = ScriptedPanel::new(&[
            Err(DriverError::Timeout),
            Err(DriverError::Transport),
            Err(DriverError::Timeout),
            Ok(()),
        ]);

        let result = run_cycle(&mut panel, &frame, RetryPolicy { max_attempts: 3 }).await;
        assert_eq!(result, Err(DriverError::Timeout));
        assert_eq!(panel.updates, 3);
    }

    #[tokio::test]
    async fn gpio_error_is_not_retried() {
        let mut pixels = vec![Color::White; PIXEL_COUNT];
        let frame = shared(&mut pixels);
        let mut panel = ScriptedPanel::new(&[Err(DriverError::Gpio), Ok(())]);

        let result = run_cycle(&mut panel, &frame, RetryPolicy::default()).await;
        assert_eq!(result, Err(DriverError::Gpio));
        assert_eq!(panel.updates, 1);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let mut pixels = vec![Color::White; PIXEL_COUNT];
        let frame = shared(&mut pixels);
        let mut panel = ScriptedPanel::new(&[Err(DriverError::Timeout)]);

        let result = run_cycle(&mut panel, &frame, RetryPolicy { max_attempts: 0 }).await;
        assert_eq!(result, Err(DriverError::Timeout));
        assert_eq!(panel.updates, 1);
    }

    #[tokio::test]
    async fn loop_keeps_running_after_a_fault() {
        let mut pixels = vec![Color::White; PIXEL_COUNT];
        let frame = shared(&mut pixels);
        let mut panel = ScriptedPanel::new(&[Err(DriverError::Gpio)]);

        let ran = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            update_loop(
                &mut panel,
                &frame,
                Duration::from_millis(20),
                RetryPolicy::default(),
            ),
        )
        .await;

        assert!(ran.is_err(), "update_loop never returns");
        assert!(panel.updates >= 2, "only {} updates", panel.updates);
    }

    #[tokio::test]
    async fn renderer_changes_land_on_the_next_cycle() {
        let mut pixels = vec![Color::White; PIXEL_COUNT];
        let frame = shared(&mut pixels);
        let mut panel = ScriptedPanel::new(&[]);

        run_cycle(&mut panel, &frame, RetryPolicy::default())
            .await
            .unwrap();
        frame.lock().await.fill(Color::Green);
        run_cycle(&mut panel, &frame, RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(panel.first_pixel, vec![Color::White, Color::Green]);
    }
}
