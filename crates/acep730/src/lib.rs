//! ACeP730 Panel Firmware
//!
//! Async driver and update loop for the 7.3" ACeP seven-color e-paper panel
//! (800×480) on STM32H7.
//!
//! # Architecture
//!
//! ```text
//! Update loop (task) ──► Panel (hal trait)
//!         │                    ↓
//!   Mutex<FrameBuffer>    Acep730 driver (state machine)
//!         ↑                    ↓
//!   Scenes (ui)           SpiTransport (CS / DC framing)
//!                              ↓
//!                     embedded-hal SPI bus + GPIO
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for STM32H7 target (embassy, defmt)
//! - `defmt` - defmt logging without the rest of the hardware stack
//! - `std` - Enable standard library (`std::error::Error` impls)
//!
//! # Hardware Target
//!
//! ```bash
//! cargo build --release --target thumbv7em-none-eabihf -p acep730 --features hardware
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::similar_names)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

pub mod display;
pub mod hal;
pub mod task;
pub mod ui;

// Re-export key types
pub use display::{
    Acep730, Color, DriverError, FrameBuffer, PanelConfig, SpiTransport, DISPLAY_HEIGHT,
    DISPLAY_WIDTH, PACKED_FRAME_SIZE, PIXEL_COUNT,
};
pub use hal::Panel;
pub use platform::UpdateState;
pub use task::{RetryPolicy, DEFAULT_UPDATE_INTERVAL};
