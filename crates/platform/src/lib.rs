//! Hardware abstraction layer for the ACeP730 panel stack
//!
//! This crate holds the hardware-facing vocabulary shared by the driver crate,
//! the hardware binary and the test harnesses. It depends only on the
//! `embedded-hal` 1.0 trait family, so it builds for the STM32 target and on
//! the host alike.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (acep730 binary, update loop)
//!         ↓
//! Panel Driver (acep730 crate)
//!         ↓
//! Platform HAL (this crate - shared types and seams)
//!         ↓
//! Hardware Layer (Embassy HAL + PAC)
//! ```
//!
//! # Modules
//!
//! - [`display`] - [`UpdateState`] of the panel refresh cycle
//! - [`gpio`] - [`NoPin`] and the raw [`PinAssignment`] with the rail sentinel
//! - [`peripheral`] - [`SpiClock`] and the validated [`SpiFrequency`]
//! - [`config`] - configuration validation errors
//! - `mocks` - wire-level recorders for host tests (`std` or `test` only)
//!
//! # Features
//!
//! - `std`: Enable standard library support and the `mocks` module
//! - `defmt`: Enable `defmt::Format` derives
//!
//! # Example
//!
//! ```
//! use platform::{PinAssignment, RAIL_ABSENT};
//!
//! let pins = PinAssignment::from_raw(10, 9, 8, 7, RAIL_ABSENT).unwrap();
//! assert!(pins.rail_en.is_none());
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors: callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

pub mod config;
pub mod display;
pub mod gpio;
pub mod peripheral;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use config::ConfigError;
pub use display::UpdateState;
pub use gpio::{NoPin, PinAssignment, PinId, RAIL_ABSENT};
pub use peripheral::{SpiClock, SpiFrequency};
