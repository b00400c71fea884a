//! ACeP730 display support
//!
//! The panel is 800×480 with six usable pigments. Pixels are kept one
//! [`Color`] per entry in a [`FrameBuffer`] and packed two per byte only
//! while streaming to the controller.

pub mod color;
pub mod command;
pub mod config;
pub mod driver;
pub mod error;
pub mod framebuffer;
pub mod transport;

/// Display width in pixels.
pub const DISPLAY_WIDTH: u32 = 800;

/// Display height in pixels.
pub const DISPLAY_HEIGHT: u32 = 480;

/// Pixels in one full frame.
pub const PIXEL_COUNT: usize = (DISPLAY_WIDTH * DISPLAY_HEIGHT) as usize;

/// Bytes the controller receives per frame (4 bits per pixel).
pub const PACKED_FRAME_SIZE: usize = PIXEL_COUNT / 2;

pub use color::Color;
pub use config::PanelConfig;
pub use driver::Acep730;
pub use error::DriverError;
pub use framebuffer::FrameBuffer;
pub use transport::SpiTransport;
