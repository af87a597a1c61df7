//! Driver layer of a battery-powered e-paper display node.
//!
//! - [`epd`]: SPI transport, per-model panel drivers and the panel registry
//! - [`framebuffer`]: one-bit pixel plane, channel extraction and status icons
//! - [`device`]: runs one update cycle across transport, panel and plane
pub mod config;
pub mod device;
pub mod epd;
pub mod error;
pub mod framebuffer;
pub mod status;

pub use config::DeviceConfig;
pub use device::{ChannelOutcome, CycleReport, Device};
pub use error::Error;
