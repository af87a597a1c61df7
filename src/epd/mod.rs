//! E-paper panel drivers
//!
//! Used with the Waveshare 4.2" panels (GDEW042T2 black/white, GDEW042Z15
//! black/white/red) on the Waveshare ESP32 e-Paper driver board.
//!
//! This driver is loosely modeled after the
//! [epd-waveshare](https://github.com/caemor/epd-waveshare) drivers but built for
//! one update per wake cycle.
//!
//! ### Usage
//! A panel never owns its interface; every lifecycle call borrows it:
//!
//! 1. pick a panel by name with [`registry::create_panel`]
//! 1. [`Panel::init`] resets the chip, powers it on and loads its configuration
//! 1. [`Panel::write_channel`] streams one bitplane per channel
//! 1. [`Panel::display`] refreshes the glass
//! 1. [`Panel::deep_sleep`] powers off; only another `init` wakes the chip
//!
use embedded_graphics::pixelcolor::Rgb888;

use crate::error::Error;

mod cmd;
mod flag;
mod lut;

pub mod gdew042t2;
pub mod gdew042z15;
pub mod interface;
pub mod pins;
pub mod registry;
pub mod sim;

pub use cmd::Cmd;
pub use flag::Flag;
pub use interface::{BusyLevel, PanelInterface, SpiInterface};

/// Computes the needed buffer length. Takes care of rounding up in case width
/// is not divisible by 8.
pub const fn buffer_len(width: usize, height: usize) -> usize {
    (width + 7) / 8 * height
}

/// Lifecycle of the controller as seen by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    /// Never initialized in this power cycle
    Uninitialized,
    /// Hardware reset issued
    Reset,
    /// Charge pumps running
    PoweredOn,
    /// Configuration loaded, RAM accepts channel data
    RamLoaded,
    /// Refresh in progress
    Refreshing,
    /// Powered off; needs `init` again
    DeepSleep,
}

/// How a bounded busy wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The controller released the busy line in time
    Ready,
    /// The deadline passed; the chip may still finish on its own
    TimedOut,
}

impl From<bool> for WaitOutcome {
    fn from(ready: bool) -> Self {
        if ready {
            WaitOutcome::Ready
        } else {
            WaitOutcome::TimedOut
        }
    }
}

/// One independently addressable color plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Pixels of exactly this color are set in the channel's plane
    pub color: Rgb888,
    /// Bit value used to draw overlays on this plane
    pub default_value: bool,
}

/// Metadata snapshot for status reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelInfo {
    pub name: &'static str,
    pub width: u16,
    pub height: u16,
    pub bits_per_channel: u8,
    pub channels: Vec<ChannelInfo>,
}

impl PanelInfo {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// A concrete e-paper panel: fixed geometry and channels plus the command
/// sequence of its controller.
pub trait Panel {
    /// Unique name the registry selects the panel by
    fn name(&self) -> &'static str;

    fn width(&self) -> u16;

    fn height(&self) -> u16;

    /// Channel list; its length is the channel count
    fn channels(&self) -> &'static [ChannelInfo];

    fn bits_per_channel(&self) -> u8 {
        1
    }

    fn state(&self) -> PanelState;

    /// Reset, power on and configure the controller, leaving both RAM planes white.
    ///
    /// A power-on timeout is a hard error: nothing else is sent to a chip that
    /// may not be powered.
    fn init(&mut self, interface: &mut dyn PanelInterface) -> Result<(), Error>;

    /// Stream one bitplane of `buffer_len(width, height)` bytes into the
    /// controller RAM belonging to `channel`
    fn write_channel(
        &mut self,
        interface: &mut dyn PanelInterface,
        channel: usize,
        data: &[u8],
    ) -> Result<(), Error>;

    /// Refresh the glass from RAM. A timeout is logged, not fatal.
    fn display(&mut self, interface: &mut dyn PanelInterface) -> Result<WaitOutcome, Error>;

    /// Power off and enter deep sleep. A power-off timeout is logged, not fatal.
    fn deep_sleep(&mut self, interface: &mut dyn PanelInterface) -> Result<WaitOutcome, Error>;

    fn channel_count(&self) -> usize {
        self.channels().len()
    }

    /// Bytes per channel plane
    fn buffer_len(&self) -> usize {
        buffer_len(usize::from(self.width()), usize::from(self.height()))
    }

    fn info(&self) -> PanelInfo {
        PanelInfo {
            name: self.name(),
            width: self.width(),
            height: self.height(),
            bits_per_channel: self.bits_per_channel(),
            channels: self.channels().to_vec(),
        }
    }
}

/// Checks shared by every driver before a channel write touches the bus
pub(crate) fn check_channel_write(
    panel: &dyn Panel,
    channel: usize,
    data: &[u8],
) -> Result<(), Error> {
    if panel.state() != PanelState::RamLoaded {
        return Err(Error::NotReady {
            panel: panel.name(),
            state: panel.state(),
            operation: "write channel",
        });
    }
    if channel >= panel.channel_count() {
        return Err(Error::InvalidChannel {
            channel,
            channels: panel.channel_count(),
        });
    }
    if data.len() != panel.buffer_len() {
        return Err(Error::BufferSize {
            expected: panel.buffer_len(),
            actual: data.len(),
        });
    }
    Ok(())
}

/// Resolution bytes for `Cmd::RESOLUTION_SETTING`: width then height, high byte first
pub(crate) fn resolution_bytes(width: u16, height: u16) -> [u8; 4] {
    [
        (width >> 8) as u8,
        (width & 0xFF) as u8,
        (height >> 8) as u8,
        (height & 0xFF) as u8,
    ]
}
