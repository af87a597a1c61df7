//! Error type shared by the panel drivers, the framebuffer and the orchestrator.
//!
//! Bus and pin faults keep the `display_interface::DisplayError` the SPI layer
//! produces; everything detected before touching hardware gets its own variant.

pub use display_interface::DisplayError;

use crate::epd::PanelState;

/// Errors reported by this crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// SPI transfer or control line failure
    #[error("display interface error: {0:?}")]
    Interface(DisplayError),

    /// No interface was supplied to the orchestrator
    #[error("no panel interface configured")]
    MissingInterface,

    /// No panel was selected before starting a cycle
    #[error("no panel selected")]
    NoPanel,

    /// The registry has no panel with this name
    #[error("unsupported panel '{0}'")]
    UnsupportedPanel(String),

    /// A panel operation was issued in the wrong lifecycle state
    #[error("panel {panel} is {state:?}, cannot {operation}")]
    NotReady {
        panel: &'static str,
        state: PanelState,
        operation: &'static str,
    },

    /// Channel index outside the panel's channel list
    #[error("channel {channel} out of range, panel has {channels} channel(s)")]
    InvalidChannel { channel: usize, channels: usize },

    /// Channel payload does not match the panel geometry
    #[error("channel buffer is {actual} bytes, panel needs {expected}")]
    BufferSize { expected: usize, actual: usize },

    /// The controller stayed busy past a hard deadline
    #[error("{operation} did not finish within {timeout_ms} ms")]
    BusyTimeout {
        operation: &'static str,
        timeout_ms: u32,
    },

    /// Drawing or extraction on a plane that has not been allocated
    #[error("pixel buffer not allocated")]
    BufferNotAllocated,

    /// Only one bit per pixel is supported
    #[error("{0} bits per pixel not supported")]
    UnsupportedBitDepth(u8),

    /// The plane could not be reserved
    #[error("could not allocate {0} bytes for the pixel buffer")]
    Allocation(usize),

    /// Image geometry does not match the plane
    #[error("image is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    ImageSize {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// Sample buffer length does not match the declared geometry
    #[error("image data is {actual} bytes, expected {expected}")]
    ImageData { expected: usize, actual: usize },

    /// PNG stream could not be decoded
    #[error("image decode failed: {0}")]
    Decode(#[from] png::DecodingError),

    /// PNG feature this decoder does not handle
    #[error("unsupported image: {0}")]
    UnsupportedImage(&'static str),
}

impl From<DisplayError> for Error {
    fn from(e: DisplayError) -> Self {
        Error::Interface(e)
    }
}
