//! One-bit pixel plane shared by all channels of a panel
//!
//! The plane holds `height * ceil(width / 8)` bytes, one bit per pixel,
//! MSB first within a byte, rows in order. Coordinates passed in are logical:
//! the current [`DisplayRotation`] is applied on every access, and anything
//! outside the rotated bounds is dropped silently.
//!
//! The plane is drawn on either bit by bit with [`PixelBuffer::set_pixel`] or
//! through `embedded-graphics`, where `BinaryColor::On` sets a bit.
use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};

use crate::epd::buffer_len;
use crate::error::Error;

mod extract;
pub mod icons;
mod source;

pub use extract::ChannelStats;
pub use source::{ImageSource, PixelSink, PngImage, RawImage, RawLayout};

/// Quarter-turn rotation applied on every pixel access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayRotation {
    /// No rotation
    #[default]
    Rotate0,
    /// Rotate by 90 degrees clockwise
    Rotate90,
    /// Rotate by 180 degrees clockwise
    Rotate180,
    /// Rotate 270 degrees clockwise
    Rotate270,
}

impl DisplayRotation {
    /// Quarter turns, 0 to 3
    pub fn quarter_turns(self) -> u8 {
        match self {
            DisplayRotation::Rotate0 => 0,
            DisplayRotation::Rotate90 => 1,
            DisplayRotation::Rotate180 => 2,
            DisplayRotation::Rotate270 => 3,
        }
    }

    /// Rotation from a quarter-turn count, wrapping past a full turn
    pub fn from_quarter_turns(turns: u8) -> Self {
        match turns % 4 {
            0 => DisplayRotation::Rotate0,
            1 => DisplayRotation::Rotate90,
            2 => DisplayRotation::Rotate180,
            _ => DisplayRotation::Rotate270,
        }
    }

    fn swaps_axes(self) -> bool {
        matches!(self, DisplayRotation::Rotate90 | DisplayRotation::Rotate270)
    }
}

/// Bitplane for one channel at a time
#[derive(Debug, Default)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    rotation: DisplayRotation,
    buffer: Option<Vec<u8>>,
}

impl PixelBuffer {
    /// Unallocated plane; every drawing call fails until [`Self::allocate`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a zeroed plane for a `width` x `height` panel.
    ///
    /// Only one bit per pixel is supported. On failure the buffer is left
    /// unallocated.
    pub fn allocate(&mut self, width: u16, height: u16, bits_per_pixel: u8) -> Result<(), Error> {
        self.release();
        if bits_per_pixel != 1 {
            return Err(Error::UnsupportedBitDepth(bits_per_pixel));
        }

        let len = buffer_len(usize::from(width), usize::from(height));
        let mut plane = Vec::new();
        plane
            .try_reserve_exact(len)
            .map_err(|_| Error::Allocation(len))?;
        plane.resize(len, 0);

        log::debug!("Allocated {} byte plane for {}x{}", len, width, height);
        self.width = u32::from(width);
        self.height = u32::from(height);
        self.buffer = Some(plane);
        Ok(())
    }

    /// Drop the plane; the geometry is forgotten with it
    pub fn release(&mut self) {
        self.buffer = None;
        self.width = 0;
        self.height = 0;
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    /// Set every bit to zero
    pub fn clear(&mut self) -> Result<(), Error> {
        self.plane_mut()?.fill(0);
        Ok(())
    }

    /// Plane bytes, ready for `Panel::write_channel`
    pub fn buffer(&self) -> Result<&[u8], Error> {
        self.buffer.as_deref().ok_or(Error::BufferNotAllocated)
    }

    pub fn set_rotation(&mut self, rotation: DisplayRotation) {
        self.rotation = rotation;
    }

    pub fn rotation(&self) -> DisplayRotation {
        self.rotation
    }

    /// Physical width of the plane
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Physical height of the plane
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width and height as seen through the current rotation
    pub fn logical_size(&self) -> (u32, u32) {
        if self.rotation.swaps_axes() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }

    /// Set or clear the bit at logical `(x, y)`. Out of bounds is a no-op.
    pub fn set_pixel(&mut self, x: i32, y: i32, value: bool) -> Result<(), Error> {
        let (width, height, rotation) = (self.width, self.height, self.rotation);
        let plane = self.buffer.as_mut().ok_or(Error::BufferNotAllocated)?;
        if outside_display(x, y, width, height, rotation) {
            return Ok(());
        }

        let (index, bit) = find_position(x as u32, y as u32, width, height, rotation);
        if value {
            plane[index] |= bit;
        } else {
            plane[index] &= !bit;
        }
        Ok(())
    }

    /// Bit at logical `(x, y)`; `None` when unallocated or out of bounds
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<bool> {
        let plane = self.buffer.as_ref()?;
        if outside_display(x, y, self.width, self.height, self.rotation) {
            return None;
        }
        let (index, bit) = find_position(x as u32, y as u32, self.width, self.height, self.rotation);
        Some(plane[index] & bit != 0)
    }

    fn plane_mut(&mut self) -> Result<&mut Vec<u8>, Error> {
        self.buffer.as_mut().ok_or(Error::BufferNotAllocated)
    }
}

impl DrawTarget for PixelBuffer {
    type Color = BinaryColor;
    type Error = Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point.x, point.y, color.is_on())?;
        }
        Ok(())
    }
}

impl OriginDimensions for PixelBuffer {
    fn size(&self) -> Size {
        let (width, height) = self.logical_size();
        Size::new(width, height)
    }
}

// Checks if a pos is outside the rotated display
fn outside_display(x: i32, y: i32, width: u32, height: u32, rotation: DisplayRotation) -> bool {
    if x < 0 || y < 0 {
        return true;
    }
    let (x, y) = (x as u32, y as u32);
    if rotation.swaps_axes() {
        x >= height || y >= width
    } else {
        x >= width || y >= height
    }
}

fn find_rotation(x: u32, y: u32, width: u32, height: u32, rotation: DisplayRotation) -> (u32, u32) {
    match rotation {
        DisplayRotation::Rotate0 => (x, y),
        DisplayRotation::Rotate90 => (width - 1 - y, x),
        DisplayRotation::Rotate180 => (width - 1 - x, height - 1 - y),
        DisplayRotation::Rotate270 => (y, height - 1 - x),
    }
}

/// Byte index and bit mask of a logical position
fn find_position(x: u32, y: u32, width: u32, height: u32, rotation: DisplayRotation) -> (usize, u8) {
    let (nx, ny) = find_rotation(x, y, width, height, rotation);
    let row_bytes = (width as usize + 7) / 8;
    (nx as usize / 8 + ny as usize * row_bytes, 0x80 >> (nx % 8))
}
