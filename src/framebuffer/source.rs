//! Decoded images the channel extraction reads from
use embedded_graphics::pixelcolor::Rgb888;
use png::{BitDepth, ColorType, Decoder, Transformations};

use crate::error::Error;

/// Callback receiving each pixel as `(x, y, color)`; an error stops the walk
pub type PixelSink<'a> = dyn FnMut(u32, u32, Rgb888) -> Result<(), Error> + 'a;

/// A raster that can be walked pixel by pixel, as often as needed.
///
/// Alpha never reaches the sink.
pub trait ImageSource {
    /// Width and height in pixels
    fn dimensions(&self) -> (u32, u32);

    /// Visit every pixel once, rows top to bottom
    fn for_each_pixel(&self, sink: &mut PixelSink<'_>) -> Result<(), Error>;
}

/// Sample layout of a [`RawImage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawLayout {
    Rgb888,
    /// Alpha byte last, ignored
    Rgba8888,
}

impl RawLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            RawLayout::Rgb888 => 3,
            RawLayout::Rgba8888 => 4,
        }
    }
}

/// Image that is already decoded into 8-bit samples
#[derive(Debug, Clone, Copy)]
pub struct RawImage<'a> {
    width: u32,
    height: u32,
    layout: RawLayout,
    data: &'a [u8],
}

impl<'a> RawImage<'a> {
    /// Wrap `data`, which must hold exactly `width * height` pixels
    pub fn new(width: u32, height: u32, layout: RawLayout, data: &'a [u8]) -> Result<Self, Error> {
        let expected = width as usize * height as usize * layout.bytes_per_pixel();
        if data.len() != expected {
            return Err(Error::ImageData {
                expected,
                actual: data.len(),
            });
        }
        Ok(RawImage {
            width,
            height,
            layout,
            data,
        })
    }
}

impl ImageSource for RawImage<'_> {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn for_each_pixel(&self, sink: &mut PixelSink<'_>) -> Result<(), Error> {
        if self.width == 0 {
            return Ok(());
        }
        let stride = self.layout.bytes_per_pixel();
        let rows = self.data.chunks_exact(self.width as usize * stride);
        for (y, row) in (0..self.height).zip(rows) {
            for (x, px) in (0..self.width).zip(row.chunks_exact(stride)) {
                sink(x, y, Rgb888::new(px[0], px[1], px[2]))?;
            }
        }
        Ok(())
    }
}

/// PNG file held in memory, decoded row by row on every walk.
///
/// Palette and sub-byte grayscale images are expanded, 16-bit samples are
/// stripped to 8 bits. Interlaced images are not supported.
#[derive(Debug, Clone, Copy)]
pub struct PngImage<'a> {
    bytes: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> PngImage<'a> {
    /// Read the header and keep the encoded bytes for later walks
    pub fn new(bytes: &'a [u8]) -> Result<Self, Error> {
        let reader = Decoder::new(bytes).read_info()?;
        let info = reader.info();
        if info.interlaced {
            return Err(Error::UnsupportedImage("interlaced PNG"));
        }
        log::debug!(
            "PNG {}x{} {:?} {:?}, {} bytes",
            info.width,
            info.height,
            info.color_type,
            info.bit_depth,
            bytes.len()
        );
        Ok(PngImage {
            bytes,
            width: info.width,
            height: info.height,
        })
    }
}

impl ImageSource for PngImage<'_> {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn for_each_pixel(&self, sink: &mut PixelSink<'_>) -> Result<(), Error> {
        let mut decoder = Decoder::new(self.bytes);
        decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
        let mut reader = decoder.read_info()?;

        let (color_type, bit_depth) = reader.output_color_type();
        if bit_depth != BitDepth::Eight {
            return Err(Error::UnsupportedImage("sample depth after expansion"));
        }
        let to_rgb: fn(&[u8]) -> Rgb888 = match color_type {
            ColorType::Grayscale | ColorType::GrayscaleAlpha => |px| Rgb888::new(px[0], px[0], px[0]),
            ColorType::Rgb | ColorType::Rgba => |px| Rgb888::new(px[0], px[1], px[2]),
            ColorType::Indexed => return Err(Error::UnsupportedImage("unexpanded palette")),
        };
        let stride = color_type.samples();

        let mut y = 0;
        while let Some(row) = reader.next_row()? {
            if y >= self.height {
                break;
            }
            for (x, px) in (0..self.width).zip(row.data().chunks_exact(stride)) {
                sink(x, y, to_rgb(px))?;
            }
            y += 1;
        }
        Ok(())
    }
}
