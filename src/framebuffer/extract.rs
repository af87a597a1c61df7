//! Bitplane extraction by exact color match
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

use super::source::ImageSource;
use super::PixelBuffer;
use crate::error::Error;

/// Pixel counters of one extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Pixels equal to the channel color
    pub set: u32,
    /// All other pixels
    pub unset: u32,
}

/// State carried through one decode: target plane, color and counters
struct ChannelExtractor<'a> {
    plane: &'a mut PixelBuffer,
    color: Rgb888,
    stats: ChannelStats,
}

impl<'a> ChannelExtractor<'a> {
    fn new(plane: &'a mut PixelBuffer, color: Rgb888) -> Self {
        ChannelExtractor {
            plane,
            color,
            stats: ChannelStats::default(),
        }
    }

    fn draw(&mut self, x: u32, y: u32, pixel: Rgb888) -> Result<(), Error> {
        let matches = pixel == self.color;
        if matches {
            self.stats.set += 1;
        } else {
            self.stats.unset += 1;
        }
        self.plane.set_pixel(x as i32, y as i32, matches)
    }
}

impl PixelBuffer {
    /// Rebuild the plane from `image`: a bit is set exactly where the pixel's
    /// RGB equals `color`.
    ///
    /// The image must have the plane's logical (rotated) size. On any error the
    /// plane is left all zero.
    pub fn extract_channel(
        &mut self,
        image: &dyn ImageSource,
        color: Rgb888,
    ) -> Result<ChannelStats, Error> {
        self.clear()?;

        let (width, height) = self.logical_size();
        let (image_width, image_height) = image.dimensions();
        if (image_width, image_height) != (width, height) {
            log::error!(
                "Image is {}x{}, plane expects {}x{}",
                image_width,
                image_height,
                width,
                height
            );
            return Err(Error::ImageSize {
                expected_width: width,
                expected_height: height,
                actual_width: image_width,
                actual_height: image_height,
            });
        }

        log::info!("Extracting channel r={} g={} b={}", color.r(), color.g(), color.b());
        let mut extractor = ChannelExtractor::new(self, color);
        let decoded = image.for_each_pixel(&mut |x, y, pixel| extractor.draw(x, y, pixel));
        let stats = extractor.stats;

        match decoded {
            Ok(()) => {
                log::info!("Channel done - set={} unset={}", stats.set, stats.unset);
                Ok(stats)
            }
            Err(e) => {
                log::error!("Channel extraction failed after {} pixels: {}", stats.set + stats.unset, e);
                self.clear()?;
                Err(e)
            }
        }
    }
}
