//! Status icons drawn onto a plane after channel extraction
use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, StrokeAlignment},
};

use super::PixelBuffer;
use crate::error::Error;

/// Outline plus terminal nub
pub const BATTERY_SIZE: Size = Size::new(22, 12);

/// Five bars, 3 px apart
pub const SIGNAL_SIZE: Size = Size::new(14, 12);

/// Width of the battery's inner fill at 100 %
pub const BATTERY_FILL_WIDTH: u32 = 16;

const MAX_BARS: u8 = 5;

/// Number of signal bars, 0 to 5, for an RSSI in dBm.
///
/// Each threshold is exclusive: -55 dBm shows four bars, not five.
pub fn signal_bars(rssi: i32) -> u8 {
    match rssi {
        r if r > -55 => 5,
        r if r > -65 => 4,
        r if r > -70 => 3,
        r if r > -78 => 2,
        r if r > -82 => 1,
        _ => 0,
    }
}

/// Inner fill width for a charge level; out of range levels are clamped
pub fn battery_fill_width(percentage: i32) -> u32 {
    BATTERY_FILL_WIDTH * percentage.clamp(0, 100) as u32 / 100
}

impl PixelBuffer {
    /// Battery outline at `origin` with the fill proportional to `percentage`
    pub fn draw_battery(
        &mut self,
        origin: Point,
        value: bool,
        voltage_mv: u32,
        percentage: i32,
    ) -> Result<(), Error> {
        self.buffer()?;
        let color = BinaryColor::from(value);
        log::debug!("Battery {} mV {}%", voltage_mv, percentage);

        let outline = PrimitiveStyleBuilder::new()
            .stroke_color(color)
            .stroke_width(1)
            .stroke_alignment(StrokeAlignment::Inside)
            .build();
        let fill = PrimitiveStyle::with_fill(color);

        Rectangle::new(origin, Size::new(20, 12))
            .into_styled(outline)
            .draw(self)?;
        Rectangle::new(origin + Point::new(20, 2), Size::new(2, 7))
            .into_styled(fill)
            .draw(self)?;
        Rectangle::new(
            origin + Point::new(2, 2),
            Size::new(battery_fill_width(percentage), 8),
        )
        .into_styled(fill)
        .draw(self)?;
        Ok(())
    }

    /// Signal strength bars at `origin`; a 2x2 foot marks every bar position
    pub fn draw_wifi(&mut self, origin: Point, value: bool, rssi: i32) -> Result<(), Error> {
        self.buffer()?;
        let fill = PrimitiveStyle::with_fill(BinaryColor::from(value));
        let strength = signal_bars(rssi);
        log::debug!("RSSI {} dBm, {} bars", rssi, strength);

        for bar in 1..=MAX_BARS {
            let x = i32::from(bar - 1) * 3;
            Rectangle::new(origin + Point::new(x, 10), Size::new(2, 2))
                .into_styled(fill)
                .draw(self)?;
            if bar <= strength {
                let height = 2 * u32::from(bar);
                Rectangle::new(origin + Point::new(x, 10 - height as i32), Size::new(2, height))
                    .into_styled(fill)
                    .draw(self)?;
            }
        }
        Ok(())
    }
}
