//! Battery and signal readings shown as icons on every channel
use embedded_graphics::prelude::Point;

use crate::error::Error;
use crate::framebuffer::{icons, PixelBuffer};

/// Cell voltage read as empty
pub const BATTERY_EMPTY_MV: u32 = 3_400;

/// Cell voltage read as full
pub const BATTERY_FULL_MV: u32 = 4_200;

/// Charge level for a single Li-ion cell voltage, linear and clamped to 0..=100
pub fn battery_percentage(voltage_mv: u32) -> u8 {
    let clamped = voltage_mv.clamp(BATTERY_EMPTY_MV, BATTERY_FULL_MV);
    ((clamped - BATTERY_EMPTY_MV) * 100 / (BATTERY_FULL_MV - BATTERY_EMPTY_MV)) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    pub voltage_mv: u32,
    pub percentage: u8,
}

impl BatteryStatus {
    pub fn from_voltage(voltage_mv: u32) -> Self {
        BatteryStatus {
            voltage_mv,
            percentage: battery_percentage(voltage_mv),
        }
    }
}

/// Readings gathered before the refresh, drawn after each channel extraction.
///
/// Either reading may be missing; its icon is then left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusOverlay {
    pub battery: Option<BatteryStatus>,
    /// Received signal strength, dBm
    pub rssi: Option<i32>,
}

/// Where the icons go on the logical (rotated) frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayLayout {
    /// Gap to the top and right edges
    pub margin: u32,
    /// Gap between the signal and battery icons
    pub spacing: u32,
}

impl Default for OverlayLayout {
    fn default() -> Self {
        OverlayLayout {
            margin: 4,
            spacing: 4,
        }
    }
}

impl OverlayLayout {
    /// Top-left corners of the signal and battery icons, anchored top-right
    pub fn positions(&self, logical_width: u32) -> (Point, Point) {
        let right = logical_width as i32 - self.margin as i32;
        let battery = Point::new(right - icons::BATTERY_SIZE.width as i32, self.margin as i32);
        let wifi = Point::new(
            battery.x - self.spacing as i32 - icons::SIGNAL_SIZE.width as i32,
            self.margin as i32,
        );
        (wifi, battery)
    }
}

impl StatusOverlay {
    pub fn is_empty(&self) -> bool {
        self.battery.is_none() && self.rssi.is_none()
    }

    /// Draw whichever icons have readings, using `value` as the ink bit
    pub fn draw(
        &self,
        plane: &mut PixelBuffer,
        layout: &OverlayLayout,
        value: bool,
    ) -> Result<(), Error> {
        let (logical_width, _) = plane.logical_size();
        let (wifi, battery) = layout.positions(logical_width);
        if let Some(status) = self.battery {
            plane.draw_battery(battery, value, status.voltage_mv, i32::from(status.percentage))?;
        }
        if let Some(rssi) = self.rssi {
            plane.draw_wifi(wifi, value, rssi)?;
        }
        Ok(())
    }
}
