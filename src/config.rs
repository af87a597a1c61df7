//! Device configuration
//!
//! Plain data handed in by whatever loads settings; nothing here is persisted.
use crate::epd::gdew042t2;
use crate::epd::pins::BusConfig;
use crate::framebuffer::DisplayRotation;
use crate::status::OverlayLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Registry name of the attached panel
    pub panel: String,
    pub bus: BusConfig,
    pub rotation: DisplayRotation,
    pub overlay: OverlayLayout,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            panel: gdew042t2::NAME.to_string(),
            bus: BusConfig::default(),
            rotation: DisplayRotation::Rotate0,
            overlay: OverlayLayout::default(),
        }
    }
}

impl DeviceConfig {
    pub fn with_panel(mut self, panel: impl Into<String>) -> Self {
        self.panel = panel.into();
        self
    }

    pub fn with_rotation(mut self, rotation: DisplayRotation) -> Self {
        self.rotation = rotation;
        self
    }
}
