//! Pin roles and SPI bus parameters for the panel connection
//!
//! Defaults match the Waveshare ESP32 e-Paper driver board.

use embedded_hal::spi::{Mode, MODE_0};

/// GPIO numbers for the seven pin roles of the panel connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pins {
    /// SPI Clock pin
    pub sck: u8,
    /// SPI Master Out Slave In (DIN on the panel)
    pub mosi: u8,
    /// SPI Master In Slave Out, not connected on the panel
    pub miso: u8,
    /// Chip Select pin for SPI display
    pub cs: u8,
    /// Data/Command control pin (High for data, Low for command)
    pub dc: u8,
    /// Reset pin for display
    pub rst: u8,
    /// Busy status pin
    pub busy: u8,
}

impl Pins {
    /// Wiring of the Waveshare ESP32 driver board
    pub const WAVESHARE_ESP32_DRIVER: Pins = Pins {
        sck: 13,
        mosi: 14,
        miso: 16,
        cs: 15,
        dc: 27,
        rst: 26,
        busy: 25,
    };
}

/// Order in which bits leave the shift register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

/// Serial bus parameters, fixed for the lifetime of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Clock rate in Hz
    pub baudrate_hz: u32,
    /// Clock polarity and phase
    pub mode: Mode,
    pub bit_order: BitOrder,
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            baudrate_hz: 4_000_000,
            mode: MODE_0,
            bit_order: BitOrder::MsbFirst,
        }
    }
}
