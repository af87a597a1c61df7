/// Data bytes and register values sent with the UC8176 commands.
///
/// The values are vendor constants transcribed from the reference sequences;
/// none of them are computed.
pub struct Flag;
#[allow(missing_docs)]
impl Flag {
    // Power Setting (0x01): VDS_EN|VDG_EN, VCOM_HV|VGHL_LV, VDH, VDL
    pub const POWER_SETTING: [u8; 4] = [0x03, 0x00, 0x2B, 0x2B];

    // Booster Soft Start (0x06) phases A, B, C
    pub const BOOSTER_SOFT_START: [u8; 3] = [0x17, 0x17, 0x17];

    // Panel Setting (0x00)
    pub const PANEL_SETTING_LUT_FROM_REGISTER: [u8; 2] = [0xBF, 0x0D]; // KW-BF KWR-AF BWROTP 0F BWOTP 1F
    pub const PANEL_SETTING_ALTERNATE: [u8; 1] = [0x3F]; // 300x400, B/W, LUT set by register
    pub const PANEL_SETTING_LUT_FROM_OTP_BWR: [u8; 1] = [0x0F];

    // PLL Control (0x30)
    pub const PLL_50HZ: u8 = 0x3C; // 3C 50Hz, 3A 100Hz, 29 150Hz, 39 200Hz, 31 171Hz

    // VCOM DC Setting (0x82)
    pub const VCOM_DC_DEFAULT: u8 = 0x28;
    pub const VCOM_DC_ALTERNATE: u8 = 0x12;

    // VCOM and Data Interval Setting (0x50)
    pub const VCOM_DATA_INTERVAL_WHITE_BORDER: u8 = 0x97; // 97 white border, 77 black border
    pub const VCOM_DATA_INTERVAL_BWR_INIT: u8 = 0x77;
    pub const VCOM_DATA_INTERVAL_FLOATING_BORDER: u8 = 0xF7;

    // Deep Sleep (0x07)
    pub const DEEP_SLEEP_CHECK_CODE: u8 = 0xA5;

    // RAM fill pattern
    pub const RAM_ALL_WHITE: u8 = 0xFF;
}
