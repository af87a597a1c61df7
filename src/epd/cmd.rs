/// UC8176 command opcodes used by the 4.2" panels.
pub struct Cmd;
#[allow(missing_docs)]
impl Cmd {
    // Power
    pub const PANEL_SETTING: u8 = 0x00;
    pub const POWER_SETTING: u8 = 0x01;
    pub const POWER_OFF: u8 = 0x02;
    pub const POWER_ON: u8 = 0x04;
    pub const BOOSTER_SOFT_START: u8 = 0x06;
    pub const DEEP_SLEEP: u8 = 0x07;

    // RAM
    pub const DATA_START_TRANSMISSION_1: u8 = 0x10;
    pub const DISPLAY_REFRESH: u8 = 0x12;
    pub const DATA_START_TRANSMISSION_2: u8 = 0x13;

    // Waveforms
    pub const LUT_VCOM: u8 = 0x20;
    pub const LUT_WW: u8 = 0x21;
    pub const LUT_BW: u8 = 0x22;
    pub const LUT_WB: u8 = 0x23;
    pub const LUT_BB: u8 = 0x24;

    // Timing and geometry
    pub const PLL_CONTROL: u8 = 0x30;
    pub const VCOM_AND_DATA_INTERVAL_SETTING: u8 = 0x50;
    pub const RESOLUTION_SETTING: u8 = 0x61;
    pub const VCOM_DC_SETTING: u8 = 0x82;
}

/*
Vendor reference sequence:
0x01 - Power Setting
0x06 - Booster Soft Start
0x04 - Power On (wait busy)
0x00 - Panel Setting
0x30 - PLL Control
0x61 - Resolution Setting
0x82 - VCOM DC Setting
0x50 - VCOM and Data Interval Setting
0x20..0x24 - LUT vcom0 / ww / bw / wb / bb
0x10, 0x13 - Data Start Transmission 1 / 2
0x12 - Display Refresh (wait busy)
0x02 - Power Off (wait busy)
0x07 - Deep Sleep (check code 0xA5)
*/
