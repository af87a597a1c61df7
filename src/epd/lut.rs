//! Full-refresh waveform tables for the GDEW042T2 (Waveshare 4.2" b/w).

/// VCOM waveform, written with `Cmd::LUT_VCOM`
pub const LUT_VCOM0: [u8; 44] = [
    0x00, 0x17, 0x00, 0x00, 0x00, 0x02, //
    0x00, 0x17, 0x17, 0x00, 0x00, 0x02, //
    0x00, 0x0A, 0x01, 0x00, 0x00, 0x01, //
    0x00, 0x0E, 0x0E, 0x00, 0x00, 0x02, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00,
];

/// White to white transition
pub const LUT_WW: [u8; 42] = [
    0x40, 0x17, 0x00, 0x00, 0x00, 0x02, //
    0x90, 0x17, 0x17, 0x00, 0x00, 0x02, //
    0x40, 0x0A, 0x01, 0x00, 0x00, 0x01, //
    0xA0, 0x0E, 0x0E, 0x00, 0x00, 0x02, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Black to white transition
pub const LUT_BW: [u8; 42] = [
    0x40, 0x17, 0x00, 0x00, 0x00, 0x02, //
    0x90, 0x17, 0x17, 0x00, 0x00, 0x02, //
    0x40, 0x0A, 0x01, 0x00, 0x00, 0x01, //
    0xA0, 0x0E, 0x0E, 0x00, 0x00, 0x02, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// White to black transition
pub const LUT_WB: [u8; 42] = [
    0x80, 0x17, 0x00, 0x00, 0x00, 0x02, //
    0x90, 0x17, 0x17, 0x00, 0x00, 0x02, //
    0x80, 0x0A, 0x01, 0x00, 0x00, 0x01, //
    0x50, 0x0E, 0x0E, 0x00, 0x00, 0x02, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Black to black transition
pub const LUT_BB: [u8; 42] = [
    0x80, 0x17, 0x00, 0x00, 0x00, 0x02, //
    0x90, 0x17, 0x17, 0x00, 0x00, 0x02, //
    0x80, 0x0A, 0x01, 0x00, 0x00, 0x01, //
    0x50, 0x0E, 0x0E, 0x00, 0x00, 0x02, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];
