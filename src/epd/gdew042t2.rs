//! GDEW042T2 / Waveshare 4.2" black and white, 400x300, UC8176 controller
//!
//! Full refresh with waveforms uploaded from [`super::lut`]. Both RAM planes
//! are primed white during init; channel data goes to the "new data" RAM
//! (`Cmd::DATA_START_TRANSMISSION_2`), a set bit is a white pixel.
use embedded_graphics::pixelcolor::Rgb888;

use super::interface::{BusyLevel, PanelInterface};
use super::{
    check_channel_write, lut, resolution_bytes, ChannelInfo, Cmd, Flag, Panel, PanelState,
    WaitOutcome,
};
use crate::error::Error;

/// Registry name
pub const NAME: &str = "Waveshare-042bw";

/// Display width, pixels horizontally
pub const WIDTH: u16 = 400;

/// Display height, pixels vertically
pub const HEIGHT: u16 = 300;

const BEFORE_RESET_MS: u32 = 200;
const RESET_DURATION_MS: u32 = 200;
const AFTER_RESET_MS: u32 = 200;
const POWER_ON_TIMEOUT_MS: u32 = 500;
const REFRESH_TIMEOUT_MS: u32 = 5_000;
const POWER_OFF_TIMEOUT_MS: u32 = 200;

static CHANNELS: [ChannelInfo; 1] = [ChannelInfo {
    color: Rgb888::new(255, 255, 255),
    default_value: false,
}];

/// Panel setting and VCOM pair loaded during init.
///
/// Two sequences exist for this glass and neither has been validated against
/// the other on hardware, so both stay selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitProfile {
    /// Panel setting 0xBF 0x0D, VCOM DC 0x28
    #[default]
    Default,
    /// Panel setting 0x3F, VCOM DC 0x12
    Alternate,
}

impl InitProfile {
    fn panel_setting(self) -> &'static [u8] {
        match self {
            InitProfile::Default => &Flag::PANEL_SETTING_LUT_FROM_REGISTER,
            InitProfile::Alternate => &Flag::PANEL_SETTING_ALTERNATE,
        }
    }

    fn vcom_dc(self) -> u8 {
        match self {
            InitProfile::Default => Flag::VCOM_DC_DEFAULT,
            InitProfile::Alternate => Flag::VCOM_DC_ALTERNATE,
        }
    }
}

/// Driver for the 4.2" black and white panel
#[derive(Debug)]
pub struct Gdew042t2 {
    profile: InitProfile,
    state: PanelState,
}

impl Gdew042t2 {
    pub fn new() -> Self {
        Self::with_profile(InitProfile::Default)
    }

    pub fn with_profile(profile: InitProfile) -> Self {
        Gdew042t2 {
            profile,
            state: PanelState::Uninitialized,
        }
    }

    pub fn profile(&self) -> InitProfile {
        self.profile
    }

    fn set_lut(&mut self, interface: &mut dyn PanelInterface) -> Result<(), Error> {
        log::debug!("Setting LUT data");
        interface.cmd_with_data(Cmd::LUT_VCOM, &lut::LUT_VCOM0)?;
        interface.cmd_with_data(Cmd::LUT_WW, &lut::LUT_WW)?;
        interface.cmd_with_data(Cmd::LUT_BW, &lut::LUT_BW)?;
        interface.cmd_with_data(Cmd::LUT_WB, &lut::LUT_WB)?;
        interface.cmd_with_data(Cmd::LUT_BB, &lut::LUT_BB)?;
        Ok(())
    }

    fn clear_ram(&mut self, interface: &mut dyn PanelInterface) -> Result<(), Error> {
        let total_bytes = self.buffer_len() as u32;
        interface.cmd(Cmd::DATA_START_TRANSMISSION_1)?;
        interface.data_x_times(Flag::RAM_ALL_WHITE, total_bytes)?;
        interface.cmd(Cmd::DATA_START_TRANSMISSION_2)?;
        interface.data_x_times(Flag::RAM_ALL_WHITE, total_bytes)?;
        Ok(())
    }
}

impl Default for Gdew042t2 {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel for Gdew042t2 {
    fn name(&self) -> &'static str {
        NAME
    }

    fn width(&self) -> u16 {
        WIDTH
    }

    fn height(&self) -> u16 {
        HEIGHT
    }

    fn channels(&self) -> &'static [ChannelInfo] {
        &CHANNELS
    }

    fn state(&self) -> PanelState {
        self.state
    }

    fn init(&mut self, interface: &mut dyn PanelInterface) -> Result<(), Error> {
        log::info!("Initializing {} ({:?} profile)", NAME, self.profile);

        interface.reset(BEFORE_RESET_MS, RESET_DURATION_MS, AFTER_RESET_MS)?;
        self.state = PanelState::Reset;

        interface.cmd_with_data(Cmd::POWER_SETTING, &Flag::POWER_SETTING)?;
        interface.cmd_with_data(Cmd::BOOSTER_SOFT_START, &Flag::BOOSTER_SOFT_START)?;

        interface.cmd(Cmd::POWER_ON)?;
        if !interface.wait_until_idle(BusyLevel::Low, POWER_ON_TIMEOUT_MS) {
            log::error!("Busy timeout expired on POWER_ON in init()");
            return Err(Error::BusyTimeout {
                operation: "power on",
                timeout_ms: POWER_ON_TIMEOUT_MS,
            });
        }
        self.state = PanelState::PoweredOn;

        interface.cmd_with_data(Cmd::PANEL_SETTING, self.profile.panel_setting())?;
        interface.cmd_with_data(Cmd::PLL_CONTROL, &[Flag::PLL_50HZ])?;
        interface.cmd_with_data(Cmd::RESOLUTION_SETTING, &resolution_bytes(WIDTH, HEIGHT))?;
        interface.cmd_with_data(Cmd::VCOM_DC_SETTING, &[self.profile.vcom_dc()])?;
        interface.cmd_with_data(
            Cmd::VCOM_AND_DATA_INTERVAL_SETTING,
            &[Flag::VCOM_DATA_INTERVAL_WHITE_BORDER],
        )?;

        self.set_lut(interface)?;
        self.clear_ram(interface)?;

        self.state = PanelState::RamLoaded;
        log::info!("{} ready", NAME);
        Ok(())
    }

    fn write_channel(
        &mut self,
        interface: &mut dyn PanelInterface,
        channel: usize,
        data: &[u8],
    ) -> Result<(), Error> {
        check_channel_write(self, channel, data)?;
        log::info!("Writing channel {} ({} bytes)", channel, data.len());

        // single RAM plane, the channel index only selects the plane data
        interface.cmd(Cmd::DATA_START_TRANSMISSION_2)?;
        interface.start_data_transfer()?;
        let transferred = interface.transfer_data(data);
        let ended = interface.end_data_transfer();
        transferred.and(ended)?;
        Ok(())
    }

    fn display(&mut self, interface: &mut dyn PanelInterface) -> Result<WaitOutcome, Error> {
        if self.state != PanelState::RamLoaded {
            return Err(Error::NotReady {
                panel: NAME,
                state: self.state,
                operation: "refresh",
            });
        }

        interface.cmd(Cmd::DISPLAY_REFRESH)?;
        self.state = PanelState::Refreshing;
        let outcome = WaitOutcome::from(interface.wait_until_idle(BusyLevel::Low, REFRESH_TIMEOUT_MS));
        if outcome == WaitOutcome::TimedOut {
            log::warn!("Busy timeout expired in display()");
        }
        self.state = PanelState::RamLoaded;
        Ok(outcome)
    }

    fn deep_sleep(&mut self, interface: &mut dyn PanelInterface) -> Result<WaitOutcome, Error> {
        match self.state {
            // power on never completed
            PanelState::Uninitialized | PanelState::Reset => {
                return Err(Error::NotReady {
                    panel: NAME,
                    state: self.state,
                    operation: "enter deep sleep",
                })
            }
            PanelState::DeepSleep => {
                log::debug!("{} already in deep sleep", NAME);
                return Ok(WaitOutcome::Ready);
            }
            _ => {}
        }

        interface.cmd(Cmd::POWER_OFF)?;
        let outcome = WaitOutcome::from(interface.wait_until_idle(BusyLevel::Low, POWER_OFF_TIMEOUT_MS));
        if outcome == WaitOutcome::TimedOut {
            log::warn!("Busy timeout expired in deep_sleep()");
        }
        interface.cmd_with_data(Cmd::DEEP_SLEEP, &[Flag::DEEP_SLEEP_CHECK_CODE])?;
        self.state = PanelState::DeepSleep;
        log::info!("{} in deep sleep", NAME);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epd::sim::{Event, SimInterface};
    use display_interface::DisplayError;

    const PLANE: usize = 15_000;

    fn data(bytes: &[u8]) -> Event {
        Event::Data(bytes.to_vec())
    }

    fn wait(timeout_ms: u32) -> Event {
        Event::Wait {
            busy_level: BusyLevel::Low,
            timeout_ms,
        }
    }

    #[test]
    fn full_cycle_matches_vendor_sequence() {
        let mut sim = SimInterface::new();
        let mut panel = Gdew042t2::new();
        let all_ones = vec![0xFF; PLANE];

        panel.init(&mut sim).unwrap();
        panel.write_channel(&mut sim, 0, &all_ones).unwrap();
        assert_eq!(panel.display(&mut sim).unwrap(), WaitOutcome::Ready);
        assert_eq!(panel.deep_sleep(&mut sim).unwrap(), WaitOutcome::Ready);

        let expected = vec![
            Event::Reset {
                before_ms: 200,
                duration_ms: 200,
                after_ms: 200,
            },
            Event::Command(0x01),
            data(&[0x03, 0x00, 0x2B, 0x2B]),
            Event::Command(0x06),
            data(&[0x17, 0x17, 0x17]),
            Event::Command(0x04),
            wait(POWER_ON_TIMEOUT_MS),
            Event::Command(0x00),
            data(&[0xBF, 0x0D]),
            Event::Command(0x30),
            data(&[0x3C]),
            Event::Command(0x61),
            data(&[0x01, 0x90, 0x01, 0x2C]),
            Event::Command(0x82),
            data(&[0x28]),
            Event::Command(0x50),
            data(&[0x97]),
            Event::Command(0x20),
            data(&lut::LUT_VCOM0),
            Event::Command(0x21),
            data(&lut::LUT_WW),
            Event::Command(0x22),
            data(&lut::LUT_BW),
            Event::Command(0x23),
            data(&lut::LUT_WB),
            Event::Command(0x24),
            data(&lut::LUT_BB),
            Event::Command(0x10),
            Event::Repeat {
                value: 0xFF,
                count: PLANE as u32,
            },
            Event::Command(0x13),
            Event::Repeat {
                value: 0xFF,
                count: PLANE as u32,
            },
            Event::Command(0x13),
            Event::Stream(all_ones),
            Event::Command(0x12),
            wait(REFRESH_TIMEOUT_MS),
            Event::Command(0x02),
            wait(POWER_OFF_TIMEOUT_MS),
            Event::Command(0x07),
            data(&[0xA5]),
        ];
        assert_eq!(sim.events(), expected.as_slice());
        assert_eq!(panel.state(), PanelState::DeepSleep);
    }

    #[test]
    fn lut_tables_have_vendor_lengths() {
        let mut sim = SimInterface::new();
        Gdew042t2::new().init(&mut sim).unwrap();

        assert_eq!(sim.payload_len(0x20), Some(44));
        for command in [0x21, 0x22, 0x23, 0x24] {
            assert_eq!(sim.payload_len(command), Some(42), "LUT 0x{command:02X}");
        }
    }

    #[test]
    fn alternate_profile_changes_only_panel_setting_and_vcom() {
        let mut sim = SimInterface::new();
        Gdew042t2::with_profile(InitProfile::Alternate)
            .init(&mut sim)
            .unwrap();

        assert_eq!(sim.payload(0x00), Some(vec![0x3F]));
        assert_eq!(sim.payload(0x82), Some(vec![0x12]));
        assert_eq!(sim.payload(0x50), Some(vec![0x97]));
    }

    #[test]
    fn power_on_timeout_stops_init() {
        let mut sim = SimInterface::new().time_out_wait(0);
        let mut panel = Gdew042t2::new();

        let err = panel.init(&mut sim).unwrap_err();
        assert!(matches!(err, Error::BusyTimeout { operation: "power on", .. }));
        assert_eq!(sim.commands(), vec![0x01, 0x06, 0x04]);
        assert_eq!(panel.state(), PanelState::Reset);

        sim.clear();
        assert!(matches!(
            panel.deep_sleep(&mut sim),
            Err(Error::NotReady { state: PanelState::Reset, .. })
        ));
        assert!(sim.events().is_empty());
    }

    #[test]
    fn refresh_and_power_off_timeouts_are_soft() {
        let mut sim = SimInterface::new().time_out_wait(1).time_out_wait(2);
        let mut panel = Gdew042t2::new();

        panel.init(&mut sim).unwrap();
        assert_eq!(panel.display(&mut sim).unwrap(), WaitOutcome::TimedOut);
        assert_eq!(panel.deep_sleep(&mut sim).unwrap(), WaitOutcome::TimedOut);
        assert_eq!(sim.commands().last(), Some(&0x07));
        assert_eq!(panel.state(), PanelState::DeepSleep);
    }

    #[test]
    fn write_before_init_touches_no_hardware() {
        let mut sim = SimInterface::new();
        let mut panel = Gdew042t2::new();

        let err = panel.write_channel(&mut sim, 0, &vec![0; PLANE]).unwrap_err();
        assert!(matches!(err, Error::NotReady { .. }));
        assert!(sim.events().is_empty());
    }

    #[test]
    fn transfer_error_wins_over_release_error() {
        let mut sim = SimInterface::new();
        let mut panel = Gdew042t2::new();
        panel.init(&mut sim).unwrap();

        let mut sim = SimInterface::new().fail_streams();
        assert!(matches!(
            panel.write_channel(&mut sim, 0, &vec![0; PLANE]),
            Err(Error::Interface(DisplayError::BusWriteError))
        ));
    }

    #[test]
    fn write_rejects_bad_channel_and_size() {
        let mut sim = SimInterface::new();
        let mut panel = Gdew042t2::new();
        panel.init(&mut sim).unwrap();
        sim.clear();

        assert!(matches!(
            panel.write_channel(&mut sim, 1, &vec![0; PLANE]),
            Err(Error::InvalidChannel { channel: 1, channels: 1 })
        ));
        assert!(matches!(
            panel.write_channel(&mut sim, 0, &[0; 10]),
            Err(Error::BufferSize { expected: PLANE, actual: 10 })
        ));
        assert!(sim.events().is_empty());
    }

    #[test]
    fn deep_sleep_is_terminal_until_next_init() {
        let mut sim = SimInterface::new();
        let mut panel = Gdew042t2::new();
        panel.init(&mut sim).unwrap();
        panel.deep_sleep(&mut sim).unwrap();

        assert!(matches!(panel.display(&mut sim), Err(Error::NotReady { .. })));
        panel.init(&mut sim).unwrap();
        assert_eq!(panel.state(), PanelState::RamLoaded);
    }

    #[test]
    fn metadata_describes_single_white_channel() {
        let info = Gdew042t2::new().info();
        assert_eq!(info.name, "Waveshare-042bw");
        assert_eq!((info.width, info.height), (400, 300));
        assert_eq!(info.channel_count(), 1);
        assert_eq!(info.bits_per_channel, 1);
        assert_eq!(info.channels[0].color, Rgb888::new(255, 255, 255));
        assert!(!info.channels[0].default_value);
    }
}
