//! GDEW042Z15 / Waveshare 4.2" black, white and red, 400x300, UC8176 controller
//!
//! Waveforms come from OTP, so no LUT upload. The chip keeps one RAM plane per
//! channel: white pixels go to `Cmd::DATA_START_TRANSMISSION_1` (bit set =
//! white), red pixels to `Cmd::DATA_START_TRANSMISSION_2`, which is active-low
//! and therefore streamed inverted.
use embedded_graphics::pixelcolor::Rgb888;

use super::interface::{BusyLevel, PanelInterface};
use super::{
    check_channel_write, resolution_bytes, ChannelInfo, Cmd, Flag, Panel, PanelState,
    WaitOutcome,
};
use crate::error::Error;

/// Registry name
pub const NAME: &str = "Waveshare-042bwr";

/// Display width, pixels horizontally
pub const WIDTH: u16 = 400;

/// Display height, pixels vertically
pub const HEIGHT: u16 = 300;

const BEFORE_RESET_MS: u32 = 200;
const RESET_DURATION_MS: u32 = 200;
const AFTER_RESET_MS: u32 = 200;
const POWER_ON_TIMEOUT_MS: u32 = 1_000;
const REFRESH_TIMEOUT_MS: u32 = 20_000;
const POWER_OFF_TIMEOUT_MS: u32 = 1_000;

/// Bytes inverted per SPI write when streaming the red plane
const INVERT_CHUNK: usize = 64;

const WHITE_CHANNEL: usize = 0;
const RED_CHANNEL: usize = 1;

static CHANNELS: [ChannelInfo; 2] = [
    ChannelInfo {
        color: Rgb888::new(255, 255, 255),
        default_value: false,
    },
    ChannelInfo {
        color: Rgb888::new(255, 0, 0),
        default_value: false,
    },
];

/// Driver for the 4.2" black, white and red panel
#[derive(Debug)]
pub struct Gdew042z15 {
    state: PanelState,
}

impl Gdew042z15 {
    pub fn new() -> Self {
        Gdew042z15 {
            state: PanelState::Uninitialized,
        }
    }

    fn clear_ram(&mut self, interface: &mut dyn PanelInterface) -> Result<(), Error> {
        let total_bytes = self.buffer_len() as u32;
        interface.cmd(Cmd::DATA_START_TRANSMISSION_1)?;
        interface.data_x_times(Flag::RAM_ALL_WHITE, total_bytes)?;
        interface.cmd(Cmd::DATA_START_TRANSMISSION_2)?;
        interface.data_x_times(Flag::RAM_ALL_WHITE, total_bytes)?;
        Ok(())
    }

    fn stream_inverted(
        interface: &mut dyn PanelInterface,
        data: &[u8],
    ) -> Result<(), Error> {
        let mut chunk = [0u8; INVERT_CHUNK];
        for part in data.chunks(INVERT_CHUNK) {
            for (dst, src) in chunk.iter_mut().zip(part) {
                *dst = !src;
            }
            interface.transfer_data(&chunk[..part.len()])?;
        }
        Ok(())
    }
}

impl Default for Gdew042z15 {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel for Gdew042z15 {
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
        log::info!("Initializing {}", NAME);

        interface.reset(BEFORE_RESET_MS, RESET_DURATION_MS, AFTER_RESET_MS)?;
        self.state = PanelState::Reset;

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

        interface.cmd_with_data(Cmd::PANEL_SETTING, &Flag::PANEL_SETTING_LUT_FROM_OTP_BWR)?;
        interface.cmd_with_data(Cmd::RESOLUTION_SETTING, &resolution_bytes(WIDTH, HEIGHT))?;
        interface.cmd_with_data(
            Cmd::VCOM_AND_DATA_INTERVAL_SETTING,
            &[Flag::VCOM_DATA_INTERVAL_BWR_INIT],
        )?;

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

        let command = match channel {
            WHITE_CHANNEL => Cmd::DATA_START_TRANSMISSION_1,
            _ => Cmd::DATA_START_TRANSMISSION_2,
        };
        interface.cmd(command)?;
        interface.start_data_transfer()?;
        let transferred = if channel == RED_CHANNEL {
            Self::stream_inverted(interface, data)
        } else {
            interface.transfer_data(data).map_err(Error::from)
        };
        let ended = interface.end_data_transfer();
        transferred.and(ended.map_err(Error::from))
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
        let outcome =
            WaitOutcome::from(interface.wait_until_idle(BusyLevel::Low, REFRESH_TIMEOUT_MS));
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

        // floating border keeps the frame from fading while powered off
        interface.cmd_with_data(
            Cmd::VCOM_AND_DATA_INTERVAL_SETTING,
            &[Flag::VCOM_DATA_INTERVAL_FLOATING_BORDER],
        )?;
        interface.cmd(Cmd::POWER_OFF)?;
        let outcome =
            WaitOutcome::from(interface.wait_until_idle(BusyLevel::Low, POWER_OFF_TIMEOUT_MS));
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

    fn ready_panel(sim: &mut SimInterface) -> Gdew042z15 {
        let mut panel = Gdew042z15::new();
        panel.init(sim).unwrap();
        sim.clear();
        panel
    }

    #[test]
    fn init_uses_otp_waveforms_and_primes_both_planes() {
        let mut sim = SimInterface::new();
        Gdew042z15::new().init(&mut sim).unwrap();

        assert_eq!(
            sim.commands(),
            vec![0x06, 0x04, 0x00, 0x61, 0x50, 0x10, 0x13]
        );
        assert_eq!(sim.payload(0x00), Some(vec![0x0F]));
        assert_eq!(sim.payload(0x50), Some(vec![0x77]));
        assert_eq!(sim.payload_len(0x10), Some(PLANE));
        assert_eq!(sim.payload_len(0x13), Some(PLANE));
        assert!(sim.payload(0x20).is_none());
        assert!(sim.events().contains(&Event::Wait {
            busy_level: BusyLevel::Low,
            timeout_ms: POWER_ON_TIMEOUT_MS,
        }));
    }

    #[test]
    fn white_channel_goes_to_first_ram_unchanged() {
        let mut sim = SimInterface::new();
        let mut panel = ready_panel(&mut sim);
        let plane: Vec<u8> = (0..PLANE).map(|i| i as u8).collect();

        panel.write_channel(&mut sim, 0, &plane).unwrap();

        assert_eq!(sim.events(), &[Event::Command(0x10), Event::Stream(plane)]);
    }

    #[test]
    fn red_channel_goes_to_second_ram_inverted() {
        let mut sim = SimInterface::new();
        let mut panel = ready_panel(&mut sim);
        let mut plane = vec![0u8; PLANE];
        plane[0] = 0x80;
        plane[PLANE - 1] = 0xFF;

        panel.write_channel(&mut sim, 1, &plane).unwrap();

        let mut expected = vec![0xFFu8; PLANE];
        expected[0] = 0x7F;
        expected[PLANE - 1] = 0x00;
        assert_eq!(
            sim.events(),
            &[Event::Command(0x13), Event::Stream(expected)]
        );
    }

    #[test]
    fn third_channel_is_rejected() {
        let mut sim = SimInterface::new();
        let mut panel = ready_panel(&mut sim);

        assert!(matches!(
            panel.write_channel(&mut sim, 2, &vec![0; PLANE]),
            Err(Error::InvalidChannel { channel: 2, channels: 2 })
        ));
        assert!(sim.events().is_empty());
    }

    #[test]
    fn deep_sleep_floats_border_before_power_off() {
        let mut sim = SimInterface::new();
        let mut panel = ready_panel(&mut sim);

        panel.display(&mut sim).unwrap();
        panel.deep_sleep(&mut sim).unwrap();

        assert_eq!(sim.commands(), vec![0x12, 0x50, 0x02, 0x07]);
        assert_eq!(sim.payload(0x50), Some(vec![0xF7]));
        assert_eq!(sim.payload(0x07), Some(vec![0xA5]));
        assert!(sim.events().contains(&Event::Wait {
            busy_level: BusyLevel::Low,
            timeout_ms: REFRESH_TIMEOUT_MS,
        }));
    }

    #[test]
    fn red_transfer_error_is_reported() {
        let mut sim = SimInterface::new();
        let mut panel = ready_panel(&mut sim);

        let mut sim = SimInterface::new().fail_streams();
        assert!(matches!(
            panel.write_channel(&mut sim, RED_CHANNEL, &vec![0; PLANE]),
            Err(Error::Interface(DisplayError::BusWriteError))
        ));
    }

    #[test]
    fn unfinished_power_on_blocks_deep_sleep() {
        let mut sim = SimInterface::new().time_out_wait(0);
        let mut panel = Gdew042z15::new();

        assert!(matches!(
            panel.init(&mut sim),
            Err(Error::BusyTimeout { operation: "power on", .. })
        ));
        sim.clear();
        assert!(matches!(panel.deep_sleep(&mut sim), Err(Error::NotReady { .. })));
        assert!(sim.events().is_empty());
    }

    #[test]
    fn metadata_lists_white_then_red() {
        let info = Gdew042z15::new().info();
        assert_eq!(info.name, "Waveshare-042bwr");
        assert_eq!(info.channel_count(), 2);
        assert_eq!(info.channels[0].color, Rgb888::new(255, 255, 255));
        assert_eq!(info.channels[1].color, Rgb888::new(255, 0, 0));
    }
}
