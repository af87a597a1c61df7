//! One update cycle of the display node
//!
//! [`Device`] owns the panel interface, the selected panel and the pixel
//! plane, and runs them in the only order the controller accepts:
//! init, one write per channel, refresh, deep sleep.
use embedded_graphics::pixelcolor::Rgb888;

use crate::config::DeviceConfig;
use crate::epd::interface::PanelInterface;
use crate::epd::{registry, ChannelInfo, Panel, PanelInfo, PanelState, WaitOutcome};
use crate::error::Error;
use crate::framebuffer::{ChannelStats, DisplayRotation, ImageSource, PixelBuffer};
use crate::status::{OverlayLayout, StatusOverlay};

/// What happened to one channel of the image
#[derive(Debug)]
pub struct ChannelOutcome {
    pub channel: usize,
    pub color: Rgb888,
    /// Counters when the plane reached the panel, otherwise why it did not
    pub result: Result<ChannelStats, Error>,
}

/// Summary of a finished cycle for status reporting
#[derive(Debug)]
pub struct CycleReport {
    pub panel: PanelInfo,
    pub channels: Vec<ChannelOutcome>,
    pub refresh: WaitOutcome,
    pub sleep: WaitOutcome,
}

impl CycleReport {
    pub fn all_channels_written(&self) -> bool {
        self.channels.iter().all(|outcome| outcome.result.is_ok())
    }
}

pub struct Device<I> {
    interface: Option<I>,
    panel: Option<Box<dyn Panel>>,
    plane: PixelBuffer,
    rotation: DisplayRotation,
    layout: OverlayLayout,
}

impl<I: PanelInterface> Device<I> {
    /// Device with no interface and no panel yet
    pub fn new() -> Self {
        Device {
            interface: None,
            panel: None,
            plane: PixelBuffer::new(),
            rotation: DisplayRotation::default(),
            layout: OverlayLayout::default(),
        }
    }

    /// Device for `interface` with the panel, rotation and overlay of `config`
    pub fn from_config(config: &DeviceConfig, interface: I) -> Result<Self, Error> {
        let mut device = Self::new();
        device.attach(interface);
        device.set_panel(&config.panel)?;
        device.rotation = config.rotation;
        device.layout = config.overlay;
        Ok(device)
    }

    pub fn attach(&mut self, interface: I) {
        self.interface = Some(interface);
    }

    /// Give the interface back, e.g. to release the pins
    pub fn detach(&mut self) -> Option<I> {
        self.interface.take()
    }

    pub fn interface(&self) -> Option<&I> {
        self.interface.as_ref()
    }

    pub fn set_rotation(&mut self, rotation: DisplayRotation) {
        self.rotation = rotation;
    }

    /// Select a fresh panel by registry name
    pub fn set_panel(&mut self, name: &str) -> Result<PanelInfo, Error> {
        let panel = registry::create_panel(name)
            .ok_or_else(|| Error::UnsupportedPanel(name.to_string()))?;
        let info = panel.info();
        log::info!(
            "Selected panel {} ({}x{}, {} channel(s))",
            info.name,
            info.width,
            info.height,
            info.channel_count()
        );
        self.panel = Some(panel);
        Ok(info)
    }

    /// Metadata of the selected panel
    pub fn panel_info(&self) -> Option<PanelInfo> {
        self.panel.as_ref().map(|panel| panel.info())
    }

    pub fn panel_state(&self) -> Option<PanelState> {
        self.panel.as_ref().map(|panel| panel.state())
    }

    /// Bring up the interface and initialize the panel
    pub fn start(&mut self) -> Result<(), Error> {
        let (panel, interface) = parts(&mut self.panel, &mut self.interface)?;
        log::info!("Starting {}", panel.name());
        interface.init()?;
        panel.init(interface)
    }

    /// Extract, decorate and write every channel of `image`.
    ///
    /// A channel that cannot be prepared or written is reported in its
    /// outcome and skipped; the others still go out.
    pub fn write_image(
        &mut self,
        image: &dyn ImageSource,
        overlay: &StatusOverlay,
    ) -> Result<Vec<ChannelOutcome>, Error> {
        let (panel, interface) = parts(&mut self.panel, &mut self.interface)?;
        if panel.state() != PanelState::RamLoaded {
            return Err(Error::NotReady {
                panel: panel.name(),
                state: panel.state(),
                operation: "write image",
            });
        }

        self.plane
            .allocate(panel.width(), panel.height(), panel.bits_per_channel())?;
        self.plane.set_rotation(self.rotation);

        let mut outcomes = Vec::with_capacity(panel.channel_count());
        for (channel, info) in panel.channels().iter().enumerate() {
            let result = prepare_channel(&mut self.plane, image, info, overlay, &self.layout)
                .and_then(|stats| {
                    panel.write_channel(interface, channel, self.plane.buffer()?)?;
                    Ok(stats)
                });
            if let Err(e) = &result {
                log::error!("Channel {} skipped: {}", channel, e);
            }
            outcomes.push(ChannelOutcome {
                channel,
                color: info.color,
                result,
            });
        }

        self.plane.release();
        Ok(outcomes)
    }

    /// Refresh the glass from controller RAM
    pub fn display(&mut self) -> Result<WaitOutcome, Error> {
        let (panel, interface) = parts(&mut self.panel, &mut self.interface)?;
        log::info!("Refreshing {}", panel.name());
        panel.display(interface)
    }

    /// Put the panel into deep sleep and drop the plane
    pub fn stop(&mut self) -> Result<WaitOutcome, Error> {
        self.plane.release();
        let (panel, interface) = parts(&mut self.panel, &mut self.interface)?;
        panel.deep_sleep(interface)
    }

    /// Run start, write, refresh and deep sleep for one image.
    ///
    /// Failing to start aborts before any channel is written. Once the chip
    /// has powered on, every early exit still tries to put it to sleep.
    pub fn run_cycle(
        &mut self,
        image: &dyn ImageSource,
        overlay: &StatusOverlay,
    ) -> Result<CycleReport, Error> {
        let panel = self.panel_info().ok_or(Error::NoPanel)?;
        if self.interface.is_none() {
            return Err(Error::MissingInterface);
        }

        if let Err(e) = self.start() {
            log::error!("Panel start failed: {}", e);
            self.sleep_after_failure();
            return Err(e);
        }

        let channels = match self.write_image(image, overlay) {
            Ok(channels) => channels,
            Err(e) => {
                self.sleep_after_failure();
                return Err(e);
            }
        };
        let refresh = match self.display() {
            Ok(outcome) => outcome,
            Err(e) => {
                self.sleep_after_failure();
                return Err(e);
            }
        };
        let sleep = self.stop()?;

        let report = CycleReport {
            panel,
            channels,
            refresh,
            sleep,
        };
        log::info!(
            "Cycle done: {}/{} channel(s) written, refresh {:?}",
            report.channels.iter().filter(|c| c.result.is_ok()).count(),
            report.channels.len(),
            report.refresh
        );
        Ok(report)
    }

    fn sleep_after_failure(&mut self) {
        self.plane.release();
        match self.panel_state() {
            None
            | Some(PanelState::Uninitialized)
            | Some(PanelState::Reset)
            | Some(PanelState::DeepSleep) => {}
            Some(_) => {
                if let Err(e) = self.stop() {
                    log::warn!("Deep sleep after failure did not complete: {}", e);
                }
            }
        }
    }
}

impl<I: PanelInterface> Default for Device<I> {
    fn default() -> Self {
        Self::new()
    }
}

fn parts<'a, I: PanelInterface>(
    panel: &'a mut Option<Box<dyn Panel>>,
    interface: &'a mut Option<I>,
) -> Result<(&'a mut dyn Panel, &'a mut I), Error> {
    let panel: &'a mut dyn Panel = panel.as_deref_mut().ok_or(Error::NoPanel)?;
    let interface = interface.as_mut().ok_or(Error::MissingInterface)?;
    Ok((panel, interface))
}

fn prepare_channel(
    plane: &mut PixelBuffer,
    image: &dyn ImageSource,
    info: &ChannelInfo,
    overlay: &StatusOverlay,
    layout: &OverlayLayout,
) -> Result<ChannelStats, Error> {
    let stats = plane.extract_channel(image, info.color)?;
    if !overlay.is_empty() {
        overlay.draw(plane, layout, info.default_value)?;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epd::sim::{Event, SimInterface};
    use crate::epd::BusyLevel;
    use crate::framebuffer::{PixelSink, RawImage, RawLayout};
    use crate::status::BatteryStatus;
    use std::cell::Cell;

    const PLANE: usize = 15_000;

    fn solid(rgb: [u8; 3]) -> Vec<u8> {
        rgb.repeat(400 * 300)
    }

    fn streams(sim: &SimInterface) -> Vec<(u8, Vec<u8>)> {
        let mut last_command = None;
        let mut out = Vec::new();
        for event in sim.events() {
            match event {
                Event::Command(command) => last_command = Some(*command),
                Event::Stream(bytes) => {
                    if let Some(command) = last_command {
                        out.push((command, bytes.clone()));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn device(panel: &str, sim: SimInterface) -> Device<SimInterface> {
        let config = DeviceConfig::default().with_panel(panel);
        Device::from_config(&config, sim).unwrap()
    }

    /// Walks like a white image, but fails from the `fail_on`-th walk on
    struct FlakySource {
        walks: Cell<usize>,
        fail_on: usize,
    }

    impl ImageSource for FlakySource {
        fn dimensions(&self) -> (u32, u32) {
            (400, 300)
        }

        fn for_each_pixel(&self, sink: &mut PixelSink<'_>) -> Result<(), Error> {
            let walk = self.walks.get();
            self.walks.set(walk + 1);
            if walk >= self.fail_on {
                return Err(Error::UnsupportedImage("flaky"));
            }
            for y in 0..300 {
                for x in 0..400 {
                    sink(x, y, Rgb888::new(255, 255, 255))?;
                }
            }
            Ok(())
        }
    }

    #[test]
    fn white_frame_on_bw_panel() {
        let data = solid([255, 255, 255]);
        let image = RawImage::new(400, 300, RawLayout::Rgb888, &data).unwrap();
        let mut device = device("Waveshare-042bw", SimInterface::new());

        let report = device.run_cycle(&image, &StatusOverlay::default()).unwrap();

        assert!(report.all_channels_written());
        assert_eq!(report.panel.name, "Waveshare-042bw");
        assert_eq!(
            report.channels[0].result.as_ref().unwrap(),
            &ChannelStats { set: 120_000, unset: 0 }
        );
        assert_eq!((report.refresh, report.sleep), (WaitOutcome::Ready, WaitOutcome::Ready));

        let sim = device.interface().unwrap();
        assert_eq!(sim.events()[0], Event::Init);
        assert_eq!(streams(sim), vec![(0x13, vec![0xFF; PLANE])]);
        assert!(sim.commands().ends_with(&[0x13, 0x12, 0x02, 0x07]));
        assert_eq!(device.panel_state(), Some(PanelState::DeepSleep));
    }

    #[test]
    fn overlay_is_inked_into_every_channel() {
        let data = solid([255, 255, 255]);
        let image = RawImage::new(400, 300, RawLayout::Rgb888, &data).unwrap();
        let mut device = device("Waveshare-042bw", SimInterface::new());
        let overlay = StatusOverlay {
            battery: Some(BatteryStatus::from_voltage(4_200)),
            rssi: Some(-50),
        };

        let report = device.run_cycle(&image, &overlay).unwrap();

        // icons clear bits (channel default value false) in an otherwise white frame
        let set = report.channels[0].result.as_ref().unwrap().set;
        assert_eq!(set, 120_000);
        let (_, written) = &streams(device.interface().unwrap())[0];
        assert!(written.iter().any(|b| *b != 0xFF));
        // top-left stays white, icons sit at the top right
        assert_eq!(written[0], 0xFF);
        assert_ne!(written[4 * 50 + 49], 0xFF);
    }

    #[test]
    fn red_frame_on_bwr_panel() {
        let data = solid([255, 0, 0]);
        let image = RawImage::new(400, 300, RawLayout::Rgb888, &data).unwrap();
        let mut device = device("Waveshare-042bwr", SimInterface::new());

        let report = device.run_cycle(&image, &StatusOverlay::default()).unwrap();

        assert_eq!(report.channels.len(), 2);
        assert_eq!(report.channels[1].color, Rgb888::new(255, 0, 0));
        let written = streams(device.interface().unwrap());
        // white plane empty; red plane full, inverted on the wire
        assert_eq!(
            written,
            vec![(0x10, vec![0x00; PLANE]), (0x13, vec![0x00; PLANE])]
        );
    }

    #[test]
    fn failed_channel_does_not_stop_the_others() {
        let mut device = device("Waveshare-042bwr", SimInterface::new());
        let image = FlakySource {
            walks: Cell::new(0),
            fail_on: 1,
        };

        let report = device.run_cycle(&image, &StatusOverlay::default()).unwrap();

        assert!(report.channels[0].result.is_ok());
        assert!(matches!(
            report.channels[1].result,
            Err(Error::UnsupportedImage("flaky"))
        ));
        assert!(!report.all_channels_written());
        let sim = device.interface().unwrap();
        assert_eq!(streams(sim).len(), 1);
        assert!(sim.commands().ends_with(&[0x12, 0x50, 0x02, 0x07]));
    }

    #[test]
    fn image_of_wrong_size_skips_channel() {
        let data = solid([255, 255, 255]);
        let image = RawImage::new(300, 400, RawLayout::Rgb888, &data).unwrap();
        let mut device = device("Waveshare-042bw", SimInterface::new());

        let report = device.run_cycle(&image, &StatusOverlay::default()).unwrap();
        assert!(matches!(report.channels[0].result, Err(Error::ImageSize { .. })));
        assert!(streams(device.interface().unwrap()).is_empty());

        // the same frame fits once the plane is turned a quarter
        let mut device = device_rotated();
        let report = device.run_cycle(&image, &StatusOverlay::default()).unwrap();
        assert!(report.all_channels_written());
    }

    fn device_rotated() -> Device<SimInterface> {
        let config = DeviceConfig::default().with_rotation(DisplayRotation::Rotate90);
        Device::from_config(&config, SimInterface::new()).unwrap()
    }

    #[test]
    fn power_on_timeout_aborts_before_any_write() {
        let data = solid([255, 255, 255]);
        let image = RawImage::new(400, 300, RawLayout::Rgb888, &data).unwrap();
        let mut device = device("Waveshare-042bw", SimInterface::new().time_out_wait(0));

        let err = device.run_cycle(&image, &StatusOverlay::default()).unwrap_err();

        assert!(matches!(err, Error::BusyTimeout { operation: "power on", .. }));
        let sim = device.interface().unwrap();
        // nothing reaches the chip after the unfinished power on
        assert_eq!(sim.commands().last(), Some(&0x04));
        assert_eq!(
            sim.events().last(),
            Some(&Event::Wait {
                busy_level: BusyLevel::Low,
                timeout_ms: 500
            })
        );
        assert_eq!(device.panel_state(), Some(PanelState::Reset));
    }

    #[test]
    fn early_exit_after_power_on_still_sleeps() {
        let data = solid([255, 255, 255]);
        let image = RawImage::new(400, 300, RawLayout::Rgb888, &data).unwrap();
        let mut device = device("Waveshare-042bw", SimInterface::new());
        device.start().unwrap();
        device.set_rotation(DisplayRotation::Rotate90);

        let outcomes = device.write_image(&image, &StatusOverlay::default()).unwrap();
        assert!(matches!(outcomes[0].result, Err(Error::ImageSize { .. })));
        device.sleep_after_failure();
        assert!(device.interface().unwrap().commands().ends_with(&[0x02, 0x07]));
        assert_eq!(device.panel_state(), Some(PanelState::DeepSleep));
    }

    #[test]
    fn bus_failure_aborts_start() {
        let data = solid([255, 255, 255]);
        let image = RawImage::new(400, 300, RawLayout::Rgb888, &data).unwrap();
        let mut device = device("Waveshare-042bw", SimInterface::new().fail_commands());

        let err = device.run_cycle(&image, &StatusOverlay::default()).unwrap_err();
        assert!(matches!(err, Error::Interface(_)));
        assert!(device.interface().unwrap().commands().is_empty());
    }

    #[test]
    fn missing_interface_or_panel_is_reported_first() {
        let data = [0u8; 3];
        let image = RawImage::new(1, 1, RawLayout::Rgb888, &data).unwrap();

        let mut device: Device<SimInterface> = Device::new();
        assert!(matches!(
            device.run_cycle(&image, &StatusOverlay::default()),
            Err(Error::NoPanel)
        ));

        device.set_panel("Waveshare-042bw").unwrap();
        assert!(matches!(
            device.run_cycle(&image, &StatusOverlay::default()),
            Err(Error::MissingInterface)
        ));
        assert_eq!(device.panel_state(), Some(PanelState::Uninitialized));
    }

    #[test]
    fn unknown_panel_name_is_rejected() {
        let config = DeviceConfig::default().with_panel("Waveshare-075");
        assert!(matches!(
            Device::from_config(&config, SimInterface::new()),
            Err(Error::UnsupportedPanel(name)) if name == "Waveshare-075"
        ));
    }

    #[test]
    fn write_before_start_is_rejected() {
        let data = solid([0, 0, 0]);
        let image = RawImage::new(400, 300, RawLayout::Rgb888, &data).unwrap();
        let mut device = device("Waveshare-042bw", SimInterface::new());

        assert!(matches!(
            device.write_image(&image, &StatusOverlay::default()),
            Err(Error::NotReady { .. })
        ));
        assert!(device.interface().unwrap().events().is_empty());
    }

    #[test]
    fn panel_info_exposes_channel_metadata() {
        let device = device("Waveshare-042bwr", SimInterface::new());
        let info = device.panel_info().unwrap();
        assert_eq!((info.width, info.height, info.bits_per_channel), (400, 300, 1));
        assert_eq!(info.channels.len(), 2);
        assert!(info.channels.iter().all(|channel| !channel.default_value));
    }
}
