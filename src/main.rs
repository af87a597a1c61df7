use anyhow::Context;

use inkpanel::framebuffer::PngImage;
use inkpanel::status::StatusOverlay;
use inkpanel::{CycleReport, Device, DeviceConfig};

// Demo frame snapped to the panel palette at build time
const FRAME_PNG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/frame.png"));

fn log_report(report: &CycleReport) {
    log::info!(
        "{} {}x{}: refresh {:?}, sleep {:?}",
        report.panel.name,
        report.panel.width,
        report.panel.height,
        report.refresh,
        report.sleep
    );
    for outcome in &report.channels {
        match &outcome.result {
            Ok(stats) => log::info!(
                "  channel {} {:?}: set={} unset={}",
                outcome.channel,
                outcome.color,
                stats.set,
                stats.unset
            ),
            Err(e) => log::error!("  channel {} {:?}: {}", outcome.channel, outcome.color, e),
        }
    }
}

// https://docs.esp-rs.org/esp-idf-svc/esp_idf_svc/
#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use esp_idf_svc::hal::delay::Delay;
    use esp_idf_svc::hal::gpio;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::hal::prelude::*;
    use esp_idf_svc::hal::spi;
    use inkpanel::epd::pins::{BitOrder, Pins};
    use inkpanel::epd::SpiInterface;

    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    let config = DeviceConfig::default();
    let peripherals = Peripherals::take().context("Could not take peripherals")?;
    let pins = peripherals.pins;

    // Waveshare ESP32 driver board
    log::info!("Panel wiring: {:?}", Pins::WAVESHARE_ESP32_DRIVER);
    log::info!(
        "Configuring SPI at {} Hz, {:?}, {:?}",
        config.bus.baudrate_hz,
        config.bus.mode,
        config.bus.bit_order
    );
    let bit_order = match config.bus.bit_order {
        BitOrder::MsbFirst => spi::config::BitOrder::MsbFirst,
        BitOrder::LsbFirst => spi::config::BitOrder::LsbFirst,
    };
    let driver = spi::SpiDriver::new(
        peripherals.spi2,
        pins.gpio13,                    // SCK - Pins::sck
        pins.gpio14,                    // MOSI - Pins::mosi
        Option::<gpio::AnyIOPin>::None, // MISO, not wired on the panel
        &spi::SpiDriverConfig::new(),
    )
    .context("Could not create SPI driver")?;
    let bus = spi::SpiBusDriver::new(
        driver,
        &spi::SpiConfig::new()
            .baudrate(config.bus.baudrate_hz.Hz().into())
            .data_mode(config.bus.mode)
            .bit_order(bit_order),
    )
    .context("Could not create SPI bus driver")?;

    let interface = SpiInterface::new(
        bus,
        gpio::PinDriver::output(pins.gpio15).context("Failed to set cs pin as output")?, // Pins::cs
        gpio::PinDriver::input(pins.gpio25).context("Failed to set busy pin as input")?, // Pins::busy
        gpio::PinDriver::output(pins.gpio27).context("Failed to set dc pin as output")?, // Pins::dc
        gpio::PinDriver::output(pins.gpio26).context("Failed to set rst pin as output")?, // Pins::rst
        Delay::default(),
    );

    let mut device = Device::from_config(&config, interface)
        .with_context(|| format!("Could not set up panel {}", config.panel))?;

    let image = PngImage::new(FRAME_PNG).context("Embedded frame is not a readable PNG")?;
    // battery and signal readings are supplied by the application layer
    let report = device
        .run_cycle(&image, &StatusOverlay::default())
        .context("Update cycle failed")?;
    log_report(&report);

    Ok(())
}

/// Dry run on the host: one full cycle against the recording interface.
///
/// `inkpanel [PANEL] [IMAGE.png]`, with `RUST_LOG` controlling the log level.
#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use inkpanel::epd::registry;
    use inkpanel::epd::sim::{Event, SimInterface};
    use inkpanel::status::BatteryStatus;
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(panel) => DeviceConfig::default().with_panel(panel),
        None => DeviceConfig::default(),
    };
    let bytes = match args.next() {
        Some(path) => std::fs::read(&path).with_context(|| format!("Could not read {}", path))?,
        None => FRAME_PNG.to_vec(),
    };

    let mut device = Device::from_config(&config, SimInterface::new()).with_context(|| {
        format!(
            "Unknown panel {:?}, supported: {}",
            config.panel,
            registry::supported_panels().join(", ")
        )
    })?;
    let image = PngImage::new(&bytes).context("Could not read PNG header")?;
    let overlay = StatusOverlay {
        battery: Some(BatteryStatus::from_voltage(3_900)),
        rssi: Some(-67),
    };

    let report = device.run_cycle(&image, &overlay).context("Update cycle failed")?;
    log_report(&report);

    if let Some(sim) = device.interface() {
        let streamed: usize = sim
            .events()
            .iter()
            .map(|event| match event {
                Event::Stream(bytes) => bytes.len(),
                _ => 0,
            })
            .sum();
        let commands = sim.commands();
        println!(
            "{}: {} commands, {} bytes of channel data, {}/{} channel(s) written",
            report.panel.name,
            commands.len(),
            streamed,
            report.channels.iter().filter(|c| c.result.is_ok()).count(),
            report.channels.len()
        );
        let trace: Vec<String> = commands.iter().map(|c| format!("{:02X}", c)).collect();
        println!("command trace: {}", trace.join(" "));
    }
    Ok(())
}
