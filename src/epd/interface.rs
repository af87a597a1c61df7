//! Display interface using SPI
//!
//! [`PanelInterface`] is the byte-level transport every panel driver talks to.
//! [`SpiInterface`] implements it on top of an `embedded-hal` SPI bus and the
//! chip-select, data/command, reset and busy lines.
use display_interface::DisplayError;
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiBus,
};

/// Settle time before the busy line is sampled for the first time
const BUSY_SETTLE_MS: u32 = 1;
/// Interval between two samples of the busy line
const BUSY_POLL_MS: u32 = 1;
/// Bytes sent per SPI write when repeating a value
const CHUNK_SIZE: usize = 32;

/// Level the busy line is driven to while the controller works
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusyLevel {
    /// Busy while LOW (UC8176 family)
    Low,
    /// Busy while HIGH (SSD16xx family)
    High,
}

/// Byte-level command/data transport to an e-paper controller.
///
/// Implementations know nothing about the panel's command set. Bus faults are
/// returned as [`DisplayError`]; busy timeouts are reported as `false` and left
/// to the calling panel to judge.
pub trait PanelInterface {
    /// Drive the control lines to idle and (re)start the bus
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Hardware reset pulse: release, hold low, release, with the given waits
    fn reset(
        &mut self,
        before_reset_ms: u32,
        reset_duration_ms: u32,
        after_reset_ms: u32,
    ) -> Result<(), DisplayError>;

    /// Send a single command byte
    fn cmd(&mut self, command: u8) -> Result<(), DisplayError>;

    /// Send a block of data bytes in one chip-select frame
    fn data(&mut self, data: &[u8]) -> Result<(), DisplayError>;

    /// Send the same data byte `repetitions` times in one chip-select frame
    fn data_x_times(&mut self, val: u8, repetitions: u32) -> Result<(), DisplayError>;

    /// Poll the busy line until it leaves `busy_level`.
    ///
    /// Returns `true` when the line was released before `timeout_ms` elapsed.
    fn wait_until_idle(&mut self, busy_level: BusyLevel, timeout_ms: u32) -> bool;

    /// Open a data frame for streaming
    fn start_data_transfer(&mut self) -> Result<(), DisplayError>;

    /// Stream bytes inside the frame opened by [`Self::start_data_transfer`]
    fn transfer_data(&mut self, data: &[u8]) -> Result<(), DisplayError>;

    /// Close the streaming frame
    fn end_data_transfer(&mut self) -> Result<(), DisplayError>;

    /// Basic function for sending a command and the data belonging to it.
    fn cmd_with_data(&mut self, command: u8, data: &[u8]) -> Result<(), DisplayError> {
        self.cmd(command)?;
        self.data(data)
    }
}

/// The connection to a UC8176-style controller over a shared SPI bus
pub struct SpiInterface<SPI, CS, BSY, DC, RST, DELAY> {
    /// SPI bus, MSB first, mode 0
    spi: SPI,
    /// Chip select, active low
    cs: CS,
    /// Busy sense input
    busy: BSY,
    /// Data/Command Control Pin (High for data, Low for command)
    dc: DC,
    /// Pin for Reseting
    rst: RST,
    /// Delay provider for reset pulses and busy polling
    delay: DELAY,
}

impl<SPI, CS, BSY, DC, RST, DELAY> SpiInterface<SPI, CS, BSY, DC, RST, DELAY> {
    /// Wrap the bus and control lines. Nothing is driven until [`PanelInterface::init`].
    pub fn new(spi: SPI, cs: CS, busy: BSY, dc: DC, rst: RST, delay: DELAY) -> Self {
        SpiInterface {
            spi,
            cs,
            busy,
            dc,
            rst,
            delay,
        }
    }

    /// Give back the bus and pins
    pub fn release(self) -> (SPI, CS, BSY, DC, RST, DELAY) {
        (self.spi, self.cs, self.busy, self.dc, self.rst, self.delay)
    }
}

impl<SPI, CS, BSY, DC, RST, DELAY> SpiInterface<SPI, CS, BSY, DC, RST, DELAY>
where
    SPI: SpiBus,
    CS: OutputPin,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    fn select(&mut self) -> Result<(), DisplayError> {
        self.cs.set_low().map_err(|_| DisplayError::CSError)
    }

    fn deselect(&mut self) -> Result<(), DisplayError> {
        self.spi.flush().map_err(|_| DisplayError::BusWriteError)?;
        self.cs.set_high().map_err(|_| DisplayError::CSError)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        self.spi.write(data).map_err(|e| {
            log::error!("SPI write error ({} bytes): {:?}", data.len(), e);
            DisplayError::BusWriteError
        })
    }

    fn write_repeated(&mut self, val: u8, repetitions: u32) -> Result<(), DisplayError> {
        let buffer = [val; CHUNK_SIZE];
        let full_chunks = (repetitions as usize) / CHUNK_SIZE;
        let remainder = (repetitions as usize) % CHUNK_SIZE;

        for _ in 0..full_chunks {
            self.write(&buffer)?;
        }
        if remainder > 0 {
            self.write(&buffer[..remainder])?;
        }
        Ok(())
    }

    /// `Some(true)` while the line sits at `busy_level`, `None` if it cannot be read
    fn is_busy(&mut self, busy_level: BusyLevel) -> Option<bool> {
        match self.busy.is_high() {
            Ok(high) => Some(high == (busy_level == BusyLevel::High)),
            Err(_) => None,
        }
    }
}

impl<SPI, CS, BSY, DC, RST, DELAY> PanelInterface for SpiInterface<SPI, CS, BSY, DC, RST, DELAY>
where
    SPI: SpiBus,
    CS: OutputPin,
    BSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    fn init(&mut self) -> Result<(), DisplayError> {
        self.cs.set_high().map_err(|_| DisplayError::CSError)?;
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.spi.flush().map_err(|_| DisplayError::BusWriteError)
    }

    fn reset(
        &mut self,
        before_reset_ms: u32,
        reset_duration_ms: u32,
        after_reset_ms: u32,
    ) -> Result<(), DisplayError> {
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(before_reset_ms);
        self.rst.set_low().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(reset_duration_ms);
        self.rst.set_high().map_err(|_| DisplayError::RSError)?;
        self.delay.delay_ms(after_reset_ms);
        Ok(())
    }

    fn cmd(&mut self, command: u8) -> Result<(), DisplayError> {
        // low for commands
        self.dc.set_low().map_err(|_| DisplayError::DCError)?;
        self.select()?;
        let written = self.write(&[command]);
        let deselected = self.deselect();
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;
        written.and(deselected)
    }

    fn data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        // high for data
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;
        self.select()?;
        let written = self.write(data);
        written.and(self.deselect())
    }

    fn data_x_times(&mut self, val: u8, repetitions: u32) -> Result<(), DisplayError> {
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;
        self.select()?;
        let written = self.write_repeated(val, repetitions);
        written.and(self.deselect())?;

        log::debug!("Completed sending {} bytes of 0x{:02X}", repetitions, val);
        Ok(())
    }

    fn wait_until_idle(&mut self, busy_level: BusyLevel, timeout_ms: u32) -> bool {
        self.delay.delay_ms(BUSY_SETTLE_MS);

        let mut elapsed_ms = 0u32;
        loop {
            if elapsed_ms >= timeout_ms {
                log::warn!("Busy timeout after {} ms", timeout_ms);
                return false;
            }
            match self.is_busy(busy_level) {
                Some(false) => break,
                Some(true) => {}
                None => {
                    log::error!("Error reading BUSY pin state, treating as timeout");
                    return false;
                }
            }
            self.delay.delay_ms(BUSY_POLL_MS);
            elapsed_ms += BUSY_POLL_MS;
        }

        log::debug!("Display was busy for {} ms", elapsed_ms);
        true
    }

    fn start_data_transfer(&mut self) -> Result<(), DisplayError> {
        self.dc.set_high().map_err(|_| DisplayError::DCError)?;
        self.select()
    }

    fn transfer_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        self.write(data)
    }

    fn end_data_transfer(&mut self) -> Result<(), DisplayError> {
        self.deselect()
    }
}
