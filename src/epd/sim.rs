//! Recording panel interface
//!
//! [`SimInterface`] stands in for the SPI connection when no hardware is
//! attached: it records every command, data payload, reset and busy wait so a
//! dry run can be inspected, and it can be told to let selected busy waits
//! time out.
use display_interface::DisplayError;

use super::interface::{BusyLevel, PanelInterface};

/// One call received by the interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Init,
    Reset {
        before_ms: u32,
        duration_ms: u32,
        after_ms: u32,
    },
    Command(u8),
    /// Data written with `data`
    Data(Vec<u8>),
    /// Data written with `data_x_times`
    Repeat { value: u8, count: u32 },
    /// All bytes sent between `start_data_transfer` and `end_data_transfer`
    Stream(Vec<u8>),
    Wait {
        busy_level: BusyLevel,
        timeout_ms: u32,
    },
}

/// Panel interface that records instead of driving pins
#[derive(Debug, Default)]
pub struct SimInterface {
    events: Vec<Event>,
    stream: Option<Vec<u8>>,
    wait_count: usize,
    timeouts: Vec<usize>,
    fail_commands: bool,
    fail_streams: bool,
}

impl SimInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the busy wait with this zero-based index time out
    pub fn time_out_wait(mut self, index: usize) -> Self {
        self.timeouts.push(index);
        self
    }

    /// Make every command write fail with a bus error
    pub fn fail_commands(mut self) -> Self {
        self.fail_commands = true;
        self
    }

    /// Make streamed writes fail on the bus and chip select stick on release
    pub fn fail_streams(mut self) -> Self {
        self.fail_streams = true;
        self
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Command bytes in the order they were sent
    pub fn commands(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Command(command) => Some(*command),
                _ => None,
            })
            .collect()
    }

    /// Total number of data bytes written after `command`, up to the next command
    pub fn payload_len(&self, command: u8) -> Option<usize> {
        self.payload(command).map(|payload| payload.len())
    }

    /// Data bytes written after the first occurrence of `command`
    pub fn payload(&self, command: u8) -> Option<Vec<u8>> {
        let start = self
            .events
            .iter()
            .position(|event| *event == Event::Command(command))?;
        let mut bytes = Vec::new();
        for event in &self.events[start + 1..] {
            match event {
                Event::Command(_) => break,
                Event::Data(data) | Event::Stream(data) => bytes.extend_from_slice(data),
                Event::Repeat { value, count } => {
                    bytes.extend(core::iter::repeat(*value).take(*count as usize))
                }
                _ => {}
            }
        }
        Some(bytes)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl PanelInterface for SimInterface {
    fn init(&mut self) -> Result<(), DisplayError> {
        self.events.push(Event::Init);
        Ok(())
    }

    fn reset(
        &mut self,
        before_reset_ms: u32,
        reset_duration_ms: u32,
        after_reset_ms: u32,
    ) -> Result<(), DisplayError> {
        self.events.push(Event::Reset {
            before_ms: before_reset_ms,
            duration_ms: reset_duration_ms,
            after_ms: after_reset_ms,
        });
        Ok(())
    }

    fn cmd(&mut self, command: u8) -> Result<(), DisplayError> {
        if self.fail_commands {
            return Err(DisplayError::BusWriteError);
        }
        self.events.push(Event::Command(command));
        Ok(())
    }

    fn data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        self.events.push(Event::Data(data.to_vec()));
        Ok(())
    }

    fn data_x_times(&mut self, val: u8, repetitions: u32) -> Result<(), DisplayError> {
        self.events.push(Event::Repeat {
            value: val,
            count: repetitions,
        });
        Ok(())
    }

    fn wait_until_idle(&mut self, busy_level: BusyLevel, timeout_ms: u32) -> bool {
        self.events.push(Event::Wait {
            busy_level,
            timeout_ms,
        });
        let index = self.wait_count;
        self.wait_count += 1;
        !self.timeouts.contains(&index)
    }

    fn start_data_transfer(&mut self) -> Result<(), DisplayError> {
        self.stream = Some(Vec::new());
        Ok(())
    }

    fn transfer_data(&mut self, data: &[u8]) -> Result<(), DisplayError> {
        if self.fail_streams {
            return Err(DisplayError::BusWriteError);
        }
        match self.stream.as_mut() {
            Some(stream) => {
                stream.extend_from_slice(data);
                Ok(())
            }
            None => Err(DisplayError::CSError),
        }
    }

    fn end_data_transfer(&mut self) -> Result<(), DisplayError> {
        let stream = self.stream.take().ok_or(DisplayError::CSError)?;
        if self.fail_streams {
            return Err(DisplayError::CSError);
        }
        self.events.push(Event::Stream(stream));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_collects_every_write_until_next_command() {
        let mut sim = SimInterface::new();
        sim.cmd(0x10).unwrap();
        sim.data(&[1, 2]).unwrap();
        sim.data_x_times(0xFF, 3).unwrap();
        sim.cmd(0x13).unwrap();
        sim.start_data_transfer().unwrap();
        sim.transfer_data(&[9]).unwrap();
        sim.end_data_transfer().unwrap();

        assert_eq!(sim.commands(), vec![0x10, 0x13]);
        assert_eq!(sim.payload(0x10), Some(vec![1, 2, 0xFF, 0xFF, 0xFF]));
        assert_eq!(sim.payload(0x13), Some(vec![9]));
        assert_eq!(sim.payload(0x12), None);
    }

    #[test]
    fn scripted_wait_times_out() {
        let mut sim = SimInterface::new().time_out_wait(1);
        assert!(sim.wait_until_idle(BusyLevel::Low, 10));
        assert!(!sim.wait_until_idle(BusyLevel::Low, 10));
        assert!(sim.wait_until_idle(BusyLevel::Low, 10));
    }

    #[test]
    fn transfer_outside_frame_is_rejected() {
        let mut sim = SimInterface::new();
        assert!(matches!(
            sim.transfer_data(&[1]),
            Err(DisplayError::CSError)
        ));
    }
}
