// Test doubles for the bus, select lines, delay and report link.

use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{self, ErrorKind, NoAcknowledgeSource, Operation};

use crate::config::*;
use crate::events::SensorPosition;
use crate::report::{Frame, FrameSink};

struct BusState {
    registers: [[u8; 128]; SENSOR_COUNT],
    selected: [bool; SENSOR_COUNT],
    faults: HashMap<u8, ErrorKind>,
    reads: Vec<u8>,
}

impl Default for BusState {
    fn default() -> Self {
        Self {
            registers: [[0; 128]; SENSOR_COUNT],
            selected: [false; SENSOR_COUNT],
            faults: HashMap::new(),
            reads: Vec::new(),
        }
    }
}

impl BusState {
    fn responder(&self) -> Option<usize> {
        let mut high = self.selected.iter().enumerate().filter(|(_, s)| **s);
        match (high.next(), high.next()) {
            (Some((i, _)), None) => Some(i),
            _ => None,
        }
    }
}

/// Register-map model of six MPU-6050s behind address-select lines.
#[derive(Clone, Default)]
pub struct FakeImuBus {
    state: Rc<RefCell<BusState>>,
}

impl FakeImuBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select_pin(&self, position: SensorPosition) -> RecordingPin {
        RecordingPin {
            position,
            state: Rc::clone(&self.state),
            levels: Rc::default(),
        }
    }

    pub fn set_register(&self, position: SensorPosition, reg: u8, value: u8) {
        self.state.borrow_mut().registers[position.index()][reg as usize] = value;
    }

    pub fn register(&self, position: SensorPosition, reg: u8) -> u8 {
        self.state.borrow().registers[position.index()][reg as usize]
    }

    /// Load the output registers so the next read returns `axes`.
    pub fn set_axes(&self, position: SensorPosition, axes: [u16; AXIS_COUNT]) {
        for (i, value) in axes.into_iter().enumerate() {
            let base = if i < 3 { REG_ACCEL_XOUT_H } else { REG_GYRO_XOUT_H };
            let reg = base + 2 * (i as u8 % 3);
            let [high, low] = value.to_be_bytes();
            self.set_register(position, reg, high);
            self.set_register(position, reg + 1, low);
        }
    }

    pub fn fail_register(&self, reg: u8, kind: ErrorKind) {
        self.state.borrow_mut().faults.insert(reg, kind);
    }

    pub fn clear_faults(&self) {
        self.state.borrow_mut().faults.clear();
    }

    /// Registers read so far, including failed reads.
    pub fn reads(&self) -> Vec<u8> {
        self.state.borrow().reads.clone()
    }
}

impl i2c::ErrorType for FakeImuBus {
    type Error = ErrorKind;
}

impl i2c::I2c for FakeImuBus {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        let sensor = match state.responder() {
            Some(sensor) if address == I2C_ADDR_SELECTED_IMU => sensor,
            _ => return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
        };

        let mut pointer = 0u8;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    let Some((&reg, data)) = bytes.split_first() else {
                        continue;
                    };
                    pointer = reg;
                    if let Some(&value) = data.first() {
                        if let Some(&kind) = state.faults.get(&reg) {
                            return Err(kind);
                        }
                        state.registers[sensor][reg as usize] = value;
                    }
                }
                Operation::Read(buf) => {
                    state.reads.push(pointer);
                    if let Some(&kind) = state.faults.get(&pointer) {
                        return Err(kind);
                    }
                    for (i, byte) in buf.iter_mut().enumerate() {
                        *byte = state.registers[sensor][pointer as usize + i];
                    }
                }
            }
        }
        Ok(())
    }
}

/// Select line that records every level it is driven to and updates the
/// bus's view of which sensor answers.
pub struct RecordingPin {
    position: SensorPosition,
    state: Rc<RefCell<BusState>>,
    levels: Rc<RefCell<Vec<bool>>>,
}

impl RecordingPin {
    pub fn levels(&self) -> Vec<bool> {
        self.levels.borrow().clone()
    }

    fn drive(&mut self, high: bool) {
        self.state.borrow_mut().selected[self.position.index()] = high;
        self.levels.borrow_mut().push(high);
    }
}

impl digital::ErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

/// Select line whose driver always fails.
pub struct BrokenPin;

impl digital::ErrorType for BrokenPin {
    type Error = digital::ErrorKind;
}

impl OutputPin for BrokenPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(digital::ErrorKind::Other)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(digital::ErrorKind::Other)
    }
}

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

/// Collects every frame sent over the report link.
#[derive(Clone, Default)]
pub struct VecSink {
    frames: Rc<RefCell<Vec<Frame>>>,
}

impl VecSink {
    pub fn frames(&self) -> Vec<Frame> {
        self.frames.borrow().clone()
    }

    /// Frame contents up to the first NUL.
    pub fn texts(&self) -> Vec<String> {
        self.frames()
            .iter()
            .map(|f| {
                let end = f.iter().position(|&b| b == 0).unwrap_or(f.len());
                String::from_utf8_lossy(&f[..end]).into_owned()
            })
            .collect()
    }
}

impl FrameSink for VecSink {
    fn send(&mut self, frame: &Frame) -> anyhow::Result<()> {
        self.frames.borrow_mut().push(*frame);
        Ok(())
    }
}
