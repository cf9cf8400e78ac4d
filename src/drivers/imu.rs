// HAR Monitor — MPU-6050 Array Driver
//
// Six MPU-6050s share one I2C bus and one address. Each sensor's AD0 pin is
// wired to a select line: raising it moves that sensor to 0x69, so exactly
// one device answers while its line is high.
//
// Sampling is best effort. A failed register read yields 0 for that byte,
// the fault is handed back with the sample, and the sequence carries on.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

use crate::config::*;
use crate::events::{RawSample, SensorPosition};

/// High-byte register of each axis, in `RawSample` order. The low byte
/// follows at `reg + 1`.
const AXIS_REGISTERS: [u8; AXIS_COUNT] = [
    REG_ACCEL_XOUT_H,
    REG_ACCEL_XOUT_H + 2,
    REG_ACCEL_XOUT_H + 4,
    REG_GYRO_XOUT_H,
    REG_GYRO_XOUT_H + 2,
    REG_GYRO_XOUT_H + 4,
];

/// One physical sensor: where it sits and the line that selects it.
pub struct SensorChannel<P> {
    pub position: SensorPosition,
    pub select: P,
}

impl<P: OutputPin> SensorChannel<P> {
    pub fn new(position: SensorPosition, select: P) -> Self {
        Self { position, select }
    }

    /// Drive the select line high so this sensor answers at the shared
    /// address.
    pub fn select(&mut self) -> Result<(), P::Error> {
        self.select.set_high()
    }

    pub fn release(&mut self) -> Result<(), P::Error> {
        self.select.set_low()
    }

    fn assert_select(&mut self) {
        if let Err(e) = self.select() {
            log::warn!("{:?} select line stuck low: {:?}", self.position, e);
        }
    }

    fn release_select(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("{:?} select line stuck high: {:?}", self.position, e);
        }
    }
}

/// A failed bus transaction, recorded but never escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault {
    pub position: SensorPosition,
    pub register: u8,
    pub kind: ErrorKind,
}

impl BusFault {
    pub fn code(&self) -> u8 {
        match self.kind {
            ErrorKind::Bus => 1,
            ErrorKind::ArbitrationLoss => 2,
            ErrorKind::NoAcknowledge(_) => 3,
            ErrorKind::Overrun => 4,
            _ => 5,
        }
    }

    /// ASCII digit carried in the tick frame's debug byte.
    pub fn debug_byte(&self) -> u8 {
        b'0' + self.code()
    }
}

impl core::fmt::Display for BusFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?} reg 0x{:02X}: {:?}", self.position, self.register, self.kind)
    }
}

/// Result of one sampling sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub sample: RawSample,
    /// Last fault seen during the sequence, if any.
    pub fault: Option<BusFault>,
}

pub struct ImuArray<I2C, D> {
    bus: I2C,
    delay: D,
}

impl<I2C: I2c, D: DelayNs> ImuArray<I2C, D> {
    pub fn new(bus: I2C, delay: D) -> Self {
        Self { bus, delay }
    }

    /// Configure one sensor: PLL clock source, ±2 g / ±250 °/s, awake.
    pub fn init<P: OutputPin>(&mut self, channel: &mut SensorChannel<P>) -> Result<(), BusFault> {
        channel.assert_select();
        self.delay.delay_ms(SENSOR_SETTLE_MS);

        let result = self.configure(channel.position);

        self.delay.delay_ms(SENSOR_SETTLE_MS);
        channel.release_select();

        match result {
            Ok(()) => log::info!("{:?} IMU initialised (±2g, ±250°/s)", channel.position),
            Err(fault) => log::warn!("{:?} IMU init failed: {}", channel.position, fault),
        }
        result
    }

    fn configure(&mut self, position: SensorPosition) -> Result<(), BusFault> {
        let pwr = self.read_register(position, REG_PWR_MGMT_1)?;
        self.write_register(position, REG_PWR_MGMT_1, (pwr & PWR_MGMT_CLKSEL_MASK) | CLKSEL_PLL_X_GYRO)?;

        let gyro = self.read_register(position, REG_GYRO_CONFIG)?;
        self.write_register(position, REG_GYRO_CONFIG, gyro & FULL_SCALE_CLEAR)?;

        let accel = self.read_register(position, REG_ACCEL_CONFIG)?;
        self.write_register(position, REG_ACCEL_CONFIG, accel & FULL_SCALE_CLEAR)?;

        let pwr = self.read_register(position, REG_PWR_MGMT_1)?;
        self.write_register(position, REG_PWR_MGMT_1, pwr & PWR_MGMT_SLEEP_CLEAR)
    }

    /// Read all six axes of one sensor, one register per transaction.
    pub fn read_sample<P: OutputPin>(&mut self, channel: &mut SensorChannel<P>) -> Reading {
        let position = channel.position;
        let mut axes = [0i32; AXIS_COUNT];
        let mut fault = None;

        channel.assert_select();
        for (axis, &reg) in axes.iter_mut().zip(AXIS_REGISTERS.iter()) {
            let high = self.read_byte_best_effort(position, reg, &mut fault);
            let low = self.read_byte_best_effort(position, reg + 1, &mut fault);
            *axis = (i32::from(high) << 8) | i32::from(low);
        }
        self.delay.delay_ms(BUS_TRANSACTION_DELAY_MS);
        channel.release_select();
        self.delay.delay_ms(BUS_TRANSACTION_DELAY_MS);

        Reading {
            sample: RawSample::from_axes(axes),
            fault,
        }
    }

    fn read_byte_best_effort(
        &mut self,
        position: SensorPosition,
        reg: u8,
        fault: &mut Option<BusFault>,
    ) -> u8 {
        match self.read_register(position, reg) {
            Ok(byte) => byte,
            Err(e) => {
                log::warn!("IMU read error: {}", e);
                *fault = Some(e);
                0
            }
        }
    }

    fn read_register(&mut self, position: SensorPosition, reg: u8) -> Result<u8, BusFault> {
        self.delay.delay_ms(BUS_TRANSACTION_DELAY_MS);
        let mut buf = [0u8; 1];
        self.bus
            .write_read(I2C_ADDR_SELECTED_IMU, &[reg], &mut buf)
            .map_err(|e| BusFault { position, register: reg, kind: e.kind() })?;
        Ok(buf[0])
    }

    fn write_register(&mut self, position: SensorPosition, reg: u8, value: u8) -> Result<(), BusFault> {
        self.delay.delay_ms(BUS_TRANSACTION_DELAY_MS);
        self.bus
            .write(I2C_ADDR_SELECTED_IMU, &[reg, value])
            .map_err(|e| BusFault { position, register: reg, kind: e.kind() })
    }
}
