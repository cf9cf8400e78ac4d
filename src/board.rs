// HAR Monitor — Board Bring-up (ESP-IDF)
//
// Takes the peripherals, brings up the report UART, the six select lines,
// the shared I2C bus and the accelerator, and wires them into the monitor.
// Any failure here is fatal: the caller halts and waits for an external
// reset.

use std::thread;
use std::time::Duration;

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Output, OutputPin, PinDriver};
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::uart::{config::Config as UartConfig, UartDriver};
use esp_idf_hal::units::Hertz;

use har_monitor::config::*;
use har_monitor::drivers::imu::{ImuArray, SensorChannel};
use har_monitor::events::SensorPosition;
use har_monitor::inference::InferenceEngine;
use har_monitor::report::{Frame, FrameSink, Reporter};
use har_monitor::tasks::monitor::ActivityMonitor;

#[cfg(feature = "cnn-accelerator")]
use har_monitor::drivers::accelerator::CnnAccelerator as BoardAccelerator;
#[cfg(not(feature = "cnn-accelerator"))]
use har_monitor::drivers::accelerator::SimulatedAccelerator as BoardAccelerator;

pub type SelectLine = PinDriver<'static, AnyOutputPin, Output>;

pub type BoardMonitor =
    ActivityMonitor<I2cDriver<'static>, FreeRtos, SelectLine, BoardAccelerator, UartSink>;

/// Report link to the BLE serial bridge.
pub struct UartSink {
    uart: UartDriver<'static>,
}

impl FrameSink for UartSink {
    fn send(&mut self, frame: &Frame) -> anyhow::Result<()> {
        let mut remaining = &frame[..];
        while !remaining.is_empty() {
            let written = self.uart.write(remaining)?;
            remaining = &remaining[written..];
        }
        Ok(())
    }
}

pub fn bring_up() -> anyhow::Result<BoardMonitor> {
    let peripherals = Peripherals::take()?;

    // ---- Report UART ------------------------------------------------------
    let uart_config = UartConfig::new().baudrate(Hertz(UART_BAUDRATE));
    let uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio21, // TX
        peripherals.pins.gpio20, // RX
        Option::<AnyIOPin>::None,
        Option::<AnyIOPin>::None,
        &uart_config,
    )?;
    let mut reporter = Reporter::new(UartSink { uart });

    // Let the BLE bridge power up before the first frame.
    FreeRtos::delay_ms(SERIAL_POWER_UP_MS);
    reporter.greeting();
    FreeRtos::delay_ms(SENSOR_POWER_UP_MS);

    // ---- Sensor select lines (all released) -------------------------------
    let pins = [
        peripherals.pins.gpio2.downgrade_output(),
        peripherals.pins.gpio3.downgrade_output(),
        peripherals.pins.gpio4.downgrade_output(),
        peripherals.pins.gpio5.downgrade_output(),
        peripherals.pins.gpio8.downgrade_output(),
        peripherals.pins.gpio9.downgrade_output(),
    ];
    let mut channels = Vec::with_capacity(SENSOR_COUNT);
    for (position, pin) in SensorPosition::ALL.into_iter().zip(pins) {
        let mut select = PinDriver::output(pin)?;
        select.set_low()?;
        channels.push(SensorChannel::new(position, select));
    }
    let channels: [SensorChannel<SelectLine>; SENSOR_COUNT] = channels
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected {} select lines", SENSOR_COUNT))?;

    // ---- I2C bus (shared by all six IMUs) ---------------------------------
    let i2c_config = I2cConfig::new().baudrate(Hertz(I2C_FREQ_HZ));
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio6, // SDA
        peripherals.pins.gpio7, // SCL
        &i2c_config,
    )?;
    log::info!("I2C bus up at {} Hz", I2C_FREQ_HZ);

    // ---- Accelerator ------------------------------------------------------
    let engine = InferenceEngine::new(accelerator()?);

    Ok(ActivityMonitor::new(
        ImuArray::new(i2c, FreeRtos),
        channels,
        engine,
        reporter,
    ))
}

#[cfg(feature = "cnn-accelerator")]
fn accelerator() -> anyhow::Result<BoardAccelerator> {
    Ok(BoardAccelerator::bring_up()?)
}

#[cfg(not(feature = "cnn-accelerator"))]
fn accelerator() -> anyhow::Result<BoardAccelerator> {
    log::warn!("Accelerator driver not linked, using simulated accelerator");
    Ok(BoardAccelerator::default())
}

/// Park forever after a fatal bring-up error.
pub fn halt() -> ! {
    loop {
        thread::sleep(Duration::from_secs(60));
    }
}
