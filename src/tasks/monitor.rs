// HAR Monitor — Control Loop
//
// One tick samples all six sensors in round-robin, encodes them into one
// frame, reports the tick and packs the frame into the window. Every time the
// window fills, the tick also runs the accelerator, reports scores and label,
// and hops the window.
//
// Everything runs on the calling thread. The only suspension point is the
// accelerator wait.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;

use crate::config::*;
use crate::drivers::accelerator::{Accelerator, AcceleratorError};
use crate::drivers::imu::{ImuArray, SensorChannel};
use crate::inference::{Inference, InferenceEngine};
use crate::report::{FrameSink, Reporter};
use crate::window::SensorWindowState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Frame packed, window not yet full.
    Sampled,
    /// Window was full and the accelerator produced a result.
    Inferred(Inference),
    /// Window was full but the accelerator never completed.
    Stalled(AcceleratorError),
}

pub struct ActivityMonitor<I2C, D, P, A, S> {
    imu: ImuArray<I2C, D>,
    channels: [SensorChannel<P>; SENSOR_COUNT],
    state: SensorWindowState,
    engine: InferenceEngine<A>,
    reporter: Reporter<S>,
}

impl<I2C, D, P, A, S> ActivityMonitor<I2C, D, P, A, S>
where
    I2C: I2c,
    D: DelayNs,
    P: OutputPin,
    A: Accelerator,
    S: FrameSink,
{
    pub fn new(
        imu: ImuArray<I2C, D>,
        channels: [SensorChannel<P>; SENSOR_COUNT],
        engine: InferenceEngine<A>,
        reporter: Reporter<S>,
    ) -> Self {
        Self {
            imu,
            channels,
            state: SensorWindowState::new(),
            engine,
            reporter,
        }
    }

    pub fn state(&self) -> &SensorWindowState {
        &self.state
    }

    pub fn engine(&self) -> &InferenceEngine<A> {
        &self.engine
    }

    pub fn reporter(&self) -> &Reporter<S> {
        &self.reporter
    }

    /// Configure each sensor in polling order and acknowledge it over the
    /// report link. Returns how many came up; a sensor that fails is still
    /// sampled.
    pub fn init_sensors(&mut self) -> usize {
        let mut ready = 0;
        for channel in self.channels.iter_mut() {
            if self.imu.init(channel).is_ok() {
                ready += 1;
            }
            self.reporter.sensor_ready(channel.position);
        }
        log::info!("{}/{} IMUs initialised", ready, SENSOR_COUNT);
        ready
    }

    pub fn tick(&mut self) -> TickOutcome {
        let mut last_fault = None;
        for channel in self.channels.iter_mut() {
            let reading = self.imu.read_sample(channel);
            if reading.fault.is_some() {
                last_fault = reading.fault;
            }
            self.state
                .encoder
                .encode(channel.position, &reading.sample, &mut self.state.frame);
        }

        self.reporter.tick(self.state.encoder.previous(), last_fault.as_ref());
        log::debug!("frame[0][0] = {}", self.state.frame[0][0]);

        if !self.state.commit_frame() {
            return TickOutcome::Sampled;
        }

        let outcome = match self.engine.run(&self.state.window) {
            Ok(inference) => {
                log::info!(
                    "Scores {:?} -> {}",
                    inference.scores.values(),
                    inference.label.map_or("no majority", |l| l.display_name())
                );
                self.reporter.scores(&inference.scores);
                if let Some(label) = inference.label {
                    self.reporter.label(label);
                }
                TickOutcome::Inferred(inference)
            }
            Err(e) => {
                log::error!("Inference skipped: {}", e);
                TickOutcome::Stalled(e)
            }
        };

        self.state.window.slide();
        self.engine.rearm();
        outcome
    }

    pub fn run(&mut self) -> ! {
        log::info!("Monitor loop started");
        loop {
            self.tick();
        }
    }
}
