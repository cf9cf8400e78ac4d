// HAR Monitor — Differential Encoder
//
// Turns consecutive raw samples into a coarse magnitude-of-change signal:
// `|previous - current| / 128 - 128` per axis. Sign and absolute offset are
// discarded. Values are left unclipped here; the window clips them when
// packing.

use crate::config::*;
use crate::events::{RawSample, SensorPosition};

/// One encoded timestep: row = sensor, column = axis.
pub type EncodedFrame = [[i32; AXIS_COUNT]; SENSOR_COUNT];

/// Encode one axis against its previous raw value (truncating division).
pub fn encode_delta(previous: i32, current: i32) -> i32 {
    (previous - current).abs() / DELTA_SCALE - DELTA_OFFSET
}

/// Last raw value per sensor-axis pair. Zero at boot.
#[derive(Debug, Clone, Default)]
pub struct PreviousState {
    values: [[i32; AXIS_COUNT]; SENSOR_COUNT],
}

impl PreviousState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sensor(&self, position: SensorPosition) -> &[i32; AXIS_COUNT] {
        &self.values[position.index()]
    }

    /// All 36 slots in sensor-major order.
    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.values.iter().flatten().copied()
    }
}

/// Encodes a sensor's new sample into its frame row and replaces the stored
/// previous values with it, whatever the sample contains.
#[derive(Debug, Clone, Default)]
pub struct DeltaEncoder {
    previous: PreviousState,
}

impl DeltaEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> &PreviousState {
        &self.previous
    }

    pub fn encode(
        &mut self,
        position: SensorPosition,
        sample: &RawSample,
        frame: &mut EncodedFrame,
    ) {
        let prev = &mut self.previous.values[position.index()];
        let row = &mut frame[position.index()];
        for (axis, current) in sample.axes().into_iter().enumerate() {
            row[axis] = encode_delta(prev[axis], current);
            prev[axis] = current;
        }
    }
}
