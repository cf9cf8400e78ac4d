// HAR Monitor — Sensor & Classification Data Types

use crate::config::*;

// ---------------------------------------------------------------------------
// Sensor placement
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorPosition {
    RightLeg,
    LeftLeg,
    Waist,
    RightArm,
    LeftArm,
    Head,
}

impl SensorPosition {
    /// Round-robin polling order; the index is also the sensor's row in an
    /// encoded frame.
    pub const ALL: [SensorPosition; SENSOR_COUNT] = [
        Self::RightLeg,
        Self::LeftLeg,
        Self::Waist,
        Self::RightArm,
        Self::LeftArm,
        Self::Head,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Short tag used in the boot acknowledgement frames.
    pub fn tag(self) -> &'static str {
        match self {
            Self::RightLeg => "RL",
            Self::LeftLeg  => "LL",
            Self::Waist    => "W",
            Self::RightArm => "RA",
            Self::LeftArm  => "LA",
            Self::Head     => "H",
        }
    }
}

// ---------------------------------------------------------------------------
// Raw sample (6-axis IMU reading, unscaled)
// ---------------------------------------------------------------------------
/// Each axis is `(high << 8) | low` as read from the two output registers,
/// so it holds 0..=65535 rather than a sign-extended `i16`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    pub ax: i32,
    pub ay: i32,
    pub az: i32,
    pub gx: i32,
    pub gy: i32,
    pub gz: i32,
}

impl RawSample {
    pub fn axes(&self) -> [i32; AXIS_COUNT] {
        [self.ax, self.ay, self.az, self.gx, self.gy, self.gz]
    }

    pub fn from_axes(axes: [i32; AXIS_COUNT]) -> Self {
        let [ax, ay, az, gx, gy, gz] = axes;
        Self { ax, ay, az, gx, gy, gz }
    }
}

// ---------------------------------------------------------------------------
// Activity Classification
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityLabel {
    GoingDownstairs,
    Sitting,
    Standing,
    GoingUpstairs,
    Walking,
}

impl ActivityLabel {
    /// Model output order.
    pub const ALL: [ActivityLabel; CLASS_COUNT] = [
        Self::GoingDownstairs,
        Self::Sitting,
        Self::Standing,
        Self::GoingUpstairs,
        Self::Walking,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::GoingDownstairs => "going downstairs",
            Self::Sitting         => "sitting",
            Self::Standing        => "standing",
            Self::GoingUpstairs   => "going upstairs",
            Self::Walking         => "walking",
        }
    }
}
