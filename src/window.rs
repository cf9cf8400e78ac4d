// HAR Monitor — Window Buffer Manager
//
// The accelerator reads its input from 8 fixed segments of 36 words. Each
// word packs up to four byte-sized timesteps of one sensor-axis cell,
// shifted in from the right: `cell = (cell << 8) | byte`.
//
// Within a window, slot 7 takes the first two frames, slots 6..1 take four
// frames each and slot 0 takes the last four, so slot 7 holds the oldest
// retained group and slot 0 the newest. After each inference the window hops
// by 8 frames: every slot takes the contents of the slot two below it, the
// oldest slot is narrowed to its low two bytes, and the frame count drops by
// 8 so the next window fills only slots 1 and 0.

use crate::config::*;
use crate::encoder::{DeltaEncoder, EncodedFrame};

pub type Segment = [u32; SEGMENT_WORDS];

/// Clip an encoded value to <= 127 and reinterpret it as a byte. Negative
/// deltas keep their two's-complement bit pattern (-128 packs as 0x80).
pub fn pack_cell(value: i32) -> u8 {
    value.min(PACK_CLIP) as u8
}

/// Shift one byte into a packed cell.
pub fn shift_in(cell: u32, byte: u8) -> u32 {
    (cell << 8) | u32::from(byte)
}

/// Slot that receives the frame packed at `frame_count`.
pub fn slot_for_count(frame_count: u32) -> usize {
    let last = SEGMENT_COUNT - 1;
    let first_group = WINDOW_FRAMES - last as u32 * FRAMES_PER_SEGMENT;
    if frame_count < first_group {
        return last;
    }
    let steps = ((frame_count - first_group) / FRAMES_PER_SEGMENT) as usize + 1;
    last.saturating_sub(steps)
}

#[derive(Debug, Clone)]
pub struct Window {
    segments: [Segment; SEGMENT_COUNT],
    frame_count: u32,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            segments: [[0; SEGMENT_WORDS]; SEGMENT_COUNT],
            frame_count: 0,
        }
    }
}

impl Window {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    pub fn segments(&self) -> &[Segment; SEGMENT_COUNT] {
        &self.segments
    }

    pub fn segment(&self, slot: usize) -> Option<&Segment> {
        self.segments.get(slot)
    }

    /// Pack one encoded frame into the slot for the current count and advance
    /// the count. Returns `true` when the window has just reached
    /// `WINDOW_FRAMES` and must be handed to the accelerator.
    pub fn push(&mut self, frame: &EncodedFrame) -> bool {
        let slot = slot_for_count(self.frame_count);
        log::debug!("frame {} -> slot {}", self.frame_count, slot);

        let segment = &mut self.segments[slot];
        for (cell, value) in segment.iter_mut().zip(frame.iter().flatten()) {
            *cell = shift_in(*cell, pack_cell(*value));
        }

        self.frame_count += 1;
        self.frame_count == WINDOW_FRAMES
    }

    /// Hop the window after an inference.
    pub fn slide(&mut self) {
        self.frame_count = self.frame_count.saturating_sub(WINDOW_HOP);

        let shift = (WINDOW_HOP / FRAMES_PER_SEGMENT) as usize;
        for slot in (shift..SEGMENT_COUNT).rev() {
            self.segments[slot] = self.segments[slot - shift];
        }
        for cell in self.segments[SEGMENT_COUNT - 1].iter_mut() {
            *cell &= RETAINED_MASK;
        }
    }
}

/// Everything the control loop mutates between ticks: the previous raw
/// values, the frame being assembled and the packed window.
#[derive(Debug, Clone)]
pub struct SensorWindowState {
    pub encoder: DeltaEncoder,
    pub frame: EncodedFrame,
    pub window: Window,
}

impl SensorWindowState {
    pub fn new() -> Self {
        Self {
            encoder: DeltaEncoder::new(),
            frame: [[0; AXIS_COUNT]; SENSOR_COUNT],
            window: Window::new(),
        }
    }

    /// Pack the frame assembled this tick.
    pub fn commit_frame(&mut self) -> bool {
        self.window.push(&self.frame)
    }
}

impl Default for SensorWindowState {
    fn default() -> Self {
        Self::new()
    }
}
