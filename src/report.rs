// HAR Monitor — Serial Report Frames
//
// Every report goes out as one fixed 64-byte ASCII frame, NUL padded.
//
//   greeting / ack   "Hello from activity monitor\r\n", "Completed initializing RL\r\n"
//   tick             36 × '0'/'1' (previous raw value non-zero per sensor-axis),
//                    bus debug byte, 5 × NUL, 19 × '2', "\r\n", NUL
//   scores           "s1, s2, s3, s4, s5\r\n"
//   label            "You are probably walking\r\n" (only on strict majority)

use crate::config::*;
use crate::drivers::imu::BusFault;
use crate::encoder::PreviousState;
use crate::events::{ActivityLabel, SensorPosition};
use crate::inference::ClassScores;

pub type Frame = [u8; REPORT_FRAME_LEN];

const DEBUG_BYTE: usize = SEGMENT_WORDS;
const FILL_START: usize = 42;
const FILL_BYTE: u8 = b'2';

/// Destination of report frames (the UART on the board).
pub trait FrameSink {
    fn send(&mut self, frame: &Frame) -> anyhow::Result<()>;
}

/// Copy `text` into a NUL-padded frame, truncating to the frame length.
pub fn text_frame(text: &str) -> Frame {
    let mut frame = [0u8; REPORT_FRAME_LEN];
    let bytes = text.as_bytes();
    let len = bytes.len().min(REPORT_FRAME_LEN);
    frame[..len].copy_from_slice(&bytes[..len]);
    frame
}

pub fn greeting_frame() -> Frame {
    text_frame("Hello from activity monitor\r\n")
}

pub fn ack_frame(position: SensorPosition) -> Frame {
    text_frame(&format!("Completed initializing {}\r\n", position.tag()))
}

pub fn tick_frame(previous: &PreviousState, fault: Option<&BusFault>) -> Frame {
    let mut frame = [0u8; REPORT_FRAME_LEN];
    for (slot, value) in frame.iter_mut().zip(previous.iter()) {
        *slot = if value != 0 { b'1' } else { b'0' };
    }
    frame[DEBUG_BYTE] = fault.map_or(0, BusFault::debug_byte);
    frame[FILL_START..REPORT_FRAME_LEN - 3].fill(FILL_BYTE);
    frame[REPORT_FRAME_LEN - 3] = b'\r';
    frame[REPORT_FRAME_LEN - 2] = b'\n';
    frame
}

pub fn score_frame(scores: &ClassScores) -> Frame {
    let text = scores
        .values()
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    text_frame(&format!("{}\r\n", text))
}

pub fn label_frame(label: ActivityLabel) -> Frame {
    text_frame(&format!("You are probably {}\r\n", label.display_name()))
}

/// Sends frames, logging and dropping any that fail to go out.
pub struct Reporter<S> {
    sink: S,
}

impl<S: FrameSink> Reporter<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn send(&mut self, frame: &Frame) {
        if let Err(e) = self.sink.send(frame) {
            log::warn!("Report write failed: {:#}", e);
        }
    }

    pub fn greeting(&mut self) {
        self.send(&greeting_frame());
    }

    pub fn sensor_ready(&mut self, position: SensorPosition) {
        self.send(&ack_frame(position));
    }

    pub fn tick(&mut self, previous: &PreviousState, fault: Option<&BusFault>) {
        self.send(&tick_frame(previous, fault));
    }

    pub fn scores(&mut self, scores: &ClassScores) {
        self.send(&score_frame(scores));
    }

    pub fn label(&mut self, label: ActivityLabel) {
        self.send(&label_frame(label));
    }
}
