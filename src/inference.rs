// HAR Monitor — Inference Trigger & Decoder
//
// Hands a full window to the accelerator, waits for completion and decodes
// the packed output into five class scores. A label is only produced when
// one class strictly beats all others.

use std::time::Duration;

use crate::config::*;
use crate::drivers::accelerator::{Accelerator, AcceleratorError, OutputWords};
use crate::events::ActivityLabel;
use crate::window::Window;

/// (word, bit offset) of each class score's 4-bit field, in label order.
const SCORE_FIELDS: [(usize, u32); CLASS_COUNT] = [(0, 22), (0, 6), (1, 22), (1, 6), (2, 6)];

/// Sign-extend a 4-bit field from bit 3: OR in 0xFFF0 and read the result as
/// a 16-bit two's-complement value.
pub fn sign_extend_nibble(nibble: u32) -> i16 {
    let nibble = (nibble & 0xF) as u16;
    if nibble & 0x8 != 0 {
        (nibble | 0xFFF0) as i16
    } else {
        nibble as i16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassScores([i16; CLASS_COUNT]);

impl ClassScores {
    pub fn new(values: [i16; CLASS_COUNT]) -> Self {
        Self(values)
    }

    pub fn decode(words: &OutputWords) -> Self {
        let mut values = [0i16; CLASS_COUNT];
        for (value, &(word, shift)) in values.iter_mut().zip(SCORE_FIELDS.iter()) {
            *value = sign_extend_nibble(words[word] >> shift);
        }
        Self(values)
    }

    pub fn values(&self) -> &[i16; CLASS_COUNT] {
        &self.0
    }

    /// Index of the class whose score is strictly greater than every other.
    pub fn strict_winner(&self) -> Option<usize> {
        self.0.iter().enumerate().find_map(|(i, &score)| {
            let beats_all = self
                .0
                .iter()
                .enumerate()
                .all(|(j, &other)| j == i || score > other);
            beats_all.then_some(i)
        })
    }

    pub fn label(&self) -> Option<ActivityLabel> {
        self.strict_winner().and_then(ActivityLabel::from_index)
    }
}

/// Outcome of one accelerator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inference {
    pub scores: ClassScores,
    pub label: Option<ActivityLabel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceState {
    Idle,
    Triggered,
    Complete,
}

pub struct InferenceEngine<A> {
    accelerator: A,
    timeout: Duration,
    state: InferenceState,
}

impl<A: Accelerator> InferenceEngine<A> {
    pub fn new(accelerator: A) -> Self {
        Self::with_timeout(accelerator, Duration::from_millis(ACCEL_TIMEOUT_MS))
    }

    pub fn with_timeout(accelerator: A, timeout: Duration) -> Self {
        Self {
            accelerator,
            timeout,
            state: InferenceState::Idle,
        }
    }

    pub fn state(&self) -> InferenceState {
        self.state
    }

    pub fn accelerator(&self) -> &A {
        &self.accelerator
    }

    /// Load every window slot, start the accelerator and block until it
    /// completes. On timeout the run is stopped and the engine returns to
    /// idle.
    pub fn run(&mut self, window: &Window) -> Result<Inference, AcceleratorError> {
        for (slot, segment) in window.segments().iter().enumerate() {
            self.accelerator.load_input(slot, segment)?;
        }
        self.accelerator.start()?;
        self.state = InferenceState::Triggered;

        if let Err(e) = self.accelerator.wait_complete(self.timeout) {
            if let Err(stop_err) = self.accelerator.stop() {
                log::warn!("Accelerator stop failed: {}", stop_err);
            }
            self.state = InferenceState::Idle;
            return Err(e);
        }
        self.state = InferenceState::Complete;

        let words = self.accelerator.unload()?;
        let scores = ClassScores::decode(&words);
        Ok(Inference {
            scores,
            label: scores.label(),
        })
    }

    /// Back to idle once the window has hopped.
    pub fn rearm(&mut self) {
        self.state = InferenceState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::accelerator::{pack_scores, SimulatedAccelerator};

    #[test]
    fn nibble_sign_extension_table() {
        let expected: [i16; 16] = [0, 1, 2, 3, 4, 5, 6, 7, -8, -7, -6, -5, -4, -3, -2, -1];
        for (nibble, want) in expected.iter().enumerate() {
            assert_eq!(sign_extend_nibble(nibble as u32), *want, "nibble {nibble:#06b}");
        }
        assert_eq!(sign_extend_nibble(0b1001), -7);
        // Only the low nibble counts.
        assert_eq!(sign_extend_nibble(0xFFF3), 3);
    }

    #[test]
    fn decode_reads_each_field() {
        let words = [0b1001 << 22 | 0b0010 << 6, 0b0111 << 22 | 0b1000 << 6, 0b1111 << 6];
        let scores = ClassScores::decode(&words);
        assert_eq!(scores.values(), &[-7, 2, 7, -8, -1]);
    }

    #[test]
    fn decode_ignores_bits_outside_fields() {
        let noise = !(0xF << 22 | 0xF << 6);
        let words = [noise | 1 << 22, noise, noise | 2 << 6];
        assert_eq!(ClassScores::decode(&words).values(), &[1, 0, 0, 0, 2]);
    }

    #[test]
    fn strict_majority_picks_unique_maximum() {
        let scores = ClassScores::new([3, 1, 2, 0, -1]);
        assert_eq!(scores.strict_winner(), Some(0));
        assert_eq!(scores.label(), Some(ActivityLabel::GoingDownstairs));

        assert_eq!(ClassScores::new([-3, -2, -4, -8, -1]).label(), Some(ActivityLabel::Walking));
    }

    #[test]
    fn tie_yields_no_label() {
        assert_eq!(ClassScores::new([3, 3, 1, 0, -1]).strict_winner(), None);
        assert_eq!(ClassScores::new([0; CLASS_COUNT]).label(), None);
    }

    #[test]
    fn run_loads_every_slot_and_decodes() {
        let mut window = Window::new();
        let mut frame = [[0; AXIS_COUNT]; SENSOR_COUNT];
        frame[0][0] = 42;
        while !window.push(&frame) {}
        let accel = SimulatedAccelerator::new(pack_scores([1, 2, 5, -3, 0]), Duration::from_millis(1));
        let mut engine = InferenceEngine::with_timeout(accel, Duration::from_secs(5));

        let inference = engine.run(&window).unwrap();

        assert_eq!(inference.scores.values(), &[1, 2, 5, -3, 0]);
        assert_eq!(inference.label, Some(ActivityLabel::Standing));
        assert_eq!(engine.state(), InferenceState::Complete);
        assert_eq!(engine.accelerator().inputs(), window.segments());
        engine.rearm();
        assert_eq!(engine.state(), InferenceState::Idle);
    }

    #[test]
    fn stalled_run_times_out_and_returns_to_idle() {
        let mut engine =
            InferenceEngine::with_timeout(SimulatedAccelerator::stalled(), Duration::from_millis(10));

        let err = engine.run(&Window::new()).unwrap_err();

        assert_eq!(err, AcceleratorError::Timeout { waited_ms: 10 });
        assert_eq!(engine.state(), InferenceState::Idle);
    }
}
