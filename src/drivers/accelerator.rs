// HAR Monitor — Neural-Network Accelerator Interface
//
// The accelerator takes its input from 8 fixed memory regions of 36 words,
// runs once per start signal, and signals completion asynchronously. The
// result is 3 packed words.
//
// Backends:
//   1. SIMULATED (default) — returns a fixed output after a configurable
//      latency, completing from a separate thread the way the hardware
//      completes from its interrupt. Lets the whole pipeline run without the
//      vendor driver.
//   2. FFI — enable the `cnn-accelerator` feature; build.rs compiles the
//      generated driver in `cnn/` and `CnnAccelerator` calls into it.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::config::*;
use crate::window::Segment;

pub type OutputWords = [u32; ACCEL_OUTPUT_WORDS];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AcceleratorError {
    #[error("accelerator did not complete within {waited_ms} ms")]
    Timeout { waited_ms: u64 },

    #[error("accelerator {op} failed (code {code})")]
    Driver { op: &'static str, code: i32 },

    #[error("no accelerator input slot {0}")]
    InvalidSlot(usize),
}

/// What the inference engine needs from the accelerator. Configuration and
/// weight loading happen once, when the backend is constructed.
pub trait Accelerator {
    fn load_input(&mut self, slot: usize, data: &Segment) -> Result<(), AcceleratorError>;

    fn start(&mut self) -> Result<(), AcceleratorError>;

    /// Block until the completion signal arrives or `timeout` elapses.
    fn wait_complete(&mut self, timeout: Duration) -> Result<(), AcceleratorError>;

    /// Abandon a run that never completed.
    fn stop(&mut self) -> Result<(), AcceleratorError>;

    fn unload(&mut self) -> Result<OutputWords, AcceleratorError>;
}

// ---------------------------------------------------------------------------
// Completion signal
// ---------------------------------------------------------------------------

/// One-shot completion flag set from the hardware side and waited on by the
/// control loop.
#[derive(Debug, Default)]
pub struct Completion {
    done: Mutex<bool>,
    cond: Condvar,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        let mut done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        *done = true;
        self.cond.notify_all();
    }

    pub fn reset(&self) {
        *self.done.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    pub fn is_set(&self) -> bool {
        *self.done.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns `true` if the flag was set before `timeout` ran out.
    pub fn wait(&self, timeout: Duration) -> bool {
        let done = self.done.lock().unwrap_or_else(PoisonError::into_inner);
        let (done, _) = self
            .cond
            .wait_timeout_while(done, timeout, |done| !*done)
            .unwrap_or_else(PoisonError::into_inner);
        *done
    }
}

// ---------------------------------------------------------------------------
// Simulated back-end — development / testing without the vendor driver
// ---------------------------------------------------------------------------

/// Pack five 4-bit class scores into the accelerator's output layout.
pub fn pack_scores(scores: [i8; CLASS_COUNT]) -> OutputWords {
    let nibble = |s: i8| u32::from(s as u8 & 0xF);
    [
        nibble(scores[0]) << 22 | nibble(scores[1]) << 6,
        nibble(scores[2]) << 22 | nibble(scores[3]) << 6,
        nibble(scores[4]) << 6,
    ]
}

pub struct SimulatedAccelerator {
    inputs: [Segment; SEGMENT_COUNT],
    output: OutputWords,
    /// `None` models a stalled accelerator.
    latency: Option<Duration>,
    completion: Arc<Completion>,
    runs: u32,
}

impl SimulatedAccelerator {
    pub fn new(output: OutputWords, latency: Duration) -> Self {
        Self {
            inputs: [[0; SEGMENT_WORDS]; SEGMENT_COUNT],
            output,
            latency: Some(latency),
            completion: Arc::new(Completion::new()),
            runs: 0,
        }
    }

    /// An accelerator that accepts a start but never completes.
    pub fn stalled() -> Self {
        Self {
            latency: None,
            ..Self::new([0; ACCEL_OUTPUT_WORDS], Duration::ZERO)
        }
    }

    pub fn set_output(&mut self, output: OutputWords) {
        self.output = output;
    }

    /// Input memory as last loaded.
    pub fn inputs(&self) -> &[Segment; SEGMENT_COUNT] {
        &self.inputs
    }

    /// Number of completed runs.
    pub fn runs(&self) -> u32 {
        self.runs
    }
}

impl Default for SimulatedAccelerator {
    fn default() -> Self {
        // Sitting wins with a score of 3.
        Self::new(pack_scores([0, 3, 1, -2, -1]), Duration::from_millis(2))
    }
}

impl Accelerator for SimulatedAccelerator {
    fn load_input(&mut self, slot: usize, data: &Segment) -> Result<(), AcceleratorError> {
        let input = self.inputs.get_mut(slot).ok_or(AcceleratorError::InvalidSlot(slot))?;
        input.copy_from_slice(data);
        Ok(())
    }

    fn start(&mut self) -> Result<(), AcceleratorError> {
        // A fresh signal per run, so a thread left over from an abandoned
        // run cannot complete this one.
        self.completion = Arc::new(Completion::new());
        if let Some(latency) = self.latency {
            let completion = Arc::clone(&self.completion);
            thread::spawn(move || {
                thread::sleep(latency);
                completion.signal();
            });
        }
        Ok(())
    }

    fn wait_complete(&mut self, timeout: Duration) -> Result<(), AcceleratorError> {
        if self.completion.wait(timeout) {
            self.runs += 1;
            Ok(())
        } else {
            Err(AcceleratorError::Timeout { waited_ms: timeout.as_millis() as u64 })
        }
    }

    fn stop(&mut self) -> Result<(), AcceleratorError> {
        self.completion = Arc::new(Completion::new());
        Ok(())
    }

    fn unload(&mut self) -> Result<OutputWords, AcceleratorError> {
        Ok(self.output)
    }
}

// ---------------------------------------------------------------------------
// Real FFI back-end — calls the generated accelerator driver
// ---------------------------------------------------------------------------
#[cfg(feature = "cnn-accelerator")]
mod ffi {
    /// Stopwatch written by the driver's completion interrupt; non-zero
    /// once the run is done. The driver only declares it, so the
    /// application owns the definition.
    #[no_mangle]
    pub static mut cnn_time: u32 = 0;

    extern "C" {
        pub fn cnn_enable(clock_source: u32, clock_divider: u32) -> i32;
        pub fn cnn_init() -> i32;
        pub fn cnn_load_weights() -> i32;
        pub fn cnn_load_bias() -> i32;
        pub fn cnn_configure() -> i32;
        pub fn cnn_start() -> i32;
        pub fn cnn_stop() -> i32;
        pub fn cnn_unload(out_buf: *mut u32) -> i32;
    }

    pub const CNN_OK: i32 = 1;
}

#[cfg(feature = "cnn-accelerator")]
fn check(op: &'static str, code: i32) -> Result<(), AcceleratorError> {
    if code == ffi::CNN_OK {
        Ok(())
    } else {
        Err(AcceleratorError::Driver { op, code })
    }
}

#[cfg(feature = "cnn-accelerator")]
pub struct CnnAccelerator {
    _private: (),
}

#[cfg(feature = "cnn-accelerator")]
impl CnnAccelerator {
    /// Power the accelerator, load the network and leave it ready to start.
    /// Must only be called once.
    pub fn bring_up() -> Result<Self, AcceleratorError> {
        // SAFETY: single caller at boot; the driver owns the accelerator
        // registers from here on.
        unsafe {
            check("enable", ffi::cnn_enable(ACCEL_CLOCK_SOURCE, ACCEL_CLOCK_DIVIDER))?;
            check("init", ffi::cnn_init())?;
            check("load weights", ffi::cnn_load_weights())?;
            check("load bias", ffi::cnn_load_bias())?;
            check("configure", ffi::cnn_configure())?;
        }
        log::info!("Accelerator configured");
        Ok(Self { _private: () })
    }

    fn completed() -> bool {
        // SAFETY: aligned u32 written only by the completion ISR.
        unsafe { core::ptr::read_volatile(core::ptr::addr_of!(ffi::cnn_time)) != 0 }
    }

    fn clear_stopwatch() {
        // SAFETY: the ISR is idle until the next `cnn_start`.
        unsafe { core::ptr::write_volatile(core::ptr::addr_of_mut!(ffi::cnn_time), 0) }
    }
}

#[cfg(feature = "cnn-accelerator")]
impl Accelerator for CnnAccelerator {
    fn load_input(&mut self, slot: usize, data: &Segment) -> Result<(), AcceleratorError> {
        let base = *ACCEL_INPUT_ADDRS.get(slot).ok_or(AcceleratorError::InvalidSlot(slot))? as *mut u32;
        for (i, word) in data.iter().enumerate() {
            // SAFETY: each input region is a fixed, word-aligned accelerator
            // memory window of at least SEGMENT_WORDS words.
            unsafe { core::ptr::write_volatile(base.add(i), *word) };
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), AcceleratorError> {
        Self::clear_stopwatch();
        check("start", unsafe { ffi::cnn_start() })
    }

    fn wait_complete(&mut self, timeout: Duration) -> Result<(), AcceleratorError> {
        let deadline = std::time::Instant::now() + timeout;
        let poll = Duration::from_millis(ACCEL_POLL_INTERVAL_MS);
        while !Self::completed() {
            if std::time::Instant::now() >= deadline {
                return Err(AcceleratorError::Timeout { waited_ms: timeout.as_millis() as u64 });
            }
            // Sleeping lets the idle task drop the core into light sleep.
            thread::sleep(poll);
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AcceleratorError> {
        check("stop", unsafe { ffi::cnn_stop() })
    }

    fn unload(&mut self) -> Result<OutputWords, AcceleratorError> {
        let mut out = [0u32; ACCEL_OUTPUT_WORDS];
        check("unload", unsafe { ffi::cnn_unload(out.as_mut_ptr()) })?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_wakes_waiter_from_other_thread() {
        let completion = Arc::new(Completion::new());
        let signaller = Arc::clone(&completion);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            signaller.signal();
        });
        assert!(completion.wait(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn completion_times_out_when_never_signalled() {
        let completion = Completion::new();
        assert!(!completion.wait(Duration::from_millis(10)));
        completion.signal();
        assert!(completion.is_set());
        completion.reset();
        assert!(!completion.is_set());
    }

    #[test]
    fn pack_scores_places_nibbles() {
        let words = pack_scores([3, 1, 2, 0, -1]);
        assert_eq!(words, [3 << 22 | 1 << 6, 2 << 22, 0xF << 6]);
    }

    #[test]
    fn simulated_run_completes_and_returns_output() {
        let mut accel = SimulatedAccelerator::new([1, 2, 3], Duration::from_millis(1));
        let segment = [0xAB; SEGMENT_WORDS];
        accel.load_input(4, &segment).unwrap();
        accel.start().unwrap();
        accel.wait_complete(Duration::from_secs(5)).unwrap();

        assert_eq!(accel.unload().unwrap(), [1, 2, 3]);
        assert_eq!(accel.inputs()[4], segment);
        assert_eq!(accel.runs(), 1);
    }

    #[test]
    fn simulated_rejects_unknown_slot() {
        let mut accel = SimulatedAccelerator::default();
        assert_eq!(
            accel.load_input(8, &[0; SEGMENT_WORDS]),
            Err(AcceleratorError::InvalidSlot(8))
        );
    }

    #[test]
    fn abandoned_run_cannot_complete_the_next_one() {
        let mut accel = SimulatedAccelerator::new([0; ACCEL_OUTPUT_WORDS], Duration::from_millis(300));
        accel.start().unwrap();
        assert!(accel.wait_complete(Duration::from_millis(20)).is_err());
        accel.stop().unwrap();

        thread::sleep(Duration::from_millis(200));
        accel.start().unwrap();
        // The first run's thread fires inside this wait; the second run's
        // does not fire until ~300 ms after its own start.
        assert_eq!(
            accel.wait_complete(Duration::from_millis(150)),
            Err(AcceleratorError::Timeout { waited_ms: 150 })
        );
        accel.wait_complete(Duration::from_secs(5)).unwrap();
        assert_eq!(accel.runs(), 1);
    }

    #[test]
    fn stalled_accelerator_times_out() {
        let mut accel = SimulatedAccelerator::stalled();
        accel.start().unwrap();
        assert_eq!(
            accel.wait_complete(Duration::from_millis(10)),
            Err(AcceleratorError::Timeout { waited_ms: 10 })
        );
    }
}

#[cfg(all(test, feature = "cnn-accelerator"))]
mod cnn_tests {
    use super::*;

    #[test]
    fn stopwatch_is_defined_here_and_tracks_isr_writes() {
        CnnAccelerator::clear_stopwatch();
        assert!(!CnnAccelerator::completed());
        // SAFETY: test stands in for the completion ISR.
        unsafe { core::ptr::write_volatile(core::ptr::addr_of_mut!(ffi::cnn_time), 42) };
        assert!(CnnAccelerator::completed());
        CnnAccelerator::clear_stopwatch();
        assert!(!CnnAccelerator::completed());
    }
}
