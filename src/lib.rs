// HAR Monitor — Human Activity Recognition Pipeline
//
// Six body-worn IMUs are polled in round-robin, differentially encoded,
// packed into a 30-frame sliding window and classified by a neural-network
// accelerator. Results go out as fixed-width frames over a serial link.
//
// Data flow (one tick per round-robin pass):
//   drivers::imu -> encoder -> window -> (every 30 ticks) inference -> report
//
// The pipeline only depends on `embedded-hal` traits, so it runs against the
// board peripherals on device and against fakes in host tests.

pub mod config;
pub mod drivers;
pub mod encoder;
pub mod events;
pub mod inference;
pub mod report;
pub mod tasks;
pub mod window;

#[cfg(test)]
mod testing;
