pub mod accelerator;
pub mod imu;
