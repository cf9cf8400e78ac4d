// HAR Monitor — Firmware Entry Point
//
// Boot sequence:
//   1. Bring up the report UART and send the greeting frame.
//   2. Release all sensor select lines, bring up the shared I2C bus.
//   3. Configure the accelerator and load the network.
//   4. Initialise each IMU in turn, acknowledging it over the UART.
//   5. Enter the sampling loop (never returns).
//
// Bring-up failures are fatal: the firmware logs the error and halts until
// an external reset.

#[cfg(target_os = "espidf")]
mod board;

#[cfg(target_os = "espidf")]
fn main() {
    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    log::info!("HAR monitor firmware starting…");

    let mut monitor = match board::bring_up() {
        Ok(monitor) => monitor,
        Err(e) => {
            log::error!("Bring-up failed: {:#}", e);
            board::halt();
        }
    };

    monitor.init_sensors();
    monitor.run()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    println!("har-monitor only runs on ESP-IDF targets; run `cargo test` for the host-side pipeline");
}
