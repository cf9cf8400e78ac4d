// HAR Monitor — Hardware & System Configuration
// Target: ESP32-C3 evaluation board, six MPU-6050 IMUs on one I2C bus

// ---------------------------------------------------------------------------
// GPIO Pin Definitions
// ---------------------------------------------------------------------------
// Sensor select lines drive each IMU's AD0 pin. Only the selected sensor
// answers at `I2C_ADDR_SELECTED_IMU`; the others stay at 0x68.
pub const PIN_SELECT_RIGHT_LEG: i32 = 2;
pub const PIN_SELECT_LEFT_LEG: i32 = 3;
pub const PIN_SELECT_WAIST: i32 = 4;
pub const PIN_SELECT_RIGHT_ARM: i32 = 5;
pub const PIN_SELECT_LEFT_ARM: i32 = 8;
pub const PIN_SELECT_HEAD: i32 = 9;
pub const PIN_I2C_SDA: i32 = 6;     // I2C data line
pub const PIN_I2C_SCL: i32 = 7;     // I2C clock line
pub const PIN_UART_TX: i32 = 21;    // Serial link to the BLE bridge
pub const PIN_UART_RX: i32 = 20;

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_ADDR_SELECTED_IMU: u8 = 0x69;
pub const I2C_FREQ_HZ: u32 = 115_200;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// UART (report link)
// ---------------------------------------------------------------------------
pub const UART_BAUDRATE: u32 = 57_600;
pub const REPORT_FRAME_LEN: usize = 64;

// ---------------------------------------------------------------------------
// MPU-6050 registers
// ---------------------------------------------------------------------------
pub const REG_GYRO_CONFIG: u8 = 0x1B;
pub const REG_ACCEL_CONFIG: u8 = 0x1C;
pub const REG_ACCEL_XOUT_H: u8 = 0x3B;
pub const REG_GYRO_XOUT_H: u8 = 0x43;
pub const REG_PWR_MGMT_1: u8 = 0x6B;

pub const CLKSEL_PLL_X_GYRO: u8 = 1;
pub const PWR_MGMT_CLKSEL_MASK: u8 = 0xF8;
pub const PWR_MGMT_SLEEP_CLEAR: u8 = 0xBF;
pub const FULL_SCALE_CLEAR: u8 = 0xE7; // ±2 g / ±250 °/s

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const BUS_TRANSACTION_DELAY_MS: u32 = 1;
pub const SENSOR_SETTLE_MS: u32 = 100;     // around per-sensor init
pub const SERIAL_POWER_UP_MS: u32 = 1000;  // BLE bridge power-up
pub const SENSOR_POWER_UP_MS: u32 = 500;
pub const ACCEL_TIMEOUT_MS: u64 = 1000;
pub const ACCEL_POLL_INTERVAL_MS: u64 = 1;

// ---------------------------------------------------------------------------
// Window geometry
// ---------------------------------------------------------------------------
pub const SENSOR_COUNT: usize = 6;
pub const AXIS_COUNT: usize = 6;                                // ax ay az gx gy gz
pub const SEGMENT_WORDS: usize = SENSOR_COUNT * AXIS_COUNT;     // 36
pub const SEGMENT_COUNT: usize = 8;
pub const WINDOW_FRAMES: u32 = 30;
pub const WINDOW_HOP: u32 = 8;
pub const FRAMES_PER_SEGMENT: u32 = 4;
pub const RETAINED_MASK: u32 = 0xFFFF;                          // two byte slots
pub const DELTA_SCALE: i32 = 128;
pub const DELTA_OFFSET: i32 = 128;
pub const PACK_CLIP: i32 = 127;

// ---------------------------------------------------------------------------
// Accelerator
// ---------------------------------------------------------------------------
pub const ACCEL_OUTPUT_WORDS: usize = 3;
pub const CLASS_COUNT: usize = 5;
/// Fixed input memory of each window slot (36 words each).
pub const ACCEL_INPUT_ADDRS: [usize; SEGMENT_COUNT] = [
    0x5040_0000,
    0x5040_8000,
    0x5041_0000,
    0x5041_8000,
    0x5080_0000,
    0x5080_8000,
    0x5081_0000,
    0x5081_8000,
];
pub const ACCEL_CLOCK_SOURCE: u32 = 0;  // peripheral clock
pub const ACCEL_CLOCK_DIVIDER: u32 = 0; // divide by 1
