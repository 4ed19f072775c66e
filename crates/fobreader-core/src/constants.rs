//! Core constants for the fob reader terminal.
//!
//! This module centralizes the fixed values the terminal depends on: the
//! per-board GPIO line tables, serial line settings, well-known device paths,
//! screen geometry, the warning beep policy and the control tokens produced
//! by the keypad simulator.
//!
//! # Pin Tables
//!
//! Every physical board exposes eleven output lines, addressed by logical
//! GPIO line number on the board's first GPIO chip:
//!
//! | Board        | Address 0..7                 | Trigger | LED | Beeper |
//! |--------------|------------------------------|---------|-----|--------|
//! | Orange Pi    | 11, 6, 0, 3, 7, 8, 10, 20    | 9       | 200 | 201    |
//! | Raspberry Pi | 3, 4, 27, 22, 5, 6, 19, 26   | 13      | 12  | 16     |
//!
//! The simulated profile numbers its lines 0 through 10 in role order so the
//! logical pin state can still be tracked without hardware.
//!
//! # Usage
//!
//! ```
//! use fobreader_core::constants::*;
//!
//! assert_eq!(SERIAL_BAUD_RATE, 9600);
//! assert_eq!(FRAME_BYTES, 480 * 320 * 2);
//! ```

// ============================================================================
// Platform Detection
// ============================================================================

/// Device-tree file holding the human readable board model string.
pub const DEVICE_TREE_MODEL_PATH: &str = "/proc/device-tree/model";

/// Substring identifying an Orange Pi board in the model string.
pub const ORANGE_PI_MODEL: &str = "Orange Pi";

/// Substring identifying a Raspberry Pi board in the model string.
pub const RASPBERRY_PI_MODEL: &str = "Raspberry Pi";

// ============================================================================
// Address Bus
// ============================================================================

/// Number of address lines on the relay bus.
pub const ADDRESS_LINES: usize = 8;

/// Total number of output lines claimed per board (address + trigger + LED + beeper).
pub const OUTPUT_LINES: usize = ADDRESS_LINES + 3;

/// Address line that doubles as a second trigger while a user is logged in.
pub const LOGIN_ADDRESS_LINE: u8 = 5;

/// Orange Pi address lines, bit 0 first.
pub const ORANGE_PI_ADDRESS_PINS: [u32; ADDRESS_LINES] = [11, 6, 0, 3, 7, 8, 10, 20];

/// Orange Pi trigger line.
pub const ORANGE_PI_TRIGGER_PIN: u32 = 9;

/// Orange Pi status LED line.
pub const ORANGE_PI_LED_PIN: u32 = 200;

/// Orange Pi beeper line.
pub const ORANGE_PI_BEEPER_PIN: u32 = 201;

/// Raspberry Pi address lines, bit 0 first.
pub const RASPBERRY_PI_ADDRESS_PINS: [u32; ADDRESS_LINES] = [3, 4, 27, 22, 5, 6, 19, 26];

/// Raspberry Pi trigger line.
pub const RASPBERRY_PI_TRIGGER_PIN: u32 = 13;

/// Raspberry Pi status LED line.
pub const RASPBERRY_PI_LED_PIN: u32 = 12;

/// Raspberry Pi beeper line.
pub const RASPBERRY_PI_BEEPER_PIN: u32 = 16;

/// Simulated address lines.
pub const SIMULATED_ADDRESS_PINS: [u32; ADDRESS_LINES] = [0, 1, 2, 3, 4, 5, 6, 7];

/// Simulated trigger line.
pub const SIMULATED_TRIGGER_PIN: u32 = 8;

/// Simulated LED line.
pub const SIMULATED_LED_PIN: u32 = 9;

/// Simulated beeper line.
pub const SIMULATED_BEEPER_PIN: u32 = 10;

/// Default GPIO character device.
pub const DEFAULT_GPIO_CHIP: &str = "/dev/gpiochip0";

/// Consumer label attached to every claimed GPIO line.
pub const GPIO_CONSUMER: &str = "fobreader";

// ============================================================================
// Serial Transport
// ============================================================================

/// Baud rate of the reader's serial link (8 data bits, no parity, 1 stop bit).
pub const SERIAL_BAUD_RATE: u32 = 9600;

/// Orange Pi serial device.
pub const ORANGE_PI_SERIAL_PATH: &str = "/dev/ttyS3";

/// Raspberry Pi serial device.
pub const RASPBERRY_PI_SERIAL_PATH: &str = "/dev/serial0";

/// Read timeout applied to the serial port, in milliseconds.
///
/// Reads only ever request bytes that are already buffered, so this bounds
/// the worst case of a racing read rather than the normal path.
pub const DEFAULT_SERIAL_TIMEOUT_MS: u64 = 10;

// ============================================================================
// Input Polling
// ============================================================================

/// Sleep between simulated keyboard polls, in milliseconds.
pub const SIMULATED_POLL_INTERVAL_MS: u64 = 5;

/// Token emitted for Enter / hash.
pub const CONFIRM_TOKEN: &str = "B";

/// Token emitted for Backspace / asterisk.
pub const CANCEL_TOKEN: &str = "A";

/// Capacity of the queue between the Wiegand pipe reader and `read()`.
pub const WIEGAND_QUEUE_CAPACITY: usize = 32;

// ============================================================================
// Screen
// ============================================================================

/// Screen width in pixels.
pub const SCREEN_WIDTH: usize = 480;

/// Screen height in pixels.
pub const SCREEN_HEIGHT: usize = 320;

/// Bytes per pixel in the device-native RGB565 encoding.
pub const BYTES_PER_PIXEL: usize = 2;

/// Size of one densely packed frame.
pub const FRAME_BYTES: usize = SCREEN_WIDTH * SCREEN_HEIGHT * BYTES_PER_PIXEL;

/// Orange Pi framebuffer device.
pub const ORANGE_PI_FRAMEBUFFER: &str = "/dev/fb0";

/// Raspberry Pi framebuffer device.
pub const RASPBERRY_PI_FRAMEBUFFER: &str = "/dev/fb1";

/// Kernel virtual console binding switch.
pub const VTCONSOLE_BIND_PATH: &str = "/sys/class/vtconsole/vtcon1/bind";

// ============================================================================
// Warning Policy
// ============================================================================

/// Warnings at or above this many seconds are ignored entirely.
pub const WARN_MAX_SECONDS: i32 = 60;

/// Above this many seconds the LED blinks but no beep is scheduled.
pub const WARN_SILENT_ABOVE_SECONDS: i32 = 45;

/// Above this many seconds (and up to [`WARN_SILENT_ABOVE_SECONDS`]) the beep is short and fixed.
pub const WARN_SHORT_ABOVE_SECONDS: i32 = 30;

/// Fixed beep length for the short band, in milliseconds.
pub const WARN_SHORT_BEEP_MS: u64 = 15;

/// Offset of the logarithmic beep ramp, in milliseconds.
pub const WARN_RAMP_OFFSET_MS: i64 = 510;

/// Slope of the logarithmic beep ramp.
pub const WARN_RAMP_SLOPE: f64 = 147.0;
