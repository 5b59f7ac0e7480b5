//! CMPS14 register map and command bytes.
//!
//! Multi-byte registers are big endian: the lower address holds the high byte.

use std::time::Duration;

/// 7-bit I2C address of the CMPS14.
pub const CMPS14_I2C_ADDRESS: u16 = 0x60;

/// Command register. Writes here are interpreted by the sensor firmware.
pub const COMMAND: u8 = 0x00;
/// Bearing as a word, 0-3599 tenths of a degree.
pub const BEARING: u8 = 0x02;
/// Pitch, signed byte in degrees.
pub const PITCH: u8 = 0x04;
/// Roll, signed byte in degrees.
pub const ROLL: u8 = 0x05;
pub const MAGNETOMETER_X: u8 = 0x06;
pub const ACCELEROMETER_X: u8 = 0x0C;
pub const GYROSCOPE_X: u8 = 0x12;
/// Calibration quality byte: sys/gyro/accel/mag, two bits each.
pub const CALIBRATION_QUALITY: u8 = 0x1E;

pub const BEARING_LEN: usize = 2;
pub const PITCH_ROLL_LEN: usize = 2;
pub const AXES_LEN: usize = 6;
/// Bearing through gyroscope Z, registers 0x02..=0x17.
pub const SAMPLE_LEN: usize = 22;

/// Must precede any configuration command, one byte per transaction.
pub const UNLOCK_SEQUENCE: [u8; 3] = [0x98, 0x95, 0x99];
/// Persist the current calibration profile.
pub const SAVE_PROFILE_SEQUENCE: [u8; 3] = [0xF0, 0xF5, 0xF6];
/// Erase the stored profile and revert to factory defaults.
pub const ERASE_PROFILE_SEQUENCE: [u8; 3] = [0xE0, 0xE5, 0xE2];
pub const VERSION_REQUEST: u8 = 0x11;

// Mode select: bit 7 enables, the low bits pick the subsystem.
pub const MODE_ENABLE: u8 = 0b1000_0000;
pub const MODE_MAGNETOMETER: u8 = 0b0000_0001;
pub const MODE_ACCELEROMETER: u8 = 0b0000_0010;
pub const MODE_GYROSCOPE: u8 = 0b0000_0100;
pub const MODE_AUTOSAVE: u8 = 0b0001_0000;

/// Sensor processing latency after every write transaction.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);
/// Wait before selecting the calibration quality register.
pub const QUALITY_PRE_READ_DELAY: Duration = Duration::from_millis(20);
/// Extra wait after erasing the stored profile.
pub const ERASE_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Accelerometer counts are milli-g.
pub const ACCEL_SCALE: f32 = 9.805_93 / 1000.0;
/// Gyroscope counts are 1/16 degree per second.
pub const GYRO_SCALE: f32 = 1.0 / 16.0;
/// Magnetometer units are undocumented, values stay in raw counts.
pub const MAG_SCALE: f32 = 1.0;

/// Protocol delays applied by [`crate::register_link::RegisterLink`].
///
/// Hardware must use [`Timing::PROTOCOL`]. Simulated buses may use
/// [`Timing::NONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub settle: Duration,
    pub quality_pre_read: Duration,
    pub erase_settle: Duration,
}

impl Timing {
    pub const PROTOCOL: Timing = Timing {
        settle: SETTLE_DELAY,
        quality_pre_read: QUALITY_PRE_READ_DELAY,
        erase_settle: ERASE_SETTLE_DELAY,
    };

    pub const NONE: Timing = Timing {
        settle: Duration::ZERO,
        quality_pre_read: Duration::ZERO,
        erase_settle: Duration::ZERO,
    };
}

impl Default for Timing {
    fn default() -> Self {
        Timing::PROTOCOL
    }
}
