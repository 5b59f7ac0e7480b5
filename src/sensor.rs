use tracing::warn;

use crate::error::BusError;
use crate::register_link::RegisterLink;
use crate::registers::{self, ACCEL_SCALE, GYRO_SCALE, MAG_SCALE};
use crate::transport::Transport;

/// One reading per axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Axes<T> {
    pub x: T,
    pub y: T,
    pub z: T,
}

impl Axes<i16> {
    /// Decode three big-endian signed words.
    pub fn from_be_bytes(bytes: [u8; 6]) -> Self {
        Self {
            x: i16::from_be_bytes([bytes[0], bytes[1]]),
            y: i16::from_be_bytes([bytes[2], bytes[3]]),
            z: i16::from_be_bytes([bytes[4], bytes[5]]),
        }
    }

    pub fn scaled(self, scale: f32) -> Axes<f32> {
        Axes {
            x: self.x as f32 * scale,
            y: self.y as f32 * scale,
            z: self.z as f32 * scale,
        }
    }
}

/// Snapshot of every measurement register, taken in one transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// 0-3599 tenths of a degree.
    pub bearing_tenths: u16,
    pub pitch: i8,
    pub roll: i8,
    pub magnetometer: Axes<i16>,
    pub accelerometer: Axes<i16>,
    pub gyroscope: Axes<i16>,
}

impl SensorSample {
    pub fn from_registers(raw: &[u8; registers::SAMPLE_LEN]) -> Self {
        let axes = |offset: usize| {
            let mut window = [0u8; registers::AXES_LEN];
            window.copy_from_slice(&raw[offset..offset + registers::AXES_LEN]);
            Axes::from_be_bytes(window)
        };
        let base = registers::BEARING as usize;
        Self {
            bearing_tenths: u16::from_be_bytes([raw[0], raw[1]]),
            pitch: raw[(registers::PITCH as usize) - base] as i8,
            roll: raw[(registers::ROLL as usize) - base] as i8,
            magnetometer: axes(registers::MAGNETOMETER_X as usize - base),
            accelerometer: axes(registers::ACCELEROMETER_X as usize - base),
            gyroscope: axes(registers::GYROSCOPE_X as usize - base),
        }
    }

    /// Whole degrees in 0-359.
    pub fn bearing_degrees(&self) -> u16 {
        tenths_to_degrees(self.bearing_tenths)
    }

    /// m/s^2
    pub fn acceleration(&self) -> Axes<f32> {
        self.accelerometer.scaled(ACCEL_SCALE)
    }

    /// Degrees per second.
    pub fn angular_rate(&self) -> Axes<f32> {
        self.gyroscope.scaled(GYRO_SCALE)
    }

    /// Raw counts.
    pub fn magnetic_field(&self) -> Axes<f32> {
        self.magnetometer.scaled(MAG_SCALE)
    }
}

fn tenths_to_degrees(tenths: u16) -> u16 {
    (tenths / 10) % 360
}

/// Decodes CMPS14 measurement registers. Performs no retries.
pub struct SensorReader<'a, T> {
    link: &'a mut RegisterLink<T>,
}

impl<'a, T: Transport> SensorReader<'a, T> {
    pub fn new(link: &'a mut RegisterLink<T>) -> Self {
        Self { link }
    }

    /// Bearing in whole degrees, or `None` when the bus failed.
    ///
    /// A failed read is never reported as 0 so that due north stays
    /// distinguishable from an offline sensor.
    pub fn read_bearing(&mut self) -> Option<u16> {
        self.try_read_bearing()
            .inspect_err(|e| warn!("no bearing reading: {e}"))
            .ok()
    }

    pub fn try_read_bearing(&mut self) -> Result<u16, BusError> {
        self.read_bearing_tenths().map(tenths_to_degrees)
    }

    pub fn read_bearing_tenths(&mut self) -> Result<u16, BusError> {
        let window: [u8; registers::BEARING_LEN] =
            self.link.read_register_window(registers::BEARING)?;
        Ok(u16::from_be_bytes(window))
    }

    /// (pitch, roll) in degrees.
    pub fn read_pitch_roll(&mut self) -> Result<(i8, i8), BusError> {
        let [pitch, roll]: [u8; registers::PITCH_ROLL_LEN] =
            self.link.read_register_window(registers::PITCH)?;
        Ok((pitch as i8, roll as i8))
    }

    pub fn read_magnetometer(&mut self) -> Result<Axes<f32>, BusError> {
        self.read_axes(registers::MAGNETOMETER_X, MAG_SCALE)
    }

    pub fn read_accelerometer(&mut self) -> Result<Axes<f32>, BusError> {
        self.read_axes(registers::ACCELEROMETER_X, ACCEL_SCALE)
    }

    pub fn read_gyroscope(&mut self) -> Result<Axes<f32>, BusError> {
        self.read_axes(registers::GYROSCOPE_X, GYRO_SCALE)
    }

    pub fn read_sample(&mut self) -> Result<SensorSample, BusError> {
        let raw: [u8; registers::SAMPLE_LEN] = self.link.read_register_window(registers::BEARING)?;
        Ok(SensorSample::from_registers(&raw))
    }

    fn read_axes(&mut self, address: u8, scale: f32) -> Result<Axes<f32>, BusError> {
        let window: [u8; registers::AXES_LEN] = self.link.read_register_window(address)?;
        Ok(Axes::from_be_bytes(window).scaled(scale))
    }
}
