//! Host-side sequencing of the CMPS14 calibration engine.
//!
//! The sensor calibrates itself once triggered. This module only sends the
//! trigger bytes and reads back the quality score; it never waits for the
//! calibration to finish and never retries a command.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info};

use crate::config;
use crate::error::BusError;
use crate::register_link::RegisterLink;
use crate::registers::{self, MODE_ENABLE};
use crate::transport::Transport;

/// Mode-select commands sent after the unlock sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationKind {
    Magnetometer,
    Accelerometer,
    Gyroscope,
    /// Periodic automatic save of calibration data.
    Autosave,
    /// Stop auto-calibration.
    Stop,
}

impl CalibrationKind {
    pub fn mode_byte(self) -> u8 {
        MODE_ENABLE
            | match self {
                CalibrationKind::Magnetometer => registers::MODE_MAGNETOMETER,
                CalibrationKind::Accelerometer => registers::MODE_ACCELEROMETER,
                CalibrationKind::Gyroscope => registers::MODE_GYROSCOPE,
                CalibrationKind::Autosave => registers::MODE_AUTOSAVE,
                CalibrationKind::Stop => 0,
            }
    }

    /// How long the operator should handle the unit before re-checking
    /// quality.
    pub fn advisory_period(self) -> Option<Duration> {
        match self {
            CalibrationKind::Magnetometer => Some(config::MAGNETOMETER_ADVISORY_PERIOD),
            CalibrationKind::Accelerometer => Some(config::ACCELEROMETER_ADVISORY_PERIOD),
            CalibrationKind::Gyroscope => Some(config::GYROSCOPE_ADVISORY_PERIOD),
            CalibrationKind::Autosave | CalibrationKind::Stop => None,
        }
    }

    /// What the operator has to do while the sensor calibrates.
    pub fn instructions(self) -> &'static str {
        match self {
            CalibrationKind::Magnetometer => "Rotate the unit randomly in all directions",
            CalibrationKind::Accelerometer => {
                "Rotate the unit through different 90 degree positions, holding each steady"
            }
            CalibrationKind::Gyroscope => "Keep the unit stationary",
            CalibrationKind::Autosave => "Calibration data will be saved periodically",
            CalibrationKind::Stop => "Auto-calibration stopped",
        }
    }

    fn state(self) -> SequencerState {
        match self {
            CalibrationKind::Magnetometer => SequencerState::CalibratingMagnetometer,
            CalibrationKind::Accelerometer => SequencerState::CalibratingAccelerometer,
            CalibrationKind::Gyroscope => SequencerState::CalibratingGyroscope,
            CalibrationKind::Autosave => SequencerState::AutosaveEnabled,
            CalibrationKind::Stop => SequencerState::Stopping,
        }
    }
}

impl fmt::Display for CalibrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CalibrationKind::Magnetometer => "magnetometer calibration",
            CalibrationKind::Accelerometer => "accelerometer calibration",
            CalibrationKind::Gyroscope => "gyroscope calibration",
            CalibrationKind::Autosave => "periodic auto-save",
            CalibrationKind::Stop => "stop auto-calibration",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Unlocking,
    CalibratingMagnetometer,
    CalibratingAccelerometer,
    CalibratingGyroscope,
    AutosaveEnabled,
    Stopping,
    Saving,
    Erasing,
}

/// Calibration quality byte. Each field is 0-3, higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationQuality(pub u8);

impl CalibrationQuality {
    pub fn system(self) -> u8 {
        (self.0 >> 6) & 0b11
    }

    pub fn gyroscope(self) -> u8 {
        (self.0 >> 4) & 0b11
    }

    pub fn accelerometer(self) -> u8 {
        (self.0 >> 2) & 0b11
    }

    pub fn magnetometer(self) -> u8 {
        self.0 & 0b11
    }

    pub fn is_fully_calibrated(self) -> bool {
        self.0 == 0xFF
    }
}

impl fmt::Display for CalibrationQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08b} (system {}, gyro {}, accel {}, mag {})",
            self.0,
            self.system(),
            self.gyroscope(),
            self.accelerometer(),
            self.magnetometer()
        )
    }
}

/// Operator-level calibration commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationCommand {
    StartMagnetometer,
    StartAccelerometer,
    StartGyroscope,
    EnableAutosave,
    StopAutocalibration,
    SaveProfile,
    EraseProfile,
    QueryVersion,
    QueryQuality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    Quality(CalibrationQuality),
    Version(u8),
}

pub struct CalibrationSequencer<'a, T> {
    link: &'a mut RegisterLink<T>,
    state: SequencerState,
}

impl<'a, T: Transport> CalibrationSequencer<'a, T> {
    pub fn new(link: &'a mut RegisterLink<T>) -> Self {
        Self {
            link,
            state: SequencerState::Idle,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn execute(&mut self, command: CalibrationCommand) -> Result<CommandOutcome, BusError> {
        let kind = match command {
            CalibrationCommand::StartMagnetometer => CalibrationKind::Magnetometer,
            CalibrationCommand::StartAccelerometer => CalibrationKind::Accelerometer,
            CalibrationCommand::StartGyroscope => CalibrationKind::Gyroscope,
            CalibrationCommand::EnableAutosave => CalibrationKind::Autosave,
            CalibrationCommand::StopAutocalibration => CalibrationKind::Stop,
            CalibrationCommand::SaveProfile => {
                return self.save_profile().map(|()| CommandOutcome::Done);
            }
            CalibrationCommand::EraseProfile => {
                return self.erase_profile().map(|()| CommandOutcome::Done);
            }
            CalibrationCommand::QueryVersion => return self.query_version().map(CommandOutcome::Version),
            CalibrationCommand::QueryQuality => return self.query_quality().map(CommandOutcome::Quality),
        };
        self.begin_calibration(kind).map(|()| CommandOutcome::Done)
    }

    /// Unlock the configuration register, then send the mode byte for
    /// `kind`. The sensor ignores the mode byte without a complete unlock.
    pub fn begin_calibration(&mut self, kind: CalibrationKind) -> Result<(), BusError> {
        info!("requesting {kind}");
        self.transition(SequencerState::Unlocking);
        let mut result = self.link.write_command_sequence(&registers::UNLOCK_SEQUENCE);
        if result.is_ok() {
            self.transition(kind.state());
            result = self.link.write_command(kind.mode_byte());
        }
        self.transition(SequencerState::Idle);
        result
    }

    pub fn stop(&mut self) -> Result<(), BusError> {
        self.begin_calibration(CalibrationKind::Stop)
    }

    /// Persist the current calibration in the sensor.
    pub fn save_profile(&mut self) -> Result<(), BusError> {
        info!("saving calibration profile");
        self.transition(SequencerState::Saving);
        let result = self
            .link
            .write_command_sequence(&registers::SAVE_PROFILE_SEQUENCE);
        self.transition(SequencerState::Idle);
        result
    }

    /// Erase the stored profile; factory defaults apply afterwards.
    pub fn erase_profile(&mut self) -> Result<(), BusError> {
        info!("erasing calibration profile");
        self.transition(SequencerState::Erasing);
        let result = self
            .link
            .write_command_sequence(&registers::ERASE_PROFILE_SEQUENCE);
        self.link.pause(self.link.timing().erase_settle);
        self.transition(SequencerState::Idle);
        result
    }

    /// Waits the pre-read delay, selects the quality register, settles, then
    /// reads one byte.
    pub fn query_quality(&mut self) -> Result<CalibrationQuality, BusError> {
        self.link.pause(self.link.timing().quality_pre_read);
        let [quality]: [u8; 1] = self
            .link
            .read_settled_window(registers::CALIBRATION_QUALITY)?;
        let quality = CalibrationQuality(quality);
        debug!("calibration quality {quality}");
        Ok(quality)
    }

    pub fn query_version(&mut self) -> Result<u8, BusError> {
        self.link.write_command(registers::VERSION_REQUEST)?;
        let [version]: [u8; 1] = self.link.read_bytes()?;
        Ok(version)
    }

    fn transition(&mut self, next: SequencerState) {
        debug!("calibration sequencer {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::mock_i2c::MockCmps14;
    use crate::registers::Timing;
    use std::time::Instant;

    fn link() -> RegisterLink<MockCmps14> {
        RegisterLink::with_timing(MockCmps14::new(), Timing::NONE)
    }

    #[test]
    fn test_magnetometer_byte_sequence() {
        let mut link = link();
        CalibrationSequencer::new(&mut link)
            .begin_calibration(CalibrationKind::Magnetometer)
            .unwrap();
        assert_eq!(
            link.transport().writes,
            vec![
                vec![0x00, 0x98],
                vec![0x00, 0x95],
                vec![0x00, 0x99],
                vec![0x00, 0b1000_0001],
            ]
        );
    }

    #[test]
    fn test_mode_bytes() {
        assert_eq!(CalibrationKind::Magnetometer.mode_byte(), 0x81);
        assert_eq!(CalibrationKind::Accelerometer.mode_byte(), 0x82);
        assert_eq!(CalibrationKind::Gyroscope.mode_byte(), 0x84);
        assert_eq!(CalibrationKind::Autosave.mode_byte(), 0x90);
        assert_eq!(CalibrationKind::Stop.mode_byte(), 0x80);
    }

    #[test]
    fn test_save_and_erase_skip_unlock() {
        let mut link = link();
        let mut sequencer = CalibrationSequencer::new(&mut link);
        sequencer.save_profile().unwrap();
        sequencer.erase_profile().unwrap();
        assert_eq!(
            link.transport().commands(),
            vec![0xF0, 0xF5, 0xF6, 0xE0, 0xE5, 0xE2]
        );
    }

    #[test]
    fn test_nack_during_unlock_skips_mode_byte() {
        let mut link = link();
        link.transport_mut().nack = true;
        let mut sequencer = CalibrationSequencer::new(&mut link);
        assert_eq!(
            sequencer.begin_calibration(CalibrationKind::Gyroscope),
            Err(BusError::Nack)
        );
        assert_eq!(sequencer.state(), SequencerState::Idle);
        assert_eq!(link.transport().writes, vec![vec![0x00, 0x98]]);
    }

    #[test]
    fn test_quality_fields() {
        let mut link = link();
        link.transport_mut().registers[registers::CALIBRATION_QUALITY as usize] = 0b11_10_01_00;
        let quality = CalibrationSequencer::new(&mut link).query_quality().unwrap();
        assert_eq!(quality.system(), 3);
        assert_eq!(quality.gyroscope(), 2);
        assert_eq!(quality.accelerometer(), 1);
        assert_eq!(quality.magnetometer(), 0);
        assert!(!quality.is_fully_calibrated());
        assert_eq!(
            quality.to_string(),
            "11100100 (system 3, gyro 2, accel 1, mag 0)"
        );
    }

    #[test]
    fn test_quality_short_read_surfaces() {
        let mut link = link();
        link.transport_mut().read_limit = Some(0);
        assert_eq!(
            CalibrationSequencer::new(&mut link).query_quality(),
            Err(BusError::ShortRead {
                expected: 1,
                received: 0
            })
        );
    }

    #[test]
    fn test_version_query() {
        let mut link = link();
        link.transport_mut().version = 0x07;
        let outcome = CalibrationSequencer::new(&mut link)
            .execute(CalibrationCommand::QueryVersion)
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Version(0x07));
        assert_eq!(link.transport().commands(), vec![0x11]);
    }

    #[test]
    fn test_execute_maps_commands() {
        let mut link = link();
        let mut sequencer = CalibrationSequencer::new(&mut link);
        for command in [
            CalibrationCommand::StartAccelerometer,
            CalibrationCommand::EnableAutosave,
            CalibrationCommand::StopAutocalibration,
        ] {
            assert_eq!(sequencer.execute(command), Ok(CommandOutcome::Done));
        }
        assert_eq!(
            link.transport().commands(),
            vec![
                0x98, 0x95, 0x99, 0x82, 0x98, 0x95, 0x99, 0x90, 0x98, 0x95, 0x99, 0x80
            ]
        );
    }

    #[test]
    fn test_quality_read_observes_protocol_delays() {
        let mut link = RegisterLink::new(MockCmps14::new());
        link.transport_mut().registers[registers::CALIBRATION_QUALITY as usize] = 0xFF;
        let start = Instant::now();
        let quality = CalibrationSequencer::new(&mut link).query_quality().unwrap();
        // 20 ms before the select, 100 ms settle after it.
        assert!(start.elapsed() >= Duration::from_millis(120));
        assert!(quality.is_fully_calibrated());
        assert_eq!(
            link.transport().writes,
            vec![vec![registers::CALIBRATION_QUALITY]]
        );
    }

    #[test]
    fn test_erase_waits_for_flash() {
        let mut link = RegisterLink::new(MockCmps14::new());
        let start = Instant::now();
        CalibrationSequencer::new(&mut link).erase_profile().unwrap();
        // Three settled command bytes plus the erase settle.
        assert!(start.elapsed() >= Duration::from_millis(800));
    }

    #[test]
    fn test_begin_calibration_settles_each_byte() {
        let mut link = RegisterLink::new(MockCmps14::new());
        let start = Instant::now();
        CalibrationSequencer::new(&mut link)
            .begin_calibration(CalibrationKind::Gyroscope)
            .unwrap();
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[test]
    fn test_advisory_periods() {
        assert_eq!(
            CalibrationKind::Gyroscope.advisory_period(),
            Some(Duration::from_secs(20))
        );
        assert_eq!(CalibrationKind::Stop.advisory_period(), None);
    }
}
