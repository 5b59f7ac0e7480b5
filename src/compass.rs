use std::fmt;

use tracing::{info, warn};

use crate::calibration::CalibrationSequencer;
use crate::card::{Cardinals, CompassCard, QuadrantFit};
use crate::direction::Direction;
use crate::error::{CardError, StoreError};
use crate::register_link::RegisterLink;
use crate::sensor::SensorReader;
use crate::store::CardStore;
use crate::transport::Transport;

/// Raw sensor heading and the heading after the compass card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heading {
    pub sensor: u16,
    pub corrected: u16,
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:03}° {} (sensor {:03}°)",
            self.corrected,
            Direction::from_heading(self.corrected),
            self.sensor
        )
    }
}

/// Everything the bus-owning task holds: the link to the CMPS14 and the
/// compass card applied to its bearings.
pub struct Compass<T> {
    link: RegisterLink<T>,
    card: CompassCard,
}

impl<T: Transport> Compass<T> {
    /// Starts with the identity card.
    pub fn new(link: RegisterLink<T>) -> Self {
        Self {
            link,
            card: CompassCard::default(),
        }
    }

    pub fn link(&self) -> &RegisterLink<T> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut RegisterLink<T> {
        &mut self.link
    }

    pub fn sensor(&mut self) -> SensorReader<'_, T> {
        SensorReader::new(&mut self.link)
    }

    pub fn calibration(&mut self) -> CalibrationSequencer<'_, T> {
        CalibrationSequencer::new(&mut self.link)
    }

    pub fn card(&self) -> &CompassCard {
        &self.card
    }

    /// `None` when the sensor gave no reading.
    pub fn heading(&mut self) -> Option<Heading> {
        let sensor = self.sensor().read_bearing()?;
        Some(Heading {
            sensor,
            corrected: self.card.apply(sensor),
        })
    }

    pub fn build_card(&mut self, cardinals: Cardinals) -> Result<[QuadrantFit; 4], CardError> {
        info!(
            "building compass card from N={:03} E={:03} S={:03} W={:03}",
            cardinals.north, cardinals.east, cardinals.south, cardinals.west
        );
        self.card.build(cardinals)
    }

    pub fn reset_card(&mut self) {
        info!("compass card reset");
        self.card.reset();
    }

    pub fn save_card(&self, store: &mut impl CardStore) -> Result<(), StoreError> {
        self.card.save(store)
    }

    /// Replace the card with the stored one. Returns `false` and keeps the
    /// current card when nothing has been stored yet.
    pub fn load_card(&mut self, store: &impl CardStore) -> Result<bool, StoreError> {
        match CompassCard::load(store) {
            Ok(card) => {
                self.card = card;
                info!("compass card loaded");
                Ok(true)
            }
            Err(StoreError::Missing(key)) => {
                warn!("no stored compass card under {key:?}, using raw headings");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationKind;
    use crate::mocks::mock_i2c::MockCmps14;
    use crate::registers::Timing;
    use crate::store::MemoryStore;

    fn new_compass() -> Compass<MockCmps14> {
        Compass::new(RegisterLink::with_timing(MockCmps14::new(), Timing::NONE))
    }

    #[test]
    fn test_uncalibrated_heading_is_raw() {
        let mut compass = new_compass();
        compass.link_mut().transport_mut().set_bearing_tenths(1234);
        assert_eq!(
            compass.heading(),
            Some(Heading {
                sensor: 123,
                corrected: 123
            })
        );
    }

    #[test]
    fn test_heading_through_card() {
        let mut compass = new_compass();
        compass.build_card(Cardinals::new(20, 110, 200, 290)).unwrap();
        compass.link_mut().transport_mut().set_bearing_tenths(200);
        let heading = compass.heading().unwrap();
        assert_eq!(heading.corrected, 0);
        assert_eq!(heading.to_string(), "000° N (sensor 020°)");
    }

    #[test]
    fn test_offline_sensor_has_no_heading() {
        let mut compass = new_compass();
        compass.link_mut().transport_mut().nack = true;
        assert_eq!(compass.heading(), None);
    }

    #[test]
    fn test_card_survives_reload() {
        let mut store = MemoryStore::new();
        let mut compass = new_compass();
        compass.build_card(Cardinals::new(15, 100, 195, 280)).unwrap();
        compass.save_card(&mut store).unwrap();

        let mut rebooted = new_compass();
        assert!(rebooted.load_card(&store).unwrap());
        assert_eq!(rebooted.card(), compass.card());
    }

    #[test]
    fn test_boot_without_stored_card() {
        let store = MemoryStore::new();
        let mut compass = new_compass();
        assert!(!compass.load_card(&store).unwrap());
        assert!(compass.card().is_identity());
    }

    #[test]
    fn test_calibration_and_sensor_share_the_link() {
        let mut compass = new_compass();
        compass
            .calibration()
            .begin_calibration(CalibrationKind::Gyroscope)
            .unwrap();
        compass.sensor().read_bearing();
        assert_eq!(compass.link().transport().writes.len(), 5);
    }
}
