pub mod calibration;
pub mod card;
pub mod compass;
pub mod config;
pub mod direction;
pub mod error;
pub mod register_link;
pub mod registers;
pub mod sensor;
pub mod service;
pub mod store;
pub mod transport;

// Re-export commonly used types
pub use calibration::{CalibrationKind, CalibrationQuality, CalibrationSequencer};
pub use card::{Cardinals, CompassCard};
pub use compass::{Compass, Heading};
pub use error::{BusError, CardError, Error, StoreError};
pub use register_link::RegisterLink;
pub use sensor::{SensorReader, SensorSample};
pub use store::{CardStore, FileStore};

#[cfg(test)]
pub(crate) mod mocks;
