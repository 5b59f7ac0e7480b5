//! Serialized access to the compass from several threads.
//!
//! The CMPS14 tolerates only one transaction at a time and the core does no
//! locking of its own. [`CompassService`] moves the [`Compass`] and its
//! settings store onto one thread that owns the bus; every other thread
//! submits work through a cloneable [`CompassHandle`] and blocks until the
//! bus thread has run it.

use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use crate::calibration::{CalibrationKind, CalibrationQuality};
use crate::card::{Cardinals, CompassCard, QuadrantFit};
use crate::compass::{Compass, Heading};
use crate::error::Error;
use crate::sensor::SensorSample;
use crate::store::CardStore;
use crate::transport::Transport;

type Job<T, S> = Box<dyn FnOnce(&mut Compass<T>, &mut S) + Send>;

pub struct CompassService;

impl CompassService {
    /// Start the bus thread.
    ///
    /// The thread exits once every handle has been dropped, and the join
    /// handle gives the compass back.
    pub fn spawn<T, S>(
        compass: Compass<T>,
        store: S,
    ) -> std::io::Result<(CompassHandle<T, S>, JoinHandle<Compass<T>>)>
    where
        T: Transport + Send + 'static,
        S: CardStore + Send + 'static,
    {
        let (jobs, queue) = mpsc::channel::<Job<T, S>>();
        let worker = thread::Builder::new()
            .name("compass-bus".to_string())
            .spawn(move || {
                let mut compass = compass;
                let mut store = store;
                info!("compass bus thread started");
                for job in queue {
                    job(&mut compass, &mut store);
                }
                info!("compass bus thread stopped");
                compass
            })?;
        Ok((CompassHandle { jobs }, worker))
    }
}

pub struct CompassHandle<T, S> {
    jobs: mpsc::Sender<Job<T, S>>,
}

impl<T, S> Clone for CompassHandle<T, S> {
    fn clone(&self) -> Self {
        Self {
            jobs: self.jobs.clone(),
        }
    }
}

impl<T, S> CompassHandle<T, S>
where
    T: Transport + 'static,
    S: CardStore + 'static,
{
    /// Run `work` on the bus thread and wait for its result.
    pub fn run<R, F>(&self, work: F) -> Result<R, Error>
    where
        R: Send + 'static,
        F: FnOnce(&mut Compass<T>, &mut S) -> R + Send + 'static,
    {
        let (reply, result) = mpsc::sync_channel(1);
        self.jobs
            .send(Box::new(move |compass: &mut Compass<T>, store: &mut S| {
                // The caller may have given up waiting.
                let _ = reply.send(work(compass, store));
            }))
            .map_err(|_| Error::ServiceStopped)?;
        result.recv().map_err(|_| Error::ServiceStopped)
    }

    pub fn heading(&self) -> Result<Option<Heading>, Error> {
        self.run(|compass, _| compass.heading())
    }

    pub fn sample(&self) -> Result<SensorSample, Error> {
        Ok(self.run(|compass, _| compass.sensor().read_sample())??)
    }

    pub fn quality(&self) -> Result<CalibrationQuality, Error> {
        Ok(self.run(|compass, _| compass.calibration().query_quality())??)
    }

    pub fn version(&self) -> Result<u8, Error> {
        Ok(self.run(|compass, _| compass.calibration().query_version())??)
    }

    pub fn begin_calibration(&self, kind: CalibrationKind) -> Result<(), Error> {
        debug!("queueing {kind}");
        Ok(self.run(move |compass, _| compass.calibration().begin_calibration(kind))??)
    }

    pub fn save_profile(&self) -> Result<(), Error> {
        Ok(self.run(|compass, _| compass.calibration().save_profile())??)
    }

    pub fn erase_profile(&self) -> Result<(), Error> {
        Ok(self.run(|compass, _| compass.calibration().erase_profile())??)
    }

    pub fn build_card(&self, cardinals: Cardinals) -> Result<[QuadrantFit; 4], Error> {
        Ok(self.run(move |compass, _| compass.build_card(cardinals))??)
    }

    pub fn reset_card(&self) -> Result<(), Error> {
        self.run(|compass, _| compass.reset_card())
    }

    pub fn save_card(&self) -> Result<(), Error> {
        Ok(self.run(|compass, store| compass.save_card(store))??)
    }

    /// Copy of the card currently in use.
    pub fn card(&self) -> Result<CompassCard, Error> {
        self.run(|compass, _| compass.card().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BusError, CardError};
    use crate::mocks::mock_i2c::MockCmps14;
    use crate::register_link::RegisterLink;
    use crate::registers::Timing;
    use crate::store::MemoryStore;

    type Handle = CompassHandle<MockCmps14, MemoryStore>;

    fn spawn(mock: MockCmps14) -> (Handle, JoinHandle<Compass<MockCmps14>>) {
        let compass = Compass::new(RegisterLink::with_timing(mock, Timing::NONE));
        CompassService::spawn(compass, MemoryStore::new()).unwrap()
    }

    #[test]
    fn test_requests_from_several_threads_are_serialized() {
        let mut mock = MockCmps14::new();
        mock.set_bearing_tenths(450);
        let (handle, worker) = spawn(mock);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        assert_eq!(handle.heading().unwrap().unwrap().sensor, 45);
                    }
                })
            })
            .collect();
        handle
            .begin_calibration(CalibrationKind::Magnetometer)
            .unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        drop(handle);

        let compass = worker.join().unwrap();
        let mock = compass.link().transport();
        // Unlock and mode byte arrive back to back, never split by a read.
        let start = mock
            .writes
            .iter()
            .position(|w| w == &vec![0x00, 0x98])
            .unwrap();
        assert_eq!(
            mock.writes[start..start + 4],
            [
                vec![0x00, 0x98],
                vec![0x00, 0x95],
                vec![0x00, 0x99],
                vec![0x00, 0x81]
            ]
        );
        assert_eq!(mock.writes.len(), 44);
    }

    #[test]
    fn test_card_built_and_saved_through_handle() {
        let (handle, _worker) = spawn(MockCmps14::new());
        handle.build_card(Cardinals::new(10, 100, 190, 280)).unwrap();
        handle.save_card().unwrap();
        assert_eq!(handle.card().unwrap().apply(10), 0);

        let stored = handle
            .run(|_, store| CompassCard::load(&*store))
            .unwrap()
            .unwrap();
        assert_eq!(stored.apply(100), 90);

        handle.reset_card().unwrap();
        assert!(handle.card().unwrap().is_identity());
    }

    #[test]
    fn test_errors_come_back_to_the_caller() {
        let mut mock = MockCmps14::new();
        mock.nack = true;
        let (handle, _worker) = spawn(mock);
        assert!(matches!(
            handle.save_profile(),
            Err(Error::Bus(BusError::Nack))
        ));
        assert!(matches!(
            handle.build_card(Cardinals::new(90, 0, 180, 270)),
            Err(Error::Card(CardError::InvalidCardinals { .. }))
        ));
        assert_eq!(handle.heading().unwrap(), None);
    }
}
