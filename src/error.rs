/// Failures reported by the I2C transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    #[error("device did not acknowledge the transfer")]
    Nack,

    #[error("short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    #[error("i2c transport error: {0}")]
    Transport(String),
}

/// Failures building a compass card.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    #[error(
        "cardinal readings N={north} E={east} S={south} W={west} are not in circular order \
         (quadrants span {quadrant_sum} degrees)"
    )]
    InvalidCardinals {
        north: u16,
        east: u16,
        south: u16,
        west: u16,
        quadrant_sum: u32,
    },

    #[error("heading {heading} is outside 0-359")]
    OutOfRange { heading: u16 },
}

/// Failures reading or writing persisted settings.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no value stored under {0:?}")]
    Missing(String),

    #[error("stored compass card has {len} bytes, expected 720")]
    CorruptCard { len: usize },

    #[error("stored compass card entry {index} = {value} is outside 0-359")]
    EntryOutOfRange { index: usize, value: i16 },
}

/// Any failure surfaced by the compass core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Card(#[from] CardError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("compass service has stopped")]
    ServiceStopped,
}
