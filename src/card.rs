//! Compass card: a 360-entry table mapping raw sensor headings onto the
//! boat's true heading, so the sensor can be mounted in any orientation.
//!
//! Each entry holds the offset (raw minus true, modulo 360) for one raw
//! heading. An all-zero card is the identity.

use std::fmt;

use tracing::info;

use crate::direction::Cardinal;
use crate::error::{CardError, StoreError};

pub const CARD_SIZE: usize = 360;
/// Serialised size: one little-endian `i16` per entry.
pub const CARD_BYTES: usize = CARD_SIZE * 2;

fn mod360(value: i32) -> i32 {
    value.rem_euclid(360)
}

/// Raw sensor bearings taken while the boat pointed at each cardinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinals {
    pub north: u16,
    pub east: u16,
    pub south: u16,
    pub west: u16,
}

impl Cardinals {
    pub fn new(north: u16, east: u16, south: u16, west: u16) -> Self {
        Self {
            north,
            east,
            south,
            west,
        }
    }

    pub fn reading(&self, cardinal: Cardinal) -> u16 {
        match cardinal {
            Cardinal::North => self.north,
            Cardinal::East => self.east,
            Cardinal::South => self.south,
            Cardinal::West => self.west,
        }
    }

    /// Raw span of the quadrant starting at `from`, in degrees.
    fn span(&self, from: Cardinal) -> u16 {
        let first = self.reading(from) as i32;
        let second = self.reading(from.next()) as i32;
        mod360(second - first) as u16
    }
}

/// How one quadrant of raw headings was fitted onto 90 true degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadrantFit {
    pub from: Cardinal,
    /// Raw heading where the quadrant starts.
    pub start: u16,
    /// Raw degrees covered; 90 for an undistorted quadrant.
    pub size: u16,
    /// Correction slope per raw degree, zero for an undistorted quadrant.
    pub delta: f32,
}

impl fmt::Display for QuadrantFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} quadrant: starts at {:03}, size {}, delta {:.4}",
            self.from.letter(),
            self.from.next().letter(),
            self.start,
            self.size,
            self.delta
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompassCard {
    offsets: [i16; CARD_SIZE],
}

impl Default for CompassCard {
    fn default() -> Self {
        Self {
            offsets: [0; CARD_SIZE],
        }
    }
}

impl CompassCard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the card from four cardinal readings.
    ///
    /// The readings must lie in 0-359 and run clockwise N, E, S, W with no
    /// two equal, so that the quadrants cover every raw heading exactly
    /// once. On error the card is left unchanged.
    pub fn build(&mut self, cardinals: Cardinals) -> Result<[QuadrantFit; 4], CardError> {
        for cardinal in Cardinal::ALL {
            let heading = cardinals.reading(cardinal);
            if heading as usize >= CARD_SIZE {
                return Err(CardError::OutOfRange { heading });
            }
        }

        let spans = Cardinal::ALL.map(|c| cardinals.span(c));
        let quadrant_sum: u32 = spans.iter().map(|&s| s as u32).sum();
        if quadrant_sum != CARD_SIZE as u32 || spans.contains(&0) {
            return Err(CardError::InvalidCardinals {
                north: cardinals.north,
                east: cardinals.east,
                south: cardinals.south,
                west: cardinals.west,
                quadrant_sum,
            });
        }

        Ok(self.build_unchecked(cardinals))
    }

    /// Rebuild without validating the readings.
    ///
    /// Quadrants are written in order N→E, E→S, S→W, W→N. With out-of-order
    /// readings a later quadrant can overwrite an earlier one, and raw
    /// headings no quadrant covers keep their previous offset.
    pub fn build_unchecked(&mut self, cardinals: Cardinals) -> [QuadrantFit; 4] {
        Cardinal::ALL.map(|from| {
            let start = cardinals.reading(from) % CARD_SIZE as u16;
            let size = cardinals.span(from);
            let delta = size as f32 / 90.0 - 1.0;
            let base = start as i32 - from.true_heading() as i32;

            for i in 0..size {
                let index = mod360(start as i32 + i as i32) as usize;
                let correction = (i as f32 * delta).round() as i32;
                self.offsets[index] = mod360(base + correction) as i16;
            }

            let fit = QuadrantFit {
                from,
                start,
                size,
                delta,
            };
            info!("{fit}");
            fit
        })
    }

    /// Corrected heading for a raw sensor heading.
    pub fn apply(&self, raw: u16) -> u16 {
        let raw = raw as usize % CARD_SIZE;
        mod360(raw as i32 - self.offsets[raw] as i32) as u16
    }

    /// Back to the identity card.
    pub fn reset(&mut self) {
        self.offsets = [0; CARD_SIZE];
    }

    pub fn is_identity(&self) -> bool {
        self.offsets.iter().all(|&o| o == 0)
    }

    pub fn offset(&self, raw: u16) -> i16 {
        self.offsets[raw as usize % CARD_SIZE]
    }

    /// `(raw heading, offset)` for every entry.
    pub fn entries(&self) -> impl Iterator<Item = (u16, i16)> + '_ {
        self.offsets
            .iter()
            .enumerate()
            .map(|(raw, &offset)| (raw as u16, offset))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.offsets.iter().flat_map(|o| o.to_le_bytes()).collect()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != CARD_BYTES {
            return Err(StoreError::CorruptCard { len: bytes.len() });
        }
        let mut card = Self::default();
        for (index, (slot, pair)) in card
            .offsets
            .iter_mut()
            .zip(bytes.chunks_exact(2))
            .enumerate()
        {
            let value = i16::from_le_bytes([pair[0], pair[1]]);
            if !(0..CARD_SIZE as i16).contains(&value) {
                return Err(StoreError::EntryOutOfRange { index, value });
            }
            *slot = value;
        }
        Ok(card)
    }
}
