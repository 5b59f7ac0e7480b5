use std::fmt;

/// The four reference directions used to build a compass card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinal {
    North,
    East,
    South,
    West,
}

impl Cardinal {
    /// Clockwise from north, the order compass card quadrants are built in.
    pub const ALL: [Cardinal; 4] = [
        Cardinal::North,
        Cardinal::East,
        Cardinal::South,
        Cardinal::West,
    ];

    pub fn true_heading(self) -> u16 {
        match self {
            Cardinal::North => 0,
            Cardinal::East => 90,
            Cardinal::South => 180,
            Cardinal::West => 270,
        }
    }

    /// The next cardinal clockwise.
    pub fn next(self) -> Cardinal {
        match self {
            Cardinal::North => Cardinal::East,
            Cardinal::East => Cardinal::South,
            Cardinal::South => Cardinal::West,
            Cardinal::West => Cardinal::North,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Cardinal::North => 'N',
            Cardinal::East => 'E',
            Cardinal::South => 'S',
            Cardinal::West => 'W',
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Cardinal::North => "North",
            Cardinal::East => "East",
            Cardinal::South => "South",
            Cardinal::West => "West",
        }
    }
}

impl fmt::Display for Cardinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Point of the 16-point rose a corrected heading falls on.
///
/// Variants are declared clockwise from north, so the discriminant is the
/// sector index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    N,
    NNE,
    NE,
    ENE,
    E,
    ESE,
    SE,
    SSE,
    S,
    SSW,
    SW,
    WSW,
    W,
    WNW,
    NW,
    NNW,
}

/// Sector width in tenths of a degree (360 / 16).
const SECTOR_TENTHS: u32 = 225;

impl Direction {
    const ROSE: [Direction; 16] = [
        Direction::N,
        Direction::NNE,
        Direction::NE,
        Direction::ENE,
        Direction::E,
        Direction::ESE,
        Direction::SE,
        Direction::SSE,
        Direction::S,
        Direction::SSW,
        Direction::SW,
        Direction::WSW,
        Direction::W,
        Direction::WNW,
        Direction::NW,
        Direction::NNW,
    ];

    const ABBREVIATIONS: [&'static str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];

    /// Nearest rose point for a whole-degree heading.
    pub fn from_heading(heading: u16) -> Direction {
        // fold into 0-359, then scale to tenths so the half-sector
        // boundary (11.25 degrees) is an integer
        let tenths = (heading as u32 % 360) * 10;

        // shift by half a sector so each point is centred on its heading
        let shifted = tenths + SECTOR_TENTHS / 2;

        // 348.75 and above rounds into sector 16, which is north again
        let sector = (shifted / SECTOR_TENTHS) % 16;
        Self::ROSE[sector as usize]
    }

    /// Centre of this point in tenths of a degree.
    pub fn centre_tenths(self) -> u32 {
        self as u32 * SECTOR_TENTHS
    }

    pub fn abbreviation(self) -> &'static str {
        Self::ABBREVIATIONS[self as usize]
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}
