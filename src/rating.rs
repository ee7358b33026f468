//! `RatingBand`: the fixed ordered partition of integer rating used both for
//! storage partitioning and query filtering (spec §3, §9 Open Question 2).
//!
//! The band list is a configuration constant, not something computed from a
//! running config file — spec.md is explicit that mixing band layouts across
//! the lifetime of a database file is unsupported, so this is a `const`
//! array, not a runtime-configurable one.

use std::fmt;

pub const BAND_BOUNDARIES: [u16; 10] = [1000, 1200, 1400, 1600, 1800, 2000, 2200, 2400, 2600, 2800];

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum RatingBand {
    Below1000 = 0,
    B1000 = 1,
    B1200 = 2,
    B1400 = 3,
    B1600 = 4,
    B1800 = 5,
    B2000 = 6,
    B2200 = 7,
    B2400 = 8,
    B2600 = 9,
    B2800Plus = 10,
}

impl RatingBand {
    pub const ALL: [RatingBand; 11] = [
        RatingBand::Below1000,
        RatingBand::B1000,
        RatingBand::B1200,
        RatingBand::B1400,
        RatingBand::B1600,
        RatingBand::B1800,
        RatingBand::B2000,
        RatingBand::B2200,
        RatingBand::B2400,
        RatingBand::B2600,
        RatingBand::B2800Plus,
    ];

    /// The band containing `rating`. Monotonic in `rating` and total over
    /// `[0, u16::MAX]`: every rating falls in exactly one band.
    pub fn of(rating: u16) -> RatingBand {
        match BAND_BOUNDARIES.iter().position(|&b| rating < b) {
            Some(idx) => Self::ALL[idx],
            None => RatingBand::B2800Plus,
        }
    }

    /// Lower bound (inclusive) of this band.
    pub fn min(self) -> u16 {
        match self {
            RatingBand::Below1000 => 0,
            other => BAND_BOUNDARIES[other as usize - 1],
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(idx: u8) -> Option<RatingBand> {
        Self::ALL.get(idx as usize).copied()
    }

    /// Parse from a band's minimum rating, as accepted by the `ratings[]`
    /// query parameter (§6): the band whose `min()` equals `value`.
    pub fn from_min(value: u16) -> Option<RatingBand> {
        Self::ALL.into_iter().find(|b| b.min() == value)
    }
}

impl fmt::Display for RatingBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.min())
    }
}
