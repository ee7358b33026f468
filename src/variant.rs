//! The `variant` enumeration of spec §6, and the 16-byte position key shared
//! by every per-variant store.

use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Variant {
    Standard,
    Chess960,
    FromPosition,
    KingOfTheHill,
    ThreeCheck,
    Antichess,
    Atomic,
    Horde,
    RacingKings,
    Crazyhouse,
}

impl Variant {
    pub const ALL: [Variant; 10] = [
        Variant::Standard,
        Variant::Chess960,
        Variant::FromPosition,
        Variant::KingOfTheHill,
        Variant::ThreeCheck,
        Variant::Antichess,
        Variant::Atomic,
        Variant::Horde,
        Variant::RacingKings,
        Variant::Crazyhouse,
    ];

    /// The lowercase name used both as the `variant` query parameter and as
    /// the `{variant}.kct` store file stem (spec §6).
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Standard => "chess",
            Variant::Chess960 => "chess960",
            Variant::FromPosition => "fromPosition",
            Variant::KingOfTheHill => "kingOfTheHill",
            Variant::ThreeCheck => "threeCheck",
            Variant::Antichess => "antichess",
            Variant::Atomic => "atomic",
            Variant::Horde => "horde",
            Variant::RacingKings => "racingKings",
            Variant::Crazyhouse => "crazyhouse",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Variant> {
        match s {
            "chess" | "standard" => Some(Variant::Standard),
            "chess960" => Some(Variant::Chess960),
            "fromPosition" => Some(Variant::FromPosition),
            "kingOfTheHill" => Some(Variant::KingOfTheHill),
            "threeCheck" => Some(Variant::ThreeCheck),
            "antichess" => Some(Variant::Antichess),
            "atomic" => Some(Variant::Atomic),
            "horde" => Some(Variant::Horde),
            "racingKings" => Some(Variant::RacingKings),
            "crazyhouse" => Some(Variant::Crazyhouse),
            _ => None,
        }
    }

    /// Whether this variant allows piece drops (only Crazyhouse), which
    /// affects move-token interpretation (spec §3).
    pub fn allows_drops(self) -> bool {
        matches!(self, Variant::Crazyhouse)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 128-bit Zobrist position hash: the sole key into a variant's position
/// store (spec §3 "Position key").
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey(pub [u8; 16]);

impl PositionKey {
    pub fn from_u128(v: u128) -> PositionKey {
        PositionKey(v.to_be_bytes())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
