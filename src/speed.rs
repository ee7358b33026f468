//! `SpeedBucket`: the time-control classification of §6.
//!
//! `TimeControl = "base+inc"` classifies into bullet/blitz/rapid/classical by
//! `base + 40 * inc`; correspondence folds into classical (spec §3); literal
//! `"-"` or a missing time control also classifies as classical.

use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SpeedBucket {
    Bullet = 0,
    Blitz = 1,
    Rapid = 2,
    Classical = 3,
}

impl SpeedBucket {
    pub const ALL: [SpeedBucket; 4] = [
        SpeedBucket::Bullet,
        SpeedBucket::Blitz,
        SpeedBucket::Rapid,
        SpeedBucket::Classical,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(idx: u8) -> Option<SpeedBucket> {
        Self::ALL.get(idx as usize).copied()
    }

    /// Classify a `TimeControl` tag value such as `"180+2"` or `"-"`.
    pub fn classify_time_control(tc: &str) -> SpeedBucket {
        if tc == "-" {
            return SpeedBucket::Classical;
        }
        let Some((base_str, inc_str)) = tc.split_once('+') else {
            return SpeedBucket::Classical;
        };
        let (Ok(base), Ok(inc)) = (base_str.parse::<u32>(), inc_str.parse::<u32>()) else {
            return SpeedBucket::Classical;
        };
        Self::classify(base, inc)
    }

    pub fn classify(base_seconds: u32, increment_seconds: u32) -> SpeedBucket {
        let estimate = base_seconds + 40 * increment_seconds;
        match estimate {
            0..=179 => SpeedBucket::Bullet,
            180..=479 => SpeedBucket::Blitz,
            480..=1499 => SpeedBucket::Rapid,
            _ => SpeedBucket::Classical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpeedBucket::Bullet => "bullet",
            SpeedBucket::Blitz => "blitz",
            SpeedBucket::Rapid => "rapid",
            SpeedBucket::Classical => "classical",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<SpeedBucket> {
        match s {
            "bullet" => Some(SpeedBucket::Bullet),
            "blitz" => Some(SpeedBucket::Blitz),
            "rapid" => Some(SpeedBucket::Rapid),
            "classical" => Some(SpeedBucket::Classical),
            _ => None,
        }
    }
}

impl fmt::Display for SpeedBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_examples_from_spec() {
        assert_eq!(SpeedBucket::classify_time_control("60+1"), SpeedBucket::Bullet);
        assert_eq!(SpeedBucket::classify_time_control("180+0"), SpeedBucket::Blitz);
        assert_eq!(SpeedBucket::classify_time_control("600+0"), SpeedBucket::Classical);
        assert_eq!(SpeedBucket::classify_time_control("-"), SpeedBucket::Classical);
    }

    #[test]
    fn missing_time_control_is_classical() {
        assert_eq!(SpeedBucket::classify_time_control("garbage"), SpeedBucket::Classical);
    }

    #[test]
    fn boundaries() {
        assert_eq!(SpeedBucket::classify(179, 0), SpeedBucket::Bullet);
        assert_eq!(SpeedBucket::classify(180, 0), SpeedBucket::Blitz);
        assert_eq!(SpeedBucket::classify(479, 0), SpeedBucket::Blitz);
        assert_eq!(SpeedBucket::classify(480, 0), SpeedBucket::Rapid);
        assert_eq!(SpeedBucket::classify(1499, 0), SpeedBucket::Rapid);
        assert_eq!(SpeedBucket::classify(1500, 0), SpeedBucket::Classical);
    }
}
