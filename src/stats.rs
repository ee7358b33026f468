//! `MoveStats`: per-move `{white, draws, black, ratingSum}` aggregator (spec §4.3).

use std::io::{Read, Write};
use std::ops::AddAssign;

use crate::codec::{read_varuint, write_varuint};
use crate::error::DecodeResult;
use crate::gameref::{GameRef, Winner};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MoveStats {
    pub white: u64,
    pub draws: u64,
    pub black: u64,
    pub rating_sum: u64,
}

impl MoveStats {
    pub fn total(&self) -> u64 {
        self.white + self.draws + self.black
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn average_rating(&self) -> Option<u32> {
        let total = self.total();
        if total == 0 {
            None
        } else {
            Some((self.rating_sum / total) as u32)
        }
    }

    pub fn with_game(&mut self, game: &GameRef) {
        match game.winner {
            Winner::White => self.white += 1,
            Winner::Draw => self.draws += 1,
            Winner::Black => self.black += 1,
        }
        self.rating_sum += u64::from(game.average_rating);
    }

    pub fn without_game(&mut self, game: &GameRef) {
        match game.winner {
            Winner::White => self.white = self.white.saturating_sub(1),
            Winner::Draw => self.draws = self.draws.saturating_sub(1),
            Winner::Black => self.black = self.black.saturating_sub(1),
        }
        self.rating_sum = self.rating_sum.saturating_sub(u64::from(game.average_rating));
    }

    pub fn write<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_varuint(w, self.white)?;
        write_varuint(w, self.draws)?;
        write_varuint(w, self.black)?;
        write_varuint(w, self.rating_sum)
    }

    pub fn read<R: Read>(r: &mut R) -> DecodeResult<MoveStats> {
        Ok(MoveStats {
            white: read_varuint(r)?,
            draws: read_varuint(r)?,
            black: read_varuint(r)?,
            rating_sum: read_varuint(r)?,
        })
    }
}

impl AddAssign for MoveStats {
    fn add_assign(&mut self, rhs: MoveStats) {
        self.white += rhs.white;
        self.draws += rhs.draws;
        self.black += rhs.black;
        self.rating_sum += rhs.rating_sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gameref::GameId;
    use crate::speed::SpeedBucket;

    fn g(winner: Winner, rating: u16) -> GameRef {
        GameRef::new(GameId::from_str_id("aaaaaaaa").unwrap(), winner, SpeedBucket::Blitz, rating)
    }

    #[test]
    fn with_and_without_game_are_symmetric() {
        let mut stats = MoveStats::default();
        let game = g(Winner::White, 1999);
        stats.with_game(&game);
        assert_eq!(stats.white, 1);
        assert_eq!(stats.rating_sum, 1999);
        stats.without_game(&game);
        assert_eq!(stats, MoveStats::default());
    }

    #[test]
    fn average_rating() {
        let mut stats = MoveStats::default();
        stats.with_game(&g(Winner::White, 2000));
        stats.with_game(&g(Winner::Black, 3000));
        assert_eq!(stats.average_rating(), Some(2500));
    }

    #[test]
    fn roundtrip() {
        let mut stats = MoveStats::default();
        stats.with_game(&g(Winner::Draw, 1500));
        let mut buf = Vec::new();
        stats.write(&mut buf).unwrap();
        let mut cursor = &buf[..];
        assert_eq!(MoveStats::read(&mut cursor).unwrap(), stats);
    }
}
