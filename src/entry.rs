//! `Entry`: the sparse `(RatingBand x SpeedBucket) -> SubEntry` cross product
//! serialized as blocks (spec §4.4).

use std::collections::HashSet;
use std::io::Cursor;

use rustc_hash::FxHashMap;

use crate::codec::{read_varuint, write_varuint, MoveToken};
use crate::error::{DecodeError, DecodeResult};
use crate::gameref::GameRef;
use crate::rating::RatingBand;
use crate::speed::SpeedBucket;
use crate::subentry::{remaining, select_recent_games, SubEntry};

pub const MAX_RECENT_GAMES: usize = 2;
pub const MAX_TOP_GAMES: usize = 4;

pub type CellKey = (RatingBand, SpeedBucket);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    pub sub: FxHashMap<CellKey, SubEntry>,
}

impl Entry {
    pub fn is_empty(&self) -> bool {
        self.sub.is_empty()
    }

    pub fn total_games(&self) -> u64 {
        self.sub.values().map(SubEntry::total_games).sum()
    }

    pub fn cell(&self, band: RatingBand, speed: SpeedBucket) -> Option<&SubEntry> {
        self.sub.get(&(band, speed))
    }

    /// `insertRef`: route `game` into its natural cell, keyed by
    /// `(RatingBand.of(game.averageRating), game.speed)`.
    pub fn insert_ref(&mut self, game: GameRef, mv: MoveToken) {
        let key = (RatingBand::of(game.average_rating), game.speed);
        self.sub.entry(key).or_default().insert(game, mv);
    }

    /// Inverse of [`Entry::insert_ref`], used by the master database's
    /// `delete` operation. The cell is dropped entirely once it empties.
    pub fn remove_ref(&mut self, game: &GameRef, mv: MoveToken) {
        let key = (RatingBand::of(game.average_rating), game.speed);
        if let Some(cell) = self.sub.get_mut(&key) {
            cell.remove(game, mv);
            if cell.is_empty() {
                self.sub.remove(&key);
            }
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let top_by_speed = self.top_games_per_speed(MAX_TOP_GAMES);

        let mut keys: Vec<CellKey> = self.sub.keys().copied().collect();
        keys.sort();

        for key in keys {
            let (band, speed) = key;
            let sub = &self.sub[&key];
            let recent = select_recent_games(&sub.games, MAX_RECENT_GAMES);
            let top_for_band = top_by_speed
                .get(&speed)
                .into_iter()
                .flatten()
                .filter(|g| RatingBand::of(g.average_rating) == band);

            let mut seen = HashSet::new();
            let mut block_games = Vec::new();
            for g in recent.iter().chain(top_for_band) {
                if seen.insert(g.id) {
                    block_games.push(*g);
                }
            }
            if block_games.is_empty() {
                // A cell only exists if it has recorded at least one game,
                // so recent selection alone guarantees this is non-empty.
                continue;
            }

            write_varuint(&mut out, block_games.len() as u64)
                .expect("writing to a Vec cannot fail");
            for g in &block_games {
                g.write(&mut out).expect("writing to a Vec cannot fail");
            }
            sub.write_moves(&mut out).expect("writing to a Vec cannot fail");
        }

        out
    }

    pub fn decode(buf: &[u8]) -> DecodeResult<Entry> {
        let mut cursor = Cursor::new(buf);
        let mut sub = FxHashMap::default();

        while remaining(&cursor) > 0 {
            let n = read_varuint(&mut cursor)?;
            if n == 0 {
                return Err(DecodeError::Malformed("entry block with zero games"));
            }
            let mut games = Vec::with_capacity(n as usize);
            for _ in 0..n {
                games.push(GameRef::read(&mut cursor)?);
            }
            let band = RatingBand::of(games[0].average_rating);
            let speed = games[0].speed;
            for g in &games {
                if RatingBand::of(g.average_rating) != band || g.speed != speed {
                    return Err(DecodeError::Malformed(
                        "entry block mixes games from different cells",
                    ));
                }
            }
            let moves = SubEntry::read_moves(&mut cursor)?;
            sub.insert((band, speed), SubEntry { moves, games });
        }

        Ok(Entry { sub })
    }

    /// For each speed bucket, the top `max` games by `averageRating` across
    /// *all* bands currently retained for that speed (spec §4.4 "Across
    /// speeds" selection).
    fn top_games_per_speed(&self, max: usize) -> FxHashMap<SpeedBucket, Vec<GameRef>> {
        let mut by_speed: FxHashMap<SpeedBucket, Vec<GameRef>> = FxHashMap::default();
        for ((_, speed), sub) in &self.sub {
            by_speed.entry(*speed).or_default().extend(sub.games.iter().copied());
        }
        for games in by_speed.values_mut() {
            games.sort_by(|a, b| b.average_rating.cmp(&a.average_rating));
            games.truncate(max);
        }
        by_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gameref::{GameId, Winner};

    fn mv() -> MoveToken {
        MoveToken::board_move(6, 21, None)
    }

    fn gref(id: &str, winner: Winner, speed: SpeedBucket, rating: u16) -> GameRef {
        GameRef::new(GameId::from_str_id(id).unwrap(), winner, speed, rating)
    }

    #[test]
    fn single_game_recency_and_top() {
        let mut entry = Entry::default();
        entry.insert_ref(
            gref("ref00000", Winner::White, SpeedBucket::Bullet, 1999),
            mv(),
        );
        let encoded = entry.encode();
        let decoded = Entry::decode(&encoded).unwrap();
        assert_eq!(decoded.total_games(), 1);
        let cell = decoded.cell(RatingBand::of(1999), SpeedBucket::Bullet).unwrap();
        assert_eq!(cell.games.len(), 1);
        assert_eq!(cell.games[0].id.to_str_id(), "ref00000");
    }

    #[test]
    fn chronological_recency_truncates_to_two() {
        let mut entry = Entry::default();
        for (id, rating) in [
            ("g0000001", 2620u16),
            ("g0000002", 2610),
            ("g0000003", 2650),
        ] {
            entry.insert_ref(
                gref(id, Winner::Draw, SpeedBucket::Classical, rating),
                mv(),
            );
        }
        let decoded = Entry::decode(&entry.encode()).unwrap();
        // All three ratings land in the same band, so the block's games are
        // written recent-first: the cell's leading two entries are exactly
        // the two most recently inserted, per spec scenario 2.
        let cell = decoded
            .cell(RatingBand::of(2620), SpeedBucket::Classical)
            .unwrap();
        let recent = select_recent_games(&cell.games, MAX_RECENT_GAMES);
        let ids: Vec<_> = recent.iter().map(|g| g.id.to_str_id()).collect();
        assert_eq!(ids, vec!["g0000003", "g0000002"]);
    }

    #[test]
    fn top_games_are_isolated_per_speed() {
        let mut entry = Entry::default();
        for (i, rating) in (2501..2510u16).enumerate() {
            entry.insert_ref(
                gref(&format!("c{i:07}"), Winner::White, SpeedBucket::Classical, rating),
                mv(),
            );
        }
        entry.insert_ref(
            gref("abcdefgh", Winner::White, SpeedBucket::Classical, 2871),
            mv(),
        );
        for (i, rating) in (2777..2786u16).enumerate() {
            entry.insert_ref(
                gref(&format!("h{i:07}"), Winner::Black, SpeedBucket::Bullet, rating),
                mv(),
            );
        }

        let decoded = Entry::decode(&entry.encode()).unwrap();
        let top_by_speed = decoded.top_games_per_speed(MAX_TOP_GAMES);
        let classical_top = &top_by_speed[&SpeedBucket::Classical];
        assert!(classical_top.iter().any(|g| g.id.to_str_id() == "abcdefgh"));
    }
}
