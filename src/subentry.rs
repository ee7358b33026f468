//! `SubEntry`: stats plus a recent-games list for one (rating-band x
//! speed-bucket) cell, or the single cell of a `MasterEntry` (spec §3, §4.3).

use std::io::{Cursor, Write};

use rustc_hash::FxHashMap;

use crate::codec::{read_varuint, write_varuint, MoveToken};
use crate::error::DecodeResult;
use crate::gameref::GameRef;
use crate::stats::MoveStats;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubEntry {
    pub moves: FxHashMap<MoveToken, MoveStats>,
    /// Newest-first, per the invariant in spec §3.
    pub games: Vec<GameRef>,
}

impl SubEntry {
    pub fn is_empty(&self) -> bool {
        self.moves.values().all(MoveStats::is_empty) && self.games.is_empty()
    }

    pub fn total_games(&self) -> u64 {
        self.moves.values().map(MoveStats::total).sum()
    }

    /// `insert(ref, move)`: update `moves[move]` (creating it if absent) and
    /// prepend `ref` to the recent-games list.
    pub fn insert(&mut self, game: GameRef, mv: MoveToken) {
        self.moves.entry(mv).or_default().with_game(&game);
        self.games.insert(0, game);
    }

    /// Inverse of [`SubEntry::insert`]: decrements the move's counters and
    /// removes `game.id` from the recent-games list. A `MoveStats` whose
    /// total falls to zero is removed from the map.
    pub fn remove(&mut self, game: &GameRef, mv: MoveToken) {
        if let Some(stats) = self.moves.get_mut(&mv) {
            stats.without_game(game);
            if stats.is_empty() {
                self.moves.remove(&mv);
            }
        }
        if let Some(pos) = self.games.iter().position(|g| g.id == game.id) {
            self.games.remove(pos);
        }
    }

    pub fn merge_from(&mut self, other: SubEntry) {
        for (mv, stats) in other.moves {
            *self.moves.entry(mv).or_default() += stats;
        }
        self.games.extend(other.games);
    }

    /// Writes only the move-statistics portion (spec §4.3 parts 1-2); used
    /// inside an `Entry` block, where games are written separately up front.
    pub fn write_moves<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let nonempty: Vec<_> = self
            .moves
            .iter()
            .filter(|(_, stats)| !stats.is_empty())
            .collect();
        write_varuint(w, nonempty.len() as u64)?;
        for (mv, stats) in nonempty {
            mv.write(w)?;
            stats.write(w)?;
        }
        Ok(())
    }

    pub fn read_moves(cursor: &mut Cursor<&[u8]>) -> DecodeResult<FxHashMap<MoveToken, MoveStats>> {
        let count = read_varuint(cursor)?;
        let mut moves = FxHashMap::default();
        for _ in 0..count {
            let mv = MoveToken::read(cursor)?;
            let stats = MoveStats::read(cursor)?;
            moves.insert(mv, stats);
        }
        Ok(moves)
    }

    /// Full standalone encoding (spec §4.3): moves, then as many `GameRef`s
    /// as fit the selection policy, consumed by the reader until end of
    /// buffer. Used by `MasterEntry`, which is a bare `SubEntry`.
    pub fn write_full<W: Write>(&self, w: &mut W, max_top_games: usize) -> std::io::Result<()> {
        self.write_moves(w)?;
        for game in select_top_games(&self.games, max_top_games) {
            game.write(w)?;
        }
        Ok(())
    }

    pub fn read_full(buf: &[u8]) -> DecodeResult<SubEntry> {
        let mut cursor = Cursor::new(buf);
        let moves = SubEntry::read_moves(&mut cursor)?;
        let mut games = Vec::new();
        while remaining(&cursor) > 0 {
            games.push(GameRef::read(&mut cursor)?);
        }
        Ok(SubEntry { moves, games })
    }
}

pub fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    cursor.get_ref().len() - cursor.position() as usize
}

/// Top games by `averageRating`, descending, truncated to `max`. Ties break
/// in favor of the later-inserted game: since `games` is newest-first, a
/// stable sort on `Reverse(rating)` preserves that order among equal ratings.
pub fn select_top_games(games: &[GameRef], max: usize) -> Vec<GameRef> {
    let mut sorted = games.to_vec();
    sorted.sort_by(|a, b| b.average_rating.cmp(&a.average_rating));
    sorted.truncate(max);
    sorted
}

/// Most recently inserted games, truncated to `max` (the list is already
/// newest-first).
pub fn select_recent_games(games: &[GameRef], max: usize) -> Vec<GameRef> {
    games.iter().take(max).copied().collect()
}

pub type MoveMap = FxHashMap<MoveToken, MoveStats>;
