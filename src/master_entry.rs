//! `MasterEntry`: a degenerate `Entry` with a single cell and a top-games-only
//! list (spec §3, §4.3). Used by the master (human grandmaster games)
//! database, which does not partition by rating band or speed.

use crate::codec::MoveToken;
use crate::error::DecodeResult;
use crate::gameref::GameRef;
use crate::subentry::{select_top_games, SubEntry};

pub const MAX_TOP_GAMES: usize = 4;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MasterEntry {
    pub sub: SubEntry,
}

impl MasterEntry {
    pub fn is_empty(&self) -> bool {
        self.sub.is_empty()
    }

    pub fn total_games(&self) -> u64 {
        self.sub.total_games()
    }

    pub fn insert(&mut self, game: GameRef, mv: MoveToken) {
        self.sub.insert(game, mv);
    }

    pub fn remove(&mut self, game: &GameRef, mv: MoveToken) {
        self.sub.remove(game, mv);
    }

    pub fn top_games(&self) -> Vec<GameRef> {
        select_top_games(&self.sub.games, MAX_TOP_GAMES)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.sub
            .write_full(&mut out, MAX_TOP_GAMES)
            .expect("writing to a Vec cannot fail");
        out
    }

    pub fn decode(buf: &[u8]) -> DecodeResult<MasterEntry> {
        Ok(MasterEntry {
            sub: SubEntry::read_full(buf)?,
        })
    }
}
