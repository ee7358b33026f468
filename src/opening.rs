//! Opening-name lookup is an explicit external collaborator (spec §1
//! Non-goals): this crate only defines the seam a real lookup plugs into.

pub struct Opening {
    pub eco: String,
    pub name: String,
}

pub trait OpeningLookup: Send + Sync {
    fn lookup(&self, fen: &str) -> Option<Opening>;
}

/// The default wiring: no opening database is bundled, so every lookup
/// misses. Swapped out by whatever embeds this crate.
pub struct NoOpeningLookup;

impl OpeningLookup for NoOpeningLookup {
    fn lookup(&self, _fen: &str) -> Option<Opening> {
        None
    }
}
