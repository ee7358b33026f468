//! Aggregation of a position's stored record into the shape returned to
//! callers: outcome totals, ranked per-move breakdown, and the notable-games
//! lists (spec §4.6 "Query").
//!
//! This module knows how to read an [`Entry`]/[`MasterEntry`] and a
//! [`crate::position::Situation`]; it says nothing about HTTP or JSON, the
//! way the teacher keeps `game.rs` free of `axum` types.

use rustc_hash::FxHashMap;

use crate::codec::MoveToken;
use crate::entry::Entry;
use crate::error::ExplorerError;
use crate::gameref::GameRef;
use crate::master_entry::MasterEntry;
use crate::position::Situation;
use crate::rating::RatingBand;
use crate::speed::SpeedBucket;
use crate::stats::MoveStats;
use crate::store::{PackedRecord, PositionStore};

/// The band/speed/quantity filters a caller supplies (spec §6 query params).
/// Empty `bands`/`speeds` means "no restriction" — every band or speed is
/// eligible, matching the API default of omitting `ratings[]`/`speeds[]`.
#[derive(Clone, Debug)]
pub struct QueryFilter {
    pub bands: Vec<RatingBand>,
    pub speeds: Vec<SpeedBucket>,
    pub max_moves: usize,
    pub top_games: usize,
    pub recent_games: usize,
}

impl Default for QueryFilter {
    fn default() -> Self {
        QueryFilter {
            bands: Vec::new(),
            speeds: Vec::new(),
            max_moves: 12,
            top_games: 4,
            recent_games: 2,
        }
    }
}

impl QueryFilter {
    fn band_allowed(&self, band: RatingBand) -> bool {
        self.bands.is_empty() || self.bands.contains(&band)
    }

    fn speed_allowed(&self, speed: SpeedBucket) -> bool {
        self.speeds.is_empty() || self.speeds.contains(&speed)
    }
}

/// One legal move annotated with its move-specific outcome counts.
pub struct ExplorerMove {
    pub uci: String,
    pub san: String,
    pub stats: MoveStats,
}

pub struct ExplorerResponse {
    pub white: u64,
    pub draws: u64,
    pub black: u64,
    pub average_rating: Option<u32>,
    pub moves: Vec<ExplorerMove>,
    pub top_games: Vec<GameRef>,
    pub recent_games: Vec<GameRef>,
}

fn totals(moves: &FxHashMap<MoveToken, MoveStats>) -> MoveStats {
    let mut total = MoveStats::default();
    for stats in moves.values() {
        total += *stats;
    }
    total
}

fn rank_and_annotate(
    situation: &Situation,
    moves: FxHashMap<MoveToken, MoveStats>,
    max_moves: usize,
) -> Vec<ExplorerMove> {
    let legal = situation.legal_moves();
    let mut ranked: Vec<_> = moves.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total().cmp(&a.1.total()).then(a.0 .0.cmp(&b.0 .0)));
    ranked.truncate(max_moves);

    ranked
        .into_iter()
        .filter_map(|(token, stats)| {
            let legal_move = legal.iter().find(|m| m.token == token)?;
            Some(ExplorerMove {
                uci: situation.uci(&legal_move.mv),
                san: situation.san(&legal_move.mv),
                stats,
            })
        })
        .collect()
}

/// Aggregates an [`Entry`]'s cells matching `filter`'s bands/speeds.
pub fn query_entry(entry: &Entry, situation: &Situation, filter: &QueryFilter) -> ExplorerResponse {
    let mut moves: FxHashMap<MoveToken, MoveStats> = FxHashMap::default();
    let mut recent_games = Vec::new();

    for ((band, speed), sub) in &entry.sub {
        if !filter.band_allowed(*band) || !filter.speed_allowed(*speed) {
            continue;
        }
        for (mv, stats) in &sub.moves {
            *moves.entry(*mv).or_default() += *stats;
        }
        recent_games.extend(sub.games.iter().copied());
    }
    recent_games.truncate(filter.recent_games);

    let top_games = top_games_for_entry(entry, filter);
    let total = totals(&moves);

    ExplorerResponse {
        white: total.white,
        draws: total.draws,
        black: total.black,
        average_rating: total.average_rating(),
        moves: rank_and_annotate(situation, moves, filter.max_moves),
        top_games,
        recent_games,
    }
}

/// The "top games" rule (spec §4.6): candidates are drawn from *every* band
/// for the requested speeds, ranked by rating, then admitted only if the
/// single highest-rated candidate's own band is itself one of the requested
/// bands — otherwise a rating-1000 query would surface a 2900-rated game
/// that has nothing to do with the position's typical rating range, so the
/// whole list is withheld rather than filtered game-by-game.
fn top_games_for_entry(entry: &Entry, filter: &QueryFilter) -> Vec<GameRef> {
    let mut candidates: Vec<GameRef> = entry
        .sub
        .iter()
        .filter(|((_, speed), _)| filter.speed_allowed(*speed))
        .flat_map(|(_, sub)| sub.games.iter().copied())
        .collect();
    candidates.sort_by(|a, b| b.average_rating.cmp(&a.average_rating));

    match candidates.first() {
        Some(top) if filter.band_allowed(RatingBand::of(top.average_rating)) => {
            candidates.truncate(filter.top_games.min(4));
            candidates
        }
        _ => Vec::new(),
    }
}

/// Aggregates a [`MasterEntry`], which has no band/speed partitioning: only
/// `max_moves`/`top_games`/`recent_games` from `filter` apply.
pub fn query_master(entry: &MasterEntry, situation: &Situation, filter: &QueryFilter) -> ExplorerResponse {
    let total = totals(&entry.sub.moves);
    let mut recent_games = entry.sub.games.clone();
    recent_games.truncate(filter.recent_games);
    let mut top_games = entry.top_games();
    top_games.truncate(filter.top_games.min(4));

    ExplorerResponse {
        white: total.white,
        draws: total.draws,
        black: total.black,
        average_rating: total.average_rating(),
        moves: rank_and_annotate(situation, entry.sub.moves.clone(), filter.max_moves),
        top_games,
        recent_games,
    }
}

/// Convenience wrapper: read the record for `situation` out of `store`
/// (treating an absent key as the empty record) and aggregate it.
pub fn explore<T: PackedRecord>(
    store: &PositionStore<T>,
    situation: &Situation,
    filter: &QueryFilter,
    aggregate: impl FnOnce(&T, &Situation, &QueryFilter) -> ExplorerResponse,
) -> Result<ExplorerResponse, ExplorerError> {
    let record = store.get(situation.hash())?.unwrap_or_default();
    Ok(aggregate(&record, situation, filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gameref::{GameId, Winner};
    use crate::variant::Variant;

    fn gref(id: &str, speed: SpeedBucket, rating: u16) -> GameRef {
        GameRef::new(GameId::from_str_id(id).unwrap(), Winner::White, speed, rating)
    }

    #[test]
    fn top_games_withheld_when_highest_candidate_out_of_band() {
        let mut entry = Entry::default();
        let mv = MoveToken::board_move(12, 28, None);
        entry.insert_ref(gref("g0000001", SpeedBucket::Blitz, 900), mv);
        entry.insert_ref(gref("g0000002", SpeedBucket::Blitz, 2900), mv);

        let filter = QueryFilter {
            bands: vec![RatingBand::Below1000],
            ..QueryFilter::default()
        };
        let top = top_games_for_entry(&entry, &filter);
        assert!(top.is_empty());
    }

    #[test]
    fn top_games_present_when_highest_candidate_in_band() {
        let mut entry = Entry::default();
        let mv = MoveToken::board_move(12, 28, None);
        entry.insert_ref(gref("g0000001", SpeedBucket::Blitz, 2650), mv);
        entry.insert_ref(gref("g0000002", SpeedBucket::Blitz, 2610), mv);

        let filter = QueryFilter {
            bands: vec![RatingBand::B2600],
            ..QueryFilter::default()
        };
        let top = top_games_for_entry(&entry, &filter);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id.to_str_id(), "g0000001");
    }

    #[test]
    fn query_entry_ranks_moves_and_sums_totals() {
        let mut entry = Entry::default();
        let e4 = MoveToken::board_move(12, 28, None);
        let d4 = MoveToken::board_move(11, 27, None);
        entry.insert_ref(gref("g0000001", SpeedBucket::Blitz, 1500), e4);
        entry.insert_ref(gref("g0000002", SpeedBucket::Blitz, 1600), e4);
        entry.insert_ref(gref("g0000003", SpeedBucket::Blitz, 1550), d4);

        let situation = Situation::starting(Variant::Standard);
        let resp = query_entry(&entry, &situation, &QueryFilter::default());
        assert_eq!(resp.white, 3);
        assert_eq!(resp.moves.first().map(|m| m.uci.as_str()), Some("e2e4"));
    }
}
