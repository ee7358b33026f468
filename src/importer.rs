//! PGN ingestion (spec §4.7): lex one game's movetext with `pgn-reader`,
//! replay it ply by ply through the rule-engine seam in [`crate::position`],
//! and merge each resulting position into a [`PositionStore`].
//!
//! Two pipelines share the replay logic but differ in their reject rules and
//! what auxiliary record marks a game as already ingested: the master
//! (strong human games) pipeline keys dedup off [`PgnStore`], the Lichess
//! pipeline off [`GameInfoStore`]. The Lichess pipeline's dedup write is a
//! first-write-wins insert performed *before* the position merges, so that a
//! losing concurrent import never reaches `positionStore.merge` at all (spec
//! §4.7, §5 "Cancellation": only the winner merges).

use std::collections::BTreeMap;

use pgn_reader::{BufferedReader, RawHeader, SanPlus, Skip, Visitor};

use crate::auxstore::{GameInfo, GameInfoStore, PgnStore};
use crate::entry::Entry;
use crate::error::ExplorerError;
use crate::gameref::{GameId, GameRef, Winner};
use crate::master_entry::MasterEntry;
use crate::position::{move_to_token, Situation};
use crate::speed::SpeedBucket;
use crate::store::{PackedRecord, PositionStore};
use crate::variant::Variant;

#[derive(Default)]
struct GameRecord {
    headers: BTreeMap<String, String>,
    sans: Vec<SanPlus>,
}

#[derive(Default)]
struct GameCollector {
    current: GameRecord,
}

impl Visitor for GameCollector {
    type Result = GameRecord;

    fn begin_game(&mut self) {
        self.current = GameRecord::default();
    }

    fn header(&mut self, key: &[u8], value: RawHeader<'_>) {
        if let (Ok(key), Ok(value)) = (std::str::from_utf8(key), value.decode_utf8()) {
            self.current.headers.insert(key.to_string(), value.into_owned());
        }
    }

    fn end_headers(&mut self) -> Skip {
        Skip(false)
    }

    fn san(&mut self, san_plus: SanPlus) {
        self.current.sans.push(san_plus);
    }

    fn begin_variation(&mut self) -> Skip {
        // Side lines are not part of the game actually played; only the
        // mainline is indexed.
        Skip(true)
    }

    fn end_game(&mut self) -> Self::Result {
        std::mem::take(&mut self.current)
    }
}

fn parse_single_game(pgn_text: &str) -> Result<GameRecord, ExplorerError> {
    let mut reader = BufferedReader::new(pgn_text.as_bytes());
    let mut visitor = GameCollector::default();
    reader
        .read_game(&mut visitor)
        .map_err(|e| ExplorerError::Validation(format!("PGN parse error: {e}")))?
        .ok_or_else(|| ExplorerError::Validation("no game found in PGN text".into()))
}

fn header_variant(headers: &BTreeMap<String, String>) -> Variant {
    headers
        .get("Variant")
        .and_then(|v| Variant::from_str_opt(v))
        .unwrap_or(Variant::Standard)
}

/// A lichess-style `Site` tag ends in the 8-character game id; falls back to
/// a random id (e.g. for hand-written test PGNs with no such tag).
fn extract_game_id(headers: &BTreeMap<String, String>) -> GameId {
    headers
        .get("Site")
        .and_then(|site| site.rsplit('/').next())
        .and_then(GameId::from_str_id)
        .unwrap_or_else(GameId::random)
}

fn extract_winner(headers: &BTreeMap<String, String>) -> Winner {
    match headers.get("Result").map(String::as_str) {
        Some("1-0") => Winner::White,
        Some("0-1") => Winner::Black,
        _ => Winner::Draw,
    }
}

fn extract_speed(headers: &BTreeMap<String, String>) -> SpeedBucket {
    headers
        .get("TimeControl")
        .map(|tc| SpeedBucket::classify_time_control(tc))
        .unwrap_or(SpeedBucket::Classical)
}

fn extract_average_rating(headers: &BTreeMap<String, String>) -> Option<u16> {
    let white: u32 = headers.get("WhiteElo")?.parse().ok()?;
    let black: u32 = headers.get("BlackElo")?.parse().ok()?;
    Some(((white + black) / 2) as u16)
}

pub struct ImportOutcome {
    pub game_id: GameId,
    pub plies_indexed: usize,
}

/// Replays `record`'s mainline, merging `game` into `store` at every
/// position reached, up to `max_plies` half-moves. Stops (without error) if
/// a SAN move cannot be resolved against the current position, since PGN
/// truncated mid-game by an upstream source is expected, not malformed.
fn index_game<T: PackedRecord>(
    store: &PositionStore<T>,
    record: &GameRecord,
    game: GameRef,
    max_plies: usize,
) -> Result<usize, ExplorerError> {
    let variant = header_variant(&record.headers);
    let mut situation = match record.headers.get("FEN") {
        Some(fen) => Situation::from_fen(variant, fen)?,
        None => Situation::starting(variant),
    };

    let mut indexed = 0;
    for san_plus in record.sans.iter().take(max_plies) {
        let Ok(mv) = situation.resolve_san(&san_plus.san) else {
            break;
        };
        let Some(token) = move_to_token(&mv) else {
            break;
        };
        store.merge(situation.hash(), game, token)?;
        situation = situation.play(&mv);
        indexed += 1;
    }
    Ok(indexed)
}

/// Inverse of [`index_game`]: subtracts `game` from every position its
/// mainline reached, for the master delete pipeline (spec §6
/// `DELETE /master/{id}`).
fn deindex_game<T: PackedRecord>(
    store: &PositionStore<T>,
    record: &GameRecord,
    game: GameRef,
    max_plies: usize,
) -> Result<usize, ExplorerError> {
    let variant = header_variant(&record.headers);
    let mut situation = match record.headers.get("FEN") {
        Some(fen) => Situation::from_fen(variant, fen)?,
        None => Situation::starting(variant),
    };

    let mut removed = 0;
    for san_plus in record.sans.iter().take(max_plies) {
        let Ok(mv) = situation.resolve_san(&san_plus.san) else {
            break;
        };
        let Some(token) = move_to_token(&mv) else {
            break;
        };
        store.subtract(situation.hash(), game, token)?;
        situation = situation.play(&mv);
        removed += 1;
    }
    Ok(removed)
}

/// Deletes a previously imported master game: re-derives its `GameRef` from
/// the stored PGN, subtracts it from every position it touched, then drops
/// the PGN text itself (last, so a crash mid-delete leaves the PGN as
/// evidence the subtraction may be incomplete rather than silently losing
/// it).
pub fn delete_master_game(
    store: &PositionStore<MasterEntry>,
    pgn_store: &PgnStore,
    game_id: GameId,
    max_plies: usize,
) -> Result<usize, ExplorerError> {
    let pgn_text = pgn_store.get(game_id)?.ok_or(ExplorerError::NotFound)?;
    let record = parse_single_game(&pgn_text)?;
    let rating = extract_average_rating(&record.headers).unwrap_or(0);
    let game = GameRef::new(
        game_id,
        extract_winner(&record.headers),
        extract_speed(&record.headers),
        rating,
    );
    let plies_removed = deindex_game(store, &record, game, max_plies)?;
    pgn_store.delete(game_id)?;
    Ok(plies_removed)
}

/// Ingests games for the master (strong human games) database: standard
/// chess only, rejecting anything below `min_rating` (spec default 2200).
pub struct MasterImporter<'a> {
    pub store: &'a PositionStore<MasterEntry>,
    pub pgn_store: &'a PgnStore,
    pub min_rating: u16,
    pub max_plies: usize,
}

impl<'a> MasterImporter<'a> {
    pub fn import_one(&self, pgn_text: &str) -> Result<ImportOutcome, ExplorerError> {
        let record = parse_single_game(pgn_text)?;
        let game_id = extract_game_id(&record.headers);

        if self.pgn_store.contains(game_id)? {
            return Err(ExplorerError::ImportReject(format!(
                "duplicate game id {}",
                game_id.to_str_id()
            )));
        }
        if header_variant(&record.headers) != Variant::Standard {
            return Err(ExplorerError::ImportReject(
                "master database indexes standard chess only".into(),
            ));
        }
        let initial = match record.headers.get("FEN") {
            Some(fen) => Situation::from_fen(Variant::Standard, fen)?,
            None => Situation::starting(Variant::Standard),
        };
        if !initial.is_starting_position() {
            return Err(ExplorerError::ImportReject(
                "master database indexes games from the standard starting position only".into(),
            ));
        }
        let rating = extract_average_rating(&record.headers)
            .ok_or_else(|| ExplorerError::ImportReject("missing WhiteElo/BlackElo".into()))?;
        if rating < self.min_rating {
            return Err(ExplorerError::ImportReject(format!(
                "average rating {rating} below master threshold {}",
                self.min_rating
            )));
        }

        let game = GameRef::new(
            game_id,
            extract_winner(&record.headers),
            extract_speed(&record.headers),
            rating,
        );
        let plies_indexed = index_game(self.store, &record, game, self.max_plies)?;
        self.pgn_store.store(game_id, pgn_text)?;
        Ok(ImportOutcome { game_id, plies_indexed })
    }
}

/// Ingests games for the Lichess-scale database: any rating, any variant,
/// deduplicated by [`GameInfoStore`] rather than raw PGN text (spec §4.7,
/// §6 — the Lichess pipeline never stores PGN text, only compact metadata).
pub struct LichessImporter<'a> {
    pub store: &'a PositionStore<Entry>,
    pub game_info_store: &'a GameInfoStore,
    pub max_plies: usize,
}

impl<'a> LichessImporter<'a> {
    pub fn import_one(&self, pgn_text: &str) -> Result<ImportOutcome, ExplorerError> {
        let record = parse_single_game(pgn_text)?;
        let game_id = extract_game_id(&record.headers);

        let info = GameInfo {
            white_name: record.headers.get("White").cloned().unwrap_or_default(),
            white_rating: record
                .headers
                .get("WhiteElo")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            black_name: record.headers.get("Black").cloned().unwrap_or_default(),
            black_rating: record
                .headers
                .get("BlackElo")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            year: record
                .headers
                .get("Date")
                .and_then(|d| d.get(0..4))
                .and_then(|y| y.parse().ok()),
        };
        // `store` is the dedup race's single arbiter: only whichever concurrent
        // import wins this first-write-wins insert goes on to merge, so two
        // racing imports of the same game id can never both index its plies.
        if !self.game_info_store.store(game_id, &info)? {
            return Err(ExplorerError::ImportReject(format!(
                "duplicate game id {}",
                game_id.to_str_id()
            )));
        }

        let rating = extract_average_rating(&record.headers).unwrap_or(0);
        let game = GameRef::new(
            game_id,
            extract_winner(&record.headers),
            extract_speed(&record.headers),
            rating,
        );
        let plies_indexed = index_game(self.store, &record, game, self.max_plies)?;
        Ok(ImportOutcome { game_id, plies_indexed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_MASTER_PGN: &str = "[Event \"Test\"]\n[Site \"https://lichess.org/abcdefgh\"]\n[White \"Carlsen\"]\n[Black \"Caruana\"]\n[Result \"1-0\"]\n[WhiteElo \"2850\"]\n[BlackElo \"2820\"]\n[TimeControl \"1800+0\"]\n\n1. e4 e5 2. Nf3 Nc6 1-0\n";

    const SAMPLE_LOW_RATED_PGN: &str = "[Event \"Test\"]\n[Site \"https://lichess.org/lowrated1\"]\n[White \"A\"]\n[Black \"B\"]\n[Result \"0-1\"]\n[WhiteElo \"1200\"]\n[BlackElo \"1180\"]\n[TimeControl \"300+0\"]\n\n1. d4 d5 0-1\n";

    #[test]
    fn master_importer_indexes_and_rejects_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let store: PositionStore<MasterEntry> = PositionStore::open(dir.path().join("master")).unwrap();
        let pgn_store = PgnStore::open(dir.path().join("pgn")).unwrap();
        let importer = MasterImporter {
            store: &store,
            pgn_store: &pgn_store,
            min_rating: 2200,
            max_plies: 60,
        };

        let outcome = importer.import_one(SAMPLE_MASTER_PGN).unwrap();
        assert_eq!(outcome.plies_indexed, 4);
        assert!(pgn_store.contains(outcome.game_id).unwrap());

        let err = importer.import_one(SAMPLE_MASTER_PGN).unwrap_err();
        assert!(matches!(err, ExplorerError::ImportReject(_)));
    }

    #[test]
    fn master_importer_rejects_below_rating_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let store: PositionStore<MasterEntry> = PositionStore::open(dir.path().join("master")).unwrap();
        let pgn_store = PgnStore::open(dir.path().join("pgn")).unwrap();
        let importer = MasterImporter {
            store: &store,
            pgn_store: &pgn_store,
            min_rating: 2200,
            max_plies: 60,
        };

        let err = importer.import_one(SAMPLE_LOW_RATED_PGN).unwrap_err();
        assert!(matches!(err, ExplorerError::ImportReject(_)));
    }

    #[test]
    fn delete_master_game_subtracts_and_removes_pgn() {
        let dir = tempfile::tempdir().unwrap();
        let store: PositionStore<MasterEntry> = PositionStore::open(dir.path().join("master")).unwrap();
        let pgn_store = PgnStore::open(dir.path().join("pgn")).unwrap();
        let importer = MasterImporter {
            store: &store,
            pgn_store: &pgn_store,
            min_rating: 2200,
            max_plies: 60,
        };
        let outcome = importer.import_one(SAMPLE_MASTER_PGN).unwrap();

        let removed = delete_master_game(&store, &pgn_store, outcome.game_id, 60).unwrap();
        assert_eq!(removed, outcome.plies_indexed);
        assert!(!pgn_store.contains(outcome.game_id).unwrap());

        let situation = Situation::starting(Variant::Standard);
        let entry = store.get(situation.hash()).unwrap().unwrap_or_default();
        assert_eq!(entry.total_games(), 0);
    }

    #[test]
    fn lichess_importer_stores_game_info_and_dedups() {
        let dir = tempfile::tempdir().unwrap();
        let store: PositionStore<Entry> = PositionStore::open(dir.path().join("lichess")).unwrap();
        let game_info_store = GameInfoStore::open(dir.path().join("gameinfo")).unwrap();
        let importer = LichessImporter {
            store: &store,
            game_info_store: &game_info_store,
            max_plies: 60,
        };

        let outcome = importer.import_one(SAMPLE_LOW_RATED_PGN).unwrap();
        assert_eq!(outcome.plies_indexed, 2);
        assert!(game_info_store.contains(outcome.game_id).unwrap());

        let err = importer.import_one(SAMPLE_LOW_RATED_PGN).unwrap_err();
        assert!(matches!(err, ExplorerError::ImportReject(_)));
    }
}
