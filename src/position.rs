//! The seam to the external chess rule engine (spec §1 Non-goals: "the chess
//! rule engine... specified only at its interface to the core"). Everything
//! else in this crate talks to a `Situation`, never to `shakmaty` directly,
//! so the core stays decoupled from move generation / Zobrist hashing / FEN
//! parsing the way spec.md requires.

use shakmaty::fen::Fen;
use shakmaty::variant::VariantPosition;
use shakmaty::zobrist::{Zobrist128, ZobristHash};
use shakmaty::{CastlingMode, EnPassantMode, Move, Position as ShakmatyPosition, Role};

use crate::codec::MoveToken;
use crate::error::ExplorerError;
use crate::moves::{drop_role_to_u8, promotion_role_to_u8};
use crate::variant::{PositionKey, Variant};

/// A position plus enough context (variant) to hash and enumerate moves.
/// Wraps `shakmaty::variant::VariantPosition`, the one type in the corpus
/// that spans every variant spec §6 lists.
#[derive(Clone)]
pub struct Situation {
    pub variant: Variant,
    pos: VariantPosition,
}

/// One legal move paired with the 16-bit token the store indexes it by.
#[derive(Clone)]
pub struct LegalMove {
    pub token: MoveToken,
    pub mv: Move,
}

impl Situation {
    pub fn from_fen(variant: Variant, fen: &str) -> Result<Situation, ExplorerError> {
        let setup: Fen = fen
            .parse()
            .map_err(|_| ExplorerError::Validation(format!("invalid FEN: {fen}")))?;
        let pos = VariantPosition::from_setup(
            to_shakmaty_variant(variant),
            setup.into_setup(),
            CastlingMode::Standard,
        )
        .map_err(|_| ExplorerError::Validation(format!("illegal position for {variant}: {fen}")))?;
        Ok(Situation { variant, pos })
    }

    pub fn starting(variant: Variant) -> Situation {
        Situation {
            variant,
            pos: VariantPosition::new(to_shakmaty_variant(variant)),
        }
    }

    pub fn is_starting_position(&self) -> bool {
        self.pos.board().clone() == VariantPosition::new(to_shakmaty_variant(self.variant)).board().clone()
            && self.pos.turn() == shakmaty::Color::White
    }

    /// The 128-bit Zobrist hash that keys this position's store row.
    pub fn hash(&self) -> PositionKey {
        let hash: Zobrist128 = self.pos.zobrist_hash(EnPassantMode::Legal);
        PositionKey::from_u128(hash.0)
    }

    /// Legal moves from here, each paired with its 16-bit token. A one-shot,
    /// non-restartable iterator per design note §9; castling moves that
    /// share a rook target (only possible in Chess960) are deduplicated by
    /// king destination square.
    pub fn legal_moves(&self) -> Vec<LegalMove> {
        let mut seen_castle_dest = std::collections::HashSet::new();
        let mut out = Vec::new();
        for mv in self.pos.legal_moves() {
            let Some(token) = move_to_token(&mv) else {
                continue;
            };
            if mv.is_castle() {
                if !seen_castle_dest.insert(token) {
                    continue;
                }
            }
            out.push(LegalMove { token, mv });
        }
        out
    }

    pub fn play(&self, mv: &Move) -> Situation {
        let mut next = self.pos.clone();
        next.play_unchecked(mv);
        Situation {
            variant: self.variant,
            pos: next,
        }
    }

    pub fn uci(&self, mv: &Move) -> String {
        mv.to_uci(CastlingMode::Standard).to_string()
    }

    pub fn san(&self, mv: &Move) -> String {
        shakmaty::san::San::from_move(&self.pos, mv).to_string()
    }

    /// Resolves PGN movetext's SAN against the current position — the one
    /// place the importer (spec §4.7) reaches back into the rule engine.
    pub fn resolve_san(&self, san: &shakmaty::san::San) -> Result<Move, ExplorerError> {
        san.to_move(&self.pos)
            .map_err(|_| ExplorerError::Validation(format!("illegal SAN move in variant {}", self.variant)))
    }
}

fn to_shakmaty_variant(variant: Variant) -> shakmaty::variant::Variant {
    use shakmaty::variant::Variant as SV;
    match variant {
        Variant::Standard | Variant::Chess960 | Variant::FromPosition => SV::Chess,
        Variant::KingOfTheHill => SV::KingOfTheHill,
        Variant::ThreeCheck => SV::ThreeCheck,
        Variant::Antichess => SV::Antichess,
        Variant::Atomic => SV::Atomic,
        Variant::Horde => SV::Horde,
        Variant::RacingKings => SV::RacingKings,
        Variant::Crazyhouse => SV::Crazyhouse,
    }
}

/// Translates a `shakmaty::Move` into the 16-bit board-move/drop token of
/// spec §3. Returns `None` for moves that cannot be represented (there are
/// none under the current rule set; kept as a seam for future variants).
pub(crate) fn move_to_token(mv: &Move) -> Option<MoveToken> {
    match mv {
        Move::Normal { from, to, promotion, .. } => Some(MoveToken::board_move(
            u8::from(*from),
            u8::from(*to),
            promotion.and_then(promotion_role_to_u8),
        )),
        Move::EnPassant { from, to } => Some(MoveToken::board_move(u8::from(*from), u8::from(*to), None)),
        Move::Castle { king, rook } => {
            let dest_file = if u8::from(*rook) % 8 > u8::from(*king) % 8 {
                6 // g-file: king-side
            } else {
                2 // c-file: queen-side
            };
            let rank = u8::from(*king) / 8;
            Some(MoveToken::board_move(u8::from(*king), rank * 8 + dest_file, None))
        }
        Move::Put { role, to } => Some(MoveToken::drop_move(drop_role_to_u8(*role), u8::from(*to))),
    }
}

pub fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "pawn",
        Role::Knight => "knight",
        Role::Bishop => "bishop",
        Role::Rook => "rook",
        Role::Queen => "queen",
        Role::King => "king",
    }
}
