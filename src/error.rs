//! Error taxonomy (spec §7): one kind per class, not one variant per cause.
//! `ParseError` / `SetupError` are input-validation errors — surfaced to the
//! caller with a short reason, position left unchanged (parse) or re-checked
//! (square edit). `CapacityError` is the resource-exhaustion class. Internal
//! invariant violations are `debug_assert!`s, never a `Result` variant —
//! they are impossible by construction in a release build (spec §7).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected 6 FEN/EPD fields, found {0}")]
    WrongFieldCount(usize),
    #[error("piece placement: rank {0} does not sum to 8 files")]
    RankLength(u8),
    #[error("piece placement: unrecognised character '{0}'")]
    UnknownPieceChar(char),
    #[error("piece placement: expected 8 ranks separated by '/'")]
    RankCount,
    #[error("side to move must be 'w' or 'b', found '{0}'")]
    BadSideToMove(String),
    #[error("castling field contains unrecognised character '{0}'")]
    BadCastlingChar(char),
    #[error("en passant target '{0}' is not a valid square")]
    BadEnPassantSquare(String),
    #[error("en passant target {0} is not on rank 3 or rank 6")]
    EnPassantWrongRank(String),
    #[error("halfmove clock is not a non-negative integer: '{0}'")]
    BadHalfmoveClock(String),
    #[error("fullmove number is not a positive integer: '{0}'")]
    BadFullmoveNumber(String),
    #[error("move text '{0}' is not valid long algebraic notation")]
    BadMoveText(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("side to move's opponent's king is in check")]
    WrongSideInCheck,
    #[error("side {0:?} has {1} pawns, more than 8 allowed")]
    TooManyPawns(crate::piece::Color, u32),
    #[error("side {0:?} has {1} kings, expected exactly 1")]
    WrongKingCount(crate::piece::Color, u32),
    #[error("side {0:?} has {1} {2:?}, more than promotion limits allow")]
    TooManyPromoted(crate::piece::Color, u32, crate::piece::Kind),
    #[error("pawn on back rank at {0}")]
    PawnOnBackRank(crate::square::Square),
    #[error("en passant target {0} is inconsistent with board occupancy")]
    BadEnPassantOccupancy(crate::square::Square),
    #[error("en passant target {0} would uncover a diagonal check on the side-to-move king")]
    EnPassantUncoversCheck(crate::square::Square),
    #[error("castling right implies a king/rook that is not on its home square")]
    CastleRightWithoutPieces,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CapacityError {
    #[error("move buffer exhausted: more than {0} legal moves in one position")]
    MoveBufferFull(usize),
    #[error("stack frame exhausted: ply depth exceeded {0}")]
    StackOverflow(usize),
}

/// The public, non-panicking form of spec §7's "internal invariant
/// violation" class: `position_check_invariants` (spec §6.1) recomputes
/// everything from scratch and reports the first mismatch instead of
/// `debug_assert!`-ing, so a caller (e.g. a fuzzer) can keep running after
/// a mismatch rather than aborting the process.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantError {
    #[error("{0:?} piece-list/square cross-reference mismatch at slot {1}")]
    PieceListMismatch(crate::piece::Color, usize),
    #[error("{0:?} attack map does not match a from-scratch recomputation")]
    AttackMapMismatch(crate::piece::Color),
    #[error("{0:?} bishop-diagonal bitset does not match a from-scratch recomputation")]
    BishopDiagonalsMismatch(crate::piece::Color),
    #[error("{0:?} last-rank-pawns bitset does not match a from-scratch recomputation")]
    LastRankPawnsMismatch(crate::piece::Color),
    #[error("board hash does not match a from-scratch recomputation")]
    BoardHashMismatch,
    #[error("pawn/king hash does not match a from-scratch recomputation")]
    PawnKingHashMismatch,
    #[error("material key does not match a from-scratch recomputation")]
    MaterialKeyMismatch,
    #[error("side to move's opponent's king is attacked")]
    WrongSideInCheck,
}
