//! `setup_square` / `update_after_edit` (spec §4.C): low-level board editing
//! plus the from-scratch recompute and validation that makes editing safe.

use super::Position;
use crate::error::SetupError;
use crate::geometry::{piece_key, ZOBRIST};
use crate::material::MaterialKey;
use crate::piece::{Color, Kind, Piece};
use crate::side::SideRecord;
use crate::square::Square;

impl Position {
    /// Edit one square, re-derive castling tags from king/rook positions,
    /// and re-run `update_after_edit`. Leaves the position unchanged (well,
    /// at the attempted edit) if the result fails validation.
    pub fn setup_square(
        &mut self,
        sq: Square,
        piece: Piece,
        side_to_move: Color,
    ) -> Result<(), SetupError> {
        self.set_piece_raw(sq, piece);
        self.update_after_edit(side_to_move)
    }

    /// Recompute side records, hashes and material key from scratch, then
    /// validate (spec §4.C). On failure the position's derived state is
    /// left freshly recomputed (so it is internally consistent) but the
    /// error is still returned — callers treat any `Err` as "setup did not
    /// succeed" regardless.
    pub fn update_after_edit(&mut self, side_to_move: Color) -> Result<(), SetupError> {
        self.retag_castle_rights();
        self.recompute_and_validate(side_to_move)
    }

    /// The shared tail of `update_after_edit`, without the home-square
    /// auto-retag: FEN parsing (component G) tags castle rights itself from
    /// the explicit `KQkq` field, which can be a strict subset of what
    /// `retag_castle_rights` would blindly grant, so it calls this instead.
    pub(crate) fn recompute_and_validate(&mut self, side_to_move: Color) -> Result<(), SetupError> {
        let white = SideRecord::recompute_from_scratch(Color::White, &self.squares);
        let black = SideRecord::recompute_from_scratch(Color::Black, &self.squares);

        validate_counts(&self.squares)?;
        validate_no_pawns_on_back_rank(&self.squares)?;

        let (active, passive) = match side_to_move {
            Color::White => (white, black),
            Color::Black => (black, white),
        };

        // The side NOT to move must not be the one in check from the side
        // to move having just "moved" into this position — i.e. the wrong
        // king must not be attacked.
        if self.squares_attack(passive.king_square(), active.colour) {
            return Err(SetupError::WrongSideInCheck);
        }

        let frame = self.frame_mut();
        frame.active = active;
        frame.passive = passive;
        frame.material_key = compute_material_key(&self.squares);
        frame.board_hash_lazy = compute_board_hash(&self.squares, side_to_move);
        frame.pawn_king_hash = compute_pawn_king_hash(&self.squares);
        frame.en_passant_lazy = None;
        frame.en_passant_node_counter = 0;
        frame.halfmove_clock = 0;
        frame.killer_moves = [0; 6];

        Ok(())
    }

    /// Recompute every derived field from scratch and compare against the
    /// live frame (spec §6.1's `position_check_invariants`, §8's universal
    /// invariants): piece-list/square cross-reference, attack-map and
    /// bishop-diagonal consistency per side, board/pawn-king hash and
    /// material key consistency, and the king-in-check asymmetry. Unlike
    /// `SideRecord::check_invariants` (debug-only, aborts), this is a
    /// public, release-build-available check that reports the first
    /// mismatch instead of panicking — for a caller (fuzzer, test harness)
    /// that wants to keep running after a failure.
    pub fn check_invariants(&self) -> Result<(), crate::error::InvariantError> {
        use crate::error::InvariantError;

        self.frame().active.verify_invariants(&self.squares)?;
        self.frame().passive.verify_invariants(&self.squares)?;

        let side_to_move = self.frame().active.colour;
        if compute_material_key(&self.squares) != self.frame().material_key {
            return Err(InvariantError::MaterialKeyMismatch);
        }
        if compute_board_hash(&self.squares, side_to_move) != self.frame().board_hash_lazy {
            return Err(InvariantError::BoardHashMismatch);
        }
        if compute_pawn_king_hash(&self.squares) != self.frame().pawn_king_hash {
            return Err(InvariantError::PawnKingHashMismatch);
        }
        if self.squares_attack(self.frame().passive.king_square(), self.frame().active.colour) {
            return Err(InvariantError::WrongSideInCheck);
        }
        Ok(())
    }

    /// Whether `target` is attacked by any piece of `by_color`, using the
    /// already-populated (or about to be populated) squares array. Used
    /// during setup before the incremental attack maps for `by_color` are
    /// trustworthy, so it walks the board directly rather than consulting
    /// a `SideRecord`.
    pub(crate) fn squares_attack(&self, target: Square, by_color: Color) -> bool {
        attacked_by(&self.squares, target, by_color)
    }

    /// Re-tag kings/rooks as castle-capable based purely on their current
    /// squares, matching the home-square test spec §6.2 requires for FEN
    /// castling rights. Call sites that want to *revoke* a right (rather
    /// than re-derive from scratch) do so by writing a plain `King`/`Rook`
    /// directly instead of calling this.
    fn retag_castle_rights(&mut self) {
        const HOME: [(Square, Square, Square); 2] = [
            (Square::new(4, 0), Square::new(0, 0), Square::new(7, 0)),
            (Square::new(4, 7), Square::new(0, 7), Square::new(7, 7)),
        ];
        for (color_idx, (king_sq, qrook_sq, krook_sq)) in HOME.into_iter().enumerate() {
            let color = if color_idx == 0 { Color::White } else { Color::Black };
            if self.squares[king_sq.index() as usize] == Piece::King(color) {
                self.squares[king_sq.index() as usize] = Piece::KingCastle(color);
            }
            for rook_sq in [qrook_sq, krook_sq] {
                if self.squares[rook_sq.index() as usize] == Piece::Rook(color) {
                    self.squares[rook_sq.index() as usize] = Piece::RookCastle(color);
                }
            }
        }
    }
}

/// Free-standing form of [`Position::squares_attack`], usable against a
/// scratch board that isn't attached to a live `Position` (FEN en-passant
/// validation probes a board with a pawn or two hypothetically lifted).
pub(crate) fn attacked_by(squares: &[Piece; 64], target: Square, by_color: Color) -> bool {
    use crate::geometry::relation;
    for i in 0..64u8 {
        let from = Square::from_index(i);
        let piece = squares[i as usize];
        if piece.color() != Some(by_color) {
            continue;
        }
        let rel = relation(from, target);
        if let Some(kind) = piece.kind() {
            match kind {
                Kind::Knight => {
                    if rel.is_knight_jump {
                        return true;
                    }
                }
                Kind::King => {
                    if let Some(dir) = rel.ray_dir {
                        let (fd, rd) = dir.deltas();
                        if from.try_offset(fd, rd) == Some(target) {
                            return true;
                        }
                    }
                }
                Kind::Pawn => {
                    if rel.pawn_capture_for == Some(by_color) {
                        return true;
                    }
                }
                Kind::Bishop | Kind::Rook | Kind::Queen => {
                    if let Some(dir) = rel.ray_dir {
                        let is_diagonal = dir.is_diagonal();
                        let slides_that_way = match kind {
                            Kind::Bishop => is_diagonal,
                            Kind::Rook => !is_diagonal,
                            _ => true,
                        };
                        if slides_that_way && ray_clear(squares, from, target, dir) {
                            return true;
                        }
                    }
                }
            }
        }
    }
    false
}

fn ray_clear(squares: &[Piece; 64], from: Square, to: Square, dir: crate::square::Direction) -> bool {
    let (fd, rd) = dir.deltas();
    let mut cur = from;
    while let Some(next) = cur.try_offset(fd, rd) {
        if next == to {
            return true;
        }
        if !squares[next.index() as usize].is_empty() {
            return false;
        }
        cur = next;
    }
    false
}

/// Reject >8 pawns or a king count other than exactly 1, per side (spec
/// §4.C). Promoted-piece surplus (e.g. three queens) is allowed by this
/// crate — it can only arise from a promotion the generator itself made,
/// never from a hand-edited position with legal piece counts, and the
/// spec's ceiling here is a defence against malformed FEN, not a rules
/// check.
fn validate_counts(squares: &[Piece; 64]) -> Result<(), SetupError> {
    let mut pawns = [0u32; 2];
    let mut kings = [0u32; 2];
    for &piece in squares.iter() {
        if let Some(color) = piece.color() {
            if piece.is_pawn() {
                pawns[color.index()] += 1;
            } else if piece.is_king() {
                kings[color.index()] += 1;
            }
        }
    }
    for color in [Color::White, Color::Black] {
        if pawns[color.index()] > 8 {
            return Err(SetupError::TooManyPawns(color, pawns[color.index()]));
        }
        if kings[color.index()] != 1 {
            return Err(SetupError::WrongKingCount(color, kings[color.index()]));
        }
    }
    Ok(())
}

fn validate_no_pawns_on_back_rank(squares: &[Piece; 64]) -> Result<(), SetupError> {
    for i in 0..64u8 {
        let sq = Square::from_index(i);
        if squares[i as usize].is_pawn() && (sq.rank() == 0 || sq.rank() == 7) {
            return Err(SetupError::PawnOnBackRank(sq));
        }
    }
    Ok(())
}

pub(crate) fn compute_material_key(squares: &[Piece; 64]) -> MaterialKey {
    let mut key = MaterialKey::default();
    for i in 0..64u8 {
        let piece = squares[i as usize];
        if let (Some(color), Some(kind)) = (piece.color(), piece.kind()) {
            if matches!(kind, Kind::King) {
                continue;
            }
            let bishop_light = if matches!(kind, Kind::Bishop) {
                let sq = Square::from_index(i);
                Some((sq.file() + sq.rank()) % 2 == 1)
            } else {
                None
            };
            key.add(color, bishop_light, kind);
        }
    }
    key
}

/// `~board_hash_lazy` complements side-to-move (spec §4.D); for a freshly
/// computed hash we fold that in directly instead of always storing the
/// white-to-move orientation and complementing once.
pub(crate) fn compute_board_hash(squares: &[Piece; 64], side_to_move: Color) -> u64 {
    let mut hash = 0u64;
    for i in 0..64u8 {
        let piece = squares[i as usize];
        let sq = Square::from_index(i);
        if let (Some(color), Some(kind)) = (piece.color(), piece.kind()) {
            hash ^= piece_key(color, kind, sq);
            if piece.has_castle_rights() {
                if piece.is_king() {
                    hash ^= ZOBRIST.castle_king[color.index()][i as usize];
                } else if piece.is_rook() {
                    hash ^= ZOBRIST.castle_rook[color.index()][i as usize];
                }
            }
        }
    }
    if side_to_move == Color::Black {
        hash = !hash;
    }
    hash
}

pub(crate) fn compute_pawn_king_hash(squares: &[Piece; 64]) -> u64 {
    let mut hash = 0u64;
    for i in 0..64u8 {
        let piece = squares[i as usize];
        let sq = Square::from_index(i);
        if let (Some(color), Some(kind)) = (piece.color(), piece.kind()) {
            match kind {
                Kind::Pawn | Kind::King => hash ^= piece_key(color, kind, sq),
                _ => {}
            }
            if piece.has_castle_rights() {
                if piece.is_king() {
                    hash ^= ZOBRIST.castle_king[color.index()][i as usize];
                } else if piece.is_rook() {
                    hash ^= ZOBRIST.castle_rook[color.index()][i as usize];
                }
            }
        }
    }
    hash
}
