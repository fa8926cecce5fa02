//! Component D: make/unmake (spec §4.D).
//!
//! The board (`Position::squares`) is a single array shared by the whole
//! stack; only the per-frame `UndoEntry` log needs to restore it. Each
//! side's attack map and piece list, by contrast, are cloned into the new
//! frame on every `make` and simply abandoned when `unmake` retreats the
//! stack pointer — nothing about them needs to be inverted by hand, only
//! built correctly going forward.
//!
//! Ray attack maintenance is not specialised per move kind. Whenever a
//! square's occupancy changes, [`Position::retoggle_through`] finds the
//! nearest slider (of either colour) whose ray passes through that square
//! and toggles it once against the old occupancy, once against the new —
//! since `toggle_rays` is self-inverse, the net effect is exactly "extend
//! the ray if the square emptied, block it if the square filled", without
//! needing to know which move kind caused the change.

use super::frame::{UndoEntry, UNDO_CAPACITY};
use super::Position;
use crate::attacks;
use crate::error::CapacityError;
use crate::geometry::{piece_key, ZOBRIST};
use crate::material::MaterialKey;
use crate::mv::Move;
use crate::piece::{Color, Kind, Piece};
use crate::side::SideRecord;
use crate::square::{Direction, Square};

impl Position {
    pub fn make(&mut self, mv: Move) -> Result<(), CapacityError> {
        let active_color = self.side_to_move();
        let from = mv.from();
        let moving_piece = self.piece_at(from);

        self.advance_sp()?;
        self.start_new_frame();

        let mut board_delta = 0u64;
        let mut pk_delta = 0u64;
        let mut material = self.frame().material_key;

        if matches!(moving_piece, Piece::PawnPromoRank(_)) {
            self.make_promotion(active_color, from, mv, &mut board_delta, &mut pk_delta, &mut material);
        } else if moving_piece.is_king() && (mv.to().file() as i8 - from.file() as i8).abs() == 2 {
            self.make_castle(active_color, from, mv.to(), &mut board_delta, &mut pk_delta, &mut material);
        } else if moving_piece.is_pawn()
            && mv.to().file() != from.file()
            && self.piece_at(mv.to()).is_empty()
        {
            self.make_en_passant(active_color, from, mv.to(), &mut board_delta, &mut pk_delta, &mut material);
        } else {
            self.make_normal(active_color, from, mv.to(), moving_piece, &mut board_delta, &mut pk_delta, &mut material);
        }

        let carried_board_hash = self.frame().board_hash_lazy;
        let carried_pawn_king_hash = self.frame().pawn_king_hash;
        let frame = self.frame_mut();
        frame.board_hash_lazy = !carried_board_hash ^ board_delta;
        frame.pawn_king_hash = carried_pawn_king_hash ^ pk_delta;
        frame.material_key = material;

        Ok(())
    }

    pub fn unmake(&mut self) {
        let mut buf = [UndoEntry::default(); UNDO_CAPACITY];
        let len = self.frame().undo_len as usize;
        buf[..len].copy_from_slice(self.frame().undo_entries());
        for entry in buf[..len].iter().rev() {
            self.set_piece_raw(entry.square, entry.previous);
        }
        self.retreat_sp();
    }

    pub fn make_null(&mut self) -> Result<(), CapacityError> {
        self.advance_sp()?;
        self.start_new_frame();
        let frame = self.frame_mut();
        frame.halfmove_clock = 1;
        frame.board_hash_lazy = !frame.board_hash_lazy;
        Ok(())
    }

    pub fn unmake_null(&mut self) {
        self.retreat_sp();
    }

    /// Clone the parent ply's side records into the (about to be current)
    /// frame, with active/passive swapped, and carry the hash/material
    /// carriers forward unchanged as the starting point for this ply's
    /// deltas. Does not touch the shared board.
    fn start_new_frame(&mut self) {
        let parent_active = self.parent_frame().active.clone();
        let parent_passive = self.parent_frame().passive.clone();
        let parent_halfmove = self.parent_frame().halfmove_clock;
        let parent_node_counter = self.parent_frame().node_counter;
        let parent_material = self.parent_frame().material_key;
        let parent_board_hash = self.parent_frame().board_hash_lazy;
        let parent_pawn_king_hash = self.parent_frame().pawn_king_hash;

        let frame = self.frame_mut();
        frame.active = parent_passive;
        frame.passive = parent_active;
        frame.undo_len = 0;
        frame.halfmove_clock = parent_halfmove.saturating_add(1);
        frame.node_counter = parent_node_counter.wrapping_add(1);
        frame.material_key = parent_material;
        frame.board_hash_lazy = parent_board_hash;
        frame.pawn_king_hash = parent_pawn_king_hash;
        frame.en_passant_lazy = None;
        frame.en_passant_node_counter = 0;
        frame.killer_moves = [0; 6];
    }

    fn make_promotion(
        &mut self,
        active_color: Color,
        from: Square,
        mv: Move,
        board_delta: &mut u64,
        pk_delta: &mut u64,
        material: &mut MaterialKey,
    ) {
        let forward: i8 = if active_color == Color::White { 1 } else { -1 };
        let mut candidates = Vec::with_capacity(3);
        candidates.extend(from.try_offset(0, forward));
        candidates.extend(from.try_offset(-1, forward));
        candidates.extend(from.try_offset(1, forward));
        let (to, promo_kind) = mv
            .decode_promotion(&candidates)
            .expect("promotion move word decodes against one of the pawn's reachable squares");

        let promoted = match promo_kind {
            Kind::Queen => Piece::Queen(active_color),
            Kind::Rook => Piece::Rook(active_color),
            Kind::Knight => Piece::Knight(active_color),
            Kind::Bishop => {
                if (to.file() + to.rank()) % 2 == 1 {
                    Piece::BishopLight(active_color)
                } else {
                    Piece::BishopDark(active_color)
                }
            }
            Kind::Pawn | Kind::King => unreachable!("pawns never promote to a pawn or king"),
        };

        self.touch(from, Piece::Empty, board_delta, pk_delta, material);
        self.touch(to, promoted, board_delta, pk_delta, material);
        self.frame_mut().halfmove_clock = 0;
    }

    fn make_castle(
        &mut self,
        active_color: Color,
        king_from: Square,
        king_to: Square,
        board_delta: &mut u64,
        pk_delta: &mut u64,
        material: &mut MaterialKey,
    ) {
        let kingside = king_to.file() > king_from.file();
        let rank = king_from.rank();
        let (rook_from, rook_to) = if kingside {
            (Square::new(7, rank), Square::new(5, rank))
        } else {
            (Square::new(0, rank), Square::new(3, rank))
        };
        self.touch(king_from, Piece::Empty, board_delta, pk_delta, material);
        self.touch(king_to, Piece::King(active_color), board_delta, pk_delta, material);
        self.touch(rook_from, Piece::Empty, board_delta, pk_delta, material);
        self.touch(rook_to, Piece::Rook(active_color), board_delta, pk_delta, material);
        // Castling never resets the halfmove clock and is never a capture;
        // the default post-increment from `start_new_frame` already stands.
    }

    fn make_en_passant(
        &mut self,
        active_color: Color,
        from: Square,
        to: Square,
        board_delta: &mut u64,
        pk_delta: &mut u64,
        material: &mut MaterialKey,
    ) {
        let victim_sq = Square::new(to.file(), from.rank());
        self.touch(from, Piece::Empty, board_delta, pk_delta, material);
        self.touch(victim_sq, Piece::Empty, board_delta, pk_delta, material);
        self.touch(to, pawn_piece_for_rank(active_color, to.rank()), board_delta, pk_delta, material);
        self.frame_mut().halfmove_clock = 0;
    }

    fn make_normal(
        &mut self,
        active_color: Color,
        from: Square,
        to: Square,
        moving_piece: Piece,
        board_delta: &mut u64,
        pk_delta: &mut u64,
        material: &mut MaterialKey,
    ) {
        let captured = self.piece_at(to);
        let is_capture = !captured.is_empty();

        let new_piece_at_to = if moving_piece.is_pawn() {
            pawn_piece_for_rank(active_color, to.rank())
        } else {
            moving_piece.strip_castle_rights()
        };

        self.touch(from, Piece::Empty, board_delta, pk_delta, material);
        self.touch(to, new_piece_at_to, board_delta, pk_delta, material);

        if moving_piece.is_pawn() && to.file() == from.file() {
            let delta = to.rank() as i8 - from.rank() as i8;
            if delta == 2 || delta == -2 {
                let ep_rank = (from.rank() as i8 + delta / 2) as u8;
                let node_counter = self.frame().node_counter;
                let frame = self.frame_mut();
                frame.en_passant_lazy = Some(Square::new(from.file(), ep_rank));
                frame.en_passant_node_counter = node_counter;
            }
        }

        if moving_piece.is_pawn() || is_capture {
            self.frame_mut().halfmove_clock = 0;
        }
    }

    /// Replace whatever sits on `sq` with `new_piece` (either may be
    /// `Piece::Empty`), logging the undo entry and folding the hash/
    /// material deltas for both the departing and arriving piece.
    fn touch(
        &mut self,
        sq: Square,
        new_piece: Piece,
        board_delta: &mut u64,
        pk_delta: &mut u64,
        material: &mut MaterialKey,
    ) {
        let old_piece = self.piece_at(sq);
        self.frame_mut().push_undo(sq, old_piece);

        *board_delta ^= board_hash_term(old_piece, sq) ^ board_hash_term(new_piece, sq);
        *pk_delta ^= pawn_king_hash_term(old_piece, sq) ^ pawn_king_hash_term(new_piece, sq);

        if let (Some(c), Some(k)) = (old_piece.color(), old_piece.kind()) {
            if !matches!(k, Kind::King) {
                material.sub(c, bishop_light(old_piece, sq), k);
            }
        }
        if !old_piece.is_empty() {
            self.lift(sq);
        }
        if !new_piece.is_empty() {
            self.place(sq, new_piece);
        }
        if let (Some(c), Some(k)) = (new_piece.color(), new_piece.kind()) {
            if !matches!(k, Kind::King) {
                material.add(c, bishop_light(new_piece, sq), k);
            }
        }
    }

    /// Withdraw the piece on `sq` from its side's attack map and piece list,
    /// clear the board, then let any slider whose ray was blocked at `sq`
    /// extend through it.
    fn lift(&mut self, sq: Square) {
        let piece = self.piece_at(sq);
        let color = piece.color().expect("lift called on an occupied square");
        let before = *self.squares();
        {
            let side = self.side_mut(color);
            withdraw_attacks(side, piece, sq, &before);
            side.remove_piece(sq, matches!(piece, Piece::Knight(_)));
            if piece.is_bishop() {
                side.toggle_bishop_diagonals(sq);
            }
            if piece.is_pawn() {
                if let Some(file) = last_rank_file(color, sq) {
                    side.set_last_rank_pawn(file, false);
                }
            }
        }
        self.set_piece_raw(sq, Piece::Empty);
        let after = *self.squares();
        self.retoggle_through(sq, &before, &after);
    }

    /// Place `piece` on the now-empty `sq`, block any slider ray that used
    /// to pass through it, then add `piece`'s own attacks and piece-list
    /// entry.
    fn place(&mut self, sq: Square, piece: Piece) {
        let before = *self.squares();
        self.set_piece_raw(sq, piece);
        let after = *self.squares();
        self.retoggle_through(sq, &before, &after);

        let color = piece.color().expect("place called with a real piece");
        let side = self.side_mut(color);
        side.add_piece(sq, piece.is_king(), matches!(piece, Piece::Knight(_)));
        if piece.is_bishop() {
            side.toggle_bishop_diagonals(sq);
        }
        if piece.is_pawn() {
            if let Some(file) = last_rank_file(color, sq) {
                side.set_last_rank_pawn(file, true);
            }
        }
        radiate_attacks(side, piece, sq, &after);
    }

    /// `changed_sq` just flipped between empty and occupied. For each of
    /// the 8 directions, find the nearest slider behind `changed_sq` along
    /// that direction (same in `before` and `after`, since they differ only
    /// at `changed_sq`) and, if its ray travels through `changed_sq`,
    /// toggle it once under the old occupancy and once under the new —
    /// `toggle_rays` is self-inverse, so this nets out to exactly the
    /// extension or blockage `changed_sq`'s flip should cause.
    fn retoggle_through(&mut self, changed_sq: Square, before: &[Piece; 64], after: &[Piece; 64]) {
        for dir in Direction::ALL {
            let back = dir.opposite();
            if let Some((origin_sq, origin_piece)) = find_ray_origin(before, changed_sq, back) {
                if origin_piece.slide_dirs() & dir.bit() != 0 {
                    let color = origin_piece.color().unwrap();
                    let side = self.side_mut(color);
                    attacks::toggle_rays(&mut side.attacks, |s| !before[s.index() as usize].is_empty(), origin_sq, dir.bit());
                    attacks::toggle_rays(&mut side.attacks, |s| !after[s.index() as usize].is_empty(), origin_sq, dir.bit());
                }
            }
        }
    }
}

fn find_ray_origin(board: &[Piece; 64], from: Square, step_dir: Direction) -> Option<(Square, Piece)> {
    let (fd, rd) = step_dir.deltas();
    let mut cur = from;
    while let Some(next) = cur.try_offset(fd, rd) {
        let p = board[next.index() as usize];
        if !p.is_empty() {
            return Some((next, p));
        }
        cur = next;
    }
    None
}

fn withdraw_attacks(side: &mut SideRecord, piece: Piece, sq: Square, board: &[Piece; 64]) {
    update_attacks(side, piece, sq, board, false);
}

fn radiate_attacks(side: &mut SideRecord, piece: Piece, sq: Square, board: &[Piece; 64]) {
    update_attacks(side, piece, sq, board, true);
}

fn update_attacks(side: &mut SideRecord, piece: Piece, sq: Square, board: &[Piece; 64], adding: bool) {
    let dirs = piece.slide_dirs();
    if dirs != 0 {
        attacks::toggle_rays(&mut side.attacks, |s| !board[s.index() as usize].is_empty(), sq, dirs);
    } else if piece.is_king() {
        attacks::toggle_king(&mut side.attacks, sq);
    } else if matches!(piece, Piece::Knight(_)) {
        if adding {
            attacks::add_knight(&mut side.attacks, sq);
        } else {
            attacks::sub_knight(&mut side.attacks, sq);
        }
    } else if piece.is_pawn() {
        match piece.color().unwrap() {
            Color::White => attacks::toggle_pawn_white(&mut side.attacks, sq),
            Color::Black => attacks::toggle_pawn_black(&mut side.attacks, sq),
        }
    }
}

/// The pawn-rank tag (`PawnStart`/`PawnMid`/`PawnPromoRank`) a pawn of
/// `color` must carry on `rank` (spec §3.2's rank-class encoding).
fn pawn_piece_for_rank(color: Color, rank: u8) -> Piece {
    let start_rank = match color {
        Color::White => 1,
        Color::Black => 6,
    };
    let promo_minus_one = match color {
        Color::White => 6,
        Color::Black => 1,
    };
    if rank == start_rank {
        Piece::PawnStart(color)
    } else if rank == promo_minus_one {
        Piece::PawnPromoRank(color)
    } else {
        Piece::PawnMid(color)
    }
}

/// If `sq` is one push from promotion for `color`, the file to flag in
/// `last_rank_pawns`; `None` otherwise.
fn last_rank_file(color: Color, sq: Square) -> Option<u8> {
    let promo_minus_one = match color {
        Color::White => 6,
        Color::Black => 1,
    };
    (sq.rank() == promo_minus_one).then(|| sq.file())
}

fn bishop_light(piece: Piece, sq: Square) -> Option<bool> {
    if piece.is_bishop() {
        Some((sq.file() + sq.rank()) % 2 == 1)
    } else {
        None
    }
}

fn board_hash_term(piece: Piece, sq: Square) -> u64 {
    let (Some(color), Some(kind)) = (piece.color(), piece.kind()) else {
        return 0;
    };
    let mut term = piece_key(color, kind, sq);
    if piece.has_castle_rights() {
        term ^= castle_term(piece, color, sq);
    }
    term
}

fn pawn_king_hash_term(piece: Piece, sq: Square) -> u64 {
    let (Some(color), Some(kind)) = (piece.color(), piece.kind()) else {
        return 0;
    };
    let mut term = 0u64;
    if matches!(kind, Kind::Pawn | Kind::King) {
        term ^= piece_key(color, kind, sq);
    }
    if piece.has_castle_rights() {
        term ^= castle_term(piece, color, sq);
    }
    term
}

fn castle_term(piece: Piece, color: Color, sq: Square) -> u64 {
    if piece.is_king() {
        ZOBRIST.castle_king[color.index()][sq.index() as usize]
    } else {
        ZOBRIST.castle_rook[color.index()][sq.index() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn startpos() -> Position {
        let mut pos = Position::create();
        pos.setup_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        pos
    }

    #[test]
    fn quiet_pawn_push_then_unmake_round_trips() {
        let mut pos = startpos();
        let before_hash = pos.frame().board_hash_lazy;
        let before_squares = *pos.squares();
        let mv = Move::quiet(Square::from_algebraic("e2").unwrap(), Square::from_algebraic("e4").unwrap());
        pos.make(mv).unwrap();
        assert_ne!(pos.frame().board_hash_lazy, before_hash);
        assert!(pos.piece_at(Square::from_algebraic("e4").unwrap()).is_pawn());
        assert!(pos.piece_at(Square::from_algebraic("e2").unwrap()).is_empty());
        assert_eq!(pos.frame().en_passant_target(), Some(Square::from_algebraic("e3").unwrap()));
        pos.unmake();
        assert_eq!(pos.frame().board_hash_lazy, before_hash);
        assert_eq!(*pos.squares(), before_squares);
    }

    #[test]
    fn capture_updates_material_key() {
        let mut pos = Position::create();
        pos.setup_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1").unwrap();
        let before_material = pos.frame().material_key;
        let mv = Move::quiet(Square::from_algebraic("e4").unwrap(), Square::from_algebraic("d5").unwrap());
        pos.make(mv).unwrap();
        assert_ne!(pos.frame().material_key, before_material);
        assert!(pos.piece_at(Square::from_algebraic("d5").unwrap()).is_pawn());
        pos.unmake();
        assert_eq!(pos.frame().material_key, before_material);
    }

    #[test]
    fn kingside_castle_moves_both_pieces() {
        let mut pos = Position::create();
        pos.setup_fen("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let mv = Move::quiet(Square::from_algebraic("e1").unwrap(), Square::from_algebraic("g1").unwrap());
        pos.make(mv).unwrap();
        assert!(pos.piece_at(Square::from_algebraic("g1").unwrap()).is_king());
        assert!(pos.piece_at(Square::from_algebraic("f1").unwrap()).is_rook());
        assert!(pos.piece_at(Square::from_algebraic("h1").unwrap()).is_empty());
        assert!(pos.piece_at(Square::from_algebraic("e1").unwrap()).is_empty());
        pos.unmake();
        assert!(pos.piece_at(Square::from_algebraic("e1").unwrap()).has_castle_rights());
        assert!(pos.piece_at(Square::from_algebraic("h1").unwrap()).has_castle_rights());
    }

    #[test]
    fn en_passant_removes_victim_pawn() {
        let mut pos = Position::create();
        pos.setup_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        let mv = Move::quiet(Square::from_algebraic("e5").unwrap(), Square::from_algebraic("d6").unwrap());
        pos.make(mv).unwrap();
        assert!(pos.piece_at(Square::from_algebraic("d6").unwrap()).is_pawn());
        assert!(pos.piece_at(Square::from_algebraic("d5").unwrap()).is_empty());
        assert!(pos.piece_at(Square::from_algebraic("e5").unwrap()).is_empty());
        pos.unmake();
        assert!(pos.piece_at(Square::from_algebraic("d5").unwrap()).is_pawn());
        assert!(pos.piece_at(Square::from_algebraic("e5").unwrap()).is_pawn());
    }

    #[test]
    fn promotion_replaces_pawn_with_chosen_piece() {
        let mut pos = Position::create();
        pos.setup_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let from = Square::from_algebraic("a7").unwrap();
        let to = Square::from_algebraic("a8").unwrap();
        let mv = Move::promotion(from, to, Kind::Queen);
        pos.make(mv).unwrap();
        assert_eq!(pos.piece_at(to), Piece::Queen(Color::White));
        pos.unmake();
        assert!(pos.piece_at(from).is_pawn());
        assert!(pos.piece_at(to).is_empty());
    }

    #[test]
    fn null_move_only_flips_side_and_complements_hash() {
        let mut pos = startpos();
        let before_hash = pos.frame().board_hash_lazy;
        let before_squares = *pos.squares();
        pos.make_null().unwrap();
        assert_eq!(pos.frame().board_hash_lazy, !before_hash);
        assert_eq!(*pos.squares(), before_squares);
        pos.unmake_null();
        assert_eq!(pos.frame().board_hash_lazy, before_hash);
    }
}
