//! Component C: the position and its stack of frames (spec §3.3, §3.6,
//! §4.C).

mod edit;
pub mod fen;
pub mod make;
pub mod query;

pub(crate) use edit::attacked_by;

pub mod frame;

use crate::error::CapacityError;
use crate::piece::{Color, Piece};
use crate::side::SideRecord;
use crate::square::Square;
use frame::Frame;

/// Two sentinel parent frames plus `MAX_DEPTH` plies of search plus one
/// spare slot, matching the spec's 253-slot fixed array (spec §3.6).
pub const MAX_DEPTH: usize = 250;
pub const FRAME_COUNT: usize = 2 + MAX_DEPTH + 1;
/// The first real frame; slots 0 and 1 are sentinel parents so that
/// `current[-1]`/`current[-2]` reads (killer inheritance, halfmove delta)
/// are always in bounds.
const ROOT_SP: usize = 2;

pub struct Position {
    squares: [Piece; 64],
    frames: Vec<Frame>,
    sp: usize,
    /// `from x to` history byte, OR-ed into a move's pre-score low byte
    /// after its SEE-derived class has been computed (spec §3.7).
    pub butterfly: [[u8; 64]; 64],
    /// FEN field 6. Not part of any spec invariant; carried only so
    /// `position_fen` can round-trip it.
    pub fullmove_number: u32,
}

impl Position {
    pub fn create() -> Self {
        let sentinel = Frame::new_empty(
            SideRecord::new_empty(Color::White),
            SideRecord::new_empty(Color::Black),
        );
        let mut frames = Vec::with_capacity(FRAME_COUNT);
        frames.resize(FRAME_COUNT, sentinel);
        let mut pos = Position {
            squares: [Piece::Empty; 64],
            frames,
            sp: ROOT_SP,
            butterfly: [[0; 64]; 64],
            fullmove_number: 1,
        };
        pos.clear();
        pos
    }

    pub fn clear(&mut self) {
        self.squares = [Piece::Empty; 64];
        self.sp = ROOT_SP;
        for frame in &mut self.frames {
            *frame = Frame::new_empty(
                SideRecord::new_empty(Color::White),
                SideRecord::new_empty(Color::Black),
            );
        }
        self.butterfly = [[0; 64]; 64];
        self.fullmove_number = 1;
    }

    #[inline]
    pub fn sp(&self) -> usize {
        self.sp
    }

    #[inline]
    pub fn frame(&self) -> &Frame {
        &self.frames[self.sp]
    }

    #[inline]
    pub fn frame_mut(&mut self) -> &mut Frame {
        &mut self.frames[self.sp]
    }

    /// Always safe to read: the previous ply, or a zeroed sentinel at the
    /// root (spec §3.6).
    #[inline]
    pub fn parent_frame(&self) -> &Frame {
        &self.frames[self.sp - 1]
    }

    #[inline]
    pub fn grandparent_frame(&self) -> &Frame {
        &self.frames[self.sp - 2]
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.frame().active.colour
    }

    #[inline]
    pub fn piece_at(&self, sq: Square) -> Piece {
        self.squares[sq.index() as usize]
    }

    #[inline]
    pub fn squares(&self) -> &[Piece; 64] {
        &self.squares
    }

    #[inline]
    pub(crate) fn set_piece_raw(&mut self, sq: Square, piece: Piece) {
        self.squares[sq.index() as usize] = piece;
    }

    #[inline]
    fn advance_sp(&mut self) -> Result<(), CapacityError> {
        if self.sp + 1 >= FRAME_COUNT {
            return Err(CapacityError::StackOverflow(MAX_DEPTH));
        }
        self.sp += 1;
        Ok(())
    }

    #[inline]
    fn retreat_sp(&mut self) {
        debug_assert!(self.sp > ROOT_SP - 2);
        self.sp -= 1;
    }

    /// The side record for `color`, regardless of which of active/passive
    /// it currently is.
    #[inline]
    pub fn side(&self, color: Color) -> &SideRecord {
        if self.frame().active.colour == color {
            &self.frame().active
        } else {
            &self.frame().passive
        }
    }

    #[inline]
    pub(crate) fn side_mut(&mut self, color: Color) -> &mut SideRecord {
        let active_color = self.frame().active.colour;
        let frame = self.frame_mut();
        if active_color == color {
            &mut frame.active
        } else {
            &mut frame.passive
        }
    }

    #[inline]
    pub fn king_square(&self, color: Color) -> Square {
        self.side(color).king_square()
    }
}

impl Default for Position {
    fn default() -> Self {
        Position::create()
    }
}
