//! Component G: FEN/EPD parsing and serialisation (spec §6.2).
//!
//! Six whitespace-separated fields, the last two optional. Piece placement
//! accepts "sloppy" rank strings whose digits plus piece letters sum to
//! less than 8 (the remainder is implicitly empty); anything over 8 is
//! rejected. Castling rights are accepted only when the matching king and
//! rook actually sit on their home squares, and are tagged explicitly here
//! rather than through the general home-square auto-retag that
//! `Position::setup_square` uses, since a FEN castling field can grant a
//! strict subset of what that auto-retag would infer.

use std::fmt;

use super::edit::attacked_by;
use super::Position;
use crate::error::{ParseError, SetupError};
use crate::piece::{Color, Piece};
use crate::square::Square;

#[derive(Debug, Clone, Copy, Default)]
struct CastlingField {
    white_king: bool,
    white_queen: bool,
    black_king: bool,
    black_queen: bool,
}

impl Position {
    /// Replace this position wholesale with the one described by `fen`.
    /// On any error the position is reset to empty, matching the "left in
    /// a valid state" contract for parse failures (spec §7).
    pub fn setup_fen(&mut self, fen: &str) -> Result<(), SetupError> {
        match self.try_setup_fen(fen) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    fn try_setup_fen(&mut self, fen: &str) -> Result<(), SetupError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 || fields.len() > 6 {
            return Err(ParseError::WrongFieldCount(fields.len()).into());
        }

        let placement = parse_placement(fields[0])?;
        let side_to_move = parse_side_to_move(fields[1])?;
        let castling = parse_castling(fields[2])?;
        let ep_square = parse_en_passant(fields[3], side_to_move)?;
        let halfmove_clock: u16 = if fields.len() > 4 {
            fields[4]
                .parse()
                .map_err(|_| ParseError::BadHalfmoveClock(fields[4].to_string()))?
        } else {
            0
        };
        let fullmove_number: u32 = if fields.len() > 5 {
            let n: u32 = fields[5]
                .parse()
                .map_err(|_| ParseError::BadFullmoveNumber(fields[5].to_string()))?;
            if n == 0 {
                return Err(ParseError::BadFullmoveNumber(fields[5].to_string()).into());
            }
            n
        } else {
            1
        };

        self.clear();
        for i in 0..64u8 {
            self.set_piece_raw(Square::from_index(i), placement[i as usize]);
        }
        self.tag_castling(castling)?;
        self.recompute_and_validate(side_to_move)?;

        if let Some(ep) = ep_square {
            validate_en_passant_occupancy(self.squares(), ep, side_to_move)?;
            if en_passant_uncovers_check(self.squares(), ep, side_to_move, self.king_square(side_to_move)) {
                return Err(SetupError::EnPassantUncoversCheck(ep));
            }
            let node_counter = self.frame().node_counter;
            let frame = self.frame_mut();
            frame.en_passant_lazy = Some(ep);
            frame.en_passant_node_counter = node_counter;
        }
        self.frame_mut().halfmove_clock = halfmove_clock;
        self.fullmove_number = fullmove_number;

        Ok(())
    }

    /// Promote exactly the king/rook pairs named by `castling` to their
    /// castle-capable tags, rejecting a right whose king or rook is not on
    /// its home square (spec §6.2).
    fn tag_castling(&mut self, castling: CastlingField) -> Result<(), SetupError> {
        const E1: Square = Square::new(4, 0);
        const A1: Square = Square::new(0, 0);
        const H1: Square = Square::new(7, 0);
        const E8: Square = Square::new(4, 7);
        const A8: Square = Square::new(0, 7);
        const H8: Square = Square::new(7, 7);

        if castling.white_king {
            promote_king(self, E1, Color::White)?;
            promote_rook(self, H1, Color::White)?;
        }
        if castling.white_queen {
            promote_king(self, E1, Color::White)?;
            promote_rook(self, A1, Color::White)?;
        }
        if castling.black_king {
            promote_king(self, E8, Color::Black)?;
            promote_rook(self, H8, Color::Black)?;
        }
        if castling.black_queen {
            promote_king(self, E8, Color::Black)?;
            promote_rook(self, A8, Color::Black)?;
        }
        Ok(())
    }

    /// Serialise the current position back to FEN (spec §6.2/§6.4 —
    /// there is no persisted state, so this is the only externalisation).
    pub fn to_fen(&self) -> String {
        let mut out = String::new();
        for rank in (0..8u8).rev() {
            let mut empty_run = 0u8;
            for file in 0..8u8 {
                let piece = self.piece_at(Square::new(file, rank));
                match piece.to_fen_char() {
                    Some(c) => {
                        if empty_run > 0 {
                            out.push((b'0' + empty_run) as char);
                            empty_run = 0;
                        }
                        out.push(c);
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                out.push((b'0' + empty_run) as char);
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out.push(' ');
        out.push(match self.side_to_move() {
            Color::White => 'w',
            Color::Black => 'b',
        });
        out.push(' ');
        let mut any_right = false;
        // Kingside/queenside are distinguished by which rook still carries
        // the tag, not by the king alone.
        let white_king_rights = self.piece_at(Square::new(4, 0)) == Piece::KingCastle(Color::White);
        if white_king_rights && self.piece_at(Square::new(7, 0)) == Piece::RookCastle(Color::White) {
            out.push('K');
            any_right = true;
        }
        if white_king_rights && self.piece_at(Square::new(0, 0)) == Piece::RookCastle(Color::White) {
            out.push('Q');
            any_right = true;
        }
        let black_king_rights = self.piece_at(Square::new(4, 7)) == Piece::KingCastle(Color::Black);
        if black_king_rights && self.piece_at(Square::new(7, 7)) == Piece::RookCastle(Color::Black) {
            out.push('k');
            any_right = true;
        }
        if black_king_rights && self.piece_at(Square::new(0, 7)) == Piece::RookCastle(Color::Black) {
            out.push('q');
            any_right = true;
        }
        if !any_right {
            out.push('-');
        }
        out.push(' ');
        match self.frame().en_passant_target() {
            Some(sq) => out.push_str(&sq.to_algebraic()),
            None => out.push('-'),
        }
        out.push(' ');
        out.push_str(&self.frame().halfmove_clock.to_string());
        out.push(' ');
        out.push_str(&self.fullmove_number.to_string());
        out
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fen())
    }
}

fn promote_king(pos: &mut Position, sq: Square, color: Color) -> Result<(), SetupError> {
    if pos.piece_at(sq) != Piece::King(color) {
        return Err(SetupError::CastleRightWithoutPieces);
    }
    pos.set_piece_raw(sq, Piece::KingCastle(color));
    Ok(())
}

fn promote_rook(pos: &mut Position, sq: Square, color: Color) -> Result<(), SetupError> {
    if pos.piece_at(sq) != Piece::Rook(color) {
        return Err(SetupError::CastleRightWithoutPieces);
    }
    pos.set_piece_raw(sq, Piece::RookCastle(color));
    Ok(())
}

fn piece_from_char(c: char, sq: Square) -> Option<Piece> {
    let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
    let piece = match c.to_ascii_lowercase() {
        'p' => {
            let start_rank = match color {
                Color::White => 1,
                Color::Black => 6,
            };
            let promo_minus_one = match color {
                Color::White => 6,
                Color::Black => 1,
            };
            if sq.rank() == start_rank {
                Piece::PawnStart(color)
            } else if sq.rank() == promo_minus_one {
                Piece::PawnPromoRank(color)
            } else {
                Piece::PawnMid(color)
            }
        }
        'n' => Piece::Knight(color),
        'b' => {
            if (sq.file() + sq.rank()) % 2 == 1 {
                Piece::BishopLight(color)
            } else {
                Piece::BishopDark(color)
            }
        }
        'r' => Piece::Rook(color),
        'q' => Piece::Queen(color),
        'k' => Piece::King(color),
        _ => return None,
    };
    Some(piece)
}

fn parse_placement(field: &str) -> Result<[Piece; 64], ParseError> {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(ParseError::RankCount);
    }
    let mut squares = [Piece::Empty; 64];
    for (row, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - row as u8;
        let mut file = 0u8;
        for c in rank_str.chars() {
            if file >= 8 {
                return Err(ParseError::RankLength(rank + 1));
            }
            if let Some(d) = c.to_digit(10) {
                file += d as u8;
                if file > 8 {
                    return Err(ParseError::RankLength(rank + 1));
                }
            } else {
                let sq = Square::new(file, rank);
                let piece = piece_from_char(c, sq).ok_or(ParseError::UnknownPieceChar(c))?;
                squares[sq.index() as usize] = piece;
                file += 1;
            }
        }
    }
    Ok(squares)
}

fn parse_side_to_move(field: &str) -> Result<Color, ParseError> {
    match field {
        "w" => Ok(Color::White),
        "b" => Ok(Color::Black),
        other => Err(ParseError::BadSideToMove(other.to_string())),
    }
}

fn parse_castling(field: &str) -> Result<CastlingField, ParseError> {
    let mut out = CastlingField::default();
    if field == "-" {
        return Ok(out);
    }
    for c in field.chars() {
        match c {
            'K' => out.white_king = true,
            'Q' => out.white_queen = true,
            'k' => out.black_king = true,
            'q' => out.black_queen = true,
            other => return Err(ParseError::BadCastlingChar(other)),
        }
    }
    Ok(out)
}

/// The side to move is the one who may *capture* en passant; the pawn that
/// produced the target belongs to the other side and just double-pushed
/// onto the rank beyond it.
fn parse_en_passant(field: &str, side_to_move: Color) -> Result<Option<Square>, ParseError> {
    if field == "-" {
        return Ok(None);
    }
    let sq = Square::from_algebraic(field).ok_or_else(|| ParseError::BadEnPassantSquare(field.to_string()))?;
    let expected_rank = match side_to_move {
        Color::White => 5, // black just double-pushed past rank 6
        Color::Black => 2, // white just double-pushed past rank 3
    };
    if sq.rank() != expected_rank {
        return Err(ParseError::EnPassantWrongRank(field.to_string()));
    }
    Ok(Some(sq))
}

fn validate_en_passant_occupancy(squares: &[Piece; 64], ep: Square, side_to_move: Color) -> Result<(), SetupError> {
    let (landing_rank, start_rank) = match side_to_move {
        Color::White => (4u8, 6u8),
        Color::Black => (3u8, 1u8),
    };
    let file = ep.file();
    let landing = Square::new(file, landing_rank);
    let start = Square::new(file, start_rank);
    let enemy = side_to_move.opposite();

    if !squares[start.index() as usize].is_empty() || !squares[ep.index() as usize].is_empty() {
        return Err(SetupError::BadEnPassantOccupancy(ep));
    }
    let landing_piece = squares[landing.index() as usize];
    if landing_piece.color() != Some(enemy) || !landing_piece.is_pawn() {
        return Err(SetupError::BadEnPassantOccupancy(ep));
    }
    let mut adjacent_friendly = false;
    for df in [-1i8, 1i8] {
        if let Some(adj) = landing.try_offset(df, 0) {
            let p = squares[adj.index() as usize];
            if p.color() == Some(side_to_move) && p.is_pawn() {
                adjacent_friendly = true;
            }
        }
    }
    if !adjacent_friendly {
        return Err(SetupError::BadEnPassantOccupancy(ep));
    }
    Ok(())
}

/// Whether capturing en passant on `ep` would expose `side_to_move`'s own
/// king to a rook/queen lying on the same rank as the two pawns that the
/// capture removes — the classic "pinned pair" case that makes a
/// recorded en-passant target illegal to ever play (spec §6.2).
fn en_passant_uncovers_check(squares: &[Piece; 64], ep: Square, side_to_move: Color, king_sq: Square) -> bool {
    let landing_rank = match side_to_move {
        Color::White => 4u8,
        Color::Black => 3u8,
    };
    if king_sq.rank() != landing_rank {
        return false;
    }
    let landing = Square::new(ep.file(), landing_rank);
    for df in [-1i8, 1i8] {
        let Some(adj) = landing.try_offset(df, 0) else { continue };
        let p = squares[adj.index() as usize];
        if p.color() != Some(side_to_move) || !p.is_pawn() {
            continue;
        }
        let mut probe = *squares;
        probe[landing.index() as usize] = Piece::Empty;
        probe[adj.index() as usize] = Piece::Empty;
        if attacked_by(&probe, king_sq, side_to_move.opposite()) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_round_trips() {
        let mut pos = Position::create();
        let startpos = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
        pos.setup_fen(startpos).unwrap();
        assert_eq!(pos.to_fen(), startpos);
    }

    #[test]
    fn sloppy_trailing_empties_accepted() {
        let mut pos = Position::create();
        // Rank 1 is given as "RNBQKBN" (7 characters): the trailing empty
        // h1 square is left implicit instead of spelled out as "...N1".
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBN w - - 0 1";
        assert!(pos.setup_fen(fen).is_ok());
    }

    #[test]
    fn bad_field_count_rejected() {
        let mut pos = Position::create();
        assert!(pos.setup_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR").is_err());
    }

    #[test]
    fn castle_right_without_rook_is_rejected() {
        let mut pos = Position::create();
        // White has no rook on h1, but "K" is claimed.
        let fen = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBN1 w KQkq - 0 1";
        assert!(matches!(pos.setup_fen(fen), Err(SetupError::CastleRightWithoutPieces)));
    }

    #[test]
    fn en_passant_target_requires_empty_target_square() {
        let mut pos = Position::create();
        // e6 claimed as an ep target but a black pawn already sits there.
        let fen = "rnbqkbnr/pppp1ppp/4p3/8/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 1";
        assert!(matches!(pos.setup_fen(fen), Err(SetupError::BadEnPassantOccupancy(_))));
    }

    #[test]
    fn valid_en_passant_target_accepted() {
        let mut pos = Position::create();
        let fen = "rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3";
        pos.setup_fen(fen).unwrap();
        assert_eq!(pos.frame().en_passant_target(), Some(Square::from_algebraic("d6").unwrap()));
    }

    #[test]
    fn wrong_side_in_check_rejected() {
        let mut pos = Position::create();
        // Black king on e8 attacked by a white rook on e-file, yet it is
        // white to move: the position could not have been reached legally.
        let fen = "4k3/8/8/8/8/8/8/4R2K w - - 0 1";
        assert!(matches!(pos.setup_fen(fen), Err(SetupError::WrongSideInCheck)));
    }
}
