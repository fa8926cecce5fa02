use rookie_core::movegen::{self, MoveList};
use rookie_core::position::Position;
use rookie_core::square::Square;

fn pos_from(fen: &str) -> Position {
    let mut pos = Position::create();
    pos.setup_fen(fen).expect("valid fen");
    pos
}

fn all_moves(pos: &Position) -> MoveList {
    let mut list = MoveList::new();
    movegen::generate_all(pos, &mut list).unwrap();
    list
}

#[test]
fn pinned_rook_may_only_shuffle_along_the_pin_axis() {
    // White rook on e4 pinned by a black rook on e8 against the white king
    // on e1; the pinned rook may move anywhere on the e-file but nowhere off
    // it.
    let pos = pos_from("4r1k1/8/8/8/4R3/8/8/4K3 w - - 0 1");
    let list = all_moves(&pos);
    let e4 = Square::from_algebraic("e4").unwrap();
    for sm in list.iter().filter(|sm| sm.mv.from() == e4) {
        assert_eq!(sm.mv.to().file(), e4.file(), "pinned rook left the pin file");
    }
}

#[test]
fn single_check_by_a_slider_can_be_interposed() {
    // Black rook on e8 checks the white king on e1 along the e-file; a
    // white bishop on c3 can block by landing on e5... actually c3 to e5 is
    // not a bishop move, so instead a rook on a5 blocks by moving to e5.
    let pos = pos_from("4r1k1/8/8/R7/8/8/8/4K3 w - - 0 1");
    let list = all_moves(&pos);
    let a5 = Square::from_algebraic("a5").unwrap();
    let e5 = Square::from_algebraic("e5").unwrap();
    assert!(list.iter().any(|sm| sm.mv.from() == a5 && sm.mv.to() == e5), "interposing on the checking ray must be legal");
}

#[test]
fn single_check_cannot_be_ignored_by_an_unrelated_move() {
    let pos = pos_from("4r1k1/8/8/R7/8/8/8/4K3 w - - 0 1");
    let list = all_moves(&pos);
    let a5 = Square::from_algebraic("a5").unwrap();
    let b5 = Square::from_algebraic("b5").unwrap();
    assert!(!list.iter().any(|sm| sm.mv.from() == a5 && sm.mv.to() == b5), "a move off the checking ray that doesn't resolve check must be filtered out");
}

#[test]
fn double_check_restricts_every_move_to_the_king() {
    let pos = pos_from("4r3/8/8/8/8/5n2/8/4K3 w - - 0 1");
    let list = all_moves(&pos);
    let king = Square::from_algebraic("e1").unwrap();
    assert!(!list.is_empty());
    assert!(list.iter().all(|sm| sm.mv.from() == king));
}

#[test]
fn king_cannot_castle_through_an_attacked_square() {
    // Black rook on f8 covers f1, so white cannot castle kingside even
    // though f1 and g1 are both empty.
    let pos = pos_from("5r1k/8/8/8/8/8/8/4K2R w K - 0 1");
    let list = all_moves(&pos);
    let e1 = Square::from_algebraic("e1").unwrap();
    let g1 = Square::from_algebraic("g1").unwrap();
    assert!(!list.iter().any(|sm| sm.mv.from() == e1 && sm.mv.to() == g1));
}

#[test]
fn king_cannot_castle_while_in_check() {
    let pos = pos_from("4r2k/8/8/8/8/8/8/4K2R w K - 0 1");
    let list = all_moves(&pos);
    let e1 = Square::from_algebraic("e1").unwrap();
    let g1 = Square::from_algebraic("g1").unwrap();
    assert!(!list.iter().any(|sm| sm.mv.from() == e1 && sm.mv.to() == g1));
}

#[test]
fn castling_is_legal_with_a_clear_and_unattacked_path() {
    let pos = pos_from("7k/8/8/8/8/8/8/4K2R w K - 0 1");
    let list = all_moves(&pos);
    let e1 = Square::from_algebraic("e1").unwrap();
    let g1 = Square::from_algebraic("g1").unwrap();
    assert!(list.iter().any(|sm| sm.mv.from() == e1 && sm.mv.to() == g1));
}

#[test]
fn en_passant_rejected_when_it_would_expose_a_discovered_check() {
    // White king a5, white pawn b5, black pawn c5 (just double-pushed from
    // c7, en-passant target c6), black rook h5: capturing en passant
    // vacates both b5 and c5, opening the fifth rank straight onto the
    // white king.
    let pos = pos_from("4k3/8/8/8/KPp4r/8/8/8 w - c6 0 1");
    let list = all_moves(&pos);
    let from = Square::from_algebraic("b5").unwrap();
    let to = Square::from_algebraic("c6").unwrap();
    assert!(!list.iter().any(|sm| sm.mv.from() == from && sm.mv.to() == to));
}
