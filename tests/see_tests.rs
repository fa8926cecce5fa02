use rookie_core::movegen::{self, MoveList};
use rookie_core::mv::prescore;
use rookie_core::position::Position;
use rookie_core::square::Square;

fn pos_from(fen: &str) -> Position {
    let mut pos = Position::create();
    pos.setup_fen(fen).expect("valid fen");
    pos
}

fn score_of(list: &MoveList, from: Square, to: Square) -> u16 {
    list.iter()
        .find(|sm| sm.mv.from() == from && sm.mv.to() == to)
        .unwrap_or_else(|| panic!("no move {from}{to} in the generated list"))
        .score
}

#[test]
fn undefended_pawn_capture_scores_as_a_good_capture() {
    // White rook on d1 can take an undefended pawn on d5; nothing recaptures.
    let pos = pos_from("4k3/8/8/3p4/8/8/8/3RK3 w - - 0 1");
    let mut list = MoveList::new();
    movegen::generate_all(&pos, &mut list).unwrap();
    let score = score_of(&list, Square::from_algebraic("d1").unwrap(), Square::from_algebraic("d5").unwrap());
    assert!(score >= prescore::GOOD_CAPTURE_BASE, "undefended capture should land in the good-capture band");
}

#[test]
fn rook_takes_defended_pawn_is_a_losing_capture() {
    // White rook on d1 can take a pawn on d5 defended by a black queen on d8;
    // losing the rook for a pawn should score well below the neutral band.
    let pos = pos_from("3qk3/8/8/3p4/8/8/8/3RK3 w - - 0 1");
    let mut list = MoveList::new();
    movegen::generate_all(&pos, &mut list).unwrap();
    let losing = score_of(&list, Square::from_algebraic("d1").unwrap(), Square::from_algebraic("d5").unwrap());
    assert!(losing < prescore::EXCHANGE_NEUTRAL, "RxP defended by a queen behind it should be a losing capture");
}

#[test]
fn good_capture_outranks_losing_capture_in_the_same_position() {
    // Same position as above, but white also has a second, safe capture
    // available: a knight takes an undefended bishop on e5.
    let pos = pos_from("3qk3/8/4b3/3pN3/8/8/8/3RK3 w - - 0 1");
    let mut list = MoveList::new();
    movegen::generate_all(&pos, &mut list).unwrap();
    let losing = score_of(&list, Square::from_algebraic("d1").unwrap(), Square::from_algebraic("d5").unwrap());
    let good = score_of(&list, Square::from_algebraic("e5").unwrap(), Square::from_algebraic("e6").unwrap());
    assert!(good > losing, "an undefended-bishop capture should outrank a losing rook-for-pawn trade");
}

#[test]
fn knight_takes_pawn_defended_by_a_pawn_is_a_losing_capture() {
    // White knight takes a pawn on e5 defended by a black pawn on d6, which
    // recaptures the knight for free: a knight for a pawn is a net loss.
    let pos = pos_from("4k3/8/3p4/4p3/3N4/8/8/4K3 w - - 0 1");
    let mut list = MoveList::new();
    movegen::generate_all(&pos, &mut list).unwrap();
    let score = score_of(&list, Square::from_algebraic("d4").unwrap(), Square::from_algebraic("e5").unwrap());
    assert!(score < prescore::EXCHANGE_NEUTRAL);
}
