use rookie_core::piece::Color;
use rookie_core::position::Position;
use rookie_core::square::Square;

fn pos_from(fen: &str) -> Position {
    let mut pos = Position::create();
    pos.setup_fen(fen).expect("valid fen");
    pos
}

#[test]
fn rook_attack_descriptor_marks_its_whole_open_file_and_rank() {
    let pos = pos_from("4k3/8/8/8/4R3/8/8/4K3 w - - 0 1");
    let white = pos.side(Color::White);
    let e1 = Square::from_algebraic("e1").unwrap();
    let h4 = Square::from_algebraic("h4").unwrap();
    let a4 = Square::from_algebraic("a4").unwrap();
    assert!(white.attacks[e1.index() as usize].is_attacked(), "rook sees down the e-file onto its own king square");
    assert!(white.attacks[h4.index() as usize].is_attacked(), "rook sees along rank 4 to the board edge");
    assert!(white.attacks[a4.index() as usize].is_attacked());
}

#[test]
fn slider_attack_stops_at_the_first_blocker() {
    let pos = pos_from("4k3/8/8/8/4R3/4p3/8/K7 w - - 0 1");
    let white = pos.side(Color::White);
    let e3 = Square::from_algebraic("e3").unwrap();
    let e2 = Square::from_algebraic("e2").unwrap();
    assert!(white.attacks[e3.index() as usize].is_attacked(), "the rook attacks the blocking pawn's square");
    assert!(!white.attacks[e2.index() as usize].is_attacked(), "nothing behind the blocker is attacked");
}

#[test]
fn knight_attack_counter_tracks_overlapping_knights() {
    let pos = pos_from("4k3/8/8/2N1N3/8/8/8/4K3 w - - 0 1");
    // Both knights (c5, e5) share some target squares but f3 is reached by
    // e5 alone, so its counter should be exactly 1.
    let white = pos.side(Color::White);
    let f3 = Square::from_algebraic("f3").unwrap();
    assert_eq!(white.attacks[f3.index() as usize].knight_count(), 1);
}

#[test]
fn pawn_attacks_are_diagonal_only_and_colour_specific() {
    let pos = pos_from("4k3/8/8/8/4P3/8/8/4K3 w - - 0 1");
    let white = pos.side(Color::White);
    let d5 = Square::from_algebraic("d5").unwrap();
    let f5 = Square::from_algebraic("f5").unwrap();
    let e5 = Square::from_algebraic("e5").unwrap();
    assert!(white.attacks[d5.index() as usize].is_attacked());
    assert!(white.attacks[f5.index() as usize].is_attacked());
    assert!(!white.attacks[e5.index() as usize].is_attacked(), "a pawn does not attack the square directly ahead");
}

#[test]
fn in_check_reflects_the_opposing_sides_attack_map_on_the_king_square() {
    let in_check = pos_from("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1");
    assert!(in_check.in_check());

    let not_in_check = pos_from("4k3/8/8/8/8/8/8/4K3 w - - 0 1");
    assert!(!not_in_check.in_check());
}

#[test]
fn king_next_to_enemy_king_cannot_approach_further() {
    // Kings may never stand adjacent; the generator relies on the enemy
    // king's own attack descriptor marking every neighbouring square.
    let pos = pos_from("8/8/8/3k4/8/8/8/3K4 w - - 0 1");
    let black = pos.side(Color::Black);
    let d4 = Square::from_algebraic("d4").unwrap();
    assert!(black.attacks[d4.index() as usize].king_attacks());
}
