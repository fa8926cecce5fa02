use rookie_core::position::Position;

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
const KIWI_FEN: &str = "r3k2r/p1ppqpb1/bN2Pnp1/8/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn pos_from(fen: &str) -> Position {
    let mut pos = Position::create();
    pos.setup_fen(fen).expect("valid fen");
    pos
}

fn run(fen: &str, depth: u32, expected: u64) {
    let mut pos = pos_from(fen);
    let nodes = pos.perft(depth).expect("perft buffer large enough");
    assert_eq!(nodes, expected, "perft mismatch at depth {depth} for {fen}");
}

#[test]
fn perft_startpos_d1() {
    run(START_FEN, 1, 20);
}

#[test]
fn perft_startpos_d2() {
    run(START_FEN, 2, 400);
}

#[test]
fn perft_startpos_d3() {
    run(START_FEN, 3, 8_902);
}

#[test]
fn perft_startpos_d4() {
    run(START_FEN, 4, 197_281);
}

#[test]
#[ignore]
fn perft_startpos_d5() {
    run(START_FEN, 5, 4_865_609);
}

#[test]
fn perft_kiwipete_d1() {
    run(KIWI_FEN, 1, 48);
}

#[test]
fn perft_kiwipete_d2() {
    run(KIWI_FEN, 2, 2_039);
}

#[test]
#[ignore]
fn perft_kiwipete_d3() {
    run(KIWI_FEN, 3, 97_862);
}

/// Back-rank promotion stress position: three pawn pushes times four
/// promotion kinds, plus two captures, plus everything else.
#[test]
fn perft_back_rank_promotion_d1() {
    run("n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1", 1, 24);
}

#[test]
fn divide_startpos_d2_sums_to_total() {
    let mut pos = pos_from(START_FEN);
    let entries = pos.divide(2).expect("divide buffer large enough");
    let total: u64 = entries.iter().map(|(_, count)| count).sum();
    assert_eq!(total, 400);
    assert_eq!(entries.len(), 20, "20 root moves from the start position");
}

#[test]
fn mirror_position_matches_perft_series() {
    // Flipping ranks and colours of the start position is the start
    // position itself, so the series trivially matches; a non-symmetric
    // position is mirrored by hand below to exercise the same invariant.
    let mirrored_kiwi = "r3k2r/p1pBbp1p/pn2Pn2/8/1P2p3/1N5P/P1PP1PP1/R3K2R b KQkq - 0 1";
    let mut normal = pos_from(KIWI_FEN);
    let mut mirrored = pos_from(mirrored_kiwi);
    assert_eq!(
        normal.perft(1).unwrap(),
        mirrored.perft(1).unwrap(),
        "mirrored position should have the same legal move count"
    );
}
