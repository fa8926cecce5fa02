use std::io::{self, BufRead};

use rookie_core::position::query::move_parse;
use rookie_core::position::Position;

fn main() {
    rookie_core::logging::init_logging("logs/rookie-cli.log", "rookie_core=info");

    let mut pos = Position::create();
    pos.setup_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
        .expect("start position is well-formed");

    println!("info string rookie-core perft/divide harness");
    println!("{pos}");

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l.trim().to_string(),
            Err(_) => break,
        };
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "position" => handle_position(&parts, &mut pos),
            "d" | "display" => println!("{pos}"),
            "board" => handle_board(&parts, &pos),
            "check" => match pos.check_invariants() {
                Ok(()) => println!("info string invariants ok"),
                Err(e) => println!("info string invariant violation: {e}"),
            },
            "perft" => handle_perft(&parts, &mut pos),
            "divide" => handle_divide(&parts, &mut pos),
            "move" => handle_move(&parts, &mut pos),
            "quit" | "exit" => break,
            _ => println!("info string unrecognised command '{}'", parts[0]),
        }
    }
}

fn handle_position(parts: &[&str], pos: &mut Position) {
    if parts.len() > 1 && parts[1] == "startpos" {
        pos.setup_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .expect("start position is well-formed");
        return;
    }
    if parts.len() > 1 && parts[1] == "fen" {
        let fen = parts[2..].join(" ");
        if let Err(e) = pos.setup_fen(&fen) {
            eprintln!("info string bad FEN: {e}");
        }
        return;
    }
    eprintln!("info string usage: position startpos | position fen <fen...>");
}

fn handle_perft(parts: &[&str], pos: &mut Position) {
    let Some(depth) = parts.get(1).and_then(|s| s.parse::<u32>().ok()) else {
        eprintln!("info string usage: perft <depth>");
        return;
    };
    match pos.perft(depth) {
        Ok(count) => println!("perft({depth}) = {count}"),
        Err(e) => eprintln!("info string perft error: {e}"),
    }
}

fn handle_divide(parts: &[&str], pos: &mut Position) {
    let Some(depth) = parts.get(1).and_then(|s| s.parse::<u32>().ok()) else {
        eprintln!("info string usage: divide <depth>");
        return;
    };
    match pos.divide(depth) {
        Ok(entries) => {
            let mut total = 0u64;
            for (mv, count) in &entries {
                println!("{}: {}", pos.move_format(*mv), count);
                total += count;
            }
            println!("total: {total}");
        }
        Err(e) => eprintln!("info string divide error: {e}"),
    }
}

fn handle_board(parts: &[&str], pos: &Position) {
    let flip = parts.iter().any(|p| *p == "flip");
    let ansi = parts.iter().any(|p| *p == "ansi");
    print!("{}", pos.format_board(flip, ansi));
}

fn handle_move(parts: &[&str], pos: &mut Position) {
    let Some(text) = parts.get(1) else {
        eprintln!("info string usage: move <from><to>[promo]");
        return;
    };
    match move_parse(text) {
        Ok(mv) => match pos.make(mv) {
            Ok(()) => println!("{pos}"),
            Err(e) => eprintln!("info string illegal move: {e}"),
        },
        Err(e) => eprintln!("info string {e}"),
    }
}
