//! Component A: static geometry and hashing tables, computed once and
//! shared immutably for the lifetime of the process (spec §3.1, §4.A, §5).

use crate::piece::{Color, Kind};
use crate::square::{Direction, KnightJump, Square};
use once_cell::sync::Lazy;

/// Which of the 8 king directions are on-board from a given square.
pub static KING_DIRS: Lazy<[u8; 64]> = Lazy::new(|| {
    let mut table = [0u8; 64];
    for i in 0..64u8 {
        let sq = Square::from_index(i);
        let mut bits = 0u8;
        for dir in Direction::ALL {
            let (fd, rd) = dir.deltas();
            if sq.try_offset(fd, rd).is_some() {
                bits |= dir.bit();
            }
        }
        table[i as usize] = bits;
    }
    table
});

/// Which of the 8 knight jumps are on-board from a given square.
pub static KNIGHT_JUMPS: Lazy<[u8; 64]> = Lazy::new(|| {
    let mut table = [0u8; 64];
    for i in 0..64u8 {
        let sq = Square::from_index(i);
        let mut bits = 0u8;
        for jump in KnightJump::ALL {
            let (fd, rd) = jump.deltas();
            if sq.try_offset(fd, rd).is_some() {
                bits |= jump.bit();
            }
        }
        table[i as usize] = bits;
    }
    table
});

/// Maximum slide length (0..7) from a square in a given direction.
pub static RAY_LEN: Lazy<[[u8; 8]; 64]> = Lazy::new(|| {
    let mut table = [[0u8; 8]; 64];
    for i in 0..64u8 {
        let sq = Square::from_index(i);
        for dir in Direction::ALL {
            let (fd, rd) = dir.deltas();
            let mut len = 0u8;
            let mut cur = sq;
            while let Some(next) = cur.try_offset(fd, rd) {
                len += 1;
                cur = next;
            }
            table[i as usize][dir as usize] = len;
        }
    }
    table
});

/// Every squares reachable from `sq` by walking one direction to the board
/// edge, ignoring occupancy. Used to build `SQ2SQ` and the cuckoo tables.
fn ray_squares(sq: Square, dir: Direction) -> Vec<Square> {
    let (fd, rd) = dir.deltas();
    let mut out = Vec::new();
    let mut cur = sq;
    while let Some(next) = cur.try_offset(fd, rd) {
        out.push(next);
        cur = next;
    }
    out
}

/// The geometric relation between two distinct squares (spec §3.1's
/// `sq2sq`): which ray direction (if any) connects them, whether one is a
/// knight jump from the other, and whether one is a pawn-capture target of
/// the other for either colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Relation {
    pub ray_dir: Option<Direction>,
    pub is_knight_jump: bool,
    pub pawn_capture_for: Option<Color>,
}

/// `sq2sq[a][b]`, flattened to a 64x64 array of `Relation`.
pub static SQ2SQ: Lazy<Vec<Relation>> = Lazy::new(|| {
    let mut table = vec![Relation::default(); 64 * 64];
    for a in 0..64u8 {
        let sq_a = Square::from_index(a);
        for dir in Direction::ALL {
            for b in ray_squares(sq_a, dir) {
                let entry = &mut table[a as usize * 64 + b.index() as usize];
                if entry.ray_dir.is_none() {
                    entry.ray_dir = Some(dir);
                }
            }
        }
        for jump in KnightJump::ALL {
            let (fd, rd) = jump.deltas();
            if let Some(b) = sq_a.try_offset(fd, rd) {
                table[a as usize * 64 + b.index() as usize].is_knight_jump = true;
            }
        }
        // White captures to the NE/NW diagonal neighbours; black to SE/SW.
        for (color, dirs) in [
            (Color::White, [Direction::NE, Direction::NW]),
            (Color::Black, [Direction::SE, Direction::SW]),
        ] {
            for dir in dirs {
                let (fd, rd) = dir.deltas();
                if let Some(b) = sq_a.try_offset(fd, rd) {
                    let entry = &mut table[a as usize * 64 + b.index() as usize];
                    entry.pawn_capture_for = Some(color);
                }
            }
        }
    }
    table
});

#[inline]
pub fn relation(a: Square, b: Square) -> Relation {
    SQ2SQ[a.index() as usize * 64 + b.index() as usize]
}

/// The squares an enemy knight would need to stand on to check a king on
/// `king_sq` — identical to the king square's own knight-jump set, since a
/// knight's attack relation is symmetric (spec's `knight_checks[xk][n]`).
#[inline]
pub fn knight_check_squares(king_sq: Square) -> Vec<Square> {
    let mut out = Vec::with_capacity(8);
    for jump in KnightJump::ALL {
        let (fd, rd) = jump.deltas();
        if let Some(sq) = king_sq.try_offset(fd, rd) {
            out.push(sq);
        }
    }
    out
}

/// Zobrist keys, drawn from a reproducible Park-Miller multiplicative
/// congruential generator so tables are identical across builds and
/// platforms (spec §4.A).
pub struct ParkMiller {
    state: u64,
}

impl ParkMiller {
    const MODULUS: u64 = 0x7FFF_FFFF; // 2^31 - 1 (Mersenne prime)
    const MULTIPLIER: u64 = 48271;

    pub fn new(seed: u64) -> Self {
        ParkMiller {
            state: (seed % (Self::MODULUS - 1)) + 1,
        }
    }

    fn next31(&mut self) -> u64 {
        self.state = (self.state * Self::MULTIPLIER) % Self::MODULUS;
        self.state
    }

    /// Combine four 31-bit draws into one 64-bit key.
    pub fn next_u64(&mut self) -> u64 {
        let a = self.next31();
        let b = self.next31();
        let c = self.next31();
        let d = self.next31();
        (a << 33) ^ (b << 22) ^ (c << 11) ^ d
    }
}

pub struct ZobristKeys {
    /// `piece[color][kind][square]`
    pub piece: [[[u64; 64]; 6]; 2],
    /// Special keys for a rook that still holds castle rights, indexed by
    /// `[color][square]` — folded into the board hash instead of the piece
    /// key so that losing castle rights changes the hash even though the
    /// rook itself hasn't moved (spec §3.6).
    pub castle_rook: [[u64; 64]; 2],
    pub castle_king: [[u64; 64]; 2],
}

pub static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(|| {
    let mut rng = ParkMiller::new(0x5EED_C0DE);
    let mut piece = [[[0u64; 64]; 6]; 2];
    for c in 0..2 {
        for k in 0..6 {
            for s in 0..64 {
                piece[c][k][s] = rng.next_u64();
            }
        }
    }
    let mut castle_rook = [[0u64; 64]; 2];
    let mut castle_king = [[0u64; 64]; 2];
    for c in 0..2 {
        for s in 0..64 {
            castle_rook[c][s] = rng.next_u64();
            castle_king[c][s] = rng.next_u64();
        }
    }
    ZobristKeys {
        piece,
        castle_rook,
        castle_king,
    }
});

#[inline]
pub fn piece_key(color: Color, kind: Kind, sq: Square) -> u64 {
    ZOBRIST.piece[color.index()][kind.index()][sq.index() as usize]
}

/// Material-key per-kind addend (spec §3.4): low bits are a 4-bit counter
/// in the kind's lane, high 16 bits are a mixed-in hash contribution. The
/// counter lane is authoritative; the hash may collide harmlessly.
pub const MATERIAL_LANES: usize = 12; // 6 kinds (bishop split light/dark) x 2 colors

#[inline]
pub const fn material_lane(color: Color, bishop_light: Option<bool>, kind: Kind) -> usize {
    let kind_slot = match (kind, bishop_light) {
        (Kind::Pawn, _) => 0,
        (Kind::Knight, _) => 1,
        (Kind::Bishop, Some(true)) => 2,
        (Kind::Bishop, _) => 3,
        (Kind::Rook, _) => 4,
        (Kind::Queen, _) => 5,
        (Kind::King, _) => 6, // unused lane, kings aren't counted in material key
    };
    color.index() * 6 + kind_slot
}

pub static MATERIAL_ADDEND: Lazy<[u64; MATERIAL_LANES]> = Lazy::new(|| {
    let mut rng = ParkMiller::new(0x7A1E_B0AD);
    let mut table = [0u64; MATERIAL_LANES];
    for (lane, slot) in table.iter_mut().enumerate() {
        let hash_part = (rng.next_u64() >> 32) & 0xFFFF;
        *slot = (hash_part << 48) | (1u64 << (4 * lane));
    }
    table
});

/// A single reversible transition usable for upcoming-repetition detection:
/// a non-pawn, non-castling piece moving directly between two squares.
#[derive(Debug, Clone, Copy)]
pub struct CuckooMove {
    pub color: Color,
    pub kind: Kind,
    pub from: Square,
    pub to: Square,
}

#[derive(Debug, Clone, Copy, Default)]
struct CuckooSlot {
    key: u64,
    mv: Option<(Color, Kind, Square, Square)>,
}

/// Two open-addressed 4096-entry tables, cuckoo-hashed on two 12-bit slices
/// of the move's Zobrist delta (spec §3.1, §4.A). Lookup reports whether a
/// given 64-bit key corresponds to some single reversible move; the caller
/// re-validates that the move is actually legal in the current position.
pub struct CuckooTable {
    table1: Vec<CuckooSlot>,
    table2: Vec<CuckooSlot>,
}

const CUCKOO_SIZE: usize = 4096;
const CUCKOO_MASK: u64 = (CUCKOO_SIZE as u64) - 1;

impl CuckooTable {
    fn slot1(key: u64) -> usize {
        (key & CUCKOO_MASK) as usize
    }
    fn slot2(key: u64) -> usize {
        ((key >> 12) & CUCKOO_MASK) as usize
    }

    fn insert(&mut self, mut key: u64, mut mv: (Color, Kind, Square, Square)) {
        // Standard cuckoo insertion: displace whatever is in slot1 of
        // table1, and if that was occupied, re-home the evicted entry into
        // table2, alternating until an empty slot is found. Termination is
        // guaranteed by table sizing (spec §4.A) — in practice the chain
        // length for this key space is a handful of steps.
        for _ in 0..128 {
            let i1 = Self::slot1(key);
            if self.table1[i1].mv.is_none() {
                self.table1[i1] = CuckooSlot { key, mv: Some(mv) };
                return;
            }
            std::mem::swap(&mut key, &mut self.table1[i1].key);
            let evicted = self.table1[i1].mv.replace(mv).unwrap();
            mv = evicted;

            let i2 = Self::slot2(key);
            if self.table2[i2].mv.is_none() {
                self.table2[i2] = CuckooSlot { key, mv: Some(mv) };
                return;
            }
            std::mem::swap(&mut key, &mut self.table2[i2].key);
            let evicted = self.table2[i2].mv.replace(mv).unwrap();
            mv = evicted;
        }
        panic!("cuckoo table insertion did not terminate; table undersized");
    }

    /// Returns the reversible move whose Zobrist delta matches `key`, if
    /// any slot's stored key agrees (a stale/colliding slot simply misses).
    pub fn lookup(&self, key: u64) -> Option<CuckooMove> {
        let i1 = Self::slot1(key);
        if self.table1[i1].key == key {
            if let Some((color, kind, from, to)) = self.table1[i1].mv {
                return Some(CuckooMove { color, kind, from, to });
            }
        }
        let i2 = Self::slot2(key);
        if self.table2[i2].key == key {
            if let Some((color, kind, from, to)) = self.table2[i2].mv {
                return Some(CuckooMove { color, kind, from, to });
            }
        }
        None
    }
}

pub static CUCKOO: Lazy<CuckooTable> = Lazy::new(build_cuckoo);

fn build_cuckoo() -> CuckooTable {
    let mut table = CuckooTable {
        table1: vec![CuckooSlot::default(); CUCKOO_SIZE],
        table2: vec![CuckooSlot::default(); CUCKOO_SIZE],
    };

    for color in [Color::White, Color::Black] {
        for kind in [Kind::Knight, Kind::Bishop, Kind::Rook, Kind::Queen, Kind::King] {
            for a in 0..64u8 {
                let sq_a = Square::from_index(a);
                let reachable = reachable_in_one(sq_a, kind);
                for sq_b in reachable {
                    if sq_b.index() <= a {
                        continue; // one entry per unordered pair
                    }
                    let delta = piece_key(color, kind, sq_a) ^ piece_key(color, kind, sq_b);
                    let key = !delta;
                    table.insert(key, (color, kind, sq_a, sq_b));
                }
            }
        }
    }
    table
}

fn reachable_in_one(sq: Square, kind: Kind) -> Vec<Square> {
    match kind {
        Kind::Knight => {
            let mut out = Vec::with_capacity(8);
            for jump in KnightJump::ALL {
                let (fd, rd) = jump.deltas();
                if let Some(to) = sq.try_offset(fd, rd) {
                    out.push(to);
                }
            }
            out
        }
        Kind::King => {
            let mut out = Vec::with_capacity(8);
            for dir in Direction::ALL {
                let (fd, rd) = dir.deltas();
                if let Some(to) = sq.try_offset(fd, rd) {
                    out.push(to);
                }
            }
            out
        }
        Kind::Bishop | Kind::Rook | Kind::Queen => {
            let dirs: &[Direction] = match kind {
                Kind::Bishop => &[Direction::NE, Direction::SE, Direction::SW, Direction::NW],
                Kind::Rook => &[Direction::N, Direction::E, Direction::S, Direction::W],
                _ => &Direction::ALL,
            };
            let mut out = Vec::new();
            for &dir in dirs {
                out.extend(ray_squares(sq, dir));
            }
            out
        }
        Kind::Pawn => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn king_dirs_corner_has_three() {
        let a1 = Square::new(0, 0);
        assert_eq!(KING_DIRS[a1.index() as usize].count_ones(), 3);
    }

    #[test]
    fn knight_jumps_center_has_eight() {
        let d4 = Square::new(3, 3);
        assert_eq!(KNIGHT_JUMPS[d4.index() as usize].count_ones(), 8);
    }

    #[test]
    fn ray_len_zero_off_board() {
        let a1 = Square::new(0, 0);
        assert_eq!(RAY_LEN[a1.index() as usize][Direction::S as usize], 0);
        assert_eq!(RAY_LEN[a1.index() as usize][Direction::W as usize], 0);
        assert_eq!(RAY_LEN[a1.index() as usize][Direction::N as usize], 7);
    }

    #[test]
    fn relation_is_symmetric_for_rays() {
        let a = Square::new(0, 0);
        let b = Square::new(7, 7);
        let rel = relation(a, b);
        assert_eq!(rel.ray_dir, Some(Direction::NE));
        let rel_back = relation(b, a);
        assert_eq!(rel_back.ray_dir, Some(Direction::SW));
    }

    #[test]
    fn zobrist_keys_are_deterministic() {
        let k1 = piece_key(Color::White, Kind::Pawn, Square::new(0, 1));
        let k2 = piece_key(Color::White, Kind::Pawn, Square::new(0, 1));
        assert_eq!(k1, k2);
        let k3 = piece_key(Color::White, Kind::Pawn, Square::new(1, 1));
        assert_ne!(k1, k3);
    }

    #[test]
    fn cuckoo_lookup_finds_inserted_moves() {
        let a = Square::new(3, 3);
        let b = Square::new(3, 6);
        let delta = piece_key(Color::White, Kind::Rook, a) ^ piece_key(Color::White, Kind::Rook, b);
        let found = CUCKOO.lookup(!delta);
        assert!(found.is_some());
    }
}
