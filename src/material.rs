//! Component C (material key): spec §3.4. A single `u64` whose low 48 bits
//! are twelve 4-bit piece counters and whose high 16 bits are a mixed-in
//! hash of the material signature. The counters are authoritative; hash
//! collisions only matter for (non-exhaustive) fast-path endgame
//! recognition, never for correctness.

use crate::geometry::{material_lane, MATERIAL_ADDEND};
use crate::piece::{Color, Kind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaterialKey(pub u64);

impl MaterialKey {
    #[inline]
    pub fn add(&mut self, color: Color, bishop_light: Option<bool>, kind: Kind) {
        let lane = material_lane(color, bishop_light, kind);
        self.0 = self.0.wrapping_add(MATERIAL_ADDEND[lane]);
    }

    #[inline]
    pub fn sub(&mut self, color: Color, bishop_light: Option<bool>, kind: Kind) {
        let lane = material_lane(color, bishop_light, kind);
        self.0 = self.0.wrapping_sub(MATERIAL_ADDEND[lane]);
    }

    #[inline]
    pub fn count(&self, color: Color, bishop_light: Option<bool>, kind: Kind) -> u32 {
        let lane = material_lane(color, bishop_light, kind);
        ((self.0 >> (4 * lane)) & 0xF) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_sub_is_identity() {
        let mut key = MaterialKey::default();
        key.add(Color::White, None, Kind::Queen);
        assert_eq!(key.count(Color::White, None, Kind::Queen), 1);
        key.sub(Color::White, None, Kind::Queen);
        assert_eq!(key, MaterialKey::default());
    }

    #[test]
    fn lanes_are_independent() {
        let mut key = MaterialKey::default();
        key.add(Color::White, None, Kind::Queen);
        key.add(Color::Black, None, Kind::Rook);
        assert_eq!(key.count(Color::White, None, Kind::Queen), 1);
        assert_eq!(key.count(Color::Black, None, Kind::Rook), 1);
        assert_eq!(key.count(Color::White, None, Kind::Rook), 0);
    }
}
