pub mod attacks;
pub mod error;
pub mod geometry;
pub mod material;
pub mod mv;
pub mod piece;
pub mod position;
pub mod see;
pub mod side;
pub mod square;

pub mod movegen;

#[cfg(feature = "cli")]
pub mod logging;
