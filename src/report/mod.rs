//! Output rendering.

mod generator;

pub use generator::*;
