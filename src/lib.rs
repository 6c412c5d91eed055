// SPDX: CC0-1.0

pub mod engine;
pub mod eval;
pub mod lex;
pub mod parse;
pub mod plot;
pub mod render;
pub mod sample;
pub mod shell;
pub mod stdlib;

pub use engine::Schemer;

pub type Number = f64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T> Point<T> {
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}
