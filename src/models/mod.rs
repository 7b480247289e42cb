//! Polynomial and power-law fit functions.
//!
//! Models are implemented as small, pure functions so that fitting and
//! plotting code can stay generic over the form.

pub mod model;

pub use model::*;
