//! Core types for Rill.

pub mod generation;
pub mod stream;
pub mod tool;
pub mod wire;

pub use generation::*;
pub use stream::*;
pub use tool::*;
