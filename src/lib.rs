//! Bookshelf application library
//!
//! Wires the core crates and the project modules into a runnable service.

pub mod bootstrap;
pub mod modules;
pub mod utils;

pub use modules::*;
