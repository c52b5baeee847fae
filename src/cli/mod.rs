//! Command-line interface module.

mod args;
pub mod serialize;
pub mod serve;

pub use args::{Cli, Commands};
