//! Shared building blocks for the template registry crates:
//! logging setup, startup filesystem checks and small wire types.

pub mod types;
pub mod utils;
pub mod env;
