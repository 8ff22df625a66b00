//! ChatAgent core: wire types, configuration, and small helpers shared by
//! the provider, agent, and CLI crates.

pub mod config;
pub mod types;
pub mod utils;
