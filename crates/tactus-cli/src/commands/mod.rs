//! CLI command implementations.

pub mod common;
pub mod config;
pub mod order;
pub mod simulate;
