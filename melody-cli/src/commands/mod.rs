//! CLI command implementations.

pub mod common;
pub mod identify;
pub mod name;
pub mod render;
