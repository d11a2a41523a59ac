//! Provider metadata and per-provider behavior hooks.

pub mod descriptor;
pub mod sam;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
