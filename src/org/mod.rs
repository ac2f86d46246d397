//! The organization tree engine: forest building, expansion and
//! selection state, and aggregate statistics. Everything a rendering or
//! submission layer needs goes through [`engine::TreeEngine`].

pub mod build;
pub mod engine;
pub mod expand;
pub mod node;
pub mod payload;
pub mod select;
pub mod stats;
