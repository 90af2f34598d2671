//! Per-read tail estimation pipeline
//!
//! probe -> locate -> extract -> (adapter) -> segment -> refine,
//! composed per read by `read` and fanned out by `batch`.

pub mod adapter;
pub mod batch;
pub mod extract;
pub mod locate;
pub mod probe;
pub mod read;
pub mod refine;
pub mod segment;
