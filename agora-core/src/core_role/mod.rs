//! Role-based permission layer
//!
//! A single predicate table decides what each role may do. Every other
//! module asks this one instead of re-encoding role lists.

pub mod authority;

pub use authority::{Action, Role};
