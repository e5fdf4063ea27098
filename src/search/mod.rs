//! Search functionality for hrbot
//!
//! Implements:
//! - Text normalization
//! - Fuzzy similarity metrics and weighted scoring
//! - The match index built from the catalog
//! - Best-match and top-N matching

mod engine;
mod fuzzy;
mod index;
mod normalize;

pub use engine::*;
pub use fuzzy::*;
pub use index::*;
pub use normalize::*;
