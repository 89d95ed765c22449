//! Analysis logic for sampled call trees
//!
//! Pure functions over a finished [`crate::tree::ThreadForest`], separated
//! from the CLI presentation.

pub mod hot_methods;

pub use hot_methods::{hot_methods, top_n, MethodHotspot};
