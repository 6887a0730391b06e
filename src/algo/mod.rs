//! Mesh processing algorithms.
//!
//! This module contains the vertex-welding engine and its companion driver:
//!
//! - **Welding**: collapse clusters of nearby vertices into single
//!   representatives ([`weld`])
//! - **Epsilon search**: find the welding threshold that achieves a target
//!   vertex reduction rate ([`find_epsilon`])
//! - **Progress**: caller-supplied sinks for progress updates
//!   ([`ProgressSink`])

pub mod find_epsilon;
pub mod progress;
pub mod weld;

pub use progress::{ProgressSink, Silent};
