//! Core data models for quizforge.
//!
//! Epistemic mapping:
//! - K_i (Knowledge): Concrete types with compile-time guarantees
//! - B_i (Beliefs): Wrapped in Result/Option
//! - I^R (Resolvable): Config parameters and per-session settings
//! - I^B (Bounded): Error variants with retry strategies

mod config;
mod error;
mod quiz;

pub use config::*;
pub use error::*;
pub use quiz::*;
