//! Pipeline module - PDF to quiz generation.

mod quiz;

pub use quiz::*;
