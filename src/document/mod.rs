//! Document module - turning an uploaded PDF into model-sized text.
//!
//! Provides:
//! - `extract_text`: per-page PDF text extraction
//! - `TextChunker`: overlapping, boundary-aware splitting
//! - `sample_chunks`: the leading sample forwarded to the model

mod chunker;
mod extract;

pub use chunker::*;
pub use extract::*;

#[cfg(test)]
pub(crate) use extract::tests::build_pdf;
