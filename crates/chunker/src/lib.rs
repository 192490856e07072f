//! Passage chunking for the retrieval pipeline.
//!
//! Documents are split into whitespace tokens and cut into windows of at most
//! `chunk_size` tokens. Each window starts `chunk_size - overlap` tokens after
//! the previous one, so adjacent passages share exactly `overlap` tokens and
//! every token lands in at least one passage.
//!
//! ## Guarantees
//!
//! - Pure: no I/O, no randomness. Same text + config, same passages.
//! - Empty or whitespace-only text yields no passages, not an error.
//! - Configs with `overlap >= chunk_size` are rejected up front with
//!   [`ChunkError::InvalidConfig`], since the window would never advance.
//!
//! ## Example
//!
//! ```
//! use chunker::{chunk_text, ChunkConfig};
//!
//! let cfg = ChunkConfig::new(4, 1);
//! let chunks = chunk_text("one two three four five six seven", &cfg).unwrap();
//! assert_eq!(chunks, vec!["one two three four", "four five six seven"]);
//! ```

mod chunk;
mod config;
mod error;
mod token;

pub use crate::chunk::{chunk_spans, chunk_text, ChunkSpan};
pub use crate::config::ChunkConfig;
pub use crate::error::ChunkError;
pub use crate::token::{tokenize, Token};
