//! # Larkdown Core
//!
//! Pure conversion logic: turns a markdown syntax-token stream into the
//! ordered document-block sequence (plus out-of-band table structures) that
//! the sync service persists. No I/O happens in this crate.
//!
//! The tokenizer itself is external (`pulldown-cmark`); this crate only
//! consumes its event stream.

pub mod convert;

pub use convert::{BlockConverter, Conversion};
pub use convert::table::TableStructureBuilder;
