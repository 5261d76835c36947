//! # Larkdown Domain
//!
//! Domain types and models for the markdown → document sync engine.
//!
//! This crate contains:
//! - Document model types (`TextElement`, `Block`, `TableStructure`)
//! - Sync progress and receipt types
//! - Fixed platform constants (block-type discriminants, code languages)
//!
//! ## Architecture
//! - No dependencies on other larkdown crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod constants;
pub mod types;

// Re-export commonly used items
pub use types::{
    Block, PersistReceipt, SyncPhase, TableStructure, TextElement, TextStyle,
};
