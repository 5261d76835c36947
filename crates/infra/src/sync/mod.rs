//! Document persistence
//!
//! [`DocumentSyncService`] drives the whole persist: create the remote
//! document, batch-insert plain block runs, and run the three-layer table
//! protocol per shell, all strictly in document order.

pub mod service;

use std::sync::Arc;

use larkdown_domain::SyncPhase;
use thiserror::Error;

pub use service::DocumentSyncService;

use crate::api::ApiError;

/// Observer for persist progress phases.
pub type ProgressCallback = Arc<dyn Fn(SyncPhase) + Send + Sync>;

/// Failures while persisting a document.
///
/// Any failure aborts the remaining sequence; no partial cleanup is
/// attempted (the created document may be left partially populated).
#[derive(Debug, Error)]
pub enum SyncError {
    /// An API call failed after exhausting its retry budget.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A table shell referenced a structure the conversion never produced.
    #[error("table structure {index} missing from conversion output")]
    MissingTable { index: usize },

    /// The platform did not report the inserted shell back.
    #[error("table shell insert returned no created block")]
    ShellNotCreated,

    /// Shell read-back returned an unexpected cell count; writing content
    /// by position would land in the wrong cells.
    #[error("table shell has {actual} cells, expected {expected}")]
    CellCountMismatch { expected: usize, actual: usize },

    /// A cell-population task died before reporting a result.
    #[error("cell population task failed: {0}")]
    CellTask(String),
}
