//! # Larkdown Infra
//!
//! The HTTP-facing half of the sync engine:
//! - **`config`**: region selection (the two supported deployments) and the
//!   tunable sync settings.
//! - **`api`**: the authenticated, rate-limited, retrying API client plus
//!   the typed document endpoints and wire payload mapping.
//! - **`sync`**: the document sync service that persists a converted block
//!   sequence, batching plain runs and running the three-step table
//!   protocol with bounded concurrency.

pub mod api;
pub mod config;
pub mod sync;

pub use api::{AccessTokenProvider, ApiClient, ApiClientConfig, ApiError};
pub use config::{Region, SyncSettings, SyncSettingsBuilder};
pub use sync::{DocumentSyncService, ProgressCallback, SyncError};
