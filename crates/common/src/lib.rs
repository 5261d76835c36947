//! # Larkdown Common
//!
//! Reusable infrastructure for the document sync engine, free of any
//! platform-specific knowledge:
//!
//! - **`auth`**: OAuth 2.0 PKCE flow, token record/store abstractions, and a
//!   token manager whose refresh path is single-flight: concurrent callers
//!   share exactly one in-flight refresh.
//! - **`resilience`**: an asynchronous token-bucket rate limiter and a
//!   dual-counter exponential-backoff retry executor.
//!
//! Higher layers (the API client and sync service) compose these without
//! this crate ever learning about document blocks or endpoints.

pub mod auth;
pub mod resilience;
