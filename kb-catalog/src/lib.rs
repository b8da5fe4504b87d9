//! HTTP client for the remote subject catalog.
//!
//! Pure I/O: wire payloads in, `kb-core` domain types out. Implements the
//! core's `CatalogApi` contract.

mod client;

pub use client::{CatalogClient, DEFAULT_BASE_URL};
