//! roster-server: HTTP back end for student and group records
//!
//! Layers, leaf first:
//! - `db`: the `Store` trait with PostgreSQL and in-memory implementations
//! - `service`: listing, export and import orchestration shared by HTTP and CLI
//! - `http`: axum router, extractors, error mapping, graceful shutdown

pub mod db;
pub mod http;
pub mod service;

pub use db::{MemoryStore, PgStore, Store, StoreError};
pub use http::{build_router, run_server, AppState, ServerConfig};
pub use service::ServiceError;
