//! Data access layer
//!
//! # Design Principles
//!
//! - One `Store` trait, injected into handlers as `Arc<dyn Store>`
//! - Missing rows and constraint violations come back as `StoreError`
//!   variants, never panics
//! - Rely on DB constraints, handle conflicts - no check-then-insert
//! - The import batch runs in a single transaction

pub mod memory;
pub mod migrations;
pub mod pool;
pub mod postgres;
pub mod store;

pub use memory::MemoryStore;
pub use pool::create_pool;
pub use postgres::PgStore;
pub use store::{Store, StoreError, StudentUpsert, UpsertSummary};
