//! # TickerLens Database Crate
//!
//! This crate is the application's interface to its two external collaborators
//! that hold state: the credential store and the price series document cache.
//!
//! ## Architectural Principles
//!
//! - **Traits at the seam:** `CredentialStore` and `PriceCache` are the contracts
//!   the rest of the application depends on. Handlers never see SQL.
//! - **Asynchronous & Pooled:** The PostgreSQL implementation uses a connection
//!   pool (`PgPool`) shared across requests.
//! - **Swappable:** `MemoryStore` implements both traits in-process for
//!   development and tests.
//!
//! ## Public API
//!
//! - `connect`: Establishes the database connection pool.
//! - `run_migrations`: Applies the embedded migrations.
//! - `DbRepository`: PostgreSQL implementation of both stores.
//! - `MemoryStore`: In-memory implementation of both stores.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use memory::MemoryStore;
pub use repository::DbRepository;
pub use store::{CredentialStore, PriceCache};
