//! # sqlgate-adapter-pg
//!
//! Postgres access for the gateway: a target-aware pool router, the
//! permission-gated execution wrapper, and schema introspection.
//!
//! The router keeps a small cache of live pools keyed by target URL so that
//! sessions bound to different databases do not tear down each other's
//! connections. The executor classifies and authorizes every statement
//! before it reaches the database, selects the transaction shape from the
//! session grant, and guarantees rollback on failure.

pub mod error;
pub mod executor;
pub mod introspect;
pub mod router;

pub use error::AdapterError;
pub use executor::run_query;
pub use introspect::describe_schema;
pub use router::{PoolRouter, PoolRouterOptions, display_target};

// Re-export the pool type for downstream crates.
pub use sqlx::PgPool;
