//! # sqlgate-core
//!
//! Shared core of the sqlgate gateway: the permission model (categories and
//! grants), the lexical SQL classifier that maps free-form statements to a
//! permission category, and the gateway configuration types.
//!
//! The classifier is a best-effort leading-clause filter, not a SQL parser.
//! Authorization fails closed: a statement whose derived category is not in
//! the session grant is rejected before it ever reaches the database.

pub mod classifier;
pub mod config;
pub mod error;
pub mod permissions;

pub use classifier::{authorize, classify};
pub use config::{GatewayConfig, Transport};
pub use error::CoreError;
pub use permissions::{Category, Grant};
