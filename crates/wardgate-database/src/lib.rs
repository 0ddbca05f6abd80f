//! # wardgate-database
//!
//! Persistence for Wardgate. The [`store`] module defines one async trait
//! per aggregate; [`repositories`] implements them on PostgreSQL and
//! [`memory`] implements them in process for tests and throwaway
//! development servers. [`Stores`] bundles one implementation of each.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::Stores;
