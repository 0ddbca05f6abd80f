//! # wardgate-entity
//!
//! Domain entity models for Wardgate. Every struct in this crate represents
//! a database table row or a domain value object. Row types derive
//! `sqlx::FromRow`; enums are backed by Postgres enum types.

#[macro_use]
mod macros;

pub mod activity;
pub mod audit;
pub mod permission;
pub mod role;
pub mod session;
pub mod user;
