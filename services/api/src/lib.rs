//! services/api/src/lib.rs
//!
//! The HTTP surface of the membership platform: configuration, the Postgres
//! adapter, and the axum router built on top of the `membership_core` services.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
