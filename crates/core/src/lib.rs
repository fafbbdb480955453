//! Restaurant Core - Shared domain types.
//!
//! This crate provides the types used across the restaurant ordering backend:
//! - `server` - HTTP API over the food catalog and purchase ledger
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Store identifiers, typed references, emails, and purchase quantities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
