//! Restaurant ordering API library.
//!
//! This crate provides the server functionality as a library, allowing it
//! to be driven in-process by tests and reused by the operator CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;
