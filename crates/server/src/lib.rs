//! TiffinBox ordering API library.
//!
//! Exposes the application modules so integration tests and tools can build
//! routers and talk to the repositories directly; the binary entrypoint
//! lives in `main.rs`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
