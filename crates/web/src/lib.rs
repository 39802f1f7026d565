//! GOMFLOW web application library.
//!
//! The server binary, the CLI and the integration tests all build on this
//! crate: configuration, repositories, services and the HTTP router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
