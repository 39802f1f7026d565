//! GOMFLOW Core - Shared domain types.
//!
//! This crate provides the types shared by every GOMFLOW component:
//! - `web` - The group-order web application
//! - `cli` - Command-line tools for migrations and operator tasks
//!
//! # Architecture
//!
//! The core crate contains only types and pure decision logic - no I/O, no
//! database access, no HTTP clients. The lifecycle rules for group orders and
//! the alphabets for shareable slugs and tracking codes live here so that the
//! web server, the CLI and the tests all agree on them.
//!
//! # Modules
//!
//! - [`types`] - IDs, emails, prices, order status, unique codes and the
//!   supported country / payment-method catalogue

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
