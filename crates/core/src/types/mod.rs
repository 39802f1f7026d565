//! Core types for GOMFLOW.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod code;
pub mod country;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use code::{CodeError, ShareableSlug, TrackingCode};
pub use country::{Country, CountryError, PaymentMethod, PaymentMethodKind};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Currency, Price, PriceError};
pub use status::*;
