//! Paper Lantern Core - Shared types library.
//!
//! This crate provides common types used across all Paper Lantern components:
//! - `storefront` - JSON API backing the browser client
//! - `cli` - Command-line tools for seeding and health checks
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no backend
//! access. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
