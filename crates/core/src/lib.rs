//! Marketlink Core - Shared domain types.
//!
//! This crate provides the types shared by every Marketlink component:
//! - `server` - Product aggregation, store registry and mapping engine
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure normalization rules - no I/O,
//! no database access, no HTTP clients.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, store types, products and mappings

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
