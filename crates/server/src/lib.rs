//! Marketlink server library.
//!
//! Links a user's marketplace accounts (Wildberries, Ozon), aggregates their
//! live products, persists chosen products and records user-asserted
//! mappings between products of different stores.
//!
//! # Modules
//!
//! - [`services`] - Store registry, product aggregator and mapping engine
//! - [`marketplace`] - Provider clients and normalization
//! - [`crypto`] - Encryption of stored marketplace tokens
//! - [`db`] - Repositories (`PostgreSQL`, and in-memory for tests)
//! - [`routes`] - Thin JSON boundary over the services

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod marketplace;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
