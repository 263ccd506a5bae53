//! VSP Server payment gateway integration service
//!
//! Registers payments with the gateway, stores them, and processes the
//! gateway's signed notifications with idempotent, record-locked updates.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod payments;
