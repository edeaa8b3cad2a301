//! Core types and trait definitions for Docket.
//!
//! This crate has no HTTP or database dependencies. It defines the lifecycle
//! wire contract and the parsed CSV row model, plus the index that correlates
//! rows into per-purchase-order lifecycles.

pub mod error;
pub mod event;
pub mod index;
pub mod lifecycle;
pub mod row;
pub mod store;

pub use error::{Error, Result};
