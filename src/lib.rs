//! Cafes - a small HTTP API over a catalog of cafes

pub mod auth;
pub mod config;
pub mod error;
pub mod types;

pub mod store;
pub mod api;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
