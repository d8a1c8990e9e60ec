//! # BookFactory Common Library
//!
//! Shared code for BookFactory services:
//! - Error type used by database and configuration code
//! - Bootstrap configuration loading and root folder resolution
//! - Database initialization and schema migrations
//! - Session token authentication
//! - Time and identifier helpers

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
