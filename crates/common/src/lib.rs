//! Common utilities and types shared across the OpenVPN exporter crates.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
