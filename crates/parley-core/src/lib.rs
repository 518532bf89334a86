//! Client-side session synchronization core without UI or transport dependencies

pub mod config;
pub mod domain;
pub mod error;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
