//! Parley Core - Configuration, shared types, and error handling

pub mod config;
pub mod error;
pub mod types;

pub use config::{ModeProfile, ParleyConfig, ProviderConfig, SessionSettings};
pub use error::{Error, Result};
pub use types::*;
