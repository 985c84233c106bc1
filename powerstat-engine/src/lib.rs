//! Pattern statistics and weighted generation over Powerball draw history.
//!
//! Everything here describes the past. Heat categories and generated sets
//! are analysis artifacts, not forecasts: draws are independent events.

pub mod cluster;
pub mod config;
pub mod error;
pub mod features;
pub mod heat;
pub mod patterns;
pub mod sampler;
pub mod strategy;

pub use error::{EngineError, Result};
