//! Shared types for the stampede load testing harness.
//!
//! Everything in here is plain data: load profiles, request specs, checks, the
//! run summary and the raw (deserializable) option types which are validated
//! into them.
mod check;
mod config;
mod constants;
mod error;
mod profile;
mod request;
mod stats;

pub use check::*;
pub use config::*;
pub use constants::*;
pub use error::*;
pub use profile::*;
pub use request::*;
pub use stats::*;
