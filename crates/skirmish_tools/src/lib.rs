//! # Skirmish Development Tools
//!
//! Command-line tools for development:
//! - Ruleset and scenario validators
//! - Headless battle runner
//! - Replay verification

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod error;
pub mod scenario;
pub mod simulate;
pub mod validate;
