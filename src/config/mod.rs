//! # Brigade Configuration Module
//!
//! This module centralizes the tunables of the materialization policy. Default
//! values live in [`constants`] next to the compile-time assertions that keep
//! them consistent; [`BucketConfig`] is the runtime surface a brigade carries.
//!
//! ## Why Centralization?
//!
//! The mapping window and the buffered chunk size interact: a high limit at or
//! below the low threshold silently disables mapping, and a zero chunk size
//! would make a buffered read never progress. Co-locating the values and
//! checking them at compile time (defaults) and in [`BucketConfig::validate`]
//! (runtime overrides) prevents both.
//!
//! ## Module Organization
//!
//! - [`constants`]: Default numeric values with dependency documentation
//! - `options`: [`BucketConfig`] with builder setters and named options

pub mod constants;
mod options;

pub use constants::*;
pub use options::BucketConfig;
