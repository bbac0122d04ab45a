//! zbundle - Library for bundling static assets
//!
//! This library provides functionality to:
//! - Resolve include/exclude lists into ordered, deduplicated inputs
//! - Minify and compile style sheets, scripts and markdown per target
//! - Rebuild affected targets when watched sources change

pub mod build;
pub mod builders;
pub mod cli;
pub mod config;
pub mod content;
pub mod logger;
pub mod toolchain;
pub mod watch;
