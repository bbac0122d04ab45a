//! Configuration module for zbundle
//!
//! Provides types and loading for the `zbundle.json` target list.

pub mod loader;
pub mod schema;

pub use loader::*;
pub use schema::*;
