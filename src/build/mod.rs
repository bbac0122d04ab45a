//! Build pipeline module for zbundle
//!
//! Turns declared targets into written assets.
//!
//! # Overview
//!
//! The build pipeline consists of:
//! - **Discovery**: Resolve includes and excludes into ordered content items
//! - **Building**: Load, transform and combine items per format
//! - **Output**: Expand output templates and write the results
//!
//! # Example
//!
//! ```ignore
//! use zbundle::build::{BuildContext, BuildPipeline};
//! use zbundle::config::load_targets;
//! use std::path::Path;
//!
//! let targets = load_targets(Path::new("zbundle.json"))?;
//! let pipeline = BuildPipeline::new(BuildContext::new(std::env::current_dir()?));
//!
//! let result = pipeline.build_all(&targets, None)?;
//! println!("{}", result.summary());
//! ```

pub mod context;
pub mod discovery;
pub mod output;
pub mod pipeline;
pub mod result;
pub mod suppress;
pub mod target;

pub use context::*;
pub use discovery::*;
pub use output::*;
pub use pipeline::*;
pub use result::*;
pub use suppress::*;
pub use target::*;
