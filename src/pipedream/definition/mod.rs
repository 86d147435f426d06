// SPDX-License-Identifier: MIT

//! Serializable pipeline definitions
//!
//! - [types] - the YAML schema
//! - [loader] - reading definitions from files or strings
//! - [builder] - compiling definitions into runnable pipelines

pub mod builder;
pub mod loader;
pub mod types;

pub use builder::{CustomCompareRegistry, PipelineBuilder};
pub use loader::DefinitionLoader;
pub use types::PipelineDefinition;
