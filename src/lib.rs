//! pipedream-rs: an embeddable rule and pipeline evaluation engine
//!
//! - [engine] - values, conditions, nodes and the pipeline executor
//! - [pipedream] - YAML pipeline definitions and built-in data sources

pub mod engine;
pub mod pipedream;
