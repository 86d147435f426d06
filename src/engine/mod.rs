// SPDX-License-Identifier: MIT

//! Engine module - the embeddable condition and pipeline core
//!
//! - [value] - dynamically-kinded values and the typed bridge to Rust types
//! - [compare] - cross-kind value comparison
//! - [getter], [builder], [context] - producing values from a context
//! - [condition] - boolean condition trees
//! - [data_source], [aggregate] - external capabilities used by nodes
//! - [node], [pipeline] - pipeline steps and the executor

pub mod aggregate;
pub mod builder;
pub mod compare;
pub mod condition;
pub mod context;
pub mod data_source;
pub mod error;
pub mod execution;
pub mod getter;
pub mod node;
pub mod pipeline;
pub mod value;

pub use builder::{DynamicValue, ValueBuilder};
pub use compare::{compare, ConditionOperand};
pub use condition::{Condition, CustomCompareCondition, CustomComparison, ValueCondition};
pub use context::PipelineContext;
pub use data_source::{DataSource, DataSourceRegistry};
pub use error::{BoxError, PipedreamError, PipelineError};
pub use execution::ExecutionContext;
pub use node::{BranchNode, FilterNode, Flow, FoldNode, Node, NodeKind, QueryNode, ReturnNode};
pub use pipeline::{Pipeline, PipelineExecutor};
pub use value::{Value, ValueKind, ValueType};
