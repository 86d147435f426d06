// SPDX-License-Identifier: MIT

//! Pipeline steps
//!
//! Every node reads and writes the [`PipelineContext`] it is given and tells
//! the executor how to continue through a [`Flow`].

use std::collections::BTreeMap;

use log::debug;

use super::builder::ValueBuilder;
use super::condition::Condition;
use super::context::PipelineContext;
use super::error::PipelineError;
use super::execution::ExecutionContext;
use super::pipeline::{Pipeline, PipelineExecutor};
use super::value::Value;

/// Context key the current element is bound to while a Filter runs
pub const DEFAULT_ELEMENT_NAME: &str = "element";

/// What the executor does after a node completes
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Run the next node
    Continue,
    /// End the whole execution with this value
    Return(Value),
    /// End the whole execution successfully, without a value
    Stop,
}

/// One executable step of a pipeline
#[derive(Debug, Clone)]
pub enum Node {
    Query(QueryNode),
    Branch(BranchNode),
    Return(ReturnNode),
    Filter(FilterNode),
    Fold(FoldNode),
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Query,
    Branch,
    Return,
    Filter,
    Fold,
    Stop,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeKind::Query => "query",
            NodeKind::Branch => "branch",
            NodeKind::Return => "return",
            NodeKind::Filter => "filter",
            NodeKind::Fold => "fold",
            NodeKind::Stop => "stop",
        };
        f.write_str(name)
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Query(_) => NodeKind::Query,
            Node::Branch(_) => NodeKind::Branch,
            Node::Return(_) => NodeKind::Return,
            Node::Filter(_) => NodeKind::Filter,
            Node::Fold(_) => NodeKind::Fold,
            Node::Stop => NodeKind::Stop,
        }
    }

    pub async fn execute(
        &self,
        executor: &PipelineExecutor,
        ectx: &ExecutionContext,
        ctx: &mut PipelineContext,
    ) -> Result<Flow, PipelineError> {
        match self {
            Node::Query(node) => node.execute(executor, ectx, ctx).await,
            Node::Branch(node) => node.execute(executor, ectx, ctx).await,
            Node::Return(node) => node.execute(ctx),
            Node::Filter(node) => node.execute(ctx),
            Node::Fold(node) => node.execute(executor, ctx).await,
            Node::Stop => Ok(Flow::Stop),
        }
    }
}

macro_rules! node_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Node {
                fn from(node: $ty) -> Self {
                    Node::$variant(node)
                }
            }
        )*
    };
}

node_from! {
    Query => QueryNode,
    Branch => BranchNode,
    Return => ReturnNode,
    Filter => FilterNode,
    Fold => FoldNode,
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Calls a named data source and stores its response in the context
#[derive(Debug, Clone)]
pub struct QueryNode {
    pub data_source: String,
    pub params: ValueBuilder,
    pub save_to: String,
}

impl QueryNode {
    pub fn new(
        data_source: impl Into<String>,
        params: ValueBuilder,
        save_to: impl Into<String>,
    ) -> Self {
        Self {
            data_source: data_source.into(),
            params,
            save_to: save_to.into(),
        }
    }

    async fn execute(
        &self,
        executor: &PipelineExecutor,
        ectx: &ExecutionContext,
        ctx: &mut PipelineContext,
    ) -> Result<Flow, PipelineError> {
        let params = self.params.build(ctx)?;

        let source = executor
            .data_sources()
            .get(&self.data_source)
            .await
            .ok_or_else(|| PipelineError::DataSourceNotFound(self.data_source.clone()))?;

        debug!("Querying data source '{}'", self.data_source);
        let response = source
            .query(ectx, params)
            .await
            .map_err(|source| PipelineError::DataSource {
                name: self.data_source.clone(),
                source,
            })?;

        ctx.set(self.save_to.clone(), response);
        Ok(Flow::Continue)
    }
}

// ---------------------------------------------------------------------------
// Branch
// ---------------------------------------------------------------------------

/// Runs one of two sub-pipelines depending on a condition.
///
/// A missing sub-pipeline for the taken side is an error (TerminatedEarly).
#[derive(Debug, Clone)]
pub struct BranchNode {
    pub condition: Condition,
    pub true_pipeline: Option<Pipeline>,
    pub false_pipeline: Option<Pipeline>,
    /// Run the sub-pipeline against a clone of the context
    pub clone_context: bool,
}

impl BranchNode {
    pub fn new(condition: Condition) -> Self {
        Self {
            condition,
            true_pipeline: None,
            false_pipeline: None,
            clone_context: false,
        }
    }

    pub fn on_true(mut self, pipeline: impl Into<Pipeline>) -> Self {
        self.true_pipeline = Some(pipeline.into());
        self
    }

    pub fn on_false(mut self, pipeline: impl Into<Pipeline>) -> Self {
        self.false_pipeline = Some(pipeline.into());
        self
    }

    pub fn isolated(mut self) -> Self {
        self.clone_context = true;
        self
    }

    async fn execute(
        &self,
        executor: &PipelineExecutor,
        ectx: &ExecutionContext,
        ctx: &mut PipelineContext,
    ) -> Result<Flow, PipelineError> {
        let outcome = self.condition.evaluate(ctx)?;
        debug!("Branch condition evaluated to {}", outcome);

        let target = if outcome {
            &self.true_pipeline
        } else {
            &self.false_pipeline
        };
        let pipeline = target
            .as_ref()
            .ok_or(PipelineError::TerminatedEarly { outcome })?;

        if self.clone_context {
            let mut scoped = ctx.clone();
            executor.run_pipeline(ectx, pipeline, &mut scoped).await
        } else {
            executor.run_pipeline(ectx, pipeline, ctx).await
        }
    }
}

// ---------------------------------------------------------------------------
// Return
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReturnNode {
    pub value: ValueBuilder,
}

impl ReturnNode {
    pub fn new(value: ValueBuilder) -> Self {
        Self { value }
    }

    fn execute(&self, ctx: &PipelineContext) -> Result<Flow, PipelineError> {
        Ok(Flow::Return(self.value.build(ctx)?))
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Keeps the elements of a list or map for which a condition holds.
///
/// The condition sees the current element under `element_name`, bound in a
/// scratch clone of the context. Only `save_to` is written back.
#[derive(Debug, Clone)]
pub struct FilterNode {
    pub condition: Condition,
    pub source: ValueBuilder,
    /// Keep elements for which the condition is false instead
    pub exclude: bool,
    pub element_name: String,
    pub save_to: String,
}

impl FilterNode {
    pub fn new(source: ValueBuilder, condition: Condition, save_to: impl Into<String>) -> Self {
        Self {
            condition,
            source,
            exclude: false,
            element_name: DEFAULT_ELEMENT_NAME.to_string(),
            save_to: save_to.into(),
        }
    }

    pub fn excluding(mut self) -> Self {
        self.exclude = true;
        self
    }

    pub fn with_element_name(mut self, name: impl Into<String>) -> Self {
        self.element_name = name.into();
        self
    }

    fn keep(&self, scope: &mut PipelineContext, element: &Value) -> Result<bool, PipelineError> {
        scope.set(self.element_name.clone(), element.clone());
        Ok(self.condition.evaluate(scope)? != self.exclude)
    }

    fn execute(&self, ctx: &mut PipelineContext) -> Result<Flow, PipelineError> {
        let source = self.source.build(ctx)?;
        let mut scope = ctx.clone();

        let filtered = match source.resolved() {
            Value::List(items) => {
                let mut kept = Vec::new();
                for item in items {
                    if self.keep(&mut scope, item)? {
                        kept.push(item.clone());
                    }
                }
                Value::List(kept)
            }
            Value::Map(entries) => {
                let mut kept = BTreeMap::new();
                for (key, item) in entries {
                    if self.keep(&mut scope, item)? {
                        kept.insert(key.clone(), item.clone());
                    }
                }
                Value::Map(kept)
            }
            other => return Err(not_iterable(other)),
        };

        ctx.set(self.save_to.clone(), filtered);
        Ok(Flow::Continue)
    }
}

fn not_iterable(value: &Value) -> PipelineError {
    let kind = value.kind();
    PipelineError::NotIterable { kind }
}

// ---------------------------------------------------------------------------
// Fold
// ---------------------------------------------------------------------------

/// Reduces a list with a registered aggregator
#[derive(Debug, Clone)]
pub struct FoldNode {
    pub source: ValueBuilder,
    pub start: ValueBuilder,
    /// Name of the aggregator in the executor's registry
    pub aggregator: String,
    pub right_to_left: bool,
    pub save_to: String,
}

impl FoldNode {
    pub fn new(
        source: ValueBuilder,
        start: ValueBuilder,
        aggregator: impl Into<String>,
        save_to: impl Into<String>,
    ) -> Self {
        Self {
            source,
            start,
            aggregator: aggregator.into(),
            right_to_left: false,
            save_to: save_to.into(),
        }
    }

    pub fn right_to_left(mut self) -> Self {
        self.right_to_left = true;
        self
    }

    async fn execute(
        &self,
        executor: &PipelineExecutor,
        ctx: &mut PipelineContext,
    ) -> Result<Flow, PipelineError> {
        let aggregator = executor
            .aggregators()
            .get(&self.aggregator)
            .await
            .ok_or_else(|| PipelineError::AggregatorNotFound(self.aggregator.clone()))?;

        let source = self.source.build(ctx)?;
        let items = match source.resolved() {
            Value::List(items) => items,
            other => return Err(not_iterable(other)),
        };

        let mut ordered: Vec<&Value> = items.iter().collect();
        if self.right_to_left {
            ordered.reverse();
        }

        let mut acc = self.start.build(ctx)?;
        for item in ordered {
            acc = aggregator
                .aggregate(acc, item.clone())
                .map_err(|source| PipelineError::Aggregation {
                    name: self.aggregator.clone(),
                    source,
                })?;
        }

        ctx.set(self.save_to.clone(), acc);
        Ok(Flow::Continue)
    }
}
