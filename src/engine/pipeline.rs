// SPDX-License-Identifier: MIT

//! Pipelines and the executor that drives them

use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use log::{debug, info};

use super::aggregate::{Aggregator, AggregatorRegistry};
use super::context::PipelineContext;
use super::data_source::{DataSource, DataSourceRegistry};
use super::error::PipelineError;
use super::execution::ExecutionContext;
use super::node::{Flow, Node};
use super::value::Value;

/// Ordered sequence of nodes. Sub-pipelines hang off Branch nodes, so a
/// pipeline is always a tree.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub nodes: Vec<Node>,
}

impl Pipeline {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Append a node, builder style
    pub fn then(mut self, node: impl Into<Node>) -> Self {
        self.nodes.push(node.into());
        self
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl From<Vec<Node>> for Pipeline {
    fn from(nodes: Vec<Node>) -> Self {
        Self::new(nodes)
    }
}

/// Runs pipelines against a context using its registries.
///
/// Registries are shared: clones of an executor see the same data sources and
/// aggregators.
#[derive(Clone, Default)]
pub struct PipelineExecutor {
    data_sources: DataSourceRegistry,
    aggregators: AggregatorRegistry,
}

impl PipelineExecutor {
    /// Executor with no data sources and the builtin aggregators
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registries(
        data_sources: DataSourceRegistry,
        aggregators: AggregatorRegistry,
    ) -> Self {
        Self {
            data_sources,
            aggregators,
        }
    }

    pub async fn register_data_source(&self, source: DataSource) {
        self.data_sources.register(source).await;
    }

    pub async fn register_aggregator(&self, aggregator: Arc<dyn Aggregator>) {
        self.aggregators.register(aggregator).await;
    }

    pub fn data_sources(&self) -> &DataSourceRegistry {
        &self.data_sources
    }

    pub fn aggregators(&self) -> &AggregatorRegistry {
        &self.aggregators
    }

    /// Run a pipeline against a fresh, empty context
    pub async fn execute(
        &self,
        ectx: &ExecutionContext,
        pipeline: &Pipeline,
    ) -> Result<Option<Value>, PipelineError> {
        let mut ctx = PipelineContext::new();
        self.execute_with_context(ectx, pipeline, &mut ctx).await
    }

    /// Run a pipeline against a caller-owned context.
    ///
    /// Returns the value of the Return node that ended the run, or `None` if
    /// the pipeline ran to completion or hit a Stop. Context mutations made
    /// before a failure are kept.
    pub async fn execute_with_context(
        &self,
        ectx: &ExecutionContext,
        pipeline: &Pipeline,
        ctx: &mut PipelineContext,
    ) -> Result<Option<Value>, PipelineError> {
        info!("Starting run {} ({} nodes)", ectx.run_id(), pipeline.len());

        match self.run_pipeline(ectx, pipeline, ctx).await {
            Ok(Flow::Return(value)) => {
                info!("Run {} returned a value", ectx.run_id());
                Ok(Some(value))
            }
            Ok(Flow::Stop) => {
                info!("Run {} stopped", ectx.run_id());
                Ok(None)
            }
            Ok(Flow::Continue) => {
                info!("Run {} completed without a return value", ectx.run_id());
                Ok(None)
            }
            Err(e) => {
                info!("Run {} failed: {}", ectx.run_id(), e);
                Err(e)
            }
        }
    }

    /// Run the nodes of one pipeline level in order.
    ///
    /// Boxed because Branch nodes recurse into it.
    pub(crate) fn run_pipeline<'a>(
        &'a self,
        ectx: &'a ExecutionContext,
        pipeline: &'a Pipeline,
        ctx: &'a mut PipelineContext,
    ) -> BoxFuture<'a, Result<Flow, PipelineError>> {
        async move {
            for (index, node) in pipeline.nodes.iter().enumerate() {
                if ectx.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }

                let kind = node.kind();
                debug!("Executing node {} ({})", index, kind);

                let flow = node
                    .execute(self, ectx, ctx)
                    .await
                    .map_err(|source| PipelineError::Node {
                        index,
                        kind,
                        source: Box::new(source),
                    })?;

                if flow != Flow::Continue {
                    return Ok(flow);
                }
            }
            Ok(Flow::Continue)
        }
        .boxed()
    }
}
