// SPDX-License-Identifier: MIT

//! Named, typed query capabilities invoked by Query nodes
//!
//! A [`DataSource`] is constructed from a typed async function. The parameter
//! and response types are captured once at construction; at call time the
//! params are converted to the parameter type before the function runs.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::{BoxError, DataSourceError};
use super::execution::ExecutionContext;
use super::value::{Value, ValueType};

/// Type-erased query signature shared by every data source
#[async_trait]
pub trait DataSourceQuery: Send + Sync {
    async fn query(&self, ectx: &ExecutionContext, params: Value) -> Result<Value, DataSourceError>;
}

/// Adapts a typed async function to [`DataSourceQuery`]
struct TypedQuery<P, R, F> {
    func: F,
    _types: PhantomData<fn(P) -> R>,
}

#[async_trait]
impl<P, R, F, Fut> DataSourceQuery for TypedQuery<P, R, F>
where
    P: ValueType,
    R: ValueType,
    F: Fn(ExecutionContext, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
{
    async fn query(
        &self,
        ectx: &ExecutionContext,
        params: Value,
    ) -> Result<Value, DataSourceError> {
        let Some(typed) = P::convert_from(&params) else {
            return Err(DataSourceError::ParamTypeDoesNotMatch {
                expected: P::TYPE_NAME,
                actual: params.resolved().kind(),
            });
        };

        let response = (self.func)(ectx.clone(), typed)
            .await
            .map_err(DataSourceError::Query)?;
        Ok(response.into_value())
    }
}

/// A named query function with its parameter and response type descriptors
#[derive(Clone)]
pub struct DataSource {
    name: String,
    param_type: &'static str,
    response_type: &'static str,
    query: Arc<dyn DataSourceQuery>,
}

impl DataSource {
    /// Create a data source from a typed async function
    pub fn new<P, R, F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        P: ValueType,
        R: ValueType,
        F: Fn(ExecutionContext, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, BoxError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            param_type: P::TYPE_NAME,
            response_type: R::TYPE_NAME,
            query: Arc::new(TypedQuery {
                func,
                _types: PhantomData,
            }),
        }
    }

    /// Create a data source from an already type-erased query
    pub fn from_query(
        name: impl Into<String>,
        param_type: &'static str,
        response_type: &'static str,
        query: Arc<dyn DataSourceQuery>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            response_type,
            query,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_type(&self) -> &'static str {
        self.param_type
    }

    pub fn response_type(&self) -> &'static str {
        self.response_type
    }

    pub async fn query(
        &self,
        ectx: &ExecutionContext,
        params: Value,
    ) -> Result<Value, DataSourceError> {
        self.query.query(ectx, params).await
    }
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("name", &self.name)
            .field("param_type", &self.param_type)
            .field("response_type", &self.response_type)
            .finish_non_exhaustive()
    }
}

/// Data sources by name. Populated before execution; last registration wins.
#[derive(Clone)]
pub struct DataSourceRegistry {
    sources: Arc<RwLock<HashMap<String, Arc<DataSource>>>>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register(&self, source: DataSource) {
        let name = source.name().to_string();
        let mut sources = self.sources.write().await;
        if sources.insert(name.clone(), Arc::new(source)).is_some() {
            log::debug!("Replaced data source '{}'", name);
        }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<DataSource>> {
        let sources = self.sources.read().await;
        sources.get(name).cloned()
    }

    pub async fn names(&self) -> Vec<String> {
        let sources = self.sources.read().await;
        let mut names: Vec<String> = sources.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for DataSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
