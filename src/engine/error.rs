// SPDX-License-Identifier: MIT

//! Typed error handling for pipedream-rs
//!
//! Every fallible layer of the engine has its own error enum. Each layer wraps
//! the error of the layer below with local attribution (which side of a
//! comparison, which node, which data source) before passing it up.

use thiserror::Error;

use super::compare::ConditionOperand;
use super::node::NodeKind;
use super::value::ValueKind;

/// Error type returned by user-supplied callbacks (data sources, aggregators,
/// custom comparisons)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type for pipedream-rs
#[derive(Debug, Error)]
pub enum PipedreamError {
    /// Configuration errors (bad CLI input, malformed initial context)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pipeline execution errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Pipeline definition errors
    #[error("Definition error: {0}")]
    Definition(#[from] DefinitionError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error wrapper for compatibility
    #[error("{0}")]
    Other(String),
}

impl PipedreamError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for PipedreamError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for PipedreamError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

/// Which operand of a comparison an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Lhs,
    Rhs,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Lhs => write!(f, "left-hand side"),
            Side::Rhs => write!(f, "right-hand side"),
        }
    }
}

/// Comparator failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompareError {
    /// The operand was left unset
    #[error("comparison operand is invalid")]
    InvalidOperand,

    /// The two values are of kinds that cannot be compared with each other
    #[error("cannot compare {lhs} with {rhs}")]
    IncompatibleTypes { lhs: ValueKind, rhs: ValueKind },

    /// The operand is not defined for this kind (e.g. ordering booleans)
    #[error("operation '{operand}' is not supported for {kind}")]
    OperationNotSupported {
        operand: ConditionOperand,
        kind: ValueKind,
    },
}

/// Structural projection failures raised by value getters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetterError {
    #[error("no value exists for the given key")]
    ValueNotFound,

    #[error("key type is not valid for this input")]
    KeyTypeInvalid,

    #[error("values cannot be extracted from this input")]
    ImproperValueKind,

    #[error("input is nil")]
    InputIsNil,

    #[error("key is empty or nil")]
    KeyIsEmpty,

    #[error("field is unexported")]
    FieldIsUnexported,
}

/// Value builder failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("no context key provided")]
    NoContextKeyProvided,

    #[error("value '{key}' not found in context")]
    ValueNotFoundInContext { key: String },

    #[error("getter failed on context value '{key}': {source}")]
    Getter {
        key: String,
        #[source]
        source: GetterError,
    },
}

/// Condition evaluation failures
#[derive(Debug, Error)]
pub enum ConditionError {
    /// Malformed condition: unset operand or missing builder
    #[error("invalid condition: {0}")]
    InvalidCondition(String),

    /// A combinator contains an absent child
    #[error("condition {index} of combinator is nil")]
    NilCondition { index: usize },

    #[error("comparison failed: {0}")]
    ComparisonFailed(#[from] CompareError),

    /// A built value could not be narrowed to the custom comparison's type
    #[error("type assertion failed on {side}: expected {expected}, got {actual}")]
    TypeAssertionFailed {
        side: Side,
        expected: &'static str,
        actual: ValueKind,
    },

    #[error("custom compare function is nil")]
    NilCustomCompareFunc,

    #[error("failed to build {side}: {source}")]
    Build {
        side: Side,
        #[source]
        source: BuildError,
    },

    /// Error returned verbatim by a user-supplied comparison
    #[error(transparent)]
    Custom(BoxError),
}

/// Data source invocation failures
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// Params could not be converted to the data source's parameter type.
    /// Raised before the underlying query function runs.
    #[error("cannot convert params of type {actual} to {expected}")]
    ParamTypeDoesNotMatch {
        expected: &'static str,
        actual: ValueKind,
    },

    /// The query function itself failed
    #[error(transparent)]
    Query(BoxError),
}

/// Pipeline execution failures
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A branch resolved toward a sub-pipeline that does not exist
    #[error("pipeline terminated early: no pipeline for {outcome} branch")]
    TerminatedEarly { outcome: bool },

    #[error("data source '{0}' not found")]
    DataSourceNotFound(String),

    #[error("data source '{name}' failed: {source}")]
    DataSource {
        name: String,
        #[source]
        source: DataSourceError,
    },

    #[error("aggregator '{0}' not found")]
    AggregatorNotFound(String),

    #[error("aggregator '{name}' failed: {source}")]
    Aggregation {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("cannot iterate over {kind}")]
    NotIterable { kind: ValueKind },

    #[error(transparent)]
    Condition(#[from] ConditionError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("pipeline execution was cancelled")]
    Cancelled,

    /// Attribution wrapper added once per pipeline level
    #[error("node {index} ({kind}) failed: {source}")]
    Node {
        index: usize,
        kind: NodeKind,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Strip every `Node` attribution layer and return the underlying error
    pub fn root_cause(&self) -> &PipelineError {
        match self {
            PipelineError::Node { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Errors raised while turning a pipeline definition into a runnable pipeline
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("condition operand must be set")]
    InvalidOperand,

    #[error("unknown custom comparison '{0}'")]
    UnknownCustomCompare(String),

    #[error("getter '{0}' requires a value")]
    MissingStaticValue(String),

    #[error("literal {literal} cannot be represented as {kind}")]
    InvalidLiteral {
        literal: serde_json::Value,
        kind: ValueKind,
    },

    #[error(transparent)]
    Condition(#[from] ConditionError),
}
