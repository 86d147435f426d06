// SPDX-License-Identifier: MIT

//! YAML schema types for pipeline definitions
//!
//! These mirror the runtime pipeline tree one to one. Literal values are kept
//! as raw JSON so they can be coerced to a declared kind when the pipeline is
//! built.

use serde::{Deserialize, Serialize};

use crate::engine::compare::ConditionOperand;
use crate::engine::value::ValueKind;

/// Top-level pipeline definition
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
}

/// A pipeline step, tagged by `kind`
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeDefinition {
    Query {
        data_source: String,
        /// Defaults to a nil literal
        params: Option<ValueDefinition>,
        save_to: String,
    },
    Branch {
        condition: ConditionDefinition,
        on_true: Option<Vec<NodeDefinition>>,
        on_false: Option<Vec<NodeDefinition>>,
        #[serde(default)]
        clone_context: bool,
    },
    Return {
        value: ValueDefinition,
    },
    Filter {
        source: ValueDefinition,
        condition: ConditionDefinition,
        #[serde(default)]
        exclude: bool,
        element_name: Option<String>,
        save_to: String,
    },
    Fold {
        source: ValueDefinition,
        start: Option<ValueDefinition>,
        aggregator: String,
        #[serde(default)]
        right_to_left: bool,
        save_to: String,
    },
    Stop,
}

/// Either a literal or a context read
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum ValueDefinition {
    Literal {
        literal: serde_json::Value,
        /// Kind to coerce the literal to; inferred from the JSON when absent
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        kind: Option<ValueKind>,
    },
    Context {
        context: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        getter: Option<GetterDefinition>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<serde_json::Value>,
        /// Constant for the `static` getter
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<serde_json::Value>,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GetterDefinition {
    #[default]
    Default,
    Chain,
    Static,
}

/// Condition tree, written as a single-key map (`compare`, `and`, `or`, `not`
/// or `custom`). `and`/`or` entries may be null, which the builder rejects.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(untagged)]
pub enum ConditionDefinition {
    Compare {
        compare: CompareDefinition,
    },
    And {
        and: Vec<Option<ConditionDefinition>>,
    },
    Or {
        or: Vec<Option<ConditionDefinition>>,
    },
    Not {
        not: Box<ConditionDefinition>,
    },
    Custom {
        custom: CustomDefinition,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CompareDefinition {
    pub lhs: ValueDefinition,
    #[serde(default)]
    pub op: ConditionOperand,
    pub rhs: ValueDefinition,
}

/// A comparison resolved by name from the custom compare registry
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CustomDefinition {
    pub name: String,
    pub lhs: ValueDefinition,
    pub rhs: ValueDefinition,
}
