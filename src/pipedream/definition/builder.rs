// SPDX-License-Identifier: MIT

//! Pipeline builder - compiles definitions into runnable pipelines
//!
//! Every check that can be made without a context happens here: unset
//! operands, null combinator children, unknown custom comparisons, literals
//! that do not fit their declared kind. Data source and aggregator names are
//! resolved at execution time since registries may change until a run starts.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::builder::{DynamicValue, ValueBuilder};
use crate::engine::compare::ConditionOperand;
use crate::engine::condition::{Condition, CustomCompareCondition, CustomComparison, ValueCondition};
use crate::engine::error::{BoxError, ConditionError, DefinitionError};
use crate::engine::getter::{ChainValueGetter, DefaultValueGetter, StaticValueGetter, ValueGetter};
use crate::engine::node::{BranchNode, FilterNode, FoldNode, Node, QueryNode, ReturnNode};
use crate::engine::pipeline::Pipeline;
use crate::engine::value::{Value, ValueKind, ValueType};

use super::types::{
    ConditionDefinition, GetterDefinition, NodeDefinition, PipelineDefinition, ValueDefinition,
};

/// Named custom comparisons available to definitions
#[derive(Debug, Clone, Default)]
pub struct CustomCompareRegistry {
    comparisons: HashMap<String, CustomComparison>,
}

impl CustomCompareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, comparison: CustomComparison) {
        self.comparisons.insert(name.into(), comparison);
    }

    /// Register a comparison over a single concrete type `T`
    pub fn register_fn<T, F>(&mut self, name: impl Into<String>, func: F)
    where
        T: ValueType,
        F: Fn(T, T) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.register(name, CustomComparison::new(func));
    }

    pub fn get(&self, name: &str) -> Option<&CustomComparison> {
        self.comparisons.get(name)
    }
}

/// Compiles [`PipelineDefinition`]s into [`Pipeline`]s
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    custom: CustomCompareRegistry,
}

impl PipelineBuilder {
    pub fn new(custom: CustomCompareRegistry) -> Self {
        Self { custom }
    }

    pub fn build(&self, def: &PipelineDefinition) -> Result<Pipeline, DefinitionError> {
        let pipeline = self.build_nodes(&def.nodes)?;
        log::info!("Built pipeline '{}' ({} nodes)", def.name, pipeline.len());
        Ok(pipeline)
    }

    fn build_nodes(&self, defs: &[NodeDefinition]) -> Result<Pipeline, DefinitionError> {
        defs.iter()
            .map(|def| self.build_node(def))
            .collect::<Result<Vec<_>, _>>()
            .map(Pipeline::new)
    }

    fn build_node(&self, def: &NodeDefinition) -> Result<Node, DefinitionError> {
        let node = match def {
            NodeDefinition::Query {
                data_source,
                params,
                save_to,
            } => {
                let params = match params {
                    Some(params) => self.build_value(params)?,
                    None => ValueBuilder::literal(Value::Nil),
                };
                QueryNode::new(data_source.clone(), params, save_to.clone()).into()
            }
            NodeDefinition::Branch {
                condition,
                on_true,
                on_false,
                clone_context,
            } => {
                let condition = self.build_condition(condition)?;
                let true_pipeline = on_true.as_deref().map(|n| self.build_nodes(n));
                let false_pipeline = on_false.as_deref().map(|n| self.build_nodes(n));
                BranchNode {
                    condition,
                    true_pipeline: true_pipeline.transpose()?,
                    false_pipeline: false_pipeline.transpose()?,
                    clone_context: *clone_context,
                }
                .into()
            }
            NodeDefinition::Return { value } => ReturnNode::new(self.build_value(value)?).into(),
            NodeDefinition::Filter {
                source,
                condition,
                exclude,
                element_name,
                save_to,
            } => {
                let mut node = FilterNode::new(
                    self.build_value(source)?,
                    self.build_condition(condition)?,
                    save_to.clone(),
                );
                node.exclude = *exclude;
                if let Some(name) = element_name {
                    node.element_name = name.clone();
                }
                node.into()
            }
            NodeDefinition::Fold {
                source,
                start,
                aggregator,
                right_to_left,
                save_to,
            } => {
                let start = match start {
                    Some(start) => self.build_value(start)?,
                    None => ValueBuilder::literal(Value::Nil),
                };
                let mut node = FoldNode::new(
                    self.build_value(source)?,
                    start,
                    aggregator.clone(),
                    save_to.clone(),
                );
                node.right_to_left = *right_to_left;
                node.into()
            }
            NodeDefinition::Stop => Node::Stop,
        };
        Ok(node)
    }

    pub fn build_value(&self, def: &ValueDefinition) -> Result<ValueBuilder, DefinitionError> {
        match def {
            ValueDefinition::Literal { literal, kind } => {
                Ok(ValueBuilder::Literal(literal_value(literal, *kind)?))
            }
            ValueDefinition::Context {
                context,
                getter,
                key,
                value,
            } => {
                let dynamic = DynamicValue::new(context.clone());
                let getter: Arc<dyn ValueGetter> = match getter {
                    None => return Ok(dynamic.into()),
                    Some(GetterDefinition::Default) => Arc::new(DefaultValueGetter),
                    Some(GetterDefinition::Chain) => Arc::new(ChainValueGetter),
                    Some(GetterDefinition::Static) => {
                        let value = value
                            .as_ref()
                            .ok_or_else(|| DefinitionError::MissingStaticValue(context.clone()))?;
                        Arc::new(StaticValueGetter::new(Value::from(value.clone())))
                    }
                };
                let key = key.clone().map(Value::from).unwrap_or_default();
                Ok(dynamic.with_getter(getter, key).into())
            }
        }
    }

    pub fn build_condition(&self, def: &ConditionDefinition) -> Result<Condition, DefinitionError> {
        match def {
            ConditionDefinition::Compare { compare: cmp } => {
                if cmp.op == ConditionOperand::Invalid {
                    return Err(DefinitionError::InvalidOperand);
                }
                let lhs = self.build_value(&cmp.lhs)?;
                let rhs = self.build_value(&cmp.rhs)?;
                Ok(ValueCondition::new(lhs, cmp.op, rhs).into())
            }
            ConditionDefinition::And { and } => Ok(Condition::And(self.build_children(and)?)),
            ConditionDefinition::Or { or } => Ok(Condition::Or(self.build_children(or)?)),
            ConditionDefinition::Not { not } => Ok(Condition::not(self.build_condition(not)?)),
            ConditionDefinition::Custom { custom } => {
                let comparison = self
                    .custom
                    .get(&custom.name)
                    .cloned()
                    .ok_or_else(|| DefinitionError::UnknownCustomCompare(custom.name.clone()))?;
                let lhs = self.build_value(&custom.lhs)?;
                let rhs = self.build_value(&custom.rhs)?;
                Ok(CustomCompareCondition::with_comparison(lhs, rhs, comparison).into())
            }
        }
    }

    fn build_children(
        &self,
        children: &[Option<ConditionDefinition>],
    ) -> Result<Vec<Condition>, DefinitionError> {
        children
            .iter()
            .enumerate()
            .map(|(index, child)| match child {
                Some(child) => self.build_condition(child),
                None => Err(ConditionError::NilCondition { index }.into()),
            })
            .collect()
    }
}

/// Convert a JSON literal, coercing it to `kind` when one is declared
fn literal_value(
    literal: &serde_json::Value,
    kind: Option<ValueKind>,
) -> Result<Value, DefinitionError> {
    let value = Value::from(literal.clone());
    let Some(kind) = kind else {
        return Ok(value);
    };

    fn typed<T: ValueType>(value: &Value) -> Option<Value> {
        T::convert_from(value).map(T::into_value)
    }

    let coerced = match kind {
        ValueKind::Nil => value.is_nil().then_some(Value::Nil),
        ValueKind::Bool => typed::<bool>(&value),
        ValueKind::I8 => typed::<i8>(&value),
        ValueKind::I16 => typed::<i16>(&value),
        ValueKind::I32 => typed::<i32>(&value),
        ValueKind::I64 => typed::<i64>(&value),
        ValueKind::U8 => typed::<u8>(&value),
        ValueKind::U16 => typed::<u16>(&value),
        ValueKind::U32 => typed::<u32>(&value),
        ValueKind::U64 => typed::<u64>(&value),
        ValueKind::F32 => typed::<f32>(&value),
        ValueKind::F64 => typed::<f64>(&value),
        ValueKind::String => typed::<String>(&value),
        ValueKind::List => typed::<Vec<Value>>(&value),
        ValueKind::Map => typed::<std::collections::BTreeMap<String, Value>>(&value),
        // Not expressible as literals
        ValueKind::Record | ValueKind::Ref | ValueKind::Opaque => None,
    };

    coerced.ok_or_else(|| DefinitionError::InvalidLiteral {
        literal: literal.clone(),
        kind,
    })
}
