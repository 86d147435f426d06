// SPDX-License-Identifier: MIT

//! Definition loader - YAML file loading and parsing

use super::types::PipelineDefinition;
use crate::engine::error::PipedreamError;
use std::fs;
use std::path::Path;

/// Loads pipeline definitions from YAML files
pub struct DefinitionLoader;

impl DefinitionLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a pipeline definition from a YAML file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<PipelineDefinition, PipedreamError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipedreamError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse_yaml(&content)
    }

    /// Parse a pipeline definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<PipelineDefinition, PipedreamError> {
        let def: PipelineDefinition = serde_yaml::from_str(content)?;
        Ok(def)
    }
}

impl Default for DefinitionLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compare::ConditionOperand;
    use crate::pipedream::definition::types::{
        ConditionDefinition, GetterDefinition, NodeDefinition, ValueDefinition,
    };
    use serde_json::json;

    #[test]
    fn test_parse_query_and_return() {
        let yaml = r#"
name: lookup
description: "Fetch a user and return it"
nodes:
  - kind: query
    data_source: users
    params: { context: user_id }
    save_to: user
  - kind: return
    value: { context: user, getter: default, key: name }
"#;
        let def = DefinitionLoader::parse_yaml(yaml).unwrap();
        assert_eq!(def.name, "lookup");
        assert_eq!(def.nodes.len(), 2);

        match &def.nodes[0] {
            NodeDefinition::Query {
                data_source,
                params,
                save_to,
            } => {
                assert_eq!(data_source, "users");
                assert_eq!(save_to, "user");
                assert!(matches!(
                    params,
                    Some(ValueDefinition::Context { context, getter: None, .. }) if context == "user_id"
                ));
            }
            other => panic!("Expected Query, got {:?}", other),
        }

        match &def.nodes[1] {
            NodeDefinition::Return {
                value: ValueDefinition::Context { getter, key, .. },
            } => {
                assert_eq!(*getter, Some(GetterDefinition::Default));
                assert_eq!(key.as_ref(), Some(&json!("name")));
            }
            other => panic!("Expected Return, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_branch_with_conditions() {
        let yaml = r#"
name: gate
nodes:
  - kind: branch
    clone_context: true
    condition:
      and:
        - compare: { lhs: { context: age }, op: ">=", rhs: { literal: 18 } }
        - not:
            compare: { lhs: { context: banned }, op: equal, rhs: { literal: true } }
    on_true:
      - kind: return
        value: { literal: "allowed" }
"#;
        let def = DefinitionLoader::parse_yaml(yaml).unwrap();
        assert!(def.description.is_empty());

        match &def.nodes[0] {
            NodeDefinition::Branch {
                condition: ConditionDefinition::And { and: children },
                on_true,
                on_false,
                clone_context,
            } => {
                assert!(*clone_context);
                assert_eq!(children.len(), 2);
                assert!(on_true.as_ref().is_some_and(|nodes| nodes.len() == 1));
                assert!(on_false.is_none());

                match &children[0] {
                    Some(ConditionDefinition::Compare { compare: cmp }) => {
                        assert_eq!(cmp.op, ConditionOperand::GreaterThanOrEqual)
                    }
                    other => panic!("Expected Compare, got {:?}", other),
                }
            }
            other => panic!("Expected Branch, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_null_child_and_typed_literal() {
        let yaml = r#"
name: odd
nodes:
  - kind: branch
    condition:
      or:
        - null
        - compare: { lhs: { literal: 1, type: u8 }, op: "<", rhs: { literal: 2 } }
  - kind: stop
"#;
        let def = DefinitionLoader::parse_yaml(yaml).unwrap();
        match &def.nodes[0] {
            NodeDefinition::Branch {
                condition: ConditionDefinition::Or { or: children },
                ..
            } => {
                assert!(children[0].is_none());
                assert!(children[1].is_some());
            }
            other => panic!("Expected Branch, got {:?}", other),
        }
        assert!(matches!(def.nodes[1], NodeDefinition::Stop));
    }

    #[test]
    fn test_parse_filter_and_fold() {
        let yaml = r#"
name: totals
nodes:
  - kind: filter
    source: { context: orders }
    element_name: order
    exclude: true
    condition:
      custom: { name: same_currency, lhs: { context: order }, rhs: { literal: "EUR" } }
    save_to: foreign
  - kind: fold
    source: { context: amounts }
    aggregator: sum
    right_to_left: true
    save_to: total
"#;
        let def = DefinitionLoader::parse_yaml(yaml).unwrap();
        assert!(matches!(
            &def.nodes[0],
            NodeDefinition::Filter { exclude: true, element_name: Some(name), .. } if name == "order"
        ));
        assert!(matches!(
            &def.nodes[1],
            NodeDefinition::Fold { start: None, right_to_left: true, .. }
        ));
    }

    #[test]
    fn test_unknown_kind_is_error() {
        let yaml = r#"
name: broken
nodes:
  - kind: loop
"#;
        assert!(DefinitionLoader::parse_yaml(yaml).is_err());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = DefinitionLoader::new()
            .load("/definitely/not/here.yaml")
            .unwrap_err();
        assert!(matches!(err, PipedreamError::Config(_)));
    }
}
