//! MySQL EXPLAIN JSON Adapter
//!
//! Walks the document produced by `EXPLAIN FORMAT=JSON` into the same plan
//! tree the text parsers produce. The walk is generic rather than tied to the
//! MySQL schema, so keys added by newer server versions are kept as
//! attributes instead of being rejected:
//!
//! - objects under structural keys (`cost_info`, `query_block`, `table` by
//!   default) are merged into the current node
//! - any other object becomes a child named after its key
//! - arrays of objects become indexed children (`nested_loop#1`, `nested_loop#2`, ...)
//! - scalars and arrays of scalars become string attributes
//!
//! # Examples
//!
//! ```
//! use qplan_analyzer::explain::mysql::MysqlJsonPlanParser;
//! use qplan_analyzer::explain::PlanParser;
//!
//! let json = r#"{
//!   "query_block": {
//!     "select_id": 1,
//!     "cost_info": {"query_cost": "1.00"},
//!     "table": {"table_name": "users", "access_type": "ALL"}
//!   }
//! }"#;
//!
//! let plan = MysqlJsonPlanParser::default().parse("SELECT * FROM users", json).unwrap();
//! assert_eq!(plan.root().object_name(), Some("users"));
//! assert_eq!(plan.root().cost(), Some(1.0));
//! ```

use crate::config::{AnalyzerConfig, JsonPlanConfig};
use crate::explain::error::{PlanError, Result};
use crate::explain::plan::{DetachedNode, Plan};
use crate::explain::PlanParser;
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Separator between an array key and the element number
pub const INDEX_SEPARATOR: char = '#';

/// Parser for MySQL `EXPLAIN FORMAT=JSON` output
#[derive(Debug, Clone, Default)]
pub struct MysqlJsonPlanParser {
    config: AnalyzerConfig,
}

impl MysqlJsonPlanParser {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl PlanParser for MysqlJsonPlanParser {
    fn parse(&self, query: &str, raw_plan: &str) -> Result<Plan> {
        let roots = parse_json_plan(raw_plan, &self.config)?;
        Plan::new(query, Some(explain_query(query)), roots)
    }
}

/// The statement that asks MySQL for a JSON plan of `query`
pub fn explain_query(query: &str) -> String {
    format!("EXPLAIN FORMAT=JSON {}", query.trim())
}

/// Parses a JSON plan document into root nodes.
///
/// The document is either one query block object or an array of them.
pub fn parse_json_plan(json: &str, config: &AnalyzerConfig) -> Result<Vec<DetachedNode>> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Err(PlanError::EmptyPlan);
    }

    let walker = JsonWalker {
        config: &config.json,
        max_depth: config.nesting_depth(),
    };

    match serde_json::from_str::<Value>(trimmed)? {
        Value::Object(object) => Ok(vec![walker.build_node(&config.json.root_name, &object, 0)?]),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(object) => walker.build_node(&config.json.root_name, object, 0),
                other => Err(PlanError::InvalidStructure(format!(
                    "expected a query block object, found {}",
                    json_type_name(other)
                ))),
            })
            .collect(),
        other => Err(PlanError::InvalidStructure(format!(
            "expected a JSON object or array, found {}",
            json_type_name(&other)
        ))),
    }
}

struct JsonWalker<'a> {
    config: &'a JsonPlanConfig,
    max_depth: usize,
}

impl JsonWalker<'_> {
    fn build_node(&self, name: &str, object: &Map<String, Value>, depth: usize) -> Result<DetachedNode> {
        if depth >= self.max_depth {
            return Err(PlanError::TooDeeplyNested {
                limit: self.max_depth,
            });
        }

        let mut attributes = IndexMap::new();
        let mut children = Vec::new();
        self.collect(object, depth, &mut attributes, &mut children)?;
        Ok(DetachedNode::json(name, attributes, children))
    }

    fn collect(
        &self,
        object: &Map<String, Value>,
        depth: usize,
        attributes: &mut IndexMap<String, String>,
        children: &mut Vec<DetachedNode>,
    ) -> Result<()> {
        for (key, value) in object {
            match value {
                Value::Object(nested) if self.config.is_structural(key) => {
                    if depth + 1 >= self.max_depth {
                        return Err(PlanError::TooDeeplyNested {
                            limit: self.max_depth,
                        });
                    }
                    self.collect(nested, depth + 1, attributes, children)?;
                }
                Value::Object(nested) => {
                    children.push(self.build_node(key, nested, depth + 1)?);
                }
                Value::Array(items) => {
                    let mut scalars = Vec::new();
                    let mut index = 0;
                    for item in items {
                        match item {
                            Value::Object(nested) => {
                                index += 1;
                                let name = format!("{key}{INDEX_SEPARATOR}{index}");
                                children.push(self.build_node(&name, nested, depth + 1)?);
                            }
                            scalar => scalars.push(scalar_to_string(scalar)),
                        }
                    }
                    if index == 0 || !scalars.is_empty() {
                        attributes.insert(key.clone(), scalars.join(", "));
                    }
                }
                scalar => {
                    attributes.insert(key.clone(), scalar_to_string(scalar));
                }
            }
        }
        Ok(())
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
