//! Query EXPLAIN Parser Module
//!
//! This module turns engine-specific execution plans into one plan tree:
//! - Firebird (`PLAN ...` text, parsed by a recursive-descent parser)
//! - MySQL (`EXPLAIN FORMAT=JSON` documents, walked by a generic adapter)
//!
//! # Example
//!
//! ```
//! use qplan_analyzer::explain::{parse_plan, render_tree, Dialect};
//! use qplan_analyzer::AnalyzerConfig;
//!
//! let config = AnalyzerConfig::default();
//!
//! // Firebird plan text
//! let plan = parse_plan(Dialect::Firebird, &config, "SELECT ...", "PLAN SORT (T1 NATURAL)").unwrap();
//! assert_eq!(render_tree(&plan), "PLAN SORT (T1 NATURAL)\n  SORT\n    T1 NATURAL\n");
//!
//! // MySQL JSON plan
//! let json = r#"{"query_block": {"select_id": 1, "table": {"table_name": "users", "access_type": "ALL"}}}"#;
//! let plan = parse_plan(Dialect::MySql, &config, "SELECT * FROM users", json).unwrap();
//! assert_eq!(plan.root().object_name(), Some("users"));
//! ```

pub mod error;
pub mod firebird;
pub mod mysql;
pub mod plan;
pub mod render;

pub use error::{ERROR_MARKER, PlanError, Result, mark_plan_error};
pub use firebird::FirebirdPlanParser;
pub use firebird::tokenizer::{Token, TokenKind, Tokenizer, next_token, skip_to_significant_token};
pub use mysql::MysqlJsonPlanParser;
pub use plan::{DetachedNode, NodeContent, NodeId, Plan, PlanNode, PlanNodeIterator, PlanTree};
pub use render::render_tree;

use crate::config::AnalyzerConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Database dialects whose plans can be parsed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Firebird `PLAN` text
    Firebird,
    /// MySQL `EXPLAIN FORMAT=JSON`
    #[strum(serialize = "mysql")]
    MySql,
}

impl Dialect {
    /// Statement used to retrieve the plan, if the dialect needs one.
    ///
    /// Firebird reports plans through statement information, so it has none.
    pub fn plan_query(&self, query: &str) -> Option<String> {
        match self {
            Self::Firebird => None,
            Self::MySql => Some(mysql::explain_query(query)),
        }
    }

    /// Creates the parser for this dialect
    pub fn parser(&self, config: &AnalyzerConfig) -> Box<dyn PlanParser> {
        match self {
            Self::Firebird => Box::new(FirebirdPlanParser::new(config)),
            Self::MySql => Box::new(MysqlJsonPlanParser::new(config)),
        }
    }
}

/// Turns a raw plan into a [`Plan`]
pub trait PlanParser: Send + Sync {
    /// Parses `raw_plan`, the plan reported for `query`
    fn parse(&self, query: &str, raw_plan: &str) -> Result<Plan>;
}

/// Source of raw plans, usually a database session
#[async_trait]
pub trait PlanSource: Send + Sync {
    /// Returns the raw plan for `query`.
    ///
    /// `plan_query` is the statement to run when the dialect needs one.
    async fn fetch_plan(&self, query: &str, plan_query: Option<&str>) -> Result<String>;
}

/// Parses a raw plan with the parser for `dialect`
pub fn parse_plan(
    dialect: Dialect,
    config: &AnalyzerConfig,
    query: &str,
    raw_plan: &str,
) -> Result<Plan> {
    tracing::debug!(%dialect, plan_len = raw_plan.len(), "parsing execution plan");

    match dialect.parser(config).parse(query, raw_plan) {
        Ok(plan) => {
            tracing::debug!(
                %dialect,
                roots = plan.roots().len(),
                nodes = plan.node_count(),
                "execution plan parsed"
            );
            Ok(plan)
        }
        Err(e) => {
            tracing::warn!(%dialect, error = %e, "cannot parse execution plan");
            Err(e)
        }
    }
}

/// Fetches the plan for `query` from `source` and parses it
#[tracing::instrument(skip(source, config, query), fields(query_preview = %query.chars().take(100).collect::<String>()))]
pub async fn explain_with(
    source: &dyn PlanSource,
    dialect: Dialect,
    config: &AnalyzerConfig,
    query: &str,
) -> Result<Plan> {
    let plan_query = dialect.plan_query(query);
    let raw_plan = source.fetch_plan(query, plan_query.as_deref()).await?;
    parse_plan(dialect, config, query, &raw_plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedSource {
        raw: std::result::Result<String, String>,
        requests: Mutex<Vec<Option<String>>>,
    }

    impl FixedSource {
        fn new(raw: std::result::Result<&str, &str>) -> Self {
            Self {
                raw: raw.map(String::from).map_err(String::from),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PlanSource for FixedSource {
        async fn fetch_plan(&self, _query: &str, plan_query: Option<&str>) -> Result<String> {
            self.requests
                .lock()
                .unwrap()
                .push(plan_query.map(String::from));
            self.raw.clone().map_err(PlanError::Source)
        }
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("firebird".parse::<Dialect>().unwrap(), Dialect::Firebird);
        assert_eq!("MySQL".parse::<Dialect>().unwrap(), Dialect::MySql);
        assert!("oracle".parse::<Dialect>().is_err());
        assert_eq!(Dialect::MySql.to_string(), "mysql");
    }

    #[test]
    fn test_dialect_plan_query() {
        assert_eq!(Dialect::Firebird.plan_query("SELECT 1"), None);
        assert_eq!(
            Dialect::MySql.plan_query("SELECT 1"),
            Some("EXPLAIN FORMAT=JSON SELECT 1".to_string())
        );
    }

    #[test]
    fn test_parse_plan_selects_parser() {
        let config = AnalyzerConfig::default();
        let text = parse_plan(Dialect::Firebird, &config, "q", "PLAN (T NATURAL)").unwrap();
        assert!(text.root().attributes().is_none());

        let json = parse_plan(Dialect::MySql, &config, "q", r#"{"query_block": {}}"#).unwrap();
        assert!(json.root().attributes().is_some());
    }

    #[tokio::test]
    async fn test_explain_with_passes_plan_query() {
        let source = FixedSource::new(Ok(r#"{"query_block": {"table": {"table_name": "t"}}}"#));
        let plan = explain_with(&source, Dialect::MySql, &AnalyzerConfig::default(), "SELECT * FROM t")
            .await
            .unwrap();

        assert_eq!(plan.root().object_name(), Some("t"));
        assert_eq!(
            *source.requests.lock().unwrap(),
            vec![Some("EXPLAIN FORMAT=JSON SELECT * FROM t".to_string())]
        );
    }

    #[tokio::test]
    async fn test_explain_with_reports_source_errors() {
        let source = FixedSource::new(Err("connection lost"));
        let err = explain_with(&source, Dialect::Firebird, &AnalyzerConfig::default(), "q")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot fetch execution plan: connection lost");
        assert_eq!(*source.requests.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_explain_with_reports_parse_errors() {
        let source = FixedSource::new(Ok("PLAN BADTOKEN"));
        let err = explain_with(&source, Dialect::Firebird, &AnalyzerConfig::default(), "q")
            .await
            .unwrap_err();
        assert_eq!(err.offset(), Some(5));
    }
}
