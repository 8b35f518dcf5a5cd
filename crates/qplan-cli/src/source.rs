//! Plan source reading captured plans from a file or stdin

use async_trait::async_trait;
use qplan_analyzer::{PlanError, PlanSource};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

/// Reads a plan captured outside of a database session
#[derive(Debug, Clone, Default)]
pub struct CapturedPlanSource {
    /// File holding the plan, stdin when unset
    path: Option<PathBuf>,
}

impl CapturedPlanSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait]
impl PlanSource for CapturedPlanSource {
    async fn fetch_plan(
        &self,
        _query: &str,
        plan_query: Option<&str>,
    ) -> qplan_analyzer::Result<String> {
        if let Some(plan_query) = plan_query {
            tracing::debug!(%plan_query, "plan retrieval statement");
        }

        match &self.path {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| PlanError::Source(format!("{}: {e}", path.display()))),
            None => {
                let mut raw = String::new();
                tokio::io::stdin()
                    .read_to_string(&mut raw)
                    .await
                    .map_err(|e| PlanError::Source(format!("stdin: {e}")))?;
                Ok(raw)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qplan_analyzer::{AnalyzerConfig, Dialect, explain_with};
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_plan_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "PLAN JOIN (A NATURAL, B INDEX (IX_B))").unwrap();

        let source = CapturedPlanSource::new(Some(file.path().to_path_buf()));
        let plan = explain_with(&source, Dialect::Firebird, &AnalyzerConfig::default(), "q")
            .await
            .unwrap();
        assert_eq!(plan.node_count(), 4);
    }

    #[tokio::test]
    async fn test_missing_file_is_a_source_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = CapturedPlanSource::new(Some(dir.path().join("plan.txt")));
        let err = source.fetch_plan("q", None).await.unwrap_err();
        assert!(matches!(err, PlanError::Source(_)));
        assert!(err.to_string().starts_with("Cannot fetch execution plan: "));
    }
}
