//! Analyzer configuration
//!
//! These types are deserialized from the `[analyzer]` table of the QPLAN
//! configuration file. Every field has a default, so an empty table (or no
//! table at all) yields a working configuration.

use serde::{Deserialize, Serialize};

/// Keys whose object values are merged into the enclosing node by the JSON adapter
pub const DEFAULT_STRUCTURAL_KEYS: [&str; 3] = ["cost_info", "query_block", "table"];

/// Nesting depth used when none is configured
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 128;

/// Hard ceiling on any configured nesting depth
pub const MAX_NESTING_DEPTH_LIMIT: usize = 512;

/// Settings shared by every plan parser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Maximum nesting of plan productions (text) or objects (JSON) before parsing is refused.
    ///
    /// Values above [`MAX_NESTING_DEPTH_LIMIT`] are clamped, see [`AnalyzerConfig::nesting_depth`].
    pub max_nesting_depth: usize,
    /// Settings for the JSON plan adapter
    pub json: JsonPlanConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            json: JsonPlanConfig::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Sets the maximum nesting depth
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Nesting depth the parsers actually enforce
    pub fn nesting_depth(&self) -> usize {
        clamp_nesting_depth(self.max_nesting_depth)
    }
}

/// Caps `depth` at [`MAX_NESTING_DEPTH_LIMIT`]
pub fn clamp_nesting_depth(depth: usize) -> usize {
    depth.min(MAX_NESTING_DEPTH_LIMIT)
}

/// Settings for the JSON plan adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonPlanConfig {
    /// Keys flattened into the current node instead of becoming children
    pub structural_keys: Vec<String>,
    /// Name given to each root node
    pub root_name: String,
}

impl Default for JsonPlanConfig {
    fn default() -> Self {
        Self {
            structural_keys: DEFAULT_STRUCTURAL_KEYS.iter().map(|k| k.to_string()).collect(),
            root_name: "query_block".to_string(),
        }
    }
}

impl JsonPlanConfig {
    /// Returns true if objects under `key` are merged into the enclosing node
    pub fn is_structural(&self, key: &str) -> bool {
        self.structural_keys.iter().any(|k| k == key)
    }
}
