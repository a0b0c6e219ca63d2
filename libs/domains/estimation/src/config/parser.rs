use serde_json::Value;
use std::path::Path;

use crate::error::{EstimateError, EstimateResult};

/// File suffixes recognised as configuration files
pub const CONFIG_EXTENSIONS: &[&str] = &[".tf", ".tf.json"];

/// Turns configuration text into a nested mapping of blocks.
///
/// Implementations must not interpret the content beyond syntax; block
/// semantics live in [`crate::config::blocks`].
pub trait ConfigParser: Send + Sync {
    fn parse(&self, text: &str, path: &Path) -> EstimateResult<Value>;
}

/// HCL (`.tf`) and JSON (`.tf.json`) parser.
///
/// Unquoted references such as `var.region` come back as `"${var.region}"`
/// strings, which is the shape the resolver expects.
#[derive(Debug, Clone, Copy, Default)]
pub struct HclConfigParser;

impl ConfigParser for HclConfigParser {
    fn parse(&self, text: &str, path: &Path) -> EstimateResult<Value> {
        let parsed = if is_json_config(path) {
            serde_json::from_str::<Value>(text).map_err(|e| e.to_string())
        } else {
            hcl::from_str::<Value>(text).map_err(|e| e.to_string())
        };

        parsed.map_err(|reason| EstimateError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }
}

/// Whether a path names a recognised configuration file
pub fn is_config_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| CONFIG_EXTENSIONS.iter().any(|ext| name.ends_with(ext)))
        .unwrap_or(false)
}

fn is_json_config(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.ends_with(".tf.json"))
}
