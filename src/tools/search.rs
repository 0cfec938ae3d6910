//! Offline search stub
//!
//! Returns canned reference links; no external search API is called.

use super::{Tool, SEARCH_TOOL};
use crate::models::{SearchResult, ToolInput, ToolOutput};
use crate::Result;
use serde_json::json;

const DEFAULT_LIMIT: usize = 3;

const CANNED_RESULTS: &[(&str, &str)] = &[
    ("Company Filings (example)", "https://www.example.com/filings"),
    ("Financial Ratios Reference", "https://www.example.com/ratios"),
];

/// Deterministic search: empty for a blank query, otherwise the canned
/// results truncated to `limit`.
pub fn search(query: &str, limit: usize) -> Vec<SearchResult> {
    if query.trim().is_empty() {
        return Vec::new();
    }

    CANNED_RESULTS
        .iter()
        .take(limit)
        .map(|(title, link)| SearchResult {
            title: title.to_string(),
            link: link.to_string(),
        })
        .collect()
}

pub struct SearchTool;

#[async_trait::async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &'static str {
        SEARCH_TOOL
    }

    fn description(&self) -> &'static str {
        "Look up reference material for a query (offline stub)"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let query = input
            .parameters
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let limit = input
            .parameters
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(DEFAULT_LIMIT);

        Ok(ToolOutput {
            success: true,
            data: json!({ "results": search(query, limit) }),
            error: None,
        })
    }
}
