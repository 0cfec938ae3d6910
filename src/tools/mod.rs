//! Tool trait and registry
//!
//! Tools are deterministic operations over the uploaded document.
//! None of them call the language model.

use crate::error::AnalyzerError;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;

pub mod document;
pub mod metrics;
pub mod risk;
pub mod search;
pub mod verification;

pub use document::{read_pdf_text, FinancialDocumentTool};
pub use metrics::{compute_ratios, extract_financial_figures, InvestmentAnalysisTool};
pub use risk::{assess_risk, RiskAssessmentTool};
pub use search::SearchTool;
pub use verification::{verify_document, DocumentVerificationTool};

pub const READ_DOCUMENT_TOOL: &str = "read_financial_document";
pub const INVESTMENT_TOOL: &str = "analyze_investment";
pub const RISK_TOOL: &str = "create_risk_assessment";
pub const VERIFICATION_TOOL: &str = "verify_document";
pub const SEARCH_TOOL: &str = "search";

/// Trait for a single tool (deterministic execution)
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// One "- name: description" line per tool, for prompts
    pub fn describe(&self, names: &[&str]) -> Vec<String> {
        names
            .iter()
            .filter_map(|name| self.get(name))
            .map(|tool| format!("{}: {}", tool.name(), tool.description()))
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the document text parameter shared by the analysis tools
pub(crate) fn require_text(input: &ToolInput) -> Result<&str> {
    if !input.parameters.is_object() {
        return Err(AnalyzerError::InvalidToolInput(
            "tool_input must be a JSON object".to_string(),
        ));
    }

    input
        .parameters
        .get("text")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            AnalyzerError::InvalidToolInput(format!(
                "Expected 'text' in tool_input for {}",
                input.tool_name
            ))
        })
}

/// Create a registry with every document tool registered.
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(FinancialDocumentTool));
    registry.register(Arc::new(DocumentVerificationTool));
    registry.register(Arc::new(InvestmentAnalysisTool));
    registry.register(Arc::new(RiskAssessmentTool));
    registry.register(Arc::new(SearchTool));

    registry
}
