//! Task definitions for the analysis pipeline
//!
//! A task names the agent role that performs it, the tools it binds, what it
//! must produce, and a templated rendition used when no language model is
//! available.

use crate::execution::TaskContext;
use crate::models::{
    AgentRole, ExecutionStatus, FinancialFigures, FinancialRatios, Observation,
};
use crate::tools::{
    INVESTMENT_TOOL, READ_DOCUMENT_TOOL, RISK_TOOL, SEARCH_TOOL, VERIFICATION_TOOL,
};
use serde_json::Value;

pub const DISCLAIMER: &str =
    "Disclaimer: this analysis is educational and heuristic. It is not personalized financial advice.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Verification,
    DocumentAnalysis,
    InvestmentAnalysis,
    RiskAssessment,
}

/// Declarative description of one pipeline stage
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub kind: TaskKind,
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub expected_output: &'static str,
    pub agent: AgentRole,
    /// Empty means the agent's own tools
    pub tools: Vec<&'static str>,
}

impl TaskSpec {
    /// Description with `{query}` filled in
    pub fn render_description(&self, query: &str) -> String {
        self.description.replace("{query}", query)
    }

    /// Tool-only output for this task
    pub fn render_fallback(&self, context: &TaskContext, observations: &[Observation]) -> String {
        match self.kind {
            TaskKind::Verification => render_verification(observations),
            TaskKind::DocumentAnalysis => render_document_analysis(context, observations),
            TaskKind::InvestmentAnalysis => render_investment_insights(observations),
            TaskKind::RiskAssessment => render_risk_assessment(observations),
        }
    }
}

pub fn verification() -> TaskSpec {
    TaskSpec {
        kind: TaskKind::Verification,
        name: "verification",
        title: "Document Verification",
        description: "Check whether the uploaded file is a financial document such as a balance \
            sheet, income statement or cash flow statement. Answer with a boolean and a short \
            explanation.",
        expected_output: "is_financial_document: bool, doc_type: string, explanation: string",
        agent: AgentRole::Verifier,
        tools: vec![READ_DOCUMENT_TOOL, VERIFICATION_TOOL],
    }
}

pub fn analyze_financial_document() -> TaskSpec {
    TaskSpec {
        kind: TaskKind::DocumentAnalysis,
        name: "analyze_financial_document",
        title: "Financial Analysis",
        description: "Analyze the uploaded financial document for this request: {query}\n\
            1) Confirm the document type.\n\
            2) Extract the key statement values (revenue, net income, total assets, total \
            liabilities, equity) where present.\n\
            3) Compute profit margin, debt-to-equity and return on assets from those values.\n\
            4) Summarize, list assumptions and recommend next steps for due diligence.",
        expected_output: "Sections: verification, extracted_values, ratios, summary, assumptions, \
            next_steps",
        agent: AgentRole::FinancialAnalyst,
        tools: vec![READ_DOCUMENT_TOOL, INVESTMENT_TOOL, RISK_TOOL, SEARCH_TOOL],
    }
}

pub fn investment_analysis() -> TaskSpec {
    TaskSpec {
        kind: TaskKind::InvestmentAnalysis,
        name: "investment_analysis",
        title: "Investment Insights",
        description: "Using the extracted values and ratios, describe the financial strengths and \
            weaknesses an investor should look into for: {query}. Keep it educational; do not \
            give personalized investment advice.",
        expected_output: "extracted_values, ratios, and a short bullet list of strengths and \
            weaknesses",
        agent: AgentRole::InvestmentAdvisor,
        tools: Vec::new(),
    }
}

pub fn risk_assessment() -> TaskSpec {
    TaskSpec {
        kind: TaskKind::RiskAssessment,
        name: "risk_assessment",
        title: "Risk Assessment",
        description: "Assess financial risk from the ratios and extracted values. Call out high \
            leverage, low profitability and losses.",
        expected_output: "risk_level: LOW/MEDIUM/HIGH and a list of reasons",
        agent: AgentRole::RiskAssessor,
        tools: Vec::new(),
    }
}

/// The fixed task order: verification, analysis, investment, risk
pub fn default_tasks() -> Vec<TaskSpec> {
    vec![
        verification(),
        analyze_financial_document(),
        investment_analysis(),
        risk_assessment(),
    ]
}

//
// ================= Templated Output =================
//

fn successful_output<'a>(observations: &'a [Observation], tool_name: &str) -> Option<&'a Value> {
    observations
        .iter()
        .find(|o| o.tool_name == tool_name && o.status == ExecutionStatus::Success)
        .map(|o| &o.tool_output)
}

fn figures_from(output: &Value) -> (FinancialFigures, FinancialRatios) {
    let figures = output
        .get("extracted_values")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    let ratios = output
        .get("ratios")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    (figures, ratios)
}

fn string_field<'a>(output: &'a Value, field: &str) -> Option<&'a str> {
    output.get(field).and_then(Value::as_str)
}

fn render_verification(observations: &[Observation]) -> String {
    match successful_output(observations, VERIFICATION_TOOL).and_then(|o| string_field(o, "report"))
    {
        Some(report) => report.to_string(),
        None => "is_financial_document: false\ndoc_type: unknown\nexplanation: verification tool \
            output unavailable"
            .to_string(),
    }
}

fn render_document_analysis(context: &TaskContext, observations: &[Observation]) -> String {
    let mut out = Vec::new();

    if let Some(verification) = context
        .task_outputs
        .iter()
        .find(|t| t.agent_role == AgentRole::Verifier)
    {
        out.push("Verification:".to_string());
        out.push(verification.raw.clone());
        out.push(String::new());
    }

    match successful_output(observations, INVESTMENT_TOOL) {
        Some(output) => {
            let (figures, ratios) = figures_from(output);
            match string_field(output, "summary") {
                Some(summary) => out.push(summary.to_string()),
                None => out.push("Investment metrics unavailable.".to_string()),
            }
            out.push(String::new());
            out.push(format!("Summary: {}", headline(&figures, &ratios)));
        }
        None => out.push("Investment metrics unavailable.".to_string()),
    }

    if let Some(report) = successful_output(observations, RISK_TOOL).and_then(|o| string_field(o, "report")) {
        out.push(String::new());
        out.push(report.to_string());
    }

    out.push(String::new());
    out.push("Assumptions:".to_string());
    out.push("- Values are taken from the last number on each labelled line of the document.".to_string());
    out.push("- Units and reporting periods are assumed consistent across statements.".to_string());

    out.push(String::new());
    out.push("Next steps:".to_string());
    out.push("- Reconcile extracted values against the audited statements.".to_string());
    out.push("- Compare ratios with prior periods and industry peers.".to_string());
    out.push("- Review notes to the accounts for off-balance-sheet items.".to_string());

    if let Some(results) = successful_output(observations, SEARCH_TOOL)
        .and_then(|o| o.get("results"))
        .and_then(Value::as_array)
    {
        if !results.is_empty() {
            out.push(String::new());
            out.push("References:".to_string());
            for result in results {
                let title = string_field(result, "title").unwrap_or("untitled");
                let link = string_field(result, "link").unwrap_or_default();
                out.push(format!("- {} ({})", title, link));
            }
        }
    }

    out.push(String::new());
    out.push(DISCLAIMER.to_string());
    out.join("\n")
}

/// One-sentence summary of what was found
fn headline(figures: &FinancialFigures, ratios: &FinancialRatios) -> String {
    if figures.is_empty() {
        return "no labelled financial figures could be extracted; manual review required."
            .to_string();
    }

    let found: Vec<&str> = figures.entries().iter().map(|(name, _)| *name).collect();
    let computed = ratios.entries().len();
    format!(
        "extracted {} ({} value(s)) and computed {} ratio(s).",
        found.join(", "),
        found.len(),
        computed
    )
}

fn render_investment_insights(observations: &[Observation]) -> String {
    let Some(output) = successful_output(observations, INVESTMENT_TOOL) else {
        return format!("Investment metrics unavailable.\n\n{}", DISCLAIMER);
    };

    let (figures, ratios) = figures_from(output);
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();

    if let Some(margin) = ratios.profit_margin {
        if margin < 0.0 {
            weaknesses.push(format!("Loss-making: profit margin {:.2}%", margin * 100.0));
        } else if margin < 0.05 {
            weaknesses.push(format!("Thin profit margin of {:.2}%", margin * 100.0));
        } else {
            strengths.push(format!("Profit margin of {:.2}%", margin * 100.0));
        }
    }

    if let Some(dte) = ratios.debt_to_equity {
        if dte > 2.0 {
            weaknesses.push(format!("High leverage: debt-to-equity {:.2}", dte));
        } else if dte <= 1.0 {
            strengths.push(format!("Moderate leverage: debt-to-equity {:.2}", dte));
        }
    }

    if let Some(roa) = ratios.return_on_assets {
        if roa < 0.0 {
            weaknesses.push(format!("Negative return on assets {:.2}%", roa * 100.0));
        } else if roa >= 0.05 {
            strengths.push(format!("Return on assets of {:.2}%", roa * 100.0));
        }
    }

    let mut out = Vec::new();
    out.push("Extracted values:".to_string());
    if figures.is_empty() {
        out.push("- none found".to_string());
    }
    for (name, value) in figures.entries() {
        out.push(format!("- {}: {:.2}", name, value));
    }

    out.push(String::new());
    out.push("Ratios:".to_string());
    if ratios.entries().is_empty() {
        out.push("- not enough data".to_string());
    }
    for (name, value) in ratios.entries() {
        out.push(format!("- {}: {:.4}", name, value));
    }

    out.push(String::new());
    out.push("Strengths:".to_string());
    if strengths.is_empty() {
        out.push("- none identified from the available figures".to_string());
    }
    out.extend(strengths.into_iter().map(|s| format!("- {}", s)));

    out.push(String::new());
    out.push("Weaknesses:".to_string());
    if weaknesses.is_empty() {
        out.push("- none identified from the available figures".to_string());
    }
    out.extend(weaknesses.into_iter().map(|w| format!("- {}", w)));

    out.push(String::new());
    out.push(DISCLAIMER.to_string());
    out.join("\n")
}

fn render_risk_assessment(observations: &[Observation]) -> String {
    let Some(output) = successful_output(observations, RISK_TOOL) else {
        return "Risk level: UNKNOWN\nReasons: risk tool output unavailable".to_string();
    };

    let mut out = vec![string_field(output, "report")
        .unwrap_or("Risk level: UNKNOWN")
        .to_string()];

    let next_step = match string_field(output, "risk_level") {
        Some("HIGH") => "Review debt maturities, covenants and the path back to profitability.",
        Some("MEDIUM") => "Monitor leverage and margins over the next reporting periods.",
        _ => "Confirm the figures against audited statements before relying on them.",
    };
    out.push(format!("Next step: {}", next_step));
    out.join("\n")
}
