//! Core data models for the document analyzer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Verifier,
    FinancialAnalyst,
    InvestmentAdvisor,
    RiskAssessor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    BalanceSheet,
    IncomeStatement,
    CashFlowStatement,
    FinancialStatement,
    Invoice,
    Unknown,
}

//
// ================= Pipeline Inputs =================
//

/// Inputs handed to `Crew::kickoff`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewInputs {
    pub query: String,
    pub file_path: String,
}

//
// ================= Extracted Metrics =================
//

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialFigures {
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub equity: Option<f64>,
}

impl FinancialFigures {
    /// Present values in a stable order
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        [
            ("revenue", self.revenue),
            ("net_income", self.net_income),
            ("total_assets", self.total_assets),
            ("total_liabilities", self.total_liabilities),
            ("equity", self.equity),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialRatios {
    pub profit_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
}

impl FinancialRatios {
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        [
            ("profit_margin", self.profit_margin),
            ("debt_to_equity", self.debt_to_equity),
            ("return_on_assets", self.return_on_assets),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVerification {
    pub is_financial_document: bool,
    pub doc_type: DocumentType,
    pub explanation: String,
    pub matched_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: serde_json::Value,
    pub error: Option<String>,
}

//
// ================= Execution =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub observation_id: Uuid,
    pub run_id: Uuid,
    pub task_name: String,
    pub tool_name: String,
    pub tool_output: serde_json::Value,
    pub execution_time_ms: u64,
    pub created_at: DateTime<Utc>,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Skipped,
}

//
// ================= Results =================
//

/// Output of one task in the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task_name: String,
    pub agent_role: AgentRole,
    pub raw: String,
    /// `true` when the text came from the language model rather than a template
    pub llm_generated: bool,
    pub observations: Vec<Observation>,
}

/// Final result of a pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewOutput {
    pub run_id: Uuid,
    pub raw: String,
    pub tasks_output: Vec<TaskOutput>,
    pub document_digest: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl fmt::Display for CrewOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentRole::Verifier => "Financial Document Verifier",
            AgentRole::FinancialAnalyst => "Senior Financial Analyst",
            AgentRole::InvestmentAdvisor => "Investment Advisor (Educational Only)",
            AgentRole::RiskAssessor => "Risk Assessment Specialist",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentType::BalanceSheet => "balance_sheet",
            DocumentType::IncomeStatement => "income_statement",
            DocumentType::CashFlowStatement => "cash_flow_statement",
            DocumentType::FinancialStatement => "financial_statement",
            DocumentType::Invoice => "invoice",
            DocumentType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
