//! Document type verification
//!
//! Classifies extracted text as a balance sheet, income statement, cash flow
//! statement, a combined financial statement, an invoice or unknown, using
//! static keyword lists.

use super::{require_text, Tool, VERIFICATION_TOOL};
use crate::models::{DocumentType, DocumentVerification, ToolInput, ToolOutput};
use crate::Result;
use serde_json::json;

const BALANCE_SHEET_KEYWORDS: &[&str] = &[
    "balance sheet",
    "statement of financial position",
    "total assets",
    "current assets",
    "total liabilities",
    "current liabilities",
    "shareholders' equity",
    "stockholders' equity",
];

const INCOME_STATEMENT_KEYWORDS: &[&str] = &[
    "income statement",
    "statement of operations",
    "profit and loss",
    "revenue",
    "net income",
    "gross profit",
    "operating income",
    "earnings per share",
];

const CASH_FLOW_KEYWORDS: &[&str] = &[
    "cash flow",
    "operating activities",
    "investing activities",
    "financing activities",
    "cash and cash equivalents",
];

const GENERAL_KEYWORDS: &[&str] = &[
    "annual report",
    "quarterly report",
    "fiscal year",
    "financial statements",
    "consolidated",
    "form 10-k",
    "form 10-q",
];

const INVOICE_KEYWORDS: &[&str] = &[
    "invoice",
    "bill to",
    "amount due",
    "due date",
    "remit to",
];

/// Minimum keyword hits for a category to count as strong evidence
const STRONG_EVIDENCE: usize = 2;

fn matches<'a>(text: &str, keywords: &[&'a str]) -> Vec<&'a str> {
    keywords
        .iter()
        .filter(|kw| text.contains(**kw))
        .copied()
        .collect()
}

/// Decide whether the text looks like a financial statement.
pub fn verify_document(text: &str) -> DocumentVerification {
    let lower = text.to_lowercase();

    let statements = [
        (DocumentType::BalanceSheet, matches(&lower, BALANCE_SHEET_KEYWORDS)),
        (DocumentType::IncomeStatement, matches(&lower, INCOME_STATEMENT_KEYWORDS)),
        (DocumentType::CashFlowStatement, matches(&lower, CASH_FLOW_KEYWORDS)),
    ];
    let general = matches(&lower, GENERAL_KEYWORDS);
    let invoice = matches(&lower, INVOICE_KEYWORDS);

    let strongest_statement = statements.iter().map(|(_, hits)| hits.len()).max().unwrap_or(0);
    let strong: Vec<DocumentType> = statements
        .iter()
        .filter(|(_, hits)| hits.len() >= STRONG_EVIDENCE)
        .map(|(doc_type, _)| *doc_type)
        .collect();
    let statement_hits: usize =
        statements.iter().map(|(_, hits)| hits.len()).sum::<usize>() + general.len();

    let mut matched_keywords: Vec<String> = statements
        .iter()
        .flat_map(|(_, hits)| hits.iter())
        .chain(general.iter())
        .chain(invoice.iter())
        .map(|kw| kw.to_string())
        .collect();
    matched_keywords.sort();
    matched_keywords.dedup();

    let (is_financial_document, doc_type, explanation) = if invoice.len() >= STRONG_EVIDENCE
        && invoice.len() > strongest_statement
    {
        (
            false,
            DocumentType::Invoice,
            format!(
                "Looks like an invoice ({}), not a financial statement.",
                invoice.join(", ")
            ),
        )
    } else if strong.len() >= 2 {
        (
            true,
            DocumentType::FinancialStatement,
            format!(
                "Contains several statement types: {}.",
                strong
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
    } else if let Some(doc_type) = strong.first() {
        let hits = statements
            .iter()
            .find(|(t, _)| t == doc_type)
            .map(|(_, hits)| hits.join(", "))
            .unwrap_or_default();
        (
            true,
            *doc_type,
            format!("Matched {} indicators: {}.", doc_type, hits),
        )
    } else if statement_hits >= STRONG_EVIDENCE {
        (
            true,
            DocumentType::FinancialStatement,
            format!(
                "Weak financial indicators found ({} keyword matches).",
                statement_hits
            ),
        )
    } else {
        (
            false,
            DocumentType::Unknown,
            "Not enough financial statement indicators to classify the document.".to_string(),
        )
    };

    DocumentVerification {
        is_financial_document,
        doc_type,
        explanation,
        matched_keywords,
    }
}

pub fn render_verification(verification: &DocumentVerification) -> String {
    format!(
        "is_financial_document: {}\ndoc_type: {}\nexplanation: {}",
        verification.is_financial_document, verification.doc_type, verification.explanation
    )
}

/// Decides whether the upload is a financial statement
pub struct DocumentVerificationTool;

#[async_trait::async_trait]
impl Tool for DocumentVerificationTool {
    fn name(&self) -> &'static str {
        VERIFICATION_TOOL
    }

    fn description(&self) -> &'static str {
        "Classify the document type and decide whether it is a financial statement"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let text = require_text(input)?;
        let verification = verify_document(text);

        Ok(ToolOutput {
            success: true,
            data: json!({
                "is_financial_document": verification.is_financial_document,
                "doc_type": verification.doc_type,
                "explanation": verification.explanation,
                "matched_keywords": verification.matched_keywords,
                "report": render_verification(&verification),
            }),
            error: None,
        })
    }
}
