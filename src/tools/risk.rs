//! Rule-based risk scoring over extracted figures

use super::metrics::extract_financial_figures;
use super::{require_text, Tool, RISK_TOOL};
use crate::models::{FinancialFigures, RiskAssessment, RiskLevel, ToolInput, ToolOutput};
use crate::Result;
use serde_json::json;

const MAX_LEVERAGE_SCORE: f64 = 2.0;
const NEGATIVE_INCOME_SCORE: f64 = 1.0;
const LOW_MARGIN_SCORE: f64 = 0.8;
const LOW_MARGIN_THRESHOLD: f64 = 0.02;
const HIGH_RISK_THRESHOLD: f64 = 2.0;
const MEDIUM_RISK_THRESHOLD: f64 = 1.0;

pub const NOT_ENOUGH_DATA: &str = "Not enough data to determine risk.";

/// Score leverage and profitability into a risk level.
///
/// Debt-to-equity contributes half its value, capped at 2.0. A loss adds 1.0;
/// otherwise a profit margin under 2% adds 0.8.
pub fn assess_figures(figures: &FinancialFigures) -> RiskAssessment {
    let mut risk_score = 0.0;
    let mut reasons = Vec::new();

    if let (Some(liabilities), Some(equity)) = (figures.total_liabilities, figures.equity) {
        if liabilities != 0.0 && equity != 0.0 {
            let dte = liabilities / equity;
            risk_score += (dte / 2.0).min(MAX_LEVERAGE_SCORE);
            reasons.push(format!("Debt-to-equity ~ {:.2}", dte));
        }
    }

    if let (Some(revenue), Some(net_income)) = (figures.revenue, figures.net_income) {
        if revenue != 0.0 && net_income != 0.0 {
            if net_income < 0.0 {
                risk_score += NEGATIVE_INCOME_SCORE;
                reasons.push("Negative net income".to_string());
            } else {
                let margin = net_income / revenue;
                if margin < LOW_MARGIN_THRESHOLD {
                    risk_score += LOW_MARGIN_SCORE;
                    reasons.push(format!("Very low profit margin ~ {:.4}", margin));
                }
            }
        }
    }

    let risk_level = if risk_score >= HIGH_RISK_THRESHOLD {
        RiskLevel::High
    } else if risk_score >= MEDIUM_RISK_THRESHOLD {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    RiskAssessment {
        risk_level,
        risk_score,
        reasons,
    }
}

/// Extract figures from text and assess them.
pub fn assess_risk(text: &str) -> RiskAssessment {
    assess_figures(&extract_financial_figures(text))
}

pub fn render_risk_report(assessment: &RiskAssessment) -> String {
    let reasons = if assessment.reasons.is_empty() {
        NOT_ENOUGH_DATA.to_string()
    } else {
        assessment.reasons.join(", ")
    };

    format!("Risk level: {}\nReasons: {}", assessment.risk_level, reasons)
}

/// Produces a LOW/MEDIUM/HIGH risk level with reasons
pub struct RiskAssessmentTool;

#[async_trait::async_trait]
impl Tool for RiskAssessmentTool {
    fn name(&self) -> &'static str {
        RISK_TOOL
    }

    fn description(&self) -> &'static str {
        "Assess leverage and profitability risk from the document's figures"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let text = require_text(input)?;
        let assessment = assess_risk(text);

        Ok(ToolOutput {
            success: true,
            data: json!({
                "risk_level": assessment.risk_level,
                "risk_score": assessment.risk_score,
                "reasons": assessment.reasons,
                "report": render_risk_report(&assessment),
            }),
            error: None,
        })
    }
}
