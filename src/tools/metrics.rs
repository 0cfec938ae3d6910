//! Heuristic figure extraction and ratio computation
//!
//! Everything here is a pure function of the document text, so the same
//! text always yields the same figures and ratios.

use super::{require_text, Tool, INVESTMENT_TOOL};
use crate::models::{FinancialFigures, FinancialRatios, ToolInput, ToolOutput};
use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

lazy_static! {
    /// An amount of two or more characters. A minus sign must touch the digits;
    /// whitespace is only allowed after a dollar sign or before the number.
    static ref NUMBER_RE: Regex = Regex::new(r"\(?\$?\s?-?\d[\d.]+\)?").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Figure {
    TotalAssets,
    TotalLiabilities,
    Revenue,
    NetIncome,
    Equity,
}

/// Label families checked against every line, in assignment order
const FIGURE_LABELS: &[(Figure, &[&str])] = &[
    (Figure::TotalAssets, &["total assets", "assets"]),
    (Figure::TotalLiabilities, &["total liabilities", "liabilities"]),
    (Figure::Revenue, &["revenue", "total revenue", "sales"]),
    (Figure::NetIncome, &["net income", "profit", "net profit"]),
    (Figure::Equity, &["equity", "shareholders' equity", "total equity"]),
];

pub const NO_TEXT_MESSAGE: &str = "No document text provided.";

/// Parse a single number token; parentheses mean a negative amount.
fn parse_amount(token: &str) -> Option<f64> {
    let token = token.trim();
    let negative_parens = token.starts_with('(') && token.ends_with(')');

    let cleaned: String = token
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '$') && !c.is_whitespace())
        .collect();
    let cleaned = cleaned.trim_end_matches('.');

    let value = cleaned.parse::<f64>().ok()?;
    if negative_parens {
        Some(-value.abs())
    } else {
        Some(value)
    }
}

/// The last number on a line, ignoring thousands separators.
fn last_amount(line: &str) -> Option<f64> {
    let without_separators = line.replace(',', "");
    NUMBER_RE
        .find_iter(&without_separators)
        .last()
        .and_then(|m| parse_amount(m.as_str()))
}

/// Extract headline figures from statement text.
///
/// Works line by line: when a line mentions a label family, the last number
/// on that line becomes the value. Later lines overwrite earlier ones.
pub fn extract_financial_figures(text: &str) -> FinancialFigures {
    let mut figures = FinancialFigures::default();

    for line in text.lines() {
        let lower = line.to_lowercase();

        for (figure, labels) in FIGURE_LABELS {
            if !labels.iter().any(|label| lower.contains(label)) {
                continue;
            }

            let Some(value) = last_amount(line) else {
                continue;
            };

            let slot = match figure {
                Figure::TotalAssets => &mut figures.total_assets,
                Figure::TotalLiabilities => &mut figures.total_liabilities,
                Figure::Revenue => &mut figures.revenue,
                Figure::NetIncome => &mut figures.net_income,
                Figure::Equity => &mut figures.equity,
            };
            *slot = Some(value);
        }
    }

    figures
}

fn non_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

/// Compute ratios whose inputs are present and non-zero.
pub fn compute_ratios(figures: &FinancialFigures) -> FinancialRatios {
    let revenue = non_zero(figures.revenue);
    let net_income = non_zero(figures.net_income);
    let total_assets = non_zero(figures.total_assets);
    let total_liabilities = non_zero(figures.total_liabilities);
    let equity = non_zero(figures.equity);

    FinancialRatios {
        profit_margin: revenue.zip(net_income).map(|(r, n)| n / r),
        debt_to_equity: total_liabilities.zip(equity).map(|(l, e)| l / e),
        return_on_assets: total_assets.zip(net_income).map(|(a, n)| n / a),
    }
}

/// Render figures and ratios as the investment tool's text report.
pub fn render_investment_summary(figures: &FinancialFigures, ratios: &FinancialRatios) -> String {
    let mut lines = vec!["Extracted financial values (heuristic):".to_string()];
    for (name, value) in figures.entries() {
        lines.push(format!("- {}: {:.2}", name, value));
    }

    lines.push(String::new());
    lines.push("Computed ratios (when possible):".to_string());
    for (name, value) in ratios.entries() {
        lines.push(format!("- {}: {:.4}", name, value));
    }

    lines.push(String::new());
    lines.push("Notes: These results are heuristic. Manual verification is recommended.".to_string());
    lines.join("\n")
}

/// Analyze document text and return the investment summary.
pub fn analyze_investment(text: &str) -> String {
    if text.trim().is_empty() {
        return NO_TEXT_MESSAGE.to_string();
    }

    let figures = extract_financial_figures(text);
    let ratios = compute_ratios(&figures);
    render_investment_summary(&figures, &ratios)
}

/// Extracts figures and computes profit margin, debt-to-equity and ROA
pub struct InvestmentAnalysisTool;

#[async_trait::async_trait]
impl Tool for InvestmentAnalysisTool {
    fn name(&self) -> &'static str {
        INVESTMENT_TOOL
    }

    fn description(&self) -> &'static str {
        "Extract revenue, net income, assets, liabilities and equity and compute basic ratios"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let text = require_text(input)?;

        let figures = extract_financial_figures(text);
        let ratios = compute_ratios(&figures);

        Ok(ToolOutput {
            success: true,
            data: json!({
                "extracted_values": figures,
                "ratios": ratios,
                "summary": analyze_investment(text),
            }),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATEMENT: &str = "ACME Corp Annual Report\n\
        Total Revenue 1,000,000\n\
        Net Income 120,000\n\
        Total Assets 2,400,000\n\
        Total Liabilities 900,000\n\
        Total Equity 1,500,000\n";

    #[test]
    fn test_extracts_labelled_figures() {
        let figures = extract_financial_figures(STATEMENT);
        assert_eq!(figures.revenue, Some(1_000_000.0));
        assert_eq!(figures.net_income, Some(120_000.0));
        assert_eq!(figures.total_assets, Some(2_400_000.0));
        assert_eq!(figures.total_liabilities, Some(900_000.0));
        assert_eq!(figures.equity, Some(1_500_000.0));
    }

    #[test]
    fn test_last_number_on_line_wins() {
        let figures = extract_financial_figures("Revenue 2023 2022 850.5 900.25");
        assert_eq!(figures.revenue, Some(900.25));
    }

    #[test]
    fn test_later_lines_overwrite_earlier_ones() {
        let figures = extract_financial_figures("Sales 100\nRevenue 250");
        assert_eq!(figures.revenue, Some(250.0));
    }

    #[test]
    fn test_negative_and_parenthesised_amounts() {
        let figures = extract_financial_figures("Net loss / net income -5,000\nProfit ($1,250)");
        assert_eq!(figures.net_income, Some(-1250.0));

        let figures = extract_financial_figures("Net income -5,000");
        assert_eq!(figures.net_income, Some(-5000.0));
    }

    #[test]
    fn test_dash_separator_is_not_a_sign() {
        let text = "Revenue - 1,000,000\nNet income - 120,000";
        let figures = extract_financial_figures(text);
        assert_eq!(figures.revenue, Some(1_000_000.0));
        assert_eq!(figures.net_income, Some(120_000.0));

        let assessment = crate::tools::assess_risk(text);
        assert!(!assessment.reasons.iter().any(|r| r == "Negative net income"));
        assert_eq!(assessment.risk_level, crate::models::RiskLevel::Low);
    }

    #[test]
    fn test_footnote_markers_are_skipped() {
        let figures = extract_financial_figures("Total assets 2,400,000 (Note 5)");
        assert_eq!(figures.total_assets, Some(2_400_000.0));
    }

    #[test]
    fn test_lines_without_numbers_are_ignored() {
        let figures = extract_financial_figures("Revenue recognition policy\nAssets are stated at cost");
        assert!(figures.is_empty());
    }

    #[test]
    fn test_ratios() {
        let ratios = compute_ratios(&extract_financial_figures(STATEMENT));
        assert!((ratios.profit_margin.unwrap() - 0.12).abs() < 1e-9);
        assert!((ratios.debt_to_equity.unwrap() - 0.6).abs() < 1e-9);
        assert!((ratios.return_on_assets.unwrap() - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_ratios_skip_zero_or_missing_inputs() {
        let figures = FinancialFigures {
            revenue: Some(0.0),
            net_income: Some(10.0),
            total_liabilities: Some(50.0),
            equity: Some(0.0),
            ..Default::default()
        };
        assert_eq!(compute_ratios(&figures), FinancialRatios::default());
    }

    #[test]
    fn test_summary_rendering() {
        let summary = analyze_investment(STATEMENT);
        assert!(summary.starts_with("Extracted financial values (heuristic):"));
        assert!(summary.contains("- revenue: 1000000.00"));
        assert!(summary.contains("- profit_margin: 0.1200"));
        assert!(summary.contains("- debt_to_equity: 0.6000"));
        assert!(summary.ends_with("Manual verification is recommended."));
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(analyze_investment("   "), NO_TEXT_MESSAGE);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let first = analyze_investment(STATEMENT);
        for _ in 0..5 {
            assert_eq!(analyze_investment(STATEMENT), first);
        }
    }

    #[tokio::test]
    async fn test_tool_output_shape() {
        let input = ToolInput {
            tool_name: INVESTMENT_TOOL.to_string(),
            parameters: json!({ "text": STATEMENT }),
        };
        let output = InvestmentAnalysisTool.execute(&input).await.unwrap();

        assert!(output.success);
        assert_eq!(output.data["extracted_values"]["revenue"], 1_000_000.0);
        assert!(output.data["ratios"]["profit_margin"].is_number());
        assert!(output.data["summary"].as_str().unwrap().contains("Computed ratios"));
    }
}
