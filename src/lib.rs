//! Financial Document Analyzer
//!
//! Accepts an uploaded PDF and a free-text question, then runs a fixed
//! sequence of role-configured agents over it:
//! - Verifier: is this a financial document, and of what kind
//! - Financial analyst: extract figures, compute ratios, explain them
//! - Investment advisor: educational strengths and weaknesses
//! - Risk assessor: leverage and profitability based risk level
//!
//! Tools are deterministic. A language model, when configured, only writes
//! the narrative from tool outputs; without one every task falls back to a
//! templated report.
//!
//! PIPELINE:
//! UPLOAD → READ → VERIFY → ANALYZE → ADVISE → ASSESS RISK → REPORT

pub mod agents;
pub mod api;
pub mod config;
pub mod crew;
pub mod error;
pub mod execution;
pub mod llm;
pub mod models;
pub mod tasks;
pub mod tools;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use error::Result;

// Re-export common types
pub use crew::{build_default_crew, AnalysisPipeline, Crew};
pub use models::*;
