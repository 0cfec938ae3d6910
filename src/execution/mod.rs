//! Execution engine for a task's bound tools
//!
//! Runs tools in order and records one observation per call.
//! The language model is NOT used here.

use crate::error::AnalyzerError;
use crate::models::{ExecutionStatus, Observation, TaskOutput, ToolInput};
use crate::tools::{ToolRegistry, READ_DOCUMENT_TOOL};
use crate::Result;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// Maximum tools bound to a single task
const MAX_TOOLS_PER_TASK: usize = 16;

/// Per-run state shared by the tasks of one pipeline run
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub run_id: Uuid,
    pub query: String,
    pub file_path: String,
    pub document_text: Option<String>,
    pub document_digest: Option<String>,
    pub task_outputs: Vec<TaskOutput>,
}

impl TaskContext {
    pub fn new(query: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            query: query.into(),
            file_path: file_path.into(),
            document_text: None,
            document_digest: None,
            task_outputs: Vec::new(),
        }
    }
}

/// Executes tools sequentially against a task context
pub struct ExecutionEngine {
    tool_registry: ToolRegistry,
}

impl ExecutionEngine {
    pub fn new(tool_registry: ToolRegistry) -> Self {
        Self { tool_registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    /// Run `tools` in order for `task_name`.
    ///
    /// The document reader runs at most once per context; its failure aborts
    /// the run with the extraction error. Other tool failures are recorded as
    /// failed observations and execution moves on to the next tool.
    pub async fn run_tools(
        &self,
        task_name: &str,
        tools: &[&str],
        context: &mut TaskContext,
    ) -> Result<Vec<Observation>> {
        if tools.len() > MAX_TOOLS_PER_TASK {
            return Err(AnalyzerError::PipelineError(format!(
                "Task {} binds more than {} tools",
                task_name, MAX_TOOLS_PER_TASK
            )));
        }

        let mut observations = Vec::with_capacity(tools.len());

        for tool_name in tools {
            debug!(run_id = %context.run_id, task = task_name, tool = tool_name, "Running tool");

            if *tool_name == READ_DOCUMENT_TOOL && context.document_text.is_some() {
                observations.push(observation(
                    context,
                    task_name,
                    tool_name,
                    json!({ "cached": true }),
                    0,
                    ExecutionStatus::Skipped,
                ));
                continue;
            }

            let parameters = match build_parameters(tool_name, context) {
                Some(parameters) => parameters,
                None => {
                    warn!(task = task_name, tool = tool_name, "Document text not available yet");
                    observations.push(observation(
                        context,
                        task_name,
                        tool_name,
                        json!({ "error": "Document text not available" }),
                        0,
                        ExecutionStatus::Skipped,
                    ));
                    continue;
                }
            };

            let Some(tool) = self.tool_registry.get(tool_name) else {
                warn!(task = task_name, tool = tool_name, "Tool not registered");
                observations.push(observation(
                    context,
                    task_name,
                    tool_name,
                    json!({
                        "error": AnalyzerError::ToolNotFound(tool_name.to_string()).to_string()
                    }),
                    0,
                    ExecutionStatus::Skipped,
                ));
                continue;
            };

            let input = ToolInput {
                tool_name: tool_name.to_string(),
                parameters,
            };

            let start = Instant::now();
            let result = tool.execute(&input).await.and_then(|output| {
                if output.success {
                    Ok(output)
                } else {
                    Err(AnalyzerError::ToolError(
                        output
                            .error
                            .unwrap_or_else(|| format!("{} reported failure", tool_name)),
                    ))
                }
            });
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(output) => {
                    if *tool_name == READ_DOCUMENT_TOOL {
                        context.document_text = output
                            .data
                            .get("text")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        context.document_digest = output
                            .data
                            .get("digest")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                    }

                    observations.push(observation(
                        context,
                        task_name,
                        tool_name,
                        output.data,
                        elapsed_ms,
                        ExecutionStatus::Success,
                    ));
                }
                Err(e) if *tool_name == READ_DOCUMENT_TOOL => {
                    warn!(
                        run_id = %context.run_id,
                        path = %context.file_path,
                        error = %e,
                        "Document extraction failed"
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(task = task_name, tool = tool_name, error = %e, "Tool execution failed");
                    observations.push(observation(
                        context,
                        task_name,
                        tool_name,
                        json!({ "error": e.to_string() }),
                        elapsed_ms,
                        ExecutionStatus::Failed,
                    ));
                }
            }
        }

        debug!(
            run_id = %context.run_id,
            task = task_name,
            observation_count = observations.len(),
            "Task tools completed"
        );

        Ok(observations)
    }
}

fn build_parameters(tool_name: &str, context: &TaskContext) -> Option<Value> {
    if tool_name == READ_DOCUMENT_TOOL {
        return Some(json!({ "path": context.file_path }));
    }

    let text = context.document_text.as_deref()?;
    Some(json!({
        "text": text,
        "query": context.query,
    }))
}

fn observation(
    context: &TaskContext,
    task_name: &str,
    tool_name: &str,
    tool_output: Value,
    execution_time_ms: u64,
    status: ExecutionStatus,
) -> Observation {
    Observation {
        observation_id: Uuid::new_v4(),
        run_id: context.run_id,
        task_name: task_name.to_string(),
        tool_name: tool_name.to_string(),
        tool_output,
        execution_time_ms,
        created_at: Utc::now(),
        status,
    }
}
