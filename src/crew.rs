//! Sequential analysis pipeline
//!
//! verification → analysis → investment insights → risk assessment.
//! Each task sees the outputs of the tasks before it.

use crate::agents::{default_agents, Agent};
use crate::error::AnalyzerError;
use crate::execution::{ExecutionEngine, TaskContext};
use crate::llm::LlmClient;
use crate::models::{CrewInputs, CrewOutput};
use crate::tasks::{default_tasks, TaskSpec, DISCLAIMER};
use crate::tools::create_default_registry;
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Anything that can turn {query, file_path} into an analysis
#[async_trait::async_trait]
pub trait AnalysisPipeline: Send + Sync {
    async fn kickoff(&self, inputs: CrewInputs) -> Result<CrewOutput>;
}

/// Immutable pipeline definition shared by every request
pub struct Crew {
    agents: Vec<Agent>,
    tasks: Vec<TaskSpec>,
    engine: ExecutionEngine,
}

impl Crew {
    pub fn new(agents: Vec<Agent>, tasks: Vec<TaskSpec>, engine: ExecutionEngine) -> Self {
        Self {
            agents,
            tasks,
            engine,
        }
    }

    pub fn has_llm(&self) -> bool {
        self.agents.iter().any(Agent::has_llm)
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name).collect()
    }

    /// Run every task in order and combine their outputs.
    pub async fn kickoff(&self, inputs: CrewInputs) -> Result<CrewOutput> {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut context = TaskContext::new(inputs.query, inputs.file_path);

        info!(
            run_id = %context.run_id,
            file_path = %context.file_path,
            tasks = self.tasks.len(),
            llm = self.has_llm(),
            "Pipeline kickoff"
        );

        for task in &self.tasks {
            let agent = self
                .agents
                .iter()
                .find(|a| a.role() == task.agent)
                .ok_or_else(|| {
                    AnalyzerError::PipelineError(format!(
                        "No agent with role {} for task {}",
                        task.agent, task.name
                    ))
                })?;

            let output = agent.execute_task(task, &self.engine, &mut context).await?;
            context.task_outputs.push(output);
        }

        let raw = self.compose_report(&context);
        let document_digest = context.document_digest.clone().unwrap_or_default();

        info!(
            run_id = %context.run_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            characters = raw.len(),
            "Pipeline complete"
        );

        Ok(CrewOutput {
            run_id: context.run_id,
            raw,
            tasks_output: context.task_outputs,
            document_digest,
            started_at,
            finished_at: Utc::now(),
        })
    }

    fn compose_report(&self, context: &TaskContext) -> String {
        let mut out = String::new();
        out.push_str("# Financial Document Analysis\n\n");
        out.push_str(&format!("Query: {}\n", context.query));

        for (i, (task, output)) in self.tasks.iter().zip(&context.task_outputs).enumerate() {
            out.push_str(&format!(
                "\n## {}. {} ({})\n\n",
                i + 1,
                task.title,
                output.agent_role
            ));
            out.push_str(output.raw.trim_end());
            out.push('\n');
        }

        if !out.contains(DISCLAIMER) {
            out.push('\n');
            out.push_str(DISCLAIMER);
            out.push('\n');
        }

        out
    }
}

#[async_trait::async_trait]
impl AnalysisPipeline for Crew {
    async fn kickoff(&self, inputs: CrewInputs) -> Result<CrewOutput> {
        Crew::kickoff(self, inputs).await
    }
}

/// The standard four-agent pipeline over the default tool registry.
pub fn build_default_crew(llm: Option<Arc<dyn LlmClient>>) -> Crew {
    Crew::new(
        default_agents(llm),
        default_tasks(),
        ExecutionEngine::new(create_default_registry()),
    )
}
