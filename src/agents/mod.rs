//! Role-configured agents
//!
//! An agent is plain configuration (role, goal, backstory, bound tools) plus
//! an optional shared language-model client. Given a task it runs the bound
//! tools, then either asks the model to write the answer from the tool
//! outputs or falls back to the task's templated rendition.

use crate::execution::{ExecutionEngine, TaskContext};
use crate::llm::LlmClient;
use crate::models::{AgentRole, ExecutionStatus, Observation, TaskOutput};
use crate::tasks::TaskSpec;
use crate::tools::{
    INVESTMENT_TOOL, READ_DOCUMENT_TOOL, RISK_TOOL, SEARCH_TOOL, VERIFICATION_TOOL,
};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Longest document excerpt handed to the model
const MAX_DOCUMENT_CHARS: usize = 12_000;

/// Static description of an agent
#[derive(Debug, Clone)]
pub struct AgentSpec {
    pub role: AgentRole,
    pub goal: &'static str,
    pub backstory: &'static str,
    pub tools: Vec<&'static str>,
    /// Model attempts per task before the templated output is used
    pub max_iter: u32,
    /// Whether the agent may reach for its own tools beyond the task's binding
    pub allow_delegation: bool,
}

pub struct Agent {
    spec: AgentSpec,
    llm: Option<Arc<dyn LlmClient>>,
}

impl Agent {
    pub fn new(spec: AgentSpec, llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { spec, llm }
    }

    pub fn role(&self) -> AgentRole {
        self.spec.role
    }

    pub fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Tools run for `task`.
    ///
    /// A task that binds nothing uses the agent's tools. A delegating agent
    /// appends its own tools the task did not bind.
    pub fn tools_for(&self, task: &TaskSpec) -> Vec<&'static str> {
        if task.tools.is_empty() {
            return self.spec.tools.clone();
        }

        let mut tools = task.tools.clone();
        if self.spec.allow_delegation {
            for tool in &self.spec.tools {
                if !tools.contains(tool) {
                    tools.push(*tool);
                }
            }
        }
        tools
    }

    /// Run `task` against `context`.
    ///
    /// The model gets up to `max_iter` attempts. Failures are logged and
    /// answered with the templated output.
    pub async fn execute_task(
        &self,
        task: &TaskSpec,
        engine: &ExecutionEngine,
        context: &mut TaskContext,
    ) -> Result<TaskOutput> {
        let tools = self.tools_for(task);

        info!(
            run_id = %context.run_id,
            task = task.name,
            agent = %self.spec.role,
            "Agent starting task"
        );

        let observations = engine.run_tools(task.name, &tools, context).await?;

        let answer = match &self.llm {
            Some(llm) => {
                let system_prompt = self.system_prompt();
                let prompt = self.task_prompt(task, &tools, context, &observations, engine);
                self.ask(llm.as_ref(), task, &system_prompt, &prompt).await
            }
            None => None,
        };

        let (raw, llm_generated) = match answer {
            Some(answer) => (answer, true),
            None => (task.render_fallback(context, &observations), false),
        };

        debug!(task = task.name, llm_generated, characters = raw.len(), "Agent finished task");

        Ok(TaskOutput {
            task_name: task.name.to_string(),
            agent_role: self.spec.role,
            raw,
            llm_generated,
            observations,
        })
    }

    async fn ask(
        &self,
        llm: &dyn LlmClient,
        task: &TaskSpec,
        system_prompt: &str,
        prompt: &str,
    ) -> Option<String> {
        let attempts = self.spec.max_iter.max(1);

        for attempt in 1..=attempts {
            match llm.complete(system_prompt, prompt).await {
                Ok(answer) => return Some(answer),
                Err(e) => warn!(
                    task = task.name,
                    agent = %self.spec.role,
                    attempt,
                    max_iter = attempts,
                    error = %e,
                    "Language model call failed"
                ),
            }
        }

        warn!(task = task.name, agent = %self.spec.role, "Using templated output");
        None
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are the {}.\n\nGoal: {}\n\nBackstory: {}\n\n\
             Rules:\n\
             - Use only figures that appear in the tool outputs or the document excerpt.\n\
             - State assumptions explicitly when a value is uncertain.\n\
             - End with a short note that this is not personalized financial advice.",
            self.spec.role, self.spec.goal, self.spec.backstory
        )
    }

    fn task_prompt(
        &self,
        task: &TaskSpec,
        tools: &[&str],
        context: &TaskContext,
        observations: &[Observation],
        engine: &ExecutionEngine,
    ) -> String {
        let mut sections = vec![
            format!("Task:\n{}", task.render_description(&context.query)),
            format!("Expected output:\n{}", task.expected_output),
            format!("User query: {}", context.query),
        ];

        let tool_lines = engine.registry().describe(tools);
        if !tool_lines.is_empty() {
            sections.push(format!("Tools used:\n- {}", tool_lines.join("\n- ")));
        }

        let tool_outputs: Vec<String> = observations
            .iter()
            .filter(|o| o.status == ExecutionStatus::Success)
            .filter_map(|o| render_observation(o, context))
            .collect();
        if !tool_outputs.is_empty() {
            sections.push(format!("Tool outputs:\n{}", tool_outputs.join("\n\n")));
        }

        if !context.task_outputs.is_empty() {
            let earlier = context
                .task_outputs
                .iter()
                .map(|t| format!("[{}]\n{}", t.task_name, t.raw))
                .collect::<Vec<_>>()
                .join("\n\n");
            sections.push(format!("Earlier findings:\n{}", earlier));
        }

        sections.join("\n\n")
    }
}

fn render_observation(observation: &Observation, context: &TaskContext) -> Option<String> {
    let output = &observation.tool_output;
    let field = |name: &str| output.get(name).and_then(|v| v.as_str()).map(str::to_string);

    let body = match observation.tool_name.as_str() {
        READ_DOCUMENT_TOOL => context
            .document_text
            .as_deref()
            .map(|text| excerpt(text, MAX_DOCUMENT_CHARS)),
        INVESTMENT_TOOL => field("summary"),
        RISK_TOOL | VERIFICATION_TOOL => field("report"),
        _ => serde_json::to_string_pretty(output).ok(),
    }?;

    Some(format!("[{}]\n{}", observation.tool_name, body))
}

/// Truncate on a char boundary
fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}\n[... truncated]", &text[..idx]),
        None => text.to_string(),
    }
}

//
// ================= Agent Roster =================
//

pub fn verifier() -> AgentSpec {
    AgentSpec {
        role: AgentRole::Verifier,
        goal: "Decide whether the uploaded file is a financial document and report \
            is_financial_document, doc_type and a short explanation.",
        backstory: "You recognise balance sheets, income statements and cash flow statements. \
            When unsure you answer is_financial_document: false and say why.",
        tools: vec![READ_DOCUMENT_TOOL, VERIFICATION_TOOL],
        max_iter: 2,
        allow_delegation: false,
    }
}

pub fn financial_analyst() -> AgentSpec {
    AgentSpec {
        role: AgentRole::FinancialAnalyst,
        goal: "Extract the key statements and metrics from the document, compute common ratios \
            and explain the results clearly, stating assumptions when calculations are uncertain.",
        backstory: "You are an experienced financial analyst who reads documents carefully, \
            quotes numbers precisely and never invents facts.",
        tools: vec![READ_DOCUMENT_TOOL, INVESTMENT_TOOL, RISK_TOOL, SEARCH_TOOL],
        max_iter: 3,
        allow_delegation: true,
    }
}

pub fn investment_advisor() -> AgentSpec {
    AgentSpec {
        role: AgentRole::InvestmentAdvisor,
        goal: "Give educational insight into strengths, weaknesses and open questions an investor \
            might investigate. Never sell products or give personalized advice.",
        backstory: "You write general educational commentary about investments and their risks.",
        tools: vec![READ_DOCUMENT_TOOL, INVESTMENT_TOOL],
        max_iter: 2,
        allow_delegation: false,
    }
}

pub fn risk_assessor() -> AgentSpec {
    AgentSpec {
        role: AgentRole::RiskAssessor,
        goal: "Produce a concise risk assessment from the computed ratios with clear reasoning, \
            assumptions and next steps for due diligence.",
        backstory: "You focus on coherent, well-explained risk assessments grounded in the \
            available data.",
        tools: vec![READ_DOCUMENT_TOOL, RISK_TOOL],
        max_iter: 2,
        allow_delegation: false,
    }
}

/// The four pipeline agents sharing one optional client
pub fn default_agents(llm: Option<Arc<dyn LlmClient>>) -> Vec<Agent> {
    [verifier(), financial_analyst(), investment_advisor(), risk_assessor()]
        .into_iter()
        .map(|spec| Agent::new(spec, llm.clone()))
        .collect()
}
