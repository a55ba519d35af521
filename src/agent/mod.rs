#[cfg(test)]
mod tests;

pub mod tools;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::chat::Generator;

pub use tools::{DuckDuckGoTool, SearchTool, SearxTool, tools_from_config};

/// Hard bound on model round-trips per task run
pub const DEFAULT_MAX_ITERATIONS: usize = 6;

/// A persona the model acts as while working a task
#[derive(Debug, Clone)]
pub struct Agent {
    pub role: String,
    pub goal: String,
    pub backstory: String,
}

/// One unit of work handed to an agent
#[derive(Debug, Clone)]
pub struct Task {
    pub description: String,
    pub expected_output: String,
}

/// What the model decided to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentDecision {
    /// Invoke a tool with a single string argument
    ToolCall { tool: String, input: String },
    /// Finish with this answer
    Final(String),
}

/// Parse a model response into a decision.
///
/// The model is asked for JSON, but small local models drift, so parsing is
/// lenient: try the whole response, then the outermost `{...}` span, and
/// treat anything unparseable as a final answer.
#[inline]
pub fn parse_decision(text: &str) -> AgentDecision {
    if let Some(value) = parse_json_from_text(text) {
        if let Some(decision) = decision_from_value(&value) {
            return decision;
        }
    }
    AgentDecision::Final(text.trim().to_string())
}

fn parse_json_from_text(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    if let Ok(v) = serde_json::from_str::<Value>(trimmed) {
        return Some(v);
    }

    // Models often wrap the JSON in prose or a code fence
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            if let Ok(v) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Some(v);
            }
        }
    }

    None
}

fn decision_from_value(value: &Value) -> Option<AgentDecision> {
    let action = value
        .get("action")
        .or_else(|| value.get("type"))
        .and_then(|v| v.as_str())
        .unwrap_or("");

    if action == "tool" || action == "tool_call" {
        let tool = value
            .get("tool")
            .or_else(|| value.get("tool_name"))
            .or_else(|| value.get("name"))
            .and_then(|v| v.as_str())?;
        let input = value
            .get("input")
            .or_else(|| value.get("query"))
            .or_else(|| value.get("args"))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        return Some(AgentDecision::ToolCall {
            tool: tool.to_string(),
            input: input.to_string(),
        });
    }

    if action == "final" {
        let answer = value
            .get("answer")
            .or_else(|| value.get("content"))
            .or_else(|| value.get("response"))
            .and_then(|v| v.as_str())?;
        return Some(AgentDecision::Final(answer.to_string()));
    }

    None
}

/// Runs a single agent against a task, letting the model drive tool use
pub struct Crew<G> {
    agent: Agent,
    tools: Vec<Box<dyn SearchTool>>,
    generator: G,
    max_iterations: usize,
}

impl<G: Generator> Crew<G> {
    #[inline]
    pub fn new(agent: Agent, tools: Vec<Box<dyn SearchTool>>, generator: G) -> Self {
        Self {
            agent,
            tools,
            generator,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Work the task to completion and return the final answer text.
    ///
    /// Each round the model either calls a tool (its output is appended to
    /// the transcript as an observation) or answers. Hitting the iteration
    /// bound asks the model once more for a final answer and returns
    /// whatever comes back.
    #[inline]
    pub async fn run(&self, task: &Task) -> Result<String> {
        let mut transcript = self.system_prompt(task);

        for iteration in 0..self.max_iterations {
            let response = self
                .generator
                .generate(&transcript)
                .await
                .context("Agent generation call failed")?;

            match parse_decision(&response) {
                AgentDecision::Final(answer) => {
                    info!("Agent finished after {} iterations", iteration + 1);
                    return Ok(answer);
                }
                AgentDecision::ToolCall { tool, input } => {
                    debug!("Agent calls tool '{}' with input '{}'", tool, input);
                    let observation = self.dispatch_tool(&tool, &input);
                    transcript.push_str(&format!(
                        "\n\nTool call: {}\nInput: {}\nObservation: {}\n\n\
                         Decide your next action.",
                        tool, input, observation
                    ));
                }
            }
        }

        warn!(
            "Agent hit the iteration bound ({}), requesting a final answer",
            self.max_iterations
        );
        transcript.push_str(
            "\n\nYou have used all your tool calls. \
             Give your final answer now as plain text.",
        );

        let response = self
            .generator
            .generate(&transcript)
            .await
            .context("Agent generation call failed")?;

        match parse_decision(&response) {
            AgentDecision::Final(answer) => Ok(answer),
            AgentDecision::ToolCall { .. } => Ok(response.trim().to_string()),
        }
    }

    fn dispatch_tool(&self, name: &str, input: &str) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            let roster = self.tool_names().join(", ");
            return format!("Unknown tool '{}'. Available tools: {}", name, roster);
        };

        match tool.call(input) {
            Ok(text) => text,
            Err(e) => format!("Tool '{}' failed: {}", name, e),
        }
    }

    fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    fn system_prompt(&self, task: &Task) -> String {
        let mut roster = String::new();
        for tool in &self.tools {
            roster.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
        }

        format!(
            "You are {role}.\nYour goal: {goal}\nBackstory: {backstory}\n\n\
             You have these tools:\n{roster}\n\
             Task: {description}\n\
             Expected output: {expected}\n\n\
             Respond with exactly one JSON object per turn:\n\
             {{\"action\": \"tool\", \"tool\": \"<tool name>\", \"input\": \"<query>\"}}\n\
             to call a tool, or\n\
             {{\"action\": \"final\", \"answer\": \"<your answer>\"}}\n\
             when you can answer the task.",
            role = self.agent.role,
            goal = self.agent.goal,
            backstory = self.agent.backstory,
            roster = roster,
            description = task.description,
            expected = task.expected_output,
        )
    }
}
