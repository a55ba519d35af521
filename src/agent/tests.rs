use super::*;
use async_trait::async_trait;
use std::sync::Mutex;

fn sample_agent() -> Agent {
    Agent {
        role: "a research analyst".to_string(),
        goal: "answer questions with sourced facts".to_string(),
        backstory: "You have spent years synthesizing primary sources.".to_string(),
    }
}

fn sample_task() -> Task {
    Task {
        description: "Find the capital of France.".to_string(),
        expected_output: "A single city name.".to_string(),
    }
}

/// Generator that replays a scripted sequence of responses
struct ScriptedGenerator {
    responses: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(responses: &[&str]) -> Self {
        let mut scripted: Vec<String> = responses.iter().map(|s| (*s).to_string()).collect();
        scripted.reverse();
        Self {
            responses: Mutex::new(scripted),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompt(&self, index: usize) -> String {
        self.prompts.lock().expect("mutex not poisoned")[index].clone()
    }

    fn call_count(&self) -> usize {
        self.prompts.lock().expect("mutex not poisoned").len()
    }
}

#[async_trait]
impl crate::chat::Generator for &ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts
            .lock()
            .expect("mutex not poisoned")
            .push(prompt.to_string());
        let next = self.responses.lock().expect("mutex not poisoned").pop();
        next.ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }
}

struct FixedTool {
    name: &'static str,
    result: &'static str,
}

impl SearchTool for FixedTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "returns a fixed string"
    }

    fn call(&self, _query: &str) -> anyhow::Result<String> {
        Ok(self.result.to_string())
    }
}

#[test]
fn parse_decision_tool_call() {
    let decision = parse_decision(r#"{"action": "tool", "tool": "web_search", "input": "rust"}"#);
    assert_eq!(
        decision,
        AgentDecision::ToolCall {
            tool: "web_search".to_string(),
            input: "rust".to_string(),
        }
    );
}

#[test]
fn parse_decision_final_answer() {
    let decision = parse_decision(r#"{"action": "final", "answer": "Paris"}"#);
    assert_eq!(decision, AgentDecision::Final("Paris".to_string()));
}

#[test]
fn parse_decision_accepts_alternate_keys() {
    let decision =
        parse_decision(r#"{"type": "tool_call", "tool_name": "web_search", "query": "rust"}"#);
    assert_eq!(
        decision,
        AgentDecision::ToolCall {
            tool: "web_search".to_string(),
            input: "rust".to_string(),
        }
    );
}

#[test]
fn parse_decision_extracts_embedded_json() {
    let text = "Sure, here is my action:\n```json\n\
                {\"action\": \"tool\", \"tool\": \"web_search\", \"input\": \"rust\"}\n```";
    let decision = parse_decision(text);
    assert_eq!(
        decision,
        AgentDecision::ToolCall {
            tool: "web_search".to_string(),
            input: "rust".to_string(),
        }
    );
}

#[test]
fn unparseable_response_becomes_final_answer() {
    let decision = parse_decision("  The capital of France is Paris.  ");
    assert_eq!(
        decision,
        AgentDecision::Final("The capital of France is Paris.".to_string())
    );
}

#[test]
fn json_without_known_action_becomes_final_answer() {
    let text = r#"{"thought": "I should search the web"}"#;
    let decision = parse_decision(text);
    assert_eq!(decision, AgentDecision::Final(text.to_string()));
}

#[tokio::test]
async fn crew_runs_tool_then_answers() {
    let generator = ScriptedGenerator::new(&[
        r#"{"action": "tool", "tool": "web_search", "input": "capital of France"}"#,
        r#"{"action": "final", "answer": "Paris"}"#,
    ]);
    let tools: Vec<Box<dyn SearchTool>> = vec![Box::new(FixedTool {
        name: "web_search",
        result: "Paris is the capital of France.",
    })];

    let crew = Crew::new(sample_agent(), tools, &generator);
    let answer = crew.run(&sample_task()).await.expect("run should succeed");

    assert_eq!(answer, "Paris");
    assert_eq!(generator.call_count(), 2);

    // The tool's output must reach the next model call as an observation
    let second_prompt = generator.prompt(1);
    assert!(second_prompt.contains("Observation: Paris is the capital of France."));
    assert!(second_prompt.contains("Tool call: web_search"));
}

#[tokio::test]
async fn crew_answers_directly_without_tools() {
    let generator = ScriptedGenerator::new(&[r#"{"action": "final", "answer": "Paris"}"#]);
    let crew = Crew::new(sample_agent(), Vec::new(), &generator);

    let answer = crew.run(&sample_task()).await.expect("run should succeed");
    assert_eq!(answer, "Paris");
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn unknown_tool_is_reported_as_observation() {
    let generator = ScriptedGenerator::new(&[
        r#"{"action": "tool", "tool": "no_such_tool", "input": "x"}"#,
        r#"{"action": "final", "answer": "done"}"#,
    ]);
    let tools: Vec<Box<dyn SearchTool>> = vec![Box::new(FixedTool {
        name: "web_search",
        result: "irrelevant",
    })];

    let crew = Crew::new(sample_agent(), tools, &generator);
    let answer = crew.run(&sample_task()).await.expect("run should succeed");

    assert_eq!(answer, "done");
    let second_prompt = generator.prompt(1);
    assert!(second_prompt.contains("Unknown tool 'no_such_tool'"));
    assert!(second_prompt.contains("web_search"));
}

#[tokio::test]
async fn iteration_bound_forces_a_final_answer() {
    // Model keeps calling the tool forever; after the bound, the crew asks
    // once more and takes whatever comes back
    let generator = ScriptedGenerator::new(&[
        r#"{"action": "tool", "tool": "web_search", "input": "a"}"#,
        r#"{"action": "tool", "tool": "web_search", "input": "b"}"#,
        "Paris, I suppose.",
    ]);
    let tools: Vec<Box<dyn SearchTool>> = vec![Box::new(FixedTool {
        name: "web_search",
        result: "some text",
    })];

    let crew = Crew::new(sample_agent(), tools, &generator).with_max_iterations(2);
    let answer = crew.run(&sample_task()).await.expect("run should succeed");

    assert_eq!(answer, "Paris, I suppose.");
    assert_eq!(generator.call_count(), 3);

    let final_prompt = generator.prompt(2);
    assert!(final_prompt.contains("Give your final answer now"));
}

#[tokio::test]
async fn system_prompt_carries_persona_and_roster() {
    let generator = ScriptedGenerator::new(&[r#"{"action": "final", "answer": "ok"}"#]);
    let tools: Vec<Box<dyn SearchTool>> = vec![Box::new(FixedTool {
        name: "web_search",
        result: "irrelevant",
    })];

    let crew = Crew::new(sample_agent(), tools, &generator);
    crew.run(&sample_task()).await.expect("run should succeed");

    let prompt = generator.prompt(0);
    assert!(prompt.contains("a research analyst"));
    assert!(prompt.contains("answer questions with sourced facts"));
    assert!(prompt.contains("primary sources"));
    assert!(prompt.contains("- web_search:"));
    assert!(prompt.contains("Find the capital of France."));
    assert!(prompt.contains("A single city name."));
}
