//! Workflow types.
//!
//! A workflow is an ordered list of steps, each invoking one action on one
//! agent. Steps share a mutable context: a step that declares `outputVar`
//! publishes its result to every later step.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Shared key/value context threaded through a workflow run.
pub type WorkflowContext = Map<String, Value>;

fn default_stop_on_error() -> bool {
    true
}

/// One step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    /// Step name, echoed in the step result.
    pub name: String,
    /// Agent that executes the step.
    pub agent_id: String,
    /// Action the agent should run.
    pub action: String,
    /// Action parameters. `context` is injected on top of these.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Context key receiving the step's result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_var: Option<String>,
    /// Whether a failure halts the run.
    #[serde(default = "default_stop_on_error")]
    pub stop_on_error: bool,
}

impl WorkflowStep {
    /// Creates a step with empty params that stops the run on error.
    pub fn new(
        name: impl Into<String>,
        agent_id: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            agent_id: agent_id.into(),
            action: action.into(),
            params: Map::new(),
            output_var: None,
            stop_on_error: true,
        }
    }

    /// Sets a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Publishes the step's result under `var`.
    pub fn with_output_var(mut self, var: impl Into<String>) -> Self {
        self.output_var = Some(var.into());
        self
    }

    /// Sets whether a failure halts the run.
    pub fn with_stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }
}

/// Outcome of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    /// Step name.
    pub step: String,
    /// Agent the step ran on.
    pub agent_id: String,
    /// Action that was invoked.
    pub action: String,
    /// Whether the agent reported success.
    pub success: bool,
    /// Result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepResult {
    /// Creates a successful result for `step`.
    pub fn succeeded(step: &WorkflowStep, result: Value) -> Self {
        Self {
            step: step.name.clone(),
            agent_id: step.agent_id.clone(),
            action: step.action.clone(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Creates a failed result for `step`.
    pub fn failed(step: &WorkflowStep, error: impl Into<String>) -> Self {
        Self {
            step: step.name.clone(),
            agent_id: step.agent_id.clone(),
            action: step.action.clone(),
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Output of a workflow run: every executed step plus the final context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    /// Step results in execution order.
    pub results: Vec<StepResult>,
    /// Context snapshot after the last executed step.
    pub context: WorkflowContext,
}

impl WorkflowOutcome {
    /// Returns true if every executed step succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_defaults_from_json() {
        let step: WorkflowStep = serde_json::from_value(json!({
            "name": "s1",
            "agentId": "A",
            "action": "a1"
        }))
        .unwrap();

        assert!(step.stop_on_error);
        assert!(step.params.is_empty());
        assert!(step.output_var.is_none());
    }

    #[test]
    fn test_step_explicit_fields() {
        let step: WorkflowStep = serde_json::from_value(json!({
            "name": "fetch",
            "agentId": "agent-rest",
            "action": "get",
            "params": {"url": "https://example.com"},
            "outputVar": "page",
            "stopOnError": false
        }))
        .unwrap();

        assert!(!step.stop_on_error);
        assert_eq!(step.output_var.as_deref(), Some("page"));
        assert_eq!(step.params["url"], "https://example.com");
    }

    #[test]
    fn test_step_missing_agent_rejected() {
        let result: Result<WorkflowStep, _> =
            serde_json::from_value(json!({"name": "s1", "action": "a1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_step_result_shape() {
        let step = WorkflowStep::new("s2", "B", "a2");

        let ok = serde_json::to_value(StepResult::succeeded(&step, json!(7))).unwrap();
        assert_eq!(ok["agentId"], "B");
        assert_eq!(ok["result"], 7);
        assert!(ok.get("error").is_none());

        let failed = serde_json::to_value(StepResult::failed(&step, "boom")).unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["error"], "boom");
        assert!(failed.get("result").is_none());
    }
}
