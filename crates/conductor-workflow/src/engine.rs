//! Workflow execution engine.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use conductor_models::{StepResult, WorkflowContext, WorkflowOutcome, WorkflowStep};

use crate::caller::AgentCaller;
use crate::error::{Result, WorkflowError};

/// Key under which the shared context is injected into step params.
pub const CONTEXT_PARAM: &str = "context";

/// Runs workflows step by step against an [`AgentCaller`].
#[derive(Clone)]
pub struct WorkflowEngine {
    caller: Arc<dyn AgentCaller>,
}

impl WorkflowEngine {
    /// Creates an engine.
    pub fn new(caller: Arc<dyn AgentCaller>) -> Self {
        Self { caller }
    }

    /// Rejects steps without an agent or action.
    pub fn validate(steps: &[WorkflowStep]) -> Result<()> {
        for (index, step) in steps.iter().enumerate() {
            let field = if step.agent_id.trim().is_empty() {
                "agentId"
            } else if step.action.trim().is_empty() {
                "action"
            } else {
                continue;
            };
            return Err(WorkflowError::InvalidStep {
                index,
                name: step.name.clone(),
                field,
            });
        }
        Ok(())
    }

    /// Validates and runs a workflow.
    ///
    /// Steps run strictly in order. A failed step is recorded and, unless it
    /// opted out with `stopOnError: false`, ends the run; later agents are
    /// never contacted.
    pub async fn execute(&self, steps: &[WorkflowStep]) -> Result<WorkflowOutcome> {
        Self::validate(steps)?;

        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, steps = steps.len(), "workflow started");

        let mut context = WorkflowContext::new();
        let mut results = Vec::with_capacity(steps.len());

        for step in steps {
            let params = step_params(step, &context);
            debug!(
                run_id = %run_id,
                step = %step.name,
                agent_id = %step.agent_id,
                action = %step.action,
                "running step"
            );

            match self.caller.execute(&step.agent_id, &step.action, params).await {
                Ok(result) => {
                    if let Some(var) = &step.output_var {
                        context.insert(var.clone(), result.clone());
                    }
                    results.push(StepResult::succeeded(step, result));
                }
                Err(e) => {
                    warn!(
                        run_id = %run_id,
                        step = %step.name,
                        agent_id = %step.agent_id,
                        error = %e,
                        "step failed"
                    );
                    results.push(StepResult::failed(step, e.to_string()));
                    if step.stop_on_error {
                        info!(run_id = %run_id, step = %step.name, "workflow halted");
                        break;
                    }
                }
            }
        }

        let outcome = WorkflowOutcome { results, context };
        info!(
            run_id = %run_id,
            executed = outcome.results.len(),
            succeeded = outcome.all_succeeded(),
            "workflow completed"
        );
        Ok(outcome)
    }
}

/// The step's own params with the current context on top.
fn step_params(step: &WorkflowStep, context: &WorkflowContext) -> Value {
    let mut params = step.params.clone();
    params.insert(CONTEXT_PARAM.to_string(), Value::Object(context.clone()));
    Value::Object(params)
}
