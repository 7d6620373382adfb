//! Shared test doubles.

use poison_game::{DecisionBackend, LlmError, ThinkingMode};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted collaborator step.
pub enum Step {
    /// Transport succeeds with this raw content.
    Reply(String),
    /// Transport fails with this error message.
    Fail(String),
}

impl Step {
    /// A well-formed reply with a rationale.
    pub fn coord(x: u8, y: u8) -> Self {
        Step::Reply(format!(
            "{{\"analyse\": \"scripted\", \"x\": {}, \"y\": {}}}",
            x, y
        ))
    }
}

/// A collaborator that plays back a fixed script, then fails.
pub struct ScriptedBackend {
    steps: Mutex<VecDeque<Step>>,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
        }
    }
}

#[async_trait::async_trait]
impl DecisionBackend for ScriptedBackend {
    async fn propose(
        &self,
        _system_prompt: &str,
        _thinking: ThinkingMode,
    ) -> Result<String, LlmError> {
        match self.steps.lock().unwrap().pop_front() {
            Some(Step::Reply(content)) => Ok(content),
            Some(Step::Fail(message)) => Err(LlmError::new(message)),
            None => Err(LlmError::new("script exhausted".to_string())),
        }
    }
}

/// A collaborator whose transport always fails, forcing the fallback path.
pub struct FailingBackend;

#[async_trait::async_trait]
impl DecisionBackend for FailingBackend {
    async fn propose(
        &self,
        _system_prompt: &str,
        _thinking: ThinkingMode,
    ) -> Result<String, LlmError> {
        Err(LlmError::new("simulated transport error".to_string()))
    }
}
