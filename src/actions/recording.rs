//! In-memory runner

use super::{RunContext, Runner, RunnerError};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Runner that keeps everything in memory.
///
/// Backs offline resolution and tests: inputs and context are fixed up
/// front, exports, outputs, masks and failures are recorded for inspection.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    context: RunContext,
    inputs: HashMap<String, String>,
    exported: Mutex<IndexMap<String, String>>,
    outputs: Mutex<IndexMap<String, String>>,
    masks: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, event_name: &str, repository: &str, git_ref: &str) -> Self {
        self.context = RunContext {
            event_name: event_name.to_string(),
            repository: repository.to_string(),
            git_ref: git_ref.to_string(),
        };
        self
    }

    pub fn with_input(mut self, name: &str, value: impl Into<String>) -> Self {
        self.inputs.insert(name.to_lowercase(), value.into());
        self
    }

    pub fn exported(&self) -> IndexMap<String, String> {
        self.exported.lock().clone()
    }

    pub fn outputs(&self) -> IndexMap<String, String> {
        self.outputs.lock().clone()
    }

    pub fn masks(&self) -> Vec<String> {
        self.masks.lock().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }
}

impl Runner for RecordingRunner {
    fn context(&self) -> RunContext {
        self.context.clone()
    }

    fn input(&self, name: &str) -> Option<String> {
        self.inputs
            .get(&name.to_lowercase())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn export_variable(&self, name: &str, value: &str) -> Result<(), RunnerError> {
        self.exported
            .lock()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn set_output(&self, name: &str, value: &str) -> Result<(), RunnerError> {
        self.outputs.lock().insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn add_mask(&self, value: &str) {
        self.masks.lock().push(value.to_string());
    }

    fn set_failed(&self, message: &str) {
        self.failures.lock().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_everything() {
        let runner = RecordingRunner::new()
            .with_context("push", "org/repo", "refs/heads/main")
            .with_input("Multi-Account", "true")
            .with_input("name", " ");

        assert!(runner.bool_input("multi-account"));
        assert_eq!(runner.input("name"), None);

        runner.export_variable("A", "1").unwrap();
        runner.export_variable("A", "2").unwrap();
        runner.set_output("out", "x").unwrap();
        runner.set_failed("boom");

        assert_eq!(runner.exported()["A"], "2");
        assert_eq!(runner.outputs()["out"], "x");
        assert_eq!(runner.failures(), vec!["boom"]);
        assert_eq!(runner.context().repo(), "repo");
    }
}
