//! Interactive prompting capability
//!
//! The release pipeline never talks to a terminal directly; it goes through
//! this trait so CI runs and tests can swap in a non-interactive stub.

use crate::error::{Result, WorkflowError};

/// Capability interface for operator interaction
pub trait Prompter: Send + Sync {
    /// Ask a yes/no question.
    fn confirm(&self, prompt: &str) -> Result<bool>;

    /// Pick one option; returns the selected index.
    fn select_one(&self, prompt: &str, options: &[&str]) -> Result<usize>;

    /// Free-form text input (e.g. a one-time password).
    fn text_input(&self, prompt: &str) -> Result<String>;
}

/// Non-interactive prompter for CI runs and tests: confirms everything,
/// picks the first option, and fails any request for text input.
#[derive(Debug, Default)]
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }

    fn select_one(&self, _prompt: &str, _options: &[&str]) -> Result<usize> {
        Ok(0)
    }

    fn text_input(&self, prompt: &str) -> Result<String> {
        Err(WorkflowError::ValidationFailed(format!(
            "input required but running non-interactively: {}",
            prompt
        ))
        .into())
    }
}
