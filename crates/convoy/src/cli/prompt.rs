//! Terminal prompter
//!
//! dialoguer-backed implementation of the core prompting capability; the
//! release pipeline itself never touches the terminal.

use dialoguer::{Confirm, Input, Select};

use convoy_core::error::{Result, WorkflowError};
use convoy_core::prompt::Prompter;

/// Prompter rendering real terminal prompts
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
            .map_err(prompt_failed)
    }

    fn select_one(&self, prompt: &str, options: &[&str]) -> Result<usize> {
        Select::new()
            .with_prompt(prompt)
            .items(options)
            .default(0)
            .interact()
            .map_err(prompt_failed)
    }

    fn text_input(&self, prompt: &str) -> Result<String> {
        Input::new()
            .with_prompt(prompt)
            .interact_text()
            .map_err(prompt_failed)
    }
}

fn prompt_failed(e: dialoguer::Error) -> convoy_core::error::ConvoyError {
    WorkflowError::ValidationFailed(format!("prompt failed: {}", e)).into()
}
