//! Terminal prompts backed by `dialoguer`.

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};
use swarmdeploy::prompt::Prompter;
use swarmdeploy::{DeployError, DeployResult};

pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

fn aborted(e: dialoguer::Error) -> DeployError {
    DeployError::Aborted(format!("prompt closed: {}", e))
}

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, prompt: &str, default: bool) -> DeployResult<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(aborted)
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> DeployResult<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(aborted)
    }

    fn password(&mut self, prompt: &str, confirm: bool) -> DeployResult<String> {
        let mut password = Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty_password(true);
        if confirm {
            password = password.with_confirmation("Repeat", "The values do not match");
        }
        password.interact().map_err(aborted)
    }

    fn select(&mut self, prompt: &str, items: &[&str], default: usize) -> DeployResult<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .map_err(aborted)
    }

    fn message(&mut self, text: &str) {
        eprintln!("{}", style(text).cyan());
    }
}
