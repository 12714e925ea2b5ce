//! Operator interaction seam.
//!
//! Library flows never touch the terminal directly; they ask a [`Prompter`].
//! The CLI supplies a terminal implementation, tests a scripted one.

use swarmdeploy_shared::{DeployError, DeployResult};

pub trait Prompter: Send {
    fn confirm(&mut self, prompt: &str, default: bool) -> DeployResult<bool>;

    fn input(&mut self, prompt: &str, default: Option<&str>) -> DeployResult<String>;

    /// Hidden input; with `confirm` the value is asked twice and must match.
    fn password(&mut self, prompt: &str, confirm: bool) -> DeployResult<String>;

    /// Index of the chosen item.
    fn select(&mut self, prompt: &str, items: &[&str], default: usize) -> DeployResult<usize>;

    /// Informational line shown to the operator.
    fn message(&mut self, text: &str);
}

/// Answers every question without asking.
///
/// Confirmations resolve to `assume_yes` (or the prompt's default when
/// `assume_yes` is false), inputs and selections to their defaults. Anything
/// without a default is an error, as is every password prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive {
    pub assume_yes: bool,
}

impl Prompter for NonInteractive {
    fn confirm(&mut self, _prompt: &str, default: bool) -> DeployResult<bool> {
        Ok(self.assume_yes || default)
    }

    fn input(&mut self, prompt: &str, default: Option<&str>) -> DeployResult<String> {
        default.map(str::to_string).ok_or_else(|| {
            DeployError::InvalidInput(format!("'{}' needs a value in non-interactive mode", prompt))
        })
    }

    fn password(&mut self, prompt: &str, _confirm: bool) -> DeployResult<String> {
        Err(DeployError::InvalidInput(format!(
            "'{}' cannot be answered in non-interactive mode",
            prompt
        )))
    }

    fn select(&mut self, _prompt: &str, _items: &[&str], default: usize) -> DeployResult<usize> {
        Ok(default)
    }

    fn message(&mut self, text: &str) {
        tracing::info!("{}", text);
    }
}
