//! User interaction for parcopy
//!
//! This module provides the prompts the tool needs before doing anything
//! destructive or ambiguous: reusing an existing output directory, choosing
//! the split column, and asking for a password when none was supplied.
//!
//! All of it sits behind the [`Prompter`] trait so the export pipeline can
//! be driven headless (tests, scripting) with a canned implementation.

use std::io::{self, Write};

use crate::error::{ParcopyError, Result};

/// Interactive capabilities required by the export pipeline
pub trait Prompter: Send + Sync {
    /// Ask the user a yes/no question. An empty answer means yes.
    fn confirm(&self, message: &str) -> Result<bool>;

    /// Ask the user to pick one of `choices`, with an optional default.
    fn select(&self, message: &str, choices: &[String], preferred: Option<&str>) -> Result<String>;

    /// Read a secret value (not persisted, not logged).
    fn secret(&self, message: &str) -> Result<String>;
}

/// Prompter backed by stdin/stdout
pub struct TerminalPrompter;

impl TerminalPrompter {
    fn read_line() -> Result<String> {
        let mut input = String::new();
        io::stdin()
            .read_line(&mut input)
            .map_err(|e| ParcopyError::Generic(format!("Failed to read input: {e}")))?;
        Ok(input.trim().to_string())
    }

    fn flush_prompt(prompt: &str) -> Result<()> {
        print!("{prompt}");
        io::stdout()
            .flush()
            .map_err(|e| ParcopyError::Generic(format!("Failed to flush stdout: {e}")))
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&self, message: &str) -> Result<bool> {
        println!("{message}");
        loop {
            Self::flush_prompt("   Continue? (Y/n): ")?;
            let input = Self::read_line()?.to_lowercase();
            match input.as_str() {
                "" | "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => println!("Please input Y or N."),
            }
        }
    }

    fn select(&self, message: &str, choices: &[String], preferred: Option<&str>) -> Result<String> {
        // Fall back to the first choice when no preferred default exists.
        let default = preferred
            .filter(|p| choices.iter().any(|c| c == p))
            .unwrap_or_else(|| choices[0].as_str());

        println!("{message}");
        for (i, choice) in choices.iter().enumerate() {
            if choice == default {
                println!("  {}) {} (default)", i + 1, choice);
            } else {
                println!("  {}) {}", i + 1, choice);
            }
        }

        loop {
            Self::flush_prompt(&format!("Select [{default}]: "))?;
            let input = Self::read_line()?;

            if input.is_empty() {
                return Ok(default.to_string());
            }
            if let Ok(index) = input.parse::<usize>()
                && index >= 1
                && index <= choices.len()
            {
                return Ok(choices[index - 1].clone());
            }
            if let Some(choice) = choices.iter().find(|c| **c == input) {
                return Ok(choice.clone());
            }
            println!("Please select one of the listed columns.");
        }
    }

    fn secret(&self, message: &str) -> Result<String> {
        Self::flush_prompt(&format!("{message}: "))?;
        Self::read_line()
    }
}

/// Prompter with canned answers, for headless runs and tests
#[cfg(test)]
pub struct ScriptedPrompter {
    pub confirm_answer: bool,
    pub selection: Option<String>,
    pub secret_answer: String,
}

#[cfg(test)]
impl Prompter for ScriptedPrompter {
    fn confirm(&self, _message: &str) -> Result<bool> {
        Ok(self.confirm_answer)
    }

    fn select(&self, _message: &str, choices: &[String], preferred: Option<&str>) -> Result<String> {
        if let Some(ref choice) = self.selection {
            return Ok(choice.clone());
        }
        Ok(preferred
            .map(|p| p.to_string())
            .unwrap_or_else(|| choices[0].clone()))
    }

    fn secret(&self, _message: &str) -> Result<String> {
        Ok(self.secret_answer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_prompter_select_uses_preferred() {
        let prompter = ScriptedPrompter {
            confirm_answer: true,
            selection: None,
            secret_answer: String::new(),
        };
        let choices = vec!["id".to_string(), "amount".to_string()];
        let picked = prompter.select("pick", &choices, Some("amount")).unwrap();
        assert_eq!(picked, "amount");
    }

    #[test]
    fn test_scripted_prompter_explicit_selection_wins() {
        let prompter = ScriptedPrompter {
            confirm_answer: false,
            selection: Some("id".to_string()),
            secret_answer: String::new(),
        };
        let choices = vec!["id".to_string(), "amount".to_string()];
        let picked = prompter.select("pick", &choices, Some("amount")).unwrap();
        assert_eq!(picked, "id");
        assert!(!prompter.confirm("sure?").unwrap());
    }
}
