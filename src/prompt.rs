// src/prompt.rs

//! Interactive input capability
//!
//! Anything in the library that needs an answer from the user goes
//! through the [`Prompter`] trait: the dependency confirmation, the
//! optional-group picker, the repository ambiguity picker, the update
//! and clean confirmations. The production implementation reads standard
//! input; tests supply a scripted implementation.

use crate::error::Result;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Source of interactive answers
pub trait Prompter {
    /// Print `prompt` and read one line, trimmed.
    fn input(&self, prompt: &str) -> Result<String>;

    /// Yes/no question; empty input and the usual yes spellings mean
    /// yes, everything else means no.
    fn confirm(&self, message: &str) -> Result<bool> {
        let answer = self.input(&format!("{message} [ (Y)es / (N)o ]: "))?;
        Ok(matches!(
            answer.to_lowercase().as_str(),
            "" | "y" | "yes" | "ye" | "yeah"
        ))
    }

    /// Numbered pick from `options` (displayed 1-based). Returns the
    /// selected index, or `None` for anything out of range or
    /// non-numeric.
    fn choose(&self, message: &str, options: &[String]) -> Result<Option<usize>> {
        let mut text = String::new();
        text.push_str(message);
        text.push('\n');
        for (i, opt) in options.iter().enumerate() {
            text.push_str(&format!(" [{}] {opt}\n", i + 1));
        }
        text.push_str("Selection: ");

        let answer = self.input(&text)?;
        match answer.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => Ok(Some(n - 1)),
            _ => Ok(None),
        }
    }
}

/// Production prompter backed by standard input
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn input(&self, prompt: &str) -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

/// Scripted prompter for tests: answers are popped in order, and an
/// exhausted script answers with the empty string (the default).
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<String>>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: RefCell::new(answers.into_iter().map(Into::into).collect()),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, _prompt: &str) -> Result<String> {
        Ok(self
            .answers
            .borrow_mut()
            .pop_front()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_answers_in_order() {
        let prompter = ScriptedPrompter::new(["a", "b"]);
        assert_eq!(prompter.input("?").unwrap(), "a");
        assert_eq!(prompter.input("?").unwrap(), "b");
        assert_eq!(prompter.input("?").unwrap(), "");
    }

    #[test]
    fn test_confirm_spellings() {
        for yes in ["", "y", "Y", "yes", "YES", "yeah"] {
            let prompter = ScriptedPrompter::new([yes]);
            assert!(prompter.confirm("proceed?").unwrap(), "{yes:?}");
        }
        for no in ["n", "no", "never", "x"] {
            let prompter = ScriptedPrompter::new([no]);
            assert!(!prompter.confirm("proceed?").unwrap(), "{no:?}");
        }
    }

    #[test]
    fn test_choose_valid_and_invalid() {
        let options = vec!["one".to_string(), "two".to_string()];

        let prompter = ScriptedPrompter::new(["2"]);
        assert_eq!(prompter.choose("pick", &options).unwrap(), Some(1));

        for bad in ["0", "3", "abc", ""] {
            let prompter = ScriptedPrompter::new([bad]);
            assert_eq!(prompter.choose("pick", &options).unwrap(), None, "{bad:?}");
        }
    }
}
