//! Interactive list prompt on the controlling terminal

use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use tailgate_common::error::DispatchError;
use tailgate_common::ActionPrompt;

/// Asks on stdout, reads the answer from stdin
pub struct TerminalPrompt;

#[async_trait]
impl ActionPrompt for TerminalPrompt {
    async fn choose(
        &self,
        question: &str,
        choices: &[&str],
        default: &str,
    ) -> Result<String, DispatchError> {
        let question = question.to_string();
        let choices: Vec<String> = choices.iter().map(|c| c.to_string()).collect();
        let default = default.to_string();

        tokio::task::spawn_blocking(move || {
            let stdin = io::stdin();
            let stdout = io::stdout();
            read_choice(&mut stdin.lock(), &mut stdout.lock(), &question, &choices, &default)
        })
        .await
        .map_err(|e| DispatchError::Prompt(e.to_string()))?
        .map_err(|e| DispatchError::Prompt(e.to_string()))
    }
}

/// Ask until the answer names one of `choices`, by number or by name.
/// An empty answer picks `default`.
fn read_choice<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    choices: &[String],
    default: &str,
) -> io::Result<String> {
    writeln!(output, "{}", question.bold())?;
    for (idx, choice) in choices.iter().enumerate() {
        let marker = if choice == default { " (default)" } else { "" };
        writeln!(output, "  {}) {}{}", idx + 1, choice, marker.dimmed())?;
    }

    loop {
        write!(output, "Enter your choice [{}]: ", default)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no answer on stdin",
            ));
        }

        let answer = line.trim();
        if answer.is_empty() {
            return Ok(default.to_string());
        }
        if let Some(choice) = choices.iter().find(|c| c.as_str() == answer) {
            return Ok(choice.clone());
        }
        if let Some(choice) = answer
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| choices.get(idx))
        {
            return Ok(choice.clone());
        }

        writeln!(output, "Invalid choice. Please enter 1-{} or a name.", choices.len())?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices() -> Vec<String> {
        ["logout", "status", "netcheck", "whois"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    fn ask(answers: &str) -> io::Result<String> {
        let mut input = io::Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        read_choice(&mut input, &mut output, "Which?", &choices(), "logout")
    }

    #[test]
    fn test_empty_answer_takes_default() {
        assert_eq!(ask("\n").unwrap(), "logout");
    }

    #[test]
    fn test_answer_by_name_or_number() {
        assert_eq!(ask("netcheck\n").unwrap(), "netcheck");
        assert_eq!(ask("  whois  \n").unwrap(), "whois");
        assert_eq!(ask("2\n").unwrap(), "status");
    }

    #[test]
    fn test_invalid_answers_are_asked_again() {
        assert_eq!(ask("reboot\n0\n9\n4\n").unwrap(), "whois");
    }

    #[test]
    fn test_eof_is_an_error() {
        let err = ask("nope\n").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
