//! Terminal input and output used by the command handlers.

use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use secrecy::SecretString;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub trait Terminal {
    fn print(&mut self, text: &str);

    /// `None` when the user aborts the prompt (Ctrl-C / Ctrl-D).
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Like `read_line`, but the answer is kept out of history.
    fn read_secret(&mut self, prompt: &str) -> Result<Option<SecretString>>;

    /// Records an entered command for recall. No-op by default.
    fn add_history(&mut self, _line: &str) {}

    fn confirm(&mut self, question: &str) -> Result<bool> {
        let answer = self.read_line(&format!("{} (s/N) ", question))?;
        Ok(answer.map(|a| is_yes(&a)).unwrap_or(false))
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "s" | "si" | "sí" | "y" | "yes")
}

pub struct RustylineTerminal {
    editor: DefaultEditor,
}

impl RustylineTerminal {
    pub fn new() -> Result<Self> {
        Ok(Self { editor: DefaultEditor::new()? })
    }
}

impl Terminal for RustylineTerminal {
    fn print(&mut self, text: &str) {
        println!("{}", text);
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn read_secret(&mut self, prompt: &str) -> Result<Option<SecretString>> {
        Ok(self.read_line(prompt)?.map(SecretString::from))
    }

    fn add_history(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }
}

/// Answers prompts from a fixed script and records everything printed.
#[derive(Debug, Default)]
pub struct ScriptedTerminal {
    answers: VecDeque<String>,
    output: Arc<Mutex<String>>,
}

impl ScriptedTerminal {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { answers: answers.into_iter().map(Into::into).collect(), output: Arc::default() }
    }

    /// Handle to the transcript that stays valid after the terminal is boxed.
    pub fn transcript(&self) -> Transcript {
        Transcript(self.output.clone())
    }

    pub fn push_answer(&mut self, answer: impl Into<String>) {
        self.answers.push_back(answer.into());
    }

    fn record(&self, text: &str) {
        if let Ok(mut output) = self.output.lock() {
            output.push_str(text);
            output.push('\n');
        }
    }
}

impl Terminal for ScriptedTerminal {
    fn print(&mut self, text: &str) {
        self.record(text);
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let answer = self.answers.pop_front();
        self.record(&format!("{}{}", prompt, answer.as_deref().unwrap_or("")));
        Ok(answer)
    }

    fn read_secret(&mut self, prompt: &str) -> Result<Option<SecretString>> {
        let answer = self.answers.pop_front();
        self.record(prompt);
        Ok(answer.map(SecretString::from))
    }
}

#[derive(Debug, Clone)]
pub struct Transcript(Arc<Mutex<String>>);

impl Transcript {
    pub fn text(&self) -> String {
        self.0.lock().map(|t| t.clone()).unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.text().contains(needle)
    }

    pub fn clear(&self) {
        if let Ok(mut t) = self.0.lock() {
            t.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use test_case::test_case;

    #[test_case("s", true)]
    #[test_case(" Sí ", true)]
    #[test_case("yes", true)]
    #[test_case("n", false)]
    #[test_case("", false)]
    fn test_is_yes(answer: &str, expected: bool) {
        assert_eq!(is_yes(answer), expected);
    }

    #[test]
    fn test_scripted_terminal_records_and_answers() -> Result<()> {
        let mut terminal = ScriptedTerminal::new(["ana@x.com", "secreto", "s"]);
        let transcript = terminal.transcript();
        assert_eq!(terminal.read_line("Email: ")?.as_deref(), Some("ana@x.com"));
        let secret = terminal.read_secret("Contraseña: ")?;
        assert_eq!(secret.as_ref().map(|s| s.expose_secret().to_string()).as_deref(), Some("secreto"));
        assert!(terminal.confirm("¿Seguro?")?);
        assert!(!terminal.confirm("¿Otra vez?")?);
        terminal.print("hecho");

        let text = transcript.text();
        assert!(text.contains("Email: ana@x.com"));
        assert!(!text.contains("secreto"));
        assert!(text.ends_with("hecho\n"));
        Ok(())
    }
}
