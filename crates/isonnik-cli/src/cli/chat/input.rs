//! Async line input for the chat loop.

use rustyline_async::{Readline, ReadlineError, ReadlineEvent, SharedWriter};

#[derive(Debug)]
pub enum InputEvent {
    /// A submitted line, already trimmed.
    Message(String),
    /// Ctrl+D, or the terminal went away.
    Eof,
    /// Ctrl+C.
    Interrupted,
}

pub struct ChatInput {
    rl: Readline,
    prompt: String,
}

impl ChatInput {
    /// Returns the handler and a writer that prints above the prompt.
    pub fn new(prompt: String) -> Result<(Self, SharedWriter), ReadlineError> {
        let (rl, writer) = Readline::new(prompt.clone())?;
        Ok((Self { rl, prompt }, writer))
    }

    /// Ask a yes/no question on the prompt line. Anything but y/yes is no.
    pub async fn confirm(&mut self, question: &str) -> bool {
        let _ = self.rl.update_prompt(&format!("  {question} [y/N] "));
        let answer = match self.rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => is_yes(&line),
            _ => false,
        };
        let _ = self.rl.update_prompt(&self.prompt);
        answer
    }

    pub async fn read_line(&mut self) -> InputEvent {
        match self.rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => {
                let trimmed = line.trim().to_string();
                if !trimmed.is_empty() {
                    self.rl.add_history_entry(trimmed.clone());
                }
                InputEvent::Message(trimmed)
            }
            Ok(ReadlineEvent::Eof) => InputEvent::Eof,
            Ok(ReadlineEvent::Interrupted) => InputEvent::Interrupted,
            Err(_) => InputEvent::Eof,
        }
    }

    pub fn clear(&mut self) {
        let _ = self.rl.clear();
    }

    /// Restore the terminal before the process prints anything else.
    pub fn flush(&mut self) {
        let _ = self.rl.flush();
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
