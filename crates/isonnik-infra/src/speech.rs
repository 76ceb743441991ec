//! Speech through external programs configured as argv arrays.
//!
//! `speak` pipes text into the speak command's stdin and returns as soon as
//! the process is running, so a reply can be interrupted with `cancel`.
//! `capture` runs the capture command to completion and takes its trimmed
//! stdout as the transcript. `{lang}` in any argument is replaced with the
//! configured language tag.

use std::process::Stdio;

use isonnik_core::speech::SpeechEngine;
use isonnik_types::config::SpeechConfig;
use isonnik_types::error::SpeechError;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

pub struct CommandSpeech {
    speak: Option<Vec<String>>,
    capture: Option<Vec<String>>,
    language: String,
    current: Mutex<Option<Child>>,
}

impl CommandSpeech {
    pub fn from_config(config: &SpeechConfig) -> Self {
        Self {
            speak: config.speak_command.clone().filter(|argv| !argv.is_empty()),
            capture: config.capture_command.clone().filter(|argv| !argv.is_empty()),
            language: config.language.clone(),
            current: Mutex::new(None),
        }
    }

    fn command(&self, argv: &[String]) -> Result<Command, SpeechError> {
        let (program, args) = argv.split_first().ok_or(SpeechError::Unsupported)?;
        let mut command = Command::new(program);
        command.args(args.iter().map(|arg| arg.replace("{lang}", &self.language)));
        command.kill_on_drop(true);
        Ok(command)
    }
}

impl SpeechEngine for CommandSpeech {
    fn is_supported(&self) -> bool {
        self.speak.is_some() || self.capture.is_some()
    }

    async fn capture(&self) -> Result<Option<String>, SpeechError> {
        let argv = self.capture.as_deref().ok_or(SpeechError::Unsupported)?;
        let output = self
            .command(argv)?
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| SpeechError::Failed(format!("failed to run capture command: {e}")))?;

        if !output.status.success() {
            return Err(SpeechError::Failed(format!(
                "capture command exited with {}",
                output.status
            )));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!transcript.is_empty()).then_some(transcript))
    }

    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        let argv = self.speak.as_deref().ok_or(SpeechError::Unsupported)?;
        let mut child = self
            .command(argv)?
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SpeechError::Failed(format!("failed to start speak command: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| SpeechError::Failed(format!("failed to write to speak command: {e}")))?;
            // Dropping stdin closes the pipe so the program sees EOF.
        }

        let mut current = self.current.lock().await;
        if let Some(mut previous) = current.replace(child) {
            let _ = previous.start_kill();
        }
        Ok(())
    }

    async fn cancel(&self) -> Result<(), SpeechError> {
        let Some(mut child) = self.current.lock().await.take() else {
            return Ok(());
        };
        if child
            .try_wait()
            .map_err(|e| SpeechError::Failed(e.to_string()))?
            .is_some()
        {
            return Ok(());
        }
        child
            .kill()
            .await
            .map_err(|e| SpeechError::Failed(format!("failed to stop speech: {e}")))?;
        tracing::debug!("Speech interrupted");
        Ok(())
    }
}
