//! Voice input/output as an injected capability.
//!
//! The core never talks to an audio stack. It asks a [`SpeechEngine`] for
//! a transcript or hands it text to read aloud; [`NoSpeech`] stands in on
//! devices without one.

use isonnik_types::chat::Message;
use isonnik_types::error::SpeechError;

use crate::text::strip_for_speech;

pub trait SpeechEngine: Send + Sync {
    fn is_supported(&self) -> bool;

    /// Record one utterance. `None` when nothing was recognized.
    fn capture(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<String>, SpeechError>> + Send;

    fn speak(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), SpeechError>> + Send;

    /// Stop whatever is currently being spoken. No-op when idle.
    fn cancel(&self) -> impl std::future::Future<Output = Result<(), SpeechError>> + Send;
}

/// The unsupported variant.
pub struct NoSpeech;

impl SpeechEngine for NoSpeech {
    fn is_supported(&self) -> bool {
        false
    }

    async fn capture(&self) -> Result<Option<String>, SpeechError> {
        Err(SpeechError::Unsupported)
    }

    async fn speak(&self, _text: &str) -> Result<(), SpeechError> {
        Err(SpeechError::Unsupported)
    }

    async fn cancel(&self) -> Result<(), SpeechError> {
        Ok(())
    }
}

/// Read a message aloud, interrupting any utterance already playing.
pub async fn speak_message<E: SpeechEngine>(
    engine: &E,
    message: &Message,
) -> Result<(), SpeechError> {
    if !engine.is_supported() {
        return Err(SpeechError::Unsupported);
    }
    engine.cancel().await?;

    let text = strip_for_speech(&message.text);
    if text.is_empty() {
        return Ok(());
    }
    engine.speak(&text).await
}
