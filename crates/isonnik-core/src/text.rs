//! Cleanup of server/AI text for display and for speech synthesis.
//!
//! Both functions are pure and idempotent.

/// Markdown-style emphasis characters removed from every reply.
pub const EMPHASIS_CHARS: [char; 6] = ['*', '_', '`', '~', '/', '\\'];

/// Normalize raw reply text for display.
///
/// Literal `\n` / `\r\n` escape sequences become newlines, emphasis
/// characters are dropped, remaining CRLF/CR line endings collapse to `\n`,
/// and surrounding whitespace is trimmed. Escapes are expanded before the
/// backslash is stripped; line endings are unified after stripping so that
/// removing a character can never leave a fresh `\r\n` behind.
pub fn normalize(raw: &str) -> String {
    let unescaped = raw.replace("\\r\\n", "\n").replace("\\n", "\n");
    let stripped = strip_emphasis(&unescaped);
    stripped
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .trim()
        .to_string()
}

/// Strip emphasis characters before handing text to a speech engine.
///
/// No escape handling: synthesis only needs the characters gone.
pub fn strip_for_speech(text: &str) -> String {
    strip_emphasis(text).trim().to_string()
}

fn strip_emphasis(text: &str) -> String {
    text.chars().filter(|c| !EMPHASIS_CHARS.contains(c)).collect()
}
