//! Transcript writer.
//!
//! Persists the non-user messages of a run as `"{source}: {content}"` paragraphs separated
//! by blank lines. The file is truncated and rewritten on every call.

use std::io;
use std::path::Path;

use crate::parliament::group_chat::ChatMessage;

/// Render the transcript text without touching the filesystem.
pub fn render(messages: &[ChatMessage]) -> String {
    let mut script = String::new();
    for msg in messages.iter().filter(|msg| !msg.is_user()) {
        script.push_str(&msg.source);
        script.push_str(": ");
        script.push_str(&msg.content);
        script.push_str("\n\n");
    }
    script
}

/// Write the transcript to `path` and return how many messages were considered.
///
/// The count includes the filtered user message, which is what the run reports.
pub fn write(messages: &[ChatMessage], path: impl AsRef<Path>) -> io::Result<usize> {
    let path = path.as_ref();
    std::fs::write(path, render(messages))?;
    log::info!(
        "Script saved to {} ({} messages).",
        path.display(),
        messages.len()
    );
    Ok(messages.len())
}
