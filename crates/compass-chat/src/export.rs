//! Transcript export.
//!
//! Plain text transcripts label each message with its speaker and separate
//! messages with a dashed rule. JSON exports serialize the full messages.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use compass_core::config::ExportFormat;

use crate::error::ChatError;
use crate::types::{ChatMessage, MessageRole};

const MESSAGE_SEPARATOR: &str = "\n\n-----------------------\n\n";
const USER_LABEL: &str = "You";
const FILE_PREFIX: &str = "strategic-compass-chat";

/// Render messages as a plain text transcript.
pub fn render_transcript(messages: &[ChatMessage], assistant_label: &str) -> String {
    messages
        .iter()
        .map(|m| {
            let speaker = match m.role {
                MessageRole::User => USER_LABEL,
                MessageRole::Assistant => assistant_label,
            };
            format!("{}: {}", speaker, m.content)
        })
        .collect::<Vec<_>>()
        .join(MESSAGE_SEPARATOR)
}

/// Render messages as a pretty-printed JSON array.
pub fn render_json(messages: &[ChatMessage]) -> Result<String, ChatError> {
    Ok(serde_json::to_string_pretty(messages)?)
}

/// `strategic-compass-chat-YYYY-MM-DD.<ext>`
pub fn export_file_name(date: NaiveDate, format: ExportFormat) -> String {
    format!(
        "{}-{}.{}",
        FILE_PREFIX,
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Write the transcript into `dir`, creating it if needed.
///
/// An existing file for the same date and format is overwritten.
pub fn write_transcript(
    dir: &Path,
    messages: &[ChatMessage],
    format: ExportFormat,
    assistant_label: &str,
    date: NaiveDate,
) -> Result<PathBuf, ChatError> {
    if messages.is_empty() {
        return Err(ChatError::Export("conversation is empty".to_string()));
    }

    let content = match format {
        ExportFormat::Text => render_transcript(messages, assistant_label),
        ExportFormat::Json => render_json(messages)?,
    };

    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(date, format));
    std::fs::write(&path, content)?;

    info!(
        path = %path.display(),
        messages = messages.len(),
        "Transcript exported"
    );
    Ok(path)
}
