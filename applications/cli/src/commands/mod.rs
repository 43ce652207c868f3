//! Subcommand implementations

pub mod play;
pub mod scan;
pub mod tags;

use std::path::Path;
use std::time::Duration;

/// Final path component for display
pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `m:ss` rendering of a duration
pub(crate) fn format_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(d) => {
            let secs = d.as_secs();
            format!("{}:{:02}", secs / 60, secs % 60)
        }
        None => "?:??".to_string(),
    }
}
