//! Utility functions for task descriptions and path manipulation

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Summarize an argument record as `key=value` pairs joined by `", "`
///
/// The record is serialized with serde; struct fields and map entries become
/// pairs in serialization order. String values are written without quotes and
/// every other value as compact JSON. Records that do not serialize to an
/// object (unit, tuples, scalars) are rendered as a single value, and `()`
/// renders as an empty string.
///
/// # Examples
///
/// ```
/// use crawl_tasks::utils::format_kwargs;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Args { slug: String, depth: u32 }
///
/// let s = format_kwargs(&Args { slug: "ml".to_string(), depth: 2 });
/// assert_eq!(s, "slug=ml, depth=2");
/// ```
pub fn format_kwargs<A: Serialize + ?Sized>(args: &A) -> String {
    match serde_json::to_value(args) {
        Ok(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(k, v)| format!("{k}={}", format_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
        Ok(serde_json::Value::Null) => String::new(),
        Ok(other) => format_value(&other),
        Err(e) => {
            tracing::debug!(error = %e, "Failed to serialize task arguments for description");
            String::new()
        }
    }
}

fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Replace the extension of a file name
///
/// An empty `ext` removes the extension.
///
/// # Examples
///
/// ```
/// use crawl_tasks::utils::change_ext;
/// use std::path::Path;
///
/// assert_eq!(change_ext(Path::new("lecture.mp4"), "srt"), Path::new("lecture.srt"));
/// assert_eq!(change_ext(Path::new("notes.html"), ""), Path::new("notes"));
/// ```
pub fn change_ext(path: &Path, ext: &str) -> PathBuf {
    path.with_extension(ext)
}
