//! Export of finished batches.
//!
//! Three sinks read a frozen [`crate::runner::BatchResult`]: the Markdown
//! report, the JSON record and the task-table write-back.

pub mod json;
pub mod markdown;
pub mod writeback;

use std::path::Path;

use crate::error::ExportError;

pub use json::write_json;
pub use markdown::{render_markdown, write_report};
pub use writeback::write_back;

/// Writes `contents` to `path`, creating missing parent directories.
pub(crate) fn write_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    let to_error = |source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(to_error)?;
    }
    std::fs::write(path, contents).map_err(to_error)
}
