//! Directory-scan task source.

use std::ffi::OsStr;
use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use super::{Task, TaskOrigin};
use crate::error::ConfigurationError;
use crate::runner::Strategy;

/// Lists level files directly inside `directory` whose name starts with
/// `prefix`, sorted by file name.
pub fn scan(
    directory: &Path,
    prefix: &str,
    extension: &str,
    strategy: Strategy,
) -> Result<Vec<Task>, ConfigurationError> {
    if !directory.is_dir() {
        return Err(ConfigurationError::MissingArtifact {
            path: directory.to_path_buf(),
            hint: "levels directory does not exist".to_string(),
        });
    }

    let mut tasks = Vec::new();
    for entry in WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| ConfigurationError::Io(e.into()))?;
        let path = entry.path();

        if !entry.file_type().is_file() || path.extension() != Some(OsStr::new(extension)) {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(OsStr::to_str) else {
            debug!(path = %path.display(), "Skipping non-UTF-8 file name");
            continue;
        };
        if !file_name.starts_with(prefix) {
            continue;
        }

        let instance_id = path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or(file_name)
            .to_string();

        tasks.push(Task {
            instance_id,
            instance_path: Some(path.to_path_buf()),
            strategy,
            origin: TaskOrigin::DirectoryScan {
                directory: directory.to_path_buf(),
            },
        });
    }

    if tasks.is_empty() {
        return Err(ConfigurationError::EmptyTaskSource {
            directory: directory.to_path_buf(),
            prefix: prefix.to_string(),
        });
    }

    info!(
        count = tasks.len(),
        directory = %directory.display(),
        prefix = prefix,
        "Discovered levels"
    );
    Ok(tasks)
}
