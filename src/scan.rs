use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, warn};

/// One log file, read in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub trace_folder: String,
    pub file_name: String,
    pub text: String,
}

impl LogEntry {
    pub fn new(
        trace_folder: impl Into<String>,
        file_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            trace_folder: trace_folder.into(),
            file_name: file_name.into(),
            text: text.into(),
        }
    }

    pub fn load(trace_folder: &str, path: &Path) -> Result<Self> {
        let bytes = fs::read(path)
            .with_context(|| format!("Unable to read log file {}", path.display()))?;
        Ok(Self {
            trace_folder: trace_folder.to_string(),
            file_name: file_name(path),
            text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

/// Reads every log file under `root/<trace>/`, trace folders and file names in
/// ascending order. Files that cannot be read are logged and skipped.
pub fn scan_output_dir(root: impl AsRef<Path>, extensions: &[String]) -> Result<Vec<LogEntry>> {
    let root = root.as_ref();
    let mut entries = Vec::new();
    for folder in sorted_children(root, |path| path.is_dir())? {
        let trace_folder = file_name(&folder);
        let logs = sorted_children(&folder, |path| {
            path.is_file() && has_log_extension(path, extensions)
        })?;
        debug!("{trace_folder}: {} log files", logs.len());
        for path in logs {
            match LogEntry::load(&trace_folder, &path) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!("Skipping {}: {err:#}", path.display()),
            }
        }
    }
    Ok(entries)
}

pub fn has_log_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

fn sorted_children(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let mut children: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Unable to read directory {}", dir.display()))?
        .filter_map(|entry| {
            entry.ok().and_then(|e| {
                let path = e.path();
                keep(path.as_path()).then_some(path)
            })
        })
        .collect();
    children.sort_by_key(|path| file_name(path));
    Ok(children)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
