//! Working directories and temporary file cleanup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::settings::{OutputConfig, PrivacyConfig};

/// Name of the sample cover letter written next to the dashboard.
pub const SAMPLE_LETTER_FILE: &str = "sample_cover_letter_template.txt";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Directories and temp files of one run, resolved against a base directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    output_dir: PathBuf,
    data_dir: PathBuf,
    temp_files: Vec<PathBuf>,
    clean_temp_files: bool,
}

impl Workspace {
    pub fn new(base_dir: &Path, output: &OutputConfig, privacy: &PrivacyConfig) -> Self {
        Self {
            output_dir: base_dir.join(&output.output_dir),
            data_dir: base_dir.join(&output.data_dir),
            temp_files: privacy.temp_files.iter().map(|f| base_dir.join(f)).collect(),
            clean_temp_files: privacy.clean_temp_files,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Create the data and output directories.
    pub fn prepare(&self) -> Result<(), WorkspaceError> {
        for dir in [&self.data_dir, &self.output_dir] {
            fs::create_dir_all(dir).map_err(|source| WorkspaceError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Write a file into the output directory.
    pub fn write_output(&self, name: &str, content: &str) -> Result<PathBuf, WorkspaceError> {
        let path = self.output_dir.join(name);
        fs::write(&path, content).map_err(|source| WorkspaceError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Remove configured temp files. Returns the files actually removed.
    ///
    /// Does nothing when cleanup is disabled. Missing files are skipped and
    /// removal failures are logged rather than returned, since cleanup runs
    /// on the error path too.
    pub fn cleanup(&self) -> Vec<PathBuf> {
        if !self.clean_temp_files {
            return Vec::new();
        }

        let mut removed = Vec::new();
        for file in &self.temp_files {
            match fs::remove_file(file) {
                Ok(()) => {
                    tracing::debug!("Removed temp file {}", file.display());
                    removed.push(file.clone());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Could not remove {}: {}", file.display(), e),
            }
        }
        removed
    }
}
