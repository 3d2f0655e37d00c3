//! Local scratch directories for raw downloads and transcoded output.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::settings::StagingConfig;
use crate::modules::video::model::VideoRequest;

/// Local file locations owned by a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub raw: PathBuf,
    pub processed: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LocalStaging {
    config: StagingConfig,
}

impl LocalStaging {
    pub fn new(config: StagingConfig) -> Self {
        Self { config }
    }

    pub fn raw_dir(&self) -> &Path {
        &self.config.raw_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.config.processed_dir
    }

    /// Creates both roots, including missing parents. Safe to call repeatedly.
    pub async fn ensure_directories(&self) -> io::Result<()> {
        for dir in [&self.config.raw_dir, &self.config.processed_dir] {
            if !fs::try_exists(dir).await? {
                fs::create_dir_all(dir).await?;
                info!(path = %dir.display(), "Directory created");
            }
        }
        Ok(())
    }

    /// File names are prefixed with the job id so concurrent jobs for the
    /// same video never touch each other's files.
    pub fn job_paths(&self, job_id: Uuid, request: &VideoRequest) -> JobPaths {
        JobPaths {
            raw: self
                .config
                .raw_dir
                .join(format!("{}-{}", job_id, request.input)),
            processed: self
                .config
                .processed_dir
                .join(format!("{}-{}", job_id, request.output)),
        }
    }

    /// Removes `path` if it exists. Returns whether a file was removed.
    pub async fn delete_if_present(&self, path: &Path) -> io::Result<bool> {
        match fs::remove_file(path).await {
            Ok(()) => {
                info!(path = %path.display(), "File deleted");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "File not found, skipping the delete");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
