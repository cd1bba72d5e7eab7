//! On-disk copies of file versions handed to external programs.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::GitError;
use crate::git::{COMMIT_WD, Vcs};

const DEV_NULL: &str = "/dev/null";

/// A file version an external viewer or diff program can open.
///
/// Historical versions are written to a temporary file that is removed when
/// the value is dropped.
#[derive(Debug)]
pub enum ReviewFile {
    /// The live file in the working tree, opened in place.
    WorkingTree(PathBuf),
    Temp(NamedTempFile),
    /// The missing side of an added or deleted file.
    DevNull,
}

impl ReviewFile {
    /// Materialize `path` as of `commit`, which must already be expanded.
    pub fn materialize(vcs: &dyn Vcs, commit: &str, path: &str) -> Result<Self, GitError> {
        if commit == COMMIT_WD {
            let root = vcs
                .working_dir()
                .ok_or_else(|| GitError::NoWorkingDir("repository".to_string()))?;
            return Ok(ReviewFile::WorkingTree(root.join(path)));
        }

        let contents = vcs.blob_contents(commit, path)?;
        let basename = path.rsplit('/').next().unwrap_or(path);
        let user = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
        let mut file = tempfile::Builder::new()
            .prefix(&format!("git-review-{user}-"))
            .suffix(&format!("-{basename}"))
            .tempfile()?;
        file.write_all(&contents)?;
        file.flush()?;
        debug!(commit, path, temp = %file.path().display(), "materialized file");
        Ok(ReviewFile::Temp(file))
    }

    pub fn path(&self) -> &Path {
        match self {
            ReviewFile::WorkingTree(path) => path,
            ReviewFile::Temp(file) => file.path(),
            ReviewFile::DevNull => Path::new(DEV_NULL),
        }
    }
}
