//! Repository access.
//!
//! The review session only talks to the repository through the [`Vcs`]
//! trait. [`GitRepo`] implements it on top of libgit2; tests substitute an
//! in-memory implementation.

#[cfg(test)]
pub(crate) mod fake;
pub mod repo;
pub mod types;

use std::path::Path;

pub use repo::GitRepo;
pub use types::{
    BlobInfo, COMMIT_HEAD, COMMIT_INDEX, COMMIT_WD, DiffEntry, DiffFileList, MERGE_STAGES,
    NULL_SHA1, ObjectType, Status, TreeEntry, is_pseudo_commit, split_rev_name,
};

use crate::errors::GitError;

/// What a command-line name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Revision,
    Path,
    /// Both a revision and a file in the working tree.
    Ambiguous,
    Neither,
}

impl NameKind {
    pub fn from_flags(is_rev: bool, is_path: bool) -> Self {
        match (is_rev, is_path) {
            (true, true) => NameKind::Ambiguous,
            (true, false) => NameKind::Revision,
            (false, true) => NameKind::Path,
            (false, false) => NameKind::Neither,
        }
    }

    /// `Ok(true)` for a revision, `Ok(false)` for a path.
    pub fn into_result(self, name: &str) -> Result<bool, GitError> {
        let reason = match self {
            NameKind::Revision => return Ok(true),
            NameKind::Path => return Ok(false),
            NameKind::Ambiguous => "both revision and filename",
            NameKind::Neither => "unknown revision or path not in the working tree",
        };
        Err(GitError::AmbiguousArgument {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    }
}

/// The repository operations a review needs.
///
/// Commit names may be any revision expression git understands, or one of
/// the pseudo-commits [`COMMIT_INDEX`] and [`COMMIT_WD`]. Index stages
/// `:1`..`:3` are accepted wherever file contents are read.
pub trait Vcs {
    /// Root of the working tree, if the repository has one.
    fn working_dir(&self) -> Option<&Path>;

    /// Resolve a commit name to a full commit id.
    fn commit_id(&self, name: &str) -> Result<String, GitError>;

    /// True if `name` names a commit, a tag, a pseudo-commit or an index
    /// stage.
    fn is_revision(&self, name: &str) -> bool;

    /// Ref names, sorted, optionally filtered by a glob.
    fn ref_names(&self, glob: Option<&str>) -> Result<Vec<String>, GitError>;

    /// Changes from `parent` to `child`. `paths` limits the diff; an empty
    /// slice yields an empty list.
    fn diff(&self, parent: &str, child: &str, paths: Option<&[String]>)
    -> Result<DiffFileList, GitError>;

    /// Entries directly below `dir` (`""` or ending in `/`) in `commit`,
    /// sorted by name.
    fn list_tree(&self, commit: &str, dir: &str) -> Result<Vec<TreeEntry>, GitError>;

    /// Contents of `path` as of `commit`.
    fn blob_contents(&self, commit: &str, path: &str) -> Result<Vec<u8>, GitError>;

    /// Classify a name the way `git log <name>` does: paths are only looked
    /// up in the working tree.
    fn classify(&self, name: &str) -> NameKind {
        let is_path = self
            .working_dir()
            .is_some_and(|dir| dir.join(name).exists());
        NameKind::from_flags(self.is_revision(name), is_path)
    }
}
