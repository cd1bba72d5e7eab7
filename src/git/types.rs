//! Value types shared by the repository layer and the review session.

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::GitError;

pub const COMMIT_HEAD: &str = "HEAD";
/// Pseudo-commit naming the staging area.
pub const COMMIT_INDEX: &str = ":0";
/// Pseudo-commit naming the live working tree.
pub const COMMIT_WD: &str = ":wd";
pub const NULL_SHA1: &str = "0000000000000000000000000000000000000000";

/// Index stage names for the ancestor and both sides of a conflicted merge.
pub const MERGE_STAGES: [&str; 3] = [":1", ":2", ":3"];

/// True for the names git itself does not know about.
pub fn is_pseudo_commit(name: &str) -> bool {
    name == COMMIT_INDEX || name == COMMIT_WD
}

/// Split a revision name at its first `^` or `~` suffix.
///
/// `HEAD^^` splits into `("HEAD", "^^")`, `master~3` into `("master", "~3")`.
/// Commit ranges are rejected.
pub fn split_rev_name(name: &str) -> Result<(&str, &str), GitError> {
    if name.find("..").is_some_and(|idx| idx > 0) {
        return Err(GitError::BadRevisionName {
            name: name.to_string(),
            msg: "specifies a commit range, not a single commit".to_string(),
        });
    }
    Ok(match name.find(['^', '~']) {
        Some(idx) => name.split_at(idx),
        None => (name, ""),
    })
}

/// Classification of a change between two trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Added,
    Copied,
    Deleted,
    Modified,
    Renamed,
    TypeChanged,
    Unmerged,
}

impl Status {
    pub fn as_char(self) -> char {
        match self {
            Status::Added => 'A',
            Status::Copied => 'C',
            Status::Deleted => 'D',
            Status::Modified => 'M',
            Status::Renamed => 'R',
            Status::TypeChanged => 'T',
            Status::Unmerged => 'U',
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Status::Added => "added",
            Status::Copied => "copied",
            Status::Deleted => "deleted",
            Status::Modified => "modified",
            Status::Renamed => "renamed",
            Status::TypeChanged => "type changed",
            Status::Unmerged => "unmerged",
        }
    }

    /// Renames and copies carry two paths.
    pub fn is_rename_or_copy(self) -> bool {
        matches!(self, Status::Renamed | Status::Copied)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One side of a diff entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    pub sha1: String,
    pub path: Option<String>,
    pub mode: u32,
}

impl BlobInfo {
    pub fn new(sha1: impl Into<String>, path: Option<String>, mode: u32) -> Self {
        Self {
            sha1: sha1.into(),
            path,
            mode,
        }
    }

    /// The absent side of an added or deleted file.
    pub fn null() -> Self {
        Self::new(NULL_SHA1, None, 0)
    }
}

/// One changed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub old: BlobInfo,
    pub new: BlobInfo,
    pub status: Status,
    /// Similarity score for renames and copies, when the backend reports one.
    pub similarity: Option<u8>,
}

impl DiffEntry {
    pub fn new(status: Status, old: BlobInfo, new: BlobInfo) -> Self {
        Self {
            old,
            new,
            status,
            similarity: None,
        }
    }

    /// Attach a similarity score; scores outside `0..=100` are rejected.
    pub fn with_similarity(mut self, score: u32) -> Result<Self, GitError> {
        let score = u8::try_from(score)
            .ok()
            .filter(|s| *s <= 100)
            .ok_or_else(|| GitError::InvalidSimilarity(score))?;
        self.similarity = Some(score);
        Ok(self)
    }

    /// The new path, or the old path for deleted files.
    pub fn path(&self) -> &str {
        self.new
            .path
            .as_deref()
            .or(self.old.path.as_deref())
            .unwrap_or_default()
    }

    /// Swap the two sides, as if the diff had been computed the other way.
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.old, &mut self.new);
        match self.status {
            Status::Added => self.status = Status::Deleted,
            Status::Deleted => self.status = Status::Added,
            Status::Copied => {
                // The copy source still exists on the other side; only the
                // copy itself disappears.
                self.status = Status::Deleted;
                self.new = BlobInfo::null();
                self.similarity = None;
            }
            _ => {}
        }
    }
}

impl fmt::Display for DiffEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)?;
        if let Some(score) = self.similarity {
            write!(f, "{score:03}")?;
        }
        if self.status.is_rename_or_copy() {
            write!(
                f,
                ": {} --> {}",
                self.old.path.as_deref().unwrap_or_default(),
                self.new.path.as_deref().unwrap_or_default()
            )
        } else {
            write!(f, ": {}", self.path())
        }
    }
}

/// Changed paths between a parent and a child, keyed by path.
#[derive(Debug, Clone)]
pub struct DiffFileList {
    pub parent: String,
    pub child: String,
    entries: BTreeMap<String, DiffEntry>,
}

impl DiffFileList {
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Add an entry.
    ///
    /// A conflicted path is often reported twice: once as unmerged and once
    /// as an ordinary change. The two records are merged into one unmerged
    /// entry; any other duplicate is an error.
    pub fn add(&mut self, mut entry: DiffEntry) -> Result<(), GitError> {
        let path = entry.path().to_string();
        if let Some(existing) = self.entries.get_mut(&path) {
            if entry.status == Status::Unmerged {
                existing.status = Status::Unmerged;
                return Ok(());
            }
            if existing.status != Status::Unmerged {
                return Err(GitError::DuplicateEntry(path));
            }
            entry.status = Status::Unmerged;
        }
        self.entries.insert(path, entry);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&DiffEntry> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiffEntry> {
        self.entries.values()
    }

    pub fn into_entries(self) -> Vec<DiffEntry> {
        self.entries.into_values().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

/// One entry of a tree listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub mode: u32,
    pub kind: ObjectType,
    pub sha1: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn modified(path: &str) -> DiffEntry {
        DiffEntry::new(
            Status::Modified,
            BlobInfo::new("1".repeat(40), Some(path.into()), 0o100644),
            BlobInfo::new("2".repeat(40), Some(path.into()), 0o100644),
        )
    }

    fn unmerged(path: &str) -> DiffEntry {
        DiffEntry::new(
            Status::Unmerged,
            BlobInfo::new(NULL_SHA1, Some(path.into()), 0),
            BlobInfo::new(NULL_SHA1, Some(path.into()), 0),
        )
    }

    #[test]
    fn split_rev_name_at_first_suffix() {
        assert_eq!(split_rev_name("HEAD^^").unwrap(), ("HEAD", "^^"));
        assert_eq!(split_rev_name("master~3^2").unwrap(), ("master", "~3^2"));
        assert_eq!(split_rev_name("master").unwrap(), ("master", ""));
        assert_eq!(split_rev_name("x^{1}").unwrap(), ("x", "^{1}"));
        assert_eq!(split_rev_name(":wd").unwrap(), (":wd", ""));
    }

    #[test]
    fn split_rev_name_rejects_ranges() {
        let err = split_rev_name("a..b").unwrap_err();
        assert!(matches!(err, GitError::BadRevisionName { ref name, .. } if name == "a..b"));
    }

    #[test]
    fn status_chars_and_descriptions() {
        assert_eq!(Status::TypeChanged.as_char(), 'T');
        assert_eq!(Status::TypeChanged.description(), "type changed");
        assert_eq!(Status::Unmerged.to_string(), "U");
        assert!(Status::Copied.is_rename_or_copy());
        assert!(!Status::Modified.is_rename_or_copy());
    }

    #[test]
    fn path_falls_back_to_old_side() {
        let deleted = DiffEntry::new(
            Status::Deleted,
            BlobInfo::new("1".repeat(40), Some("gone.h".into()), 0o100644),
            BlobInfo::null(),
        );
        assert_eq!(deleted.path(), "gone.h");
    }

    #[test]
    fn reverse_swaps_added_and_deleted() {
        let mut entry = DiffEntry::new(
            Status::Added,
            BlobInfo::null(),
            BlobInfo::new("3".repeat(40), Some("new.c".into()), 0o100644),
        );
        entry.reverse();
        assert_eq!(entry.status, Status::Deleted);
        assert_eq!(entry.old.path.as_deref(), Some("new.c"));
        assert_eq!(entry.new, BlobInfo::null());

        entry.reverse();
        assert_eq!(entry.status, Status::Added);
    }

    #[test]
    fn reversed_copy_becomes_delete_with_null_new_side() {
        let mut entry = DiffEntry::new(
            Status::Copied,
            BlobInfo::new("1".repeat(40), Some("src.c".into()), 0o100644),
            BlobInfo::new("1".repeat(40), Some("copy.c".into()), 0o100644),
        )
        .with_similarity(100)
        .unwrap();
        entry.reverse();
        assert_eq!(entry.status, Status::Deleted);
        assert_eq!(entry.old.path.as_deref(), Some("copy.c"));
        assert_eq!(entry.new, BlobInfo::null());
        assert_eq!(entry.path(), "copy.c");
    }

    #[test]
    fn similarity_bounds_are_inclusive() {
        assert!(modified("a").with_similarity(0).is_ok());
        assert_eq!(modified("a").with_similarity(100).unwrap().similarity, Some(100));
        assert!(modified("a").with_similarity(101).is_err());
    }

    #[test]
    fn display_includes_similarity_and_both_paths() {
        let entry = DiffEntry::new(
            Status::Renamed,
            BlobInfo::new("1".repeat(40), Some("a.c".into()), 0o100644),
            BlobInfo::new("1".repeat(40), Some("b.c".into()), 0o100644),
        )
        .with_similarity(87)
        .unwrap();
        assert_eq!(entry.to_string(), "R087: a.c --> b.c");
        assert_eq!(modified("x.h").to_string(), "M: x.h");
    }

    #[test]
    fn unmerged_record_merges_into_existing_entry() {
        let mut list = DiffFileList::new(COMMIT_INDEX, COMMIT_WD);
        list.add(modified("conflict.c")).unwrap();
        list.add(unmerged("conflict.c")).unwrap();
        let entry = list.get("conflict.c").unwrap();
        assert_eq!(entry.status, Status::Unmerged);
        assert_eq!(entry.old.sha1, "1".repeat(40));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn ordinary_record_replaces_unmerged_entry_keeping_status() {
        let mut list = DiffFileList::new(COMMIT_INDEX, COMMIT_WD);
        list.add(unmerged("conflict.c")).unwrap();
        list.add(modified("conflict.c")).unwrap();
        let entry = list.get("conflict.c").unwrap();
        assert_eq!(entry.status, Status::Unmerged);
        assert_eq!(entry.new.sha1, "2".repeat(40));
    }

    #[test]
    fn other_duplicates_are_errors() {
        let mut list = DiffFileList::new("a", "b");
        list.add(modified("x.c")).unwrap();
        let err = list.add(modified("x.c")).unwrap_err();
        assert_eq!(err.to_string(), "diff list already contains an entry for x.c");
    }
}
