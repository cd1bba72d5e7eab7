//! Review session state: the entries under review, the cursor and the
//! commit aliases.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::files::ReviewFile;
use crate::errors::{GitError, ReviewError};
use crate::git::{DiffEntry, DiffFileList, NameKind, Vcs, is_pseudo_commit, split_rev_name};

/// Alias bound to the parent side of the reviewed diff.
pub const ALIAS_PARENT: &str = "parent";
/// Alias bound to the child side of the reviewed diff.
pub const ALIAS_CHILD: &str = "child";

/// A walk over the entries of one diff.
///
/// The entry order is fixed at construction. The cursor only moves through
/// [`next`](Review::next), [`prev`](Review::prev) and [`goto`](Review::goto),
/// none of which wrap.
pub struct Review {
    vcs: Box<dyn Vcs>,
    parent: String,
    child: String,
    entries: Vec<DiffEntry>,
    current: usize,
    aliases: BTreeMap<String, String>,
}

impl Review {
    /// Start a review of `diff`, binding the `parent` and `child` aliases to
    /// its endpoints.
    pub fn new(vcs: Box<dyn Vcs>, diff: DiffFileList) -> Result<Self, GitError> {
        let parent = diff.parent.clone();
        let child = diff.child.clone();
        let mut entries = diff.into_entries();
        sort_reasonably(&mut entries);

        let mut review = Self {
            vcs,
            parent,
            child,
            entries,
            current: 0,
            aliases: BTreeMap::new(),
        };
        let (parent, child) = (review.parent.clone(), review.child.clone());
        review.set_alias(ALIAS_PARENT, &parent)?;
        review.set_alias(ALIAS_CHILD, &child)?;
        Ok(review)
    }

    pub fn vcs(&self) -> &dyn Vcs {
        self.vcs.as_ref()
    }

    /// The parent commit name as given when the diff was computed.
    pub fn parent(&self) -> &str {
        &self.parent
    }

    pub fn child(&self) -> &str {
        &self.child
    }

    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_entry(&self) -> Result<&DiffEntry, ReviewError> {
        self.entries
            .get(self.current)
            .ok_or(ReviewError::NoCurrentEntry)
    }

    pub fn has_next(&self) -> bool {
        self.current + 1 < self.entries.len()
    }

    pub fn next(&mut self) -> Result<(), ReviewError> {
        if !self.has_next() {
            return Err(ReviewError::NoMoreEntries);
        }
        self.current += 1;
        Ok(())
    }

    pub fn prev(&mut self) -> Result<(), ReviewError> {
        if self.current == 0 {
            return Err(ReviewError::NoMoreEntries);
        }
        self.current -= 1;
        Ok(())
    }

    pub fn goto(&mut self, index: usize) -> Result<(), ReviewError> {
        if index >= self.entries.len() {
            return Err(ReviewError::InvalidIndex(index));
        }
        self.current = index;
        Ok(())
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Replace an alias at the start of `name`, keeping any `^`/`~` suffix.
    pub fn expand_commit_name(&self, name: &str) -> Result<String, GitError> {
        let (base, suffix) = split_rev_name(name)?;
        let base = self.alias(base).unwrap_or(base);
        Ok(format!("{base}{suffix}"))
    }

    /// Bind `alias` to the commit `commit` currently refers to.
    ///
    /// The stored value is a commit id (or pseudo-commit), so redefining an
    /// alias used in `commit` later has no effect on this one.
    pub fn set_alias(&mut self, alias: &str, commit: &str) -> Result<(), GitError> {
        let expanded = self.expand_commit_name(commit)?;
        let resolved = if is_pseudo_commit(&expanded) {
            expanded
        } else {
            self.vcs.commit_id(&expanded)?
        };
        info!(alias, commit = %resolved, "alias set");
        self.aliases.insert(alias.to_string(), resolved);
        Ok(())
    }

    pub fn unset_alias(&mut self, alias: &str) -> Result<(), ReviewError> {
        if self.aliases.remove(alias).is_none() {
            return Err(ReviewError::UnknownAlias(alias.to_string()));
        }
        debug!(alias, "alias removed");
        Ok(())
    }

    /// `Ok(true)` if `name` is a revision, `Ok(false)` if it is a path in
    /// the working tree, an error if it is both or neither.
    pub fn is_revision_or_path(&self, name: &str) -> Result<bool, GitError> {
        let is_rev = self
            .expand_commit_name(name)
            .is_ok_and(|expanded| self.vcs.is_revision(&expanded));
        let is_path = self
            .vcs
            .working_dir()
            .is_some_and(|dir| dir.join(name).exists());
        NameKind::from_flags(is_rev, is_path).into_result(name)
    }

    /// Materialize `commit:path` for an external program.
    ///
    /// Errors name the file with the commit as the user typed it.
    pub fn get_file(&self, commit: &str, path: Option<&str>) -> Result<ReviewFile, GitError> {
        let Some(path) = path else {
            return Err(GitError::NoSuchBlob(format!("{commit}:<None>")));
        };
        let expanded = self.expand_commit_name(commit)?;
        ReviewFile::materialize(self.vcs(), &expanded, path)
            .map_err(|err| err.with_name(format!("{commit}:{path}")))
    }
}

/// Order entries so that interface files come before their implementation:
/// by stem, then file category, then extension.
pub fn sort_reasonably(entries: &mut [DiffEntry]) {
    entries.sort_by(|a, b| sort_key(a.path()).cmp(&sort_key(b.path())));
}

fn sort_key(path: &str) -> (&str, u8, &str) {
    let (stem, ext) = split_extension(path);
    let priority = match ext {
        ".thrift" => 10,
        ".h" | ".hpp" | ".hh" | ".H" => 20,
        ".c" | ".cpp" | ".cc" | ".C" => 30,
        _ => 40,
    };
    (stem, priority, ext)
}

/// Split at the last `.` of the file name. Leading dots do not start an
/// extension.
fn split_extension(path: &str) -> (&str, &str) {
    let name_start = path.rfind('/').map_or(0, |idx| idx + 1);
    let name = &path[name_start..];
    match name.rfind('.') {
        Some(idx) if !name[..idx].chars().all(|c| c == '.') => path.split_at(name_start + idx),
        _ => (path, ""),
    }
}
