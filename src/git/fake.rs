//! In-memory [`Vcs`] used by session and command tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::types::{
    DiffEntry, DiffFileList, MERGE_STAGES, ObjectType, TreeEntry, is_pseudo_commit,
    split_rev_name,
};
use super::Vcs;
use crate::errors::GitError;

#[derive(Default)]
pub struct FakeVcs {
    /// Commit name to id.
    pub commits: BTreeMap<String, String>,
    pub refs: Vec<String>,
    /// Commit id (or pseudo-commit) to file contents by path.
    pub trees: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    pub entries: Vec<DiffEntry>,
    pub working_dir: Option<PathBuf>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(mut self, name: &str, id: &str) -> Self {
        self.commits.insert(name.to_string(), id.to_string());
        self
    }

    pub fn file(mut self, commit: &str, path: &str, contents: &str) -> Self {
        self.trees
            .entry(commit.to_string())
            .or_default()
            .insert(path.to_string(), contents.as_bytes().to_vec());
        self
    }

    pub fn entry(mut self, entry: DiffEntry) -> Self {
        self.entries.push(entry);
        self
    }

    fn known_id(&self, name: &str) -> Option<String> {
        if let Some(id) = self.commits.get(name) {
            return Some(id.clone());
        }
        self.commits.values().find(|id| *id == name).cloned()
    }
}

impl Vcs for FakeVcs {
    fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Ancestor suffixes are kept verbatim after the resolved id.
    fn commit_id(&self, name: &str) -> Result<String, GitError> {
        if let Some(id) = self.known_id(name) {
            return Ok(id);
        }
        let (base, suffix) = split_rev_name(name)?;
        self.known_id(base)
            .map(|id| format!("{id}{suffix}"))
            .ok_or_else(|| GitError::NoSuchCommit(name.to_string()))
    }

    fn is_revision(&self, name: &str) -> bool {
        is_pseudo_commit(name) || MERGE_STAGES.contains(&name) || self.commit_id(name).is_ok()
    }

    fn ref_names(&self, _glob: Option<&str>) -> Result<Vec<String>, GitError> {
        Ok(self.refs.clone())
    }

    fn diff(
        &self,
        parent: &str,
        child: &str,
        _paths: Option<&[String]>,
    ) -> Result<DiffFileList, GitError> {
        let mut list = DiffFileList::new(parent, child);
        for entry in &self.entries {
            list.add(entry.clone())?;
        }
        Ok(list)
    }

    fn list_tree(&self, commit: &str, dir: &str) -> Result<Vec<TreeEntry>, GitError> {
        let files = self
            .trees
            .get(commit)
            .ok_or_else(|| GitError::NoSuchCommit(commit.to_string()))?;
        let mut listing: BTreeMap<String, ObjectType> = BTreeMap::new();
        for path in files.keys() {
            let Some(rest) = path.strip_prefix(dir) else {
                continue;
            };
            match rest.split_once('/') {
                Some((subdir, _)) => listing.insert(subdir.to_string(), ObjectType::Tree),
                None => listing.insert(rest.to_string(), ObjectType::Blob),
            };
        }
        Ok(listing
            .into_iter()
            .map(|(name, kind)| TreeEntry {
                name,
                mode: if kind == ObjectType::Tree { 0o040000 } else { 0o100644 },
                kind,
                sha1: String::new(),
            })
            .collect())
    }

    fn blob_contents(&self, commit: &str, path: &str) -> Result<Vec<u8>, GitError> {
        let name = format!("{commit}:{path}");
        let files = self
            .trees
            .get(commit)
            .ok_or_else(|| GitError::NoSuchCommit(commit.to_string()))?;
        if let Some(contents) = files.get(path) {
            return Ok(contents.clone());
        }
        let dir = format!("{path}/");
        if files.keys().any(|p| p.starts_with(&dir)) {
            return Err(GitError::NotABlob(name));
        }
        Err(GitError::NoSuchBlob(name))
    }
}
