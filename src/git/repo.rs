use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use git2::{Delta, DiffFindOptions, DiffOptions, FileMode, Repository, Tree};
use tracing::debug;

use super::types::{
    BlobInfo, COMMIT_HEAD, COMMIT_INDEX, COMMIT_WD, DiffEntry, DiffFileList, MERGE_STAGES,
    NULL_SHA1, ObjectType, Status, TreeEntry, is_pseudo_commit,
};
use super::Vcs;
use crate::errors::GitError;

const TREE_MODE: u32 = 0o040000;

/// A path recorded in the index, relative to the listed directory.
struct IndexRecord {
    path: String,
    mode: u32,
    sha1: String,
    stage: u16,
}

/// [`Vcs`] backed by libgit2.
pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Find the repository containing `start`, searching upwards.
    pub fn discover(start: &Path) -> Result<Self, GitError> {
        let repo = Repository::discover(start)
            .map_err(|_| GitError::NotARepo(start.display().to_string()))?;
        debug!(git_dir = %repo.path().display(), "opened repository");
        Ok(Self { repo })
    }

    fn commit_tree(&self, name: &str) -> Result<Tree<'_>, GitError> {
        let commit = self
            .repo
            .revparse_single(name)
            .and_then(|object| object.peel_to_commit())
            .map_err(|_| GitError::NoSuchCommit(name.to_string()))?;
        Ok(commit.tree()?)
    }

    fn index_records(&self, dir: &str) -> Result<Vec<IndexRecord>, GitError> {
        let mut index = self.repo.index()?;
        index.read(false)?;
        let records = index
            .iter()
            .filter_map(|entry| {
                let path = String::from_utf8_lossy(&entry.path).into_owned();
                let relative = path.strip_prefix(dir)?.to_string();
                Some(IndexRecord {
                    path: relative,
                    mode: entry.mode,
                    sha1: entry.id.to_string(),
                    stage: (entry.flags >> 12) & 0x3,
                })
            })
            .collect();
        Ok(records)
    }

    fn list_working_dir(&self, dir: &str) -> Result<Vec<TreeEntry>, GitError> {
        if self.repo.workdir().is_none() {
            return Err(GitError::NoWorkingDir(self.repo.path().display().to_string()));
        }

        // Untracked files are not listed; modified files have no blob id yet.
        let mut records = self.index_records(dir)?;
        let pathspec = dir.trim_end_matches('/');
        let paths = (!pathspec.is_empty()).then(|| vec![pathspec.to_string()]);
        let diff = self.diff(COMMIT_INDEX, COMMIT_WD, paths.as_deref())?;

        let mut changes: HashMap<String, Option<u32>> = HashMap::new();
        for entry in diff.iter() {
            let Some(relative) = entry.old.path.as_deref().and_then(|p| p.strip_prefix(dir))
            else {
                continue;
            };
            let change = match entry.status {
                Status::Deleted => None,
                _ => Some(entry.new.mode),
            };
            changes.insert(relative.to_string(), change);
        }

        records.retain_mut(|record| match changes.get(&record.path) {
            Some(None) => false,
            Some(Some(mode)) => {
                record.mode = *mode;
                record.sha1 = NULL_SHA1.to_string();
                true
            }
            None => true,
        });
        Ok(records_to_tree(records))
    }

    fn list_commit_tree(&self, commit: &str, dir: &str) -> Result<Vec<TreeEntry>, GitError> {
        let root = self.commit_tree(commit)?;
        let subdir = dir.trim_end_matches('/');
        let tree = if subdir.is_empty() {
            root
        } else {
            let Ok(entry) = root.get_path(Path::new(subdir)) else {
                return Ok(Vec::new());
            };
            match entry.to_object(&self.repo)?.peel_to_tree() {
                Ok(tree) => tree,
                Err(_) => return Ok(Vec::new()),
            }
        };

        let mut entries: Vec<TreeEntry> = tree
            .iter()
            .filter_map(|entry| {
                let kind = match entry.kind()? {
                    git2::ObjectType::Blob => ObjectType::Blob,
                    git2::ObjectType::Tree => ObjectType::Tree,
                    git2::ObjectType::Commit => ObjectType::Commit,
                    _ => return None,
                };
                Some(TreeEntry {
                    name: entry.name()?.to_string(),
                    mode: entry.filemode() as u32,
                    kind,
                    sha1: entry.id().to_string(),
                })
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn index_blob(&self, stage: &str, path: &str, name: &str) -> Result<Vec<u8>, GitError> {
        let stage: i32 = stage[1..].parse().unwrap_or(0);
        let mut index = self.repo.index()?;
        index.read(false)?;
        let entry = index
            .get_path(Path::new(path), stage)
            .ok_or_else(|| GitError::NoSuchBlob(name.to_string()))?;
        let blob = self.repo.find_blob(entry.id)?;
        Ok(blob.content().to_vec())
    }
}

impl Vcs for GitRepo {
    fn working_dir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    fn commit_id(&self, name: &str) -> Result<String, GitError> {
        let commit = self
            .repo
            .revparse_single(name)
            .and_then(|object| object.peel_to_commit())
            .map_err(|_| GitError::NoSuchCommit(name.to_string()))?;
        Ok(commit.id().to_string())
    }

    fn is_revision(&self, name: &str) -> bool {
        if is_pseudo_commit(name) || MERGE_STAGES.contains(&name) {
            return true;
        }
        self.repo.revparse_single(name).is_ok_and(|object| {
            matches!(
                object.kind(),
                Some(git2::ObjectType::Commit | git2::ObjectType::Tag)
            )
        })
    }

    fn ref_names(&self, glob: Option<&str>) -> Result<Vec<String>, GitError> {
        let references = match glob {
            Some(glob) => self.repo.references_glob(glob)?,
            None => self.repo.references()?,
        };
        let mut names: Vec<String> = references
            .filter_map(|reference| reference.ok())
            .filter_map(|reference| reference.name().map(str::to_string))
            .collect();
        if glob.is_none() && self.repo.head().is_ok() {
            names.push(COMMIT_HEAD.to_string());
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn diff(
        &self,
        parent: &str,
        child: &str,
        paths: Option<&[String]>,
    ) -> Result<DiffFileList, GitError> {
        let mut list = DiffFileList::new(parent, child);
        if paths.is_some_and(|paths| paths.is_empty()) {
            return Ok(list);
        }

        let mut opts = DiffOptions::new();
        for path in paths.unwrap_or_default() {
            opts.pathspec(path);
        }

        // libgit2 only diffs from older to newer; when the parent is the
        // newer side, diff the other way round and reverse each entry.
        let repo = &self.repo;
        let (mut diff, reverse) = match (parent, child) {
            (COMMIT_WD, COMMIT_WD) | (COMMIT_INDEX, COMMIT_INDEX) => return Ok(list),
            (COMMIT_WD, COMMIT_INDEX) => (repo.diff_index_to_workdir(None, Some(&mut opts))?, true),
            (COMMIT_WD, commit) => (
                repo.diff_tree_to_workdir_with_index(
                    Some(&self.commit_tree(commit)?),
                    Some(&mut opts),
                )?,
                true,
            ),
            (COMMIT_INDEX, COMMIT_WD) => {
                (repo.diff_index_to_workdir(None, Some(&mut opts))?, false)
            }
            (COMMIT_INDEX, commit) => (
                repo.diff_tree_to_index(Some(&self.commit_tree(commit)?), None, Some(&mut opts))?,
                true,
            ),
            (commit, COMMIT_WD) => (
                repo.diff_tree_to_workdir_with_index(
                    Some(&self.commit_tree(commit)?),
                    Some(&mut opts),
                )?,
                false,
            ),
            (commit, COMMIT_INDEX) => (
                repo.diff_tree_to_index(Some(&self.commit_tree(commit)?), None, Some(&mut opts))?,
                false,
            ),
            (old, new) => (
                repo.diff_tree_to_tree(
                    Some(&self.commit_tree(old)?),
                    Some(&self.commit_tree(new)?),
                    Some(&mut opts),
                )?,
                false,
            ),
        };

        let mut find = DiffFindOptions::new();
        find.renames(true).copies(true);
        diff.find_similar(Some(&mut find))?;

        for delta in diff.deltas() {
            let status = match delta.status() {
                Delta::Added => Status::Added,
                Delta::Deleted => Status::Deleted,
                Delta::Modified => Status::Modified,
                Delta::Renamed => Status::Renamed,
                Delta::Copied => Status::Copied,
                Delta::Typechange => Status::TypeChanged,
                Delta::Conflicted => Status::Unmerged,
                _ => continue,
            };

            let side = |file: git2::DiffFile<'_>, present: bool| {
                if !present {
                    return BlobInfo::null();
                }
                BlobInfo::new(
                    file.id().to_string(),
                    file.path().map(|p| p.to_string_lossy().into_owned()),
                    mode_bits(file.mode()),
                )
            };
            let old = side(delta.old_file(), status != Status::Added);
            let new = side(delta.new_file(), status != Status::Deleted);

            let mut entry = DiffEntry::new(status, old, new);
            if reverse {
                entry.reverse();
            }
            list.add(entry)?;
        }

        debug!(parent, child, entries = list.len(), "computed diff");
        Ok(list)
    }

    fn list_tree(&self, commit: &str, dir: &str) -> Result<Vec<TreeEntry>, GitError> {
        match commit {
            COMMIT_INDEX => Ok(records_to_tree(self.index_records(dir)?)),
            COMMIT_WD => self.list_working_dir(dir),
            _ => self.list_commit_tree(commit, dir),
        }
    }

    fn blob_contents(&self, commit: &str, path: &str) -> Result<Vec<u8>, GitError> {
        let name = format!("{commit}:{path}");
        if commit == COMMIT_WD {
            let dir = self
                .working_dir()
                .ok_or_else(|| GitError::NoWorkingDir(self.repo.path().display().to_string()))?;
            let full = dir.join(path);
            if full.is_dir() {
                return Err(GitError::NotABlob(name));
            }
            return std::fs::read(&full).map_err(|_| GitError::NoSuchBlob(name));
        }
        if commit == COMMIT_INDEX || MERGE_STAGES.contains(&commit) {
            return self.index_blob(commit, path, &name);
        }

        let tree = self
            .commit_tree(commit)
            .map_err(|_| GitError::NoSuchBlob(name.clone()))?;
        let entry = tree
            .get_path(Path::new(path))
            .map_err(|_| GitError::NoSuchBlob(name.clone()))?;
        if entry.kind() != Some(git2::ObjectType::Blob) {
            return Err(GitError::NotABlob(name));
        }
        let blob = self.repo.find_blob(entry.id())?;
        Ok(blob.content().to_vec())
    }
}

fn mode_bits(mode: FileMode) -> u32 {
    match mode {
        FileMode::Tree => TREE_MODE,
        FileMode::Blob => 0o100644,
        FileMode::BlobExecutable => 0o100755,
        FileMode::Link => 0o120000,
        FileMode::Commit => 0o160000,
        _ => 0,
    }
}

/// Collapse index records into the entries of one directory level.
///
/// Conflicted paths have no stage 0 entry; the first parent's version
/// (stage 2) stands in for them.
fn records_to_tree(records: Vec<IndexRecord>) -> Vec<TreeEntry> {
    let mut entries: BTreeMap<String, TreeEntry> = BTreeMap::new();
    for record in records {
        if let Some((subdir, _)) = record.path.split_once('/') {
            entries.entry(subdir.to_string()).or_insert_with(|| TreeEntry {
                name: subdir.to_string(),
                mode: TREE_MODE,
                kind: ObjectType::Tree,
                sha1: NULL_SHA1.to_string(),
            });
            continue;
        }
        if record.stage != 0 && record.stage != 2 {
            continue;
        }
        entries.insert(
            record.path.clone(),
            TreeEntry {
                name: record.path,
                mode: record.mode,
                kind: ObjectType::Blob,
                sha1: record.sha1,
            },
        );
    }
    entries.into_values().collect()
}
