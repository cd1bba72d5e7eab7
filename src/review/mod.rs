//! Interactive review of one diff.
//!
//! [`Reviewer`] is the shell context: it owns the [`Review`] session, the
//! configured external programs, and a small cache of repository listings
//! used while completing a line. The command set lives in [`commands`].
//!
//! ## Example
//!
//! ```no_run
//! use git_review::config::{ReviewConfig, ToolOverrides};
//! use git_review::git::{GitRepo, Vcs, COMMIT_INDEX, COMMIT_WD};
//! use git_review::review::{Review, Reviewer};
//!
//! let repo = GitRepo::discover(std::path::Path::new("."))?;
//! let diff = repo.diff(COMMIT_INDEX, COMMIT_WD, None)?;
//! let review = Review::new(Box::new(repo), diff)?;
//! let config = ReviewConfig::load(&ToolOverrides::default())?;
//! let mut shell = git_review::review::new_shell(Reviewer::new(review, config.tools))?;
//! assert_eq!(shell.run_command(Some("list")), 0);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod args;
pub mod commands;
pub mod files;
pub mod session;

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::debug;

pub use files::ReviewFile;
pub use session::{ALIAS_CHILD, ALIAS_PARENT, Review, sort_reasonably};

use crate::cli::{Cli, Completion, ShellContext};
use crate::config::ToolCommands;
use crate::errors::{CliError, GitError};
use crate::git::{COMMIT_HEAD, COMMIT_INDEX, COMMIT_WD, DiffEntry, ObjectType, Status, TreeEntry, Vcs};

/// How to pick the next suggested command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suggestion {
    /// Whatever suits the current entry.
    Review,
    /// Move on, or quit at the end of the list.
    Next,
    Quit,
}

/// Repository listings cached for the duration of one line edit.
#[derive(Debug, Default)]
pub struct RepoCache {
    ref_names: RefCell<Option<Vec<String>>>,
    trees: RefCell<HashMap<(String, String), Vec<TreeEntry>>>,
}

impl RepoCache {
    pub fn clear(&self) {
        self.ref_names.borrow_mut().take();
        self.trees.borrow_mut().clear();
    }

    pub fn ref_names(&self, vcs: &dyn Vcs) -> Result<Vec<String>, GitError> {
        if let Some(names) = self.ref_names.borrow().as_ref() {
            return Ok(names.clone());
        }
        let names = vcs.ref_names(None)?;
        *self.ref_names.borrow_mut() = Some(names.clone());
        Ok(names)
    }

    pub fn list_tree(&self, vcs: &dyn Vcs, commit: &str, dir: &str) -> Result<Vec<TreeEntry>, GitError> {
        let key = (commit.to_string(), dir.to_string());
        if let Some(entries) = self.trees.borrow().get(&key) {
            return Ok(entries.clone());
        }
        let entries = vcs.list_tree(commit, dir)?;
        self.trees.borrow_mut().insert(key, entries.clone());
        Ok(entries)
    }
}

/// Shell context for a review.
pub struct Reviewer {
    review: Review,
    tools: ToolCommands,
    cache: RepoCache,
    suggested: String,
}

impl Reviewer {
    pub fn new(review: Review, tools: ToolCommands) -> Self {
        let mut reviewer = Self {
            review,
            tools,
            cache: RepoCache::default(),
            suggested: String::new(),
        };
        reviewer.suggest(Suggestion::Review);
        reviewer
    }

    pub fn review(&self) -> &Review {
        &self.review
    }

    pub fn review_mut(&mut self) -> &mut Review {
        &mut self.review
    }

    pub fn tools(&self) -> &ToolCommands {
        &self.tools
    }

    pub fn cache(&self) -> &RepoCache {
        &self.cache
    }

    /// The command an empty input line runs.
    pub fn suggested(&self) -> &str {
        &self.suggested
    }

    pub fn suggest(&mut self, mode: Suggestion) {
        let status = match mode {
            Suggestion::Review => self.review.current_entry().ok().map(|entry| entry.status),
            Suggestion::Next | Suggestion::Quit => None,
        };
        self.suggested = match (mode, status) {
            (Suggestion::Review, Some(Status::Deleted)) => return self.suggest(Suggestion::Next),
            (Suggestion::Review, Some(Status::Added)) => "view".to_string(),
            (Suggestion::Review, Some(Status::Unmerged)) if self.review.parent() == COMMIT_INDEX => {
                "diff :1 :2 :3".to_string()
            }
            (Suggestion::Review, Some(Status::Unmerged)) => "diff parent :2 :3".to_string(),
            (Suggestion::Review, Some(_)) => "diff".to_string(),
            (Suggestion::Next, _) if self.review.has_next() => "next".to_string(),
            _ => "quit".to_string(),
        };
    }

    /// Commit names starting with `text`: ref names (and each part after a
    /// `/`), `HEAD`, the pseudo-commits and aliases.
    pub fn commit_names(&self, text: &str) -> Vec<String> {
        let refs = self
            .cache
            .ref_names(self.review.vcs())
            .unwrap_or_default();
        let fixed = [COMMIT_HEAD, COMMIT_INDEX, COMMIT_WD];

        let mut names = Vec::new();
        for name in refs.iter().map(String::as_str).chain(fixed) {
            if name.starts_with(text) {
                names.push(name.to_string());
            }
            for (idx, _) in name.match_indices('/') {
                let tail = &name[idx + 1..];
                if tail.starts_with(text) {
                    names.push(tail.to_string());
                }
            }
        }
        names.extend(
            self.review
                .aliases()
                .keys()
                .filter(|alias| alias.starts_with(text))
                .cloned(),
        );
        names.sort();
        names.dedup();
        names
    }

    /// Complete a commit name, finishing the word when only one matches.
    pub fn complete_commit(&self, text: &str) -> Vec<Completion> {
        let mut names = self.commit_names(text);
        if names.len() == 1 {
            return names.drain(..).map(Completion::word).collect();
        }
        names.into_iter().map(Completion::new).collect()
    }

    /// Complete a path within `commit`.
    ///
    /// Directories get a trailing `/`; a unique file match finishes the
    /// word. Lookup failures produce no candidates.
    pub fn complete_filename(&self, commit: &str, text: &str) -> Vec<Completion> {
        let (dir, base) = match text.rfind('/') {
            Some(idx) => text.split_at(idx + 1),
            None => ("", text),
        };
        let Ok(commit) = self.review.expand_commit_name(commit) else {
            return Vec::new();
        };
        let entries = match self.cache.list_tree(self.review.vcs(), &commit, dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(commit = %commit, dir, error = %err, "no completions");
                return Vec::new();
            }
        };

        let matches: Vec<&TreeEntry> = entries.iter().filter(|e| e.name.starts_with(base)).collect();
        if let [only] = matches.as_slice()
            && only.kind == ObjectType::Blob
        {
            return vec![Completion::word(format!("{dir}{}", only.name))];
        }
        matches
            .into_iter()
            .map(|entry| {
                let mut path = format!("{dir}{}", entry.name);
                if entry.kind == ObjectType::Tree {
                    path.push('/');
                }
                Completion::new(path)
            })
            .collect()
    }
}

impl ShellContext for Reviewer {
    fn before_dispatch(&mut self) {
        self.cache.clear();
    }

    fn empty_line_command(&self) -> Option<String> {
        Some(self.suggested.clone())
    }

    fn prompt(&self) -> Option<String> {
        Some(match self.review.current_entry() {
            Ok(entry) => format!("{} [{}]> ", basename(entry.path()), self.suggested),
            Err(_) => format!("[{}]> ", self.suggested),
        })
    }
}

pub(crate) fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// "Now processing modified file src/main.c"
pub fn describe_entry(entry: &DiffEntry) -> String {
    let path = if entry.status.is_rename_or_copy() {
        format!(
            "{}\n--> {}",
            entry.old.path.as_deref().unwrap_or_default(),
            entry.new.path.as_deref().unwrap_or_default()
        )
    } else {
        entry.path().to_string()
    };
    format!("Now processing {} file {}", entry.status.description(), path)
}

/// Announce the current entry and refresh the suggested command.
pub fn index_updated(cli: &mut Cli<Reviewer>) {
    let message = cli.context().review().current_entry().map(describe_entry);
    match message {
        Ok(message) => {
            cli.output(&message);
            cli.context_mut().suggest(Suggestion::Review);
        }
        Err(_) => {
            cli.output("No files to review");
            cli.context_mut().suggest(Suggestion::Quit);
        }
    }
}

/// A shell with the full review command set registered.
pub fn new_shell(reviewer: Reviewer) -> Result<Cli<Reviewer>, CliError> {
    let mut cli = Cli::new(reviewer);
    commands::register(&mut cli)?;
    Ok(cli)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::cli::testing::{SharedBuffer, captured};
    use crate::git::fake::FakeVcs;
    use crate::git::{BlobInfo, DiffFileList};

    pub const CHILD_ID: &str = "1111111111111111111111111111111111111111";
    pub const PARENT_ID: &str = "2222222222222222222222222222222222222222";

    pub fn entry(status: Status, old: Option<&str>, new: Option<&str>) -> DiffEntry {
        let side = |path: Option<&str>, fill: &str| match path {
            Some(path) => BlobInfo::new(fill.repeat(40), Some(path.to_string()), 0o100644),
            None => BlobInfo::null(),
        };
        DiffEntry::new(status, side(old, "a"), side(new, "b"))
    }

    /// `file1.c` added and `file2.h` deleted between two commits, with the
    /// file contents available in both.
    pub fn two_entry_vcs() -> FakeVcs {
        FakeVcs::new()
            .commit("HEAD", CHILD_ID)
            .commit("HEAD^", PARENT_ID)
            .file(PARENT_ID, "file2.h", "old header\n")
            .file(PARENT_ID, "src/main.c", "int main;\n")
            .file(CHILD_ID, "file1.c", "new source\n")
            .file(CHILD_ID, "src/main.c", "int main;\n")
            .entry(entry(Status::Added, None, Some("file1.c")))
            .entry(entry(Status::Deleted, Some("file2.h"), None))
    }

    pub fn tools(view: &[&str], diff: &[&str]) -> ToolCommands {
        let words = |w: &[&str]| -> Vec<String> { w.iter().map(|s| s.to_string()).collect() };
        ToolCommands {
            view: words(view),
            diff: words(diff),
        }
    }

    pub fn reviewer_for(vcs: FakeVcs, parent: &str, child: &str) -> Reviewer {
        let diff = vcs.diff(parent, child, None).unwrap();
        let review = Review::new(Box::new(vcs), diff).unwrap();
        Reviewer::new(review, tools(&["true"], &["true"]))
    }

    pub fn reviewer() -> Reviewer {
        reviewer_for(two_entry_vcs(), "HEAD^", "HEAD")
    }

    pub fn shell(reviewer: Reviewer) -> (Cli<Reviewer>, SharedBuffer, SharedBuffer) {
        let (mut cli, out, err) = captured(reviewer);
        commands::register(&mut cli).unwrap();
        (cli, out, err)
    }

    pub fn diff_list(entries: Vec<DiffEntry>) -> DiffFileList {
        let mut list = DiffFileList::new("HEAD^", "HEAD");
        for entry in entries {
            list.add(entry).unwrap();
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::git::fake::FakeVcs;

    fn reviewer_with(entries: Vec<DiffEntry>, parent: &str) -> Reviewer {
        let mut vcs = FakeVcs::new().commit("HEAD", CHILD_ID).commit("HEAD^", PARENT_ID);
        for entry in entries {
            vcs = vcs.entry(entry);
        }
        reviewer_for(vcs, parent, "HEAD")
    }

    #[test]
    fn suggestion_follows_entry_status() {
        let mut reviewer = reviewer_with(
            vec![
                entry(Status::Added, None, Some("a.txt")),
                entry(Status::Deleted, Some("b.txt"), None),
                entry(Status::Modified, Some("c.txt"), Some("c.txt")),
                entry(Status::Deleted, Some("d.txt"), None),
            ],
            "HEAD^",
        );
        assert_eq!(reviewer.suggested(), "view");

        reviewer.review_mut().next().unwrap();
        reviewer.suggest(Suggestion::Review);
        assert_eq!(reviewer.suggested(), "next");

        reviewer.review_mut().next().unwrap();
        reviewer.suggest(Suggestion::Review);
        assert_eq!(reviewer.suggested(), "diff");

        reviewer.review_mut().next().unwrap();
        reviewer.suggest(Suggestion::Review);
        assert_eq!(reviewer.suggested(), "quit");
    }

    #[test]
    fn unmerged_entries_suggest_three_way_diff() {
        let unmerged = || vec![entry(Status::Unmerged, Some("m.c"), Some("m.c"))];
        let reviewer = reviewer_with(unmerged(), "HEAD^");
        assert_eq!(reviewer.suggested(), "diff parent :2 :3");
        let reviewer = reviewer_with(unmerged(), COMMIT_INDEX);
        assert_eq!(reviewer.suggested(), "diff :1 :2 :3");
    }

    #[test]
    fn empty_review_suggests_quit() {
        let reviewer = reviewer_with(Vec::new(), "HEAD^");
        assert_eq!(reviewer.suggested(), "quit");
        assert_eq!(reviewer.prompt().unwrap(), "[quit]> ");
    }

    #[test]
    fn prompt_shows_basename_and_suggestion() {
        let reviewer = reviewer_with(vec![entry(Status::Modified, Some("src/x.c"), Some("src/x.c"))], "HEAD^");
        assert_eq!(reviewer.prompt().unwrap(), "x.c [diff]> ");
        assert_eq!(reviewer.empty_line_command().unwrap(), "diff");
    }

    #[test]
    fn describe_entry_shows_both_paths_for_renames() {
        let renamed = entry(Status::Renamed, Some("old.c"), Some("new.c"));
        assert_eq!(describe_entry(&renamed), "Now processing renamed file old.c\n--> new.c");
        let added = entry(Status::Added, None, Some("a.c"));
        assert_eq!(describe_entry(&added), "Now processing added file a.c");
    }

    #[test]
    fn commit_names_include_ref_tails_pseudo_commits_and_aliases() {
        let mut vcs = two_entry_vcs();
        vcs.refs = vec!["refs/heads/master".into(), "refs/tags/v1.0".into()];
        let reviewer = reviewer_for(vcs, "HEAD^", "HEAD");

        assert_eq!(reviewer.commit_names("ma"), ["master"]);
        assert_eq!(reviewer.commit_names("refs/h"), ["refs/heads/master"]);
        assert_eq!(reviewer.commit_names(":"), [":0", ":wd"]);
        assert_eq!(reviewer.commit_names("c"), ["child"]);
        assert_eq!(reviewer.complete_commit("v"), [Completion::word("v1.0")]);
        assert_eq!(
            reviewer.complete_commit("p"),
            [Completion::word("parent")]
        );
        assert!(reviewer.complete_commit("zz").is_empty());
    }

    #[test]
    fn filename_completion_marks_directories_and_unique_files() {
        let reviewer = reviewer();
        assert_eq!(
            reviewer.complete_filename("child", ""),
            [Completion::new("file1.c"), Completion::new("src/")]
        );
        assert_eq!(
            reviewer.complete_filename("child", "f"),
            [Completion::word("file1.c")]
        );
        assert_eq!(reviewer.complete_filename("child", "s"), [Completion::new("src/")]);
        assert_eq!(
            reviewer.complete_filename("parent", "src/m"),
            [Completion::word("src/main.c")]
        );
        assert!(reviewer.complete_filename("nope", "f").is_empty());
    }

    #[test]
    fn repo_cache_is_cleared_before_dispatch() {
        let mut reviewer = reviewer();
        reviewer.complete_filename("child", "");
        assert_eq!(reviewer.cache().trees.borrow().len(), 1);
        reviewer.before_dispatch();
        assert!(reviewer.cache().trees.borrow().is_empty());
    }
}
