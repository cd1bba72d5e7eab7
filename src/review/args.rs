//! Argument kinds understood by the review commands.

use crate::cli::{ArgSpec, ArgValue, Argument, Cli, Completion};
use crate::errors::ArgumentError;
use crate::git::DiffEntry;

use super::session::{ALIAS_CHILD, ALIAS_PARENT, Review};
use super::{Reviewer, basename};

/// A parsed `commit:path` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPath {
    /// Commit name as typed, possibly an alias.
    pub commit: String,
    /// `None` when the entry has no file on the requested side.
    pub path: Option<String>,
}

impl CommitPath {
    pub fn new(commit: impl Into<String>, path: Option<String>) -> Self {
        Self {
            commit: commit.into(),
            path,
        }
    }
}

/// Split `commit:path` at the first colon that is not the leading colon of
/// a pseudo-commit (`:0`, `:wd`, `:1`...).
pub fn split_commit_path(text: &str) -> (&str, Option<&str>) {
    let from = usize::from(text.starts_with(':'));
    match text[from..].find(':') {
        Some(idx) => {
            let split = from + idx;
            (&text[..split], Some(&text[split + 1..]))
        }
        None => (text, None),
    }
}

fn arg_error(err: impl std::fmt::Display) -> ArgumentError {
    ArgumentError::new(err.to_string())
}

/// A file in the review, by index or by (partial) path.
pub struct FileIndexArgument {
    spec: ArgSpec,
}

impl FileIndexArgument {
    pub fn new(spec: ArgSpec) -> Self {
        Self { spec }
    }
}

/// Find the entry `name` refers to.
///
/// An exact path wins; otherwise exact basename matches, then basename
/// prefixes, then path suffixes are tried in turn and the first match of the
/// first non-empty group is used. Several exact basename matches are
/// ambiguous.
pub fn find_entry(entries: &[DiffEntry], name: &str) -> Result<usize, ArgumentError> {
    let paths: Vec<&str> = entries.iter().map(DiffEntry::path).collect();
    if let Some(idx) = paths.iter().position(|path| *path == name) {
        return Ok(idx);
    }

    let matching = |pred: &dyn Fn(&str) -> bool| -> Vec<usize> {
        (0..paths.len()).filter(|&idx| pred(paths[idx])).collect()
    };
    let exact = matching(&|path| basename(path) == name);
    if exact.len() > 1 {
        let listed: Vec<&str> = exact.iter().map(|&idx| paths[idx]).collect();
        return Err(ArgumentError::new(format!(
            "ambiguous path name:\n  {}",
            listed.join("\n  ")
        )));
    }

    [
        exact,
        matching(&|path| basename(path).starts_with(name)),
        matching(&|path| path.ends_with(name)),
    ]
    .into_iter()
    .find_map(|group| group.first().copied())
    .ok_or_else(|| ArgumentError::new(format!("unknown file '{name}'")))
}

impl Argument<Reviewer> for FileIndexArgument {
    fn spec(&self) -> &ArgSpec {
        &self.spec
    }

    fn parse(&self, cli: &Cli<Reviewer>, raw: &str) -> Result<ArgValue, ArgumentError> {
        let review = cli.context().review();
        let Ok(index) = raw.parse::<i64>() else {
            let idx = find_entry(review.entries(), raw)?;
            return Ok(ArgValue::Int(idx as i64));
        };
        if index < 0 {
            return Err(ArgumentError::new("file index may not be negative"));
        }
        if index as usize >= review.len() {
            return Err(ArgumentError::new(format!(
                "file index must be less than {}",
                review.len()
            )));
        }
        Ok(ArgValue::Int(index))
    }

    fn complete(&self, cli: &Cli<Reviewer>, text: &str) -> Vec<Completion> {
        let mut matches = Vec::new();
        for entry in cli.context().review().entries() {
            let path = entry.path();
            if path.starts_with(text) {
                matches.push(path.to_string());
            }
            let name = basename(path);
            if name.starts_with(text) {
                matches.push(name.to_string());
            }
        }
        matches.sort();
        matches.dedup();
        matches.into_iter().map(Completion::new).collect()
    }
}

/// The name of a commit alias.
pub struct AliasArgument {
    spec: ArgSpec,
}

impl AliasArgument {
    pub fn new(spec: ArgSpec) -> Self {
        Self { spec }
    }
}

impl Argument<Reviewer> for AliasArgument {
    fn spec(&self) -> &ArgSpec {
        &self.spec
    }

    fn parse(&self, _cli: &Cli<Reviewer>, raw: &str) -> Result<ArgValue, ArgumentError> {
        Ok(ArgValue::Str(raw.to_string()))
    }

    fn complete(&self, cli: &Cli<Reviewer>, text: &str) -> Vec<Completion> {
        let matches: Vec<&String> = cli
            .context()
            .review()
            .aliases()
            .keys()
            .filter(|alias| alias.starts_with(text))
            .collect();
        match matches.as_slice() {
            [only] => vec![Completion::word(only.as_str())],
            _ => matches.into_iter().map(|m| Completion::new(m.as_str())).collect(),
        }
    }
}

/// A commit name or alias, resolved when used.
pub struct CommitArgument {
    spec: ArgSpec,
}

impl CommitArgument {
    pub fn new(spec: ArgSpec) -> Self {
        Self { spec }
    }
}

impl Argument<Reviewer> for CommitArgument {
    fn spec(&self) -> &ArgSpec {
        &self.spec
    }

    fn parse(&self, _cli: &Cli<Reviewer>, raw: &str) -> Result<ArgValue, ArgumentError> {
        Ok(ArgValue::Str(raw.to_string()))
    }

    fn complete(&self, cli: &Cli<Reviewer>, text: &str) -> Vec<Completion> {
        cli.context().complete_commit(text)
    }
}

/// A file, optionally qualified by a commit: `path`, `commit:path`, or a
/// lone `commit` meaning the current file in that commit.
///
/// Parses to an [`ArgValue::Custom`] holding a [`CommitPath`].
pub struct CommitFileArgument {
    spec: ArgSpec,
    default_commit: String,
}

impl CommitFileArgument {
    /// `default_commit` is used for unqualified paths.
    pub fn new(spec: ArgSpec, default_commit: impl Into<String>) -> Self {
        Self {
            spec,
            default_commit: default_commit.into(),
        }
    }
}

/// The current entry's path on the side `commit` refers to.
fn entry_path_in(review: &Review, commit: &str, entry: &DiffEntry) -> Result<Option<String>, ArgumentError> {
    let expanded = review.expand_commit_name(commit).map_err(arg_error)?;
    let is_side = |alias: &str| review.expand_commit_name(alias).is_ok_and(|side| side == expanded);
    Ok(if is_side(ALIAS_PARENT) {
        entry.old.path.clone()
    } else if is_side(ALIAS_CHILD) {
        entry.new.path.clone()
    } else {
        entry.new.path.clone().or_else(|| entry.old.path.clone())
    })
}

impl Argument<Reviewer> for CommitFileArgument {
    fn spec(&self) -> &ArgSpec {
        &self.spec
    }

    fn parse(&self, cli: &Cli<Reviewer>, raw: &str) -> Result<ArgValue, ArgumentError> {
        let review = cli.context().review();
        let value = match split_commit_path(raw) {
            (commit, Some(path)) => CommitPath::new(commit, Some(path.to_string())),
            (name, None) => {
                if review.is_revision_or_path(name).map_err(arg_error)? {
                    let entry = review.current_entry().map_err(arg_error)?;
                    CommitPath::new(name, entry_path_in(review, name, entry)?)
                } else {
                    CommitPath::new(self.default_commit.as_str(), Some(name.to_string()))
                }
            }
        };
        Ok(ArgValue::custom(value))
    }

    /// Without a colon, complete commit names (a unique exact match gains
    /// a `:`) and paths in the default commit. After a colon, complete paths
    /// in the named commit.
    fn complete(&self, cli: &Cli<Reviewer>, text: &str) -> Vec<Completion> {
        let reviewer = cli.context();
        match split_commit_path(text) {
            (partial, None) => {
                let names = reviewer.commit_names(partial);
                let mut matches: Vec<Completion> = if names.len() == 1 && names[0] == partial {
                    vec![Completion::new(format!("{partial}:"))]
                } else {
                    names.into_iter().map(Completion::new).collect()
                };
                matches.extend(reviewer.complete_filename(&self.default_commit, partial));
                matches
            }
            (commit, Some(path)) => reviewer
                .complete_filename(commit, path)
                .into_iter()
                .map(|candidate| Completion {
                    text: format!("{commit}:{}", candidate.text),
                    add_space: candidate.add_space,
                })
                .collect(),
        }
    }
}
