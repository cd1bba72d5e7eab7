use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::cell::RefCell;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, warn};

use git_review::cli::{PlainLineSource, RustylineSource, run_loop};
use git_review::config::{ReviewConfig, ReviewToml, ToolOverrides};
use git_review::git::{COMMIT_HEAD, COMMIT_INDEX, COMMIT_WD, GitRepo, Vcs, is_pseudo_commit};
use git_review::review::{Review, Reviewer, index_updated, new_shell};

#[derive(Parser)]
#[command(name = "git-review")]
#[command(version, about = "Step through the files changed between two revisions")]
pub struct Cli {
    #[arg(short, long)]
    pub verbose: bool,

    /// Review staged changes instead of working tree changes
    #[arg(long)]
    pub cached: bool,

    /// Start repository discovery from this directory
    #[arg(short = 'C', long = "repo", value_name = "DIR")]
    pub repo: Option<PathBuf>,

    /// Program used by the `view` command
    #[arg(long, value_name = "CMD")]
    pub viewer: Option<String>,

    /// Program used by the `diff` command
    #[arg(long, value_name = "CMD")]
    pub differ: Option<String>,

    /// Zero, one or two commits, or a single `A..B` range
    pub commits: Vec<String>,

    /// Limit the review to these paths
    #[arg(last = true)]
    pub paths: Vec<String>,
}

/// Work out the parent and child of the review from the positional commits.
fn endpoints(commits: &[String], cached: bool) -> Result<(String, String), String> {
    match commits {
        [] if cached => Ok((COMMIT_HEAD.to_string(), COMMIT_INDEX.to_string())),
        [] => Ok((COMMIT_INDEX.to_string(), COMMIT_WD.to_string())),
        [commit] if commit.contains("...") => {
            Err(format!("symmetric difference '{commit}' is not supported"))
        }
        [commit] if commit.contains("..") => {
            if cached {
                return Err("--cached cannot be combined with a commit range".to_string());
            }
            let (parent, child) = commit.split_once("..").unwrap_or((commit.as_str(), ""));
            let or_head = |name: &str| {
                if name.is_empty() {
                    COMMIT_HEAD.to_string()
                } else {
                    name.to_string()
                }
            };
            Ok((or_head(parent), or_head(child)))
        }
        [commit] if cached => Ok((commit.clone(), COMMIT_INDEX.to_string())),
        [commit] => Ok((format!("{commit}^"), commit.clone())),
        [parent, child] if cached => Err(format!(
            "--cached takes at most one commit, got '{parent}' and '{child}'"
        )),
        [parent, child] if parent.contains("..") || child.contains("..") => {
            Err("a commit range cannot be combined with another commit".to_string())
        }
        [parent, child] => Ok((parent.clone(), child.clone())),
        _ => Err(format!("expected at most two commits, got {}", commits.len())),
    }
}

fn resolve(repo: &GitRepo, name: &str) -> Result<String> {
    if is_pseudo_commit(name) {
        return Ok(name.to_string());
    }
    repo.commit_id(name)
        .with_context(|| format!("Cannot review '{}'", name))
}

fn run(cli: Cli) -> Result<i32> {
    let (parent, child) = match endpoints(&cli.commits, cli.cached) {
        Ok(endpoints) => endpoints,
        Err(msg) => Cli::command()
            .error(clap::error::ErrorKind::ArgumentConflict, msg)
            .exit(),
    };

    let file = ReviewToml::default_path();
    for warning in ReviewToml::load_or_default(file.as_deref())?.validate() {
        warn!("{}", warning);
    }
    let config = ReviewConfig::load(&ToolOverrides {
        viewer: cli.viewer.clone(),
        differ: cli.differ.clone(),
    })?;

    let start = match &cli.repo {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let repo = GitRepo::discover(&start)?;

    let parent = resolve(&repo, &parent)?;
    let child = resolve(&repo, &child)?;
    debug!(%parent, %child, paths = ?cli.paths, "computing diff");
    let paths = (!cli.paths.is_empty()).then_some(cli.paths.as_slice());
    let diff = repo
        .diff(&parent, &child, paths)
        .with_context(|| format!("Failed to diff {} and {}", parent, child))?;

    let review = Review::new(Box::new(repo), diff)?;
    let mut shell = new_shell(Reviewer::new(review, config.tools))?;
    shell.set_color(console::colors_enabled_stderr());
    index_updated(&mut shell);

    if std::io::stdin().is_terminal() {
        let shell = Rc::new(RefCell::new(shell));
        let mut input = RustylineSource::new(Rc::clone(&shell), config.history_size)?;
        run_loop(&*shell, &mut input)
    } else {
        let shell = RefCell::new(shell);
        let stdin = std::io::stdin();
        let mut input = PlainLineSource::new(stdin.lock());
        run_loop(&shell, &mut input)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    git_review::logging::init(cli.verbose);

    let rc = run(cli)?;
    std::process::exit(rc & 0xff);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn pair(parent: &str, child: &str) -> (String, String) {
        (parent.to_string(), child.to_string())
    }

    #[test]
    fn no_commit_reviews_working_tree() {
        assert_eq!(endpoints(&[], false).unwrap(), pair(":0", ":wd"));
        assert_eq!(endpoints(&[], true).unwrap(), pair("HEAD", ":0"));
    }

    #[test]
    fn one_commit_reviews_its_changes() {
        assert_eq!(
            endpoints(&names(&["abc"]), false).unwrap(),
            pair("abc^", "abc")
        );
        assert_eq!(
            endpoints(&names(&["abc"]), true).unwrap(),
            pair("abc", ":0")
        );
    }

    #[test]
    fn range_is_split() {
        assert_eq!(
            endpoints(&names(&["v1..v2"]), false).unwrap(),
            pair("v1", "v2")
        );
        assert_eq!(
            endpoints(&names(&["v1.."]), false).unwrap(),
            pair("v1", "HEAD")
        );
        assert!(endpoints(&names(&["v1...v2"]), false).is_err());
        assert!(endpoints(&names(&["v1..v2"]), true).is_err());
    }

    #[test]
    fn two_commits_are_parent_and_child() {
        assert_eq!(
            endpoints(&names(&["a", "b"]), false).unwrap(),
            pair("a", "b")
        );
        assert!(endpoints(&names(&["a..b", "c"]), false).is_err());
        assert!(endpoints(&names(&["a", "b"]), true).is_err());
    }

    #[test]
    fn too_many_commits() {
        let err = endpoints(&names(&["a", "b", "c"]), false).unwrap_err();
        assert_eq!(err, "expected at most two commits, got 3");
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
