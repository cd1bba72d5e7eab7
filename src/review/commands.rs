//! The review command set.

use std::path::Path;

use anyhow::Result;

use super::args::{AliasArgument, CommitArgument, CommitFileArgument, CommitPath, FileIndexArgument};
use super::session::{ALIAS_CHILD, ALIAS_PARENT, Review};
use super::{ReviewFile, Reviewer, Suggestion, index_updated};
use crate::cli::{ArgCommand, ArgSpec, ArgValue, Cli, HelpCommand, IntArgument, ParsedArgs, RunParsed};
use crate::errors::{CliError, GitError, ReviewError};
use crate::external;
use crate::git::{DiffEntry, Status};

/// Register every review command on `cli`.
pub fn register(cli: &mut Cli<Reviewer>) -> Result<(), CliError> {
    let exit_code = IntArgument::new(
        ArgSpec::new("exit_code")
            .hr_name("<exit_code>")
            .default(ArgValue::Int(0)),
    )
    .min(0)
    .max(255);
    cli.add_command_aliases(&["exit", "quit"], ArgCommand::new("Exit", Exit).arg(exit_code))?;
    cli.add_command_aliases(
        &["list", "files"],
        ArgCommand::new("Show the file list", ListFiles),
    )?;
    cli.add_command("next", ArgCommand::new("Move to the next file", Next))?;
    cli.add_command("prev", ArgCommand::new("Move to the previous file", Prev))?;
    cli.add_command(
        "goto",
        ArgCommand::new("Go to the specified file", Goto).arg(FileIndexArgument::new(
            ArgSpec::new("index").hr_name("<index-or-path>"),
        )),
    )?;
    cli.add_command(
        "diff",
        ArgCommand::new(
            "Diff the specified files. With no arguments, diff the parent and child \
             versions of the current file. With one argument, diff that file against \
             the child version of the current file.",
            Diff,
        )
        .arg(CommitFileArgument::new(ArgSpec::new("path1").optional(), ALIAS_PARENT))
        .arg(CommitFileArgument::new(ArgSpec::new("path2").optional(), ALIAS_CHILD))
        .arg(CommitFileArgument::new(ArgSpec::new("path3").optional(), ALIAS_CHILD)),
    )?;
    cli.add_command(
        "view",
        ArgCommand::new("View the specified file", View)
            .arg(CommitFileArgument::new(ArgSpec::new("path").optional(), ALIAS_CHILD)),
    )?;
    cli.add_command(
        "alias",
        ArgCommand::new("View or set a commit alias", Alias)
            .arg(AliasArgument::new(ArgSpec::new("alias").optional()))
            .arg(CommitArgument::new(ArgSpec::new("commit").optional())),
    )?;
    cli.add_command(
        "unalias",
        ArgCommand::new("Unset a commit alias", Unalias)
            .arg(AliasArgument::new(ArgSpec::new("alias"))),
    )?;
    cli.add_command_aliases(&["help", "?"], HelpCommand)?;
    Ok(())
}

struct Exit;

impl RunParsed<Reviewer> for Exit {
    fn run_parsed(&self, cli: &mut Cli<Reviewer>, _name: &str, args: &ParsedArgs) -> Result<i32> {
        cli.request_stop();
        Ok(args.int("exit_code").unwrap_or(0) as i32)
    }
}

struct ListFiles;

/// One line per entry: `index: status path`, with renames and copies
/// continued on a second line.
pub fn format_file_list(entries: &[DiffEntry]) -> Vec<String> {
    let width = entries.len().saturating_sub(1).to_string().len();
    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let mut line = format!("{idx:>width$}: {} ", entry.status.as_char());
            if entry.status.is_rename_or_copy() {
                line.push_str(&format!(
                    "{}\n{:width$}    --> {}",
                    entry.old.path.as_deref().unwrap_or_default(),
                    "",
                    entry.new.path.as_deref().unwrap_or_default()
                ));
            } else {
                line.push_str(entry.path());
            }
            line
        })
        .collect()
}

impl RunParsed<Reviewer> for ListFiles {
    fn run_parsed(&self, cli: &mut Cli<Reviewer>, _name: &str, _args: &ParsedArgs) -> Result<i32> {
        let lines = format_file_list(cli.context().review().entries());
        for line in lines {
            cli.output(&line);
        }
        Ok(0)
    }
}

/// Apply a cursor move, then announce wherever the cursor ended up.
fn navigate(cli: &mut Cli<Reviewer>, step: impl FnOnce(&mut Review) -> Result<(), ReviewError>) -> i32 {
    let rc = match step(cli.context_mut().review_mut()) {
        Ok(()) => 0,
        Err(err) => {
            cli.output_error(&err);
            1
        }
    };
    index_updated(cli);
    rc
}

struct Next;

impl RunParsed<Reviewer> for Next {
    fn run_parsed(&self, cli: &mut Cli<Reviewer>, _name: &str, _args: &ParsedArgs) -> Result<i32> {
        Ok(navigate(cli, Review::next))
    }
}

struct Prev;

impl RunParsed<Reviewer> for Prev {
    fn run_parsed(&self, cli: &mut Cli<Reviewer>, _name: &str, _args: &ParsedArgs) -> Result<i32> {
        Ok(navigate(cli, Review::prev))
    }
}

struct Goto;

impl RunParsed<Reviewer> for Goto {
    fn run_parsed(&self, cli: &mut Cli<Reviewer>, _name: &str, args: &ParsedArgs) -> Result<i32> {
        let index = args.int("index").unwrap_or_default();
        let index = usize::try_from(index).unwrap_or(usize::MAX);
        Ok(navigate(cli, |review| review.goto(index)))
    }
}

/// Report a failure to locate a file in user terms and return status 1.
///
/// Errors other than repository and review conditions are passed on.
fn report_file_error(cli: &mut Cli<Reviewer>, err: anyhow::Error) -> Result<i32> {
    let message = match err.downcast_ref::<GitError>() {
        Some(GitError::NoSuchBlob(name)) => format!("no such file '{name}'"),
        Some(GitError::NotABlob(name)) => format!("not a file '{name}'"),
        Some(other) => other.to_string(),
        None => match err.downcast_ref::<ReviewError>() {
            Some(review_err) => review_err.to_string(),
            None => return Err(err),
        },
    };
    cli.output_error(&message);
    Ok(1)
}

/// Run an external program on `files` and suggest moving on afterwards.
fn run_external(cli: &mut Cli<Reviewer>, argv: &[String], files: &[ReviewFile]) -> Result<i32> {
    let paths: Vec<&Path> = files.iter().map(ReviewFile::path).collect();
    match external::run_tool(argv, &paths) {
        Ok(rc) => {
            cli.context_mut().suggest(Suggestion::Next);
            Ok(rc)
        }
        Err(err) => {
            cli.output_error(&err);
            Ok(1)
        }
    }
}

fn get_file(review: &Review, target: &CommitPath) -> Result<ReviewFile, GitError> {
    review.get_file(&target.commit, target.path.as_deref())
}

struct Diff;

impl Diff {
    fn files(review: &Review, targets: &[&CommitPath]) -> Result<Vec<ReviewFile>> {
        if targets.len() >= 2 {
            return Ok(targets
                .iter()
                .map(|target| get_file(review, target))
                .collect::<Result<_, _>>()?);
        }

        let entry = review.current_entry()?;
        let old_path = entry.old.path.as_deref();
        let new_path = entry.new.path.as_deref();

        if let Some(target) = targets.first() {
            if entry.status == Status::Deleted {
                let name = format!("{ALIAS_CHILD}:{}", old_path.unwrap_or_default());
                return Err(GitError::NoSuchBlob(name).into());
            }
            return Ok(vec![
                get_file(review, target)?,
                review.get_file(ALIAS_CHILD, new_path)?,
            ]);
        }

        Ok(match entry.status {
            Status::Deleted => vec![review.get_file(ALIAS_PARENT, old_path)?, ReviewFile::DevNull],
            Status::Added => vec![ReviewFile::DevNull, review.get_file(ALIAS_CHILD, new_path)?],
            _ => vec![
                review.get_file(ALIAS_PARENT, old_path)?,
                review.get_file(ALIAS_CHILD, new_path)?,
            ],
        })
    }
}

impl RunParsed<Reviewer> for Diff {
    fn run_parsed(&self, cli: &mut Cli<Reviewer>, _name: &str, args: &ParsedArgs) -> Result<i32> {
        let targets: Vec<&CommitPath> = ["path1", "path2", "path3"]
            .into_iter()
            .filter_map(|name| args.custom::<CommitPath>(name))
            .collect();
        let files = match Self::files(cli.context().review(), &targets) {
            Ok(files) => files,
            Err(err) => return report_file_error(cli, err),
        };
        let argv = cli.context().tools().diff.clone();
        run_external(cli, &argv, &files)
    }
}

struct View;

impl RunParsed<Reviewer> for View {
    fn run_parsed(&self, cli: &mut Cli<Reviewer>, _name: &str, args: &ParsedArgs) -> Result<i32> {
        let target = match args.custom::<CommitPath>("path") {
            Some(target) => target.clone(),
            None => {
                let current = cli.context().review().current_entry().map(|entry| {
                    if entry.status == Status::Deleted {
                        CommitPath::new(ALIAS_PARENT, entry.old.path.clone())
                    } else {
                        CommitPath::new(ALIAS_CHILD, entry.new.path.clone())
                    }
                });
                match current {
                    Ok(target) => target,
                    Err(err) => return report_file_error(cli, err.into()),
                }
            }
        };

        let file = match get_file(cli.context().review(), &target) {
            Ok(file) => file,
            Err(err) => return report_file_error(cli, err.into()),
        };
        let argv = cli.context().tools().view.clone();
        run_external(cli, &argv, &[file])
    }
}

struct Alias;

impl RunParsed<Reviewer> for Alias {
    fn run_parsed(&self, cli: &mut Cli<Reviewer>, _name: &str, args: &ParsedArgs) -> Result<i32> {
        let Some(alias) = args.str("alias") else {
            let lines: Vec<String> = cli
                .context()
                .review()
                .aliases()
                .iter()
                .map(|(alias, commit)| format!("{alias}: {commit}"))
                .collect();
            for line in lines {
                cli.output(&line);
            }
            return Ok(0);
        };

        let Some(commit) = args.str("commit") else {
            let found = cli.context().review().alias(alias).map(str::to_string);
            return match found {
                Some(commit) => {
                    cli.output(&format!("{alias}: {commit}"));
                    Ok(0)
                }
                None => {
                    cli.output_error(&ReviewError::UnknownAlias(alias.to_string()));
                    Ok(1)
                }
            };
        };

        match cli.context_mut().review_mut().set_alias(alias, commit) {
            Ok(()) => Ok(0),
            Err(err) => {
                cli.output_error(&err);
                Ok(1)
            }
        }
    }
}

struct Unalias;

impl RunParsed<Reviewer> for Unalias {
    fn run_parsed(&self, cli: &mut Cli<Reviewer>, _name: &str, args: &ParsedArgs) -> Result<i32> {
        let alias = args.str("alias").unwrap_or_default();
        match cli.context_mut().review_mut().unset_alias(alias) {
            Ok(()) => Ok(0),
            Err(err) => {
                cli.output_error(&err);
                Ok(1)
            }
        }
    }
}
