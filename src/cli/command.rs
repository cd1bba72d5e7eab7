//! The command capability and the built-in `help` command.

use anyhow::Result;

use super::Cli;

/// One completion candidate returned by a command or argument.
///
/// `add_space` asks the shell to terminate the token after inserting it,
/// which is what the user wants once a candidate is unambiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub add_space: bool,
}

impl Completion {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            add_space: false,
        }
    }

    /// A candidate that completes the whole token.
    pub fn word(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            add_space: true,
        }
    }
}

impl From<String> for Completion {
    fn from(text: String) -> Self {
        Completion::new(text)
    }
}

/// A command that can be registered with a [`Cli`].
///
/// `args` never includes the command name itself; `name` is the name as the
/// user typed it, which may be an unambiguous prefix of the registered name.
pub trait Command<C> {
    /// Execute the command and return its status code.
    ///
    /// Returning an [`ArgumentError`](crate::errors::ArgumentError) marks the
    /// failure as user-caused; any other error is reported with full detail.
    fn run(&self, cli: &mut Cli<C>, name: &str, args: &[String], line: &str) -> Result<i32>;

    /// Print usage information.
    fn help(&self, cli: &mut Cli<C>, name: &str, args: &[String], line: &str);

    /// Return completion candidates for the partial token `text`.
    ///
    /// `args` holds the complete tokens between the command name and the
    /// token being completed.
    fn complete(&self, _cli: &Cli<C>, _name: &str, _args: &[String], _text: &str) -> Vec<Completion> {
        Vec::new()
    }
}

/// `help [<command>]`: list commands, or show help for one of them.
pub struct HelpCommand;

impl<C> Command<C> for HelpCommand {
    fn run(&self, cli: &mut Cli<C>, _name: &str, args: &[String], line: &str) -> Result<i32> {
        let Some((cmd_name, rest)) = args.split_first() else {
            let names: Vec<String> = cli.command_names().map(str::to_string).collect();
            for name in names {
                cli.output(&name);
            }
            return Ok(0);
        };

        match cli.get_command(cmd_name) {
            Ok(command) => {
                command.help(cli, cmd_name, rest, line);
                Ok(0)
            }
            Err(err) => {
                cli.output_error(&err);
                Ok(1)
            }
        }
    }

    fn help(&self, cli: &mut Cli<C>, name: &str, _args: &[String], _line: &str) {
        cli.output(&format!("{name} [<command>]"));
        cli.output("");
        cli.output("Display help");
    }

    fn complete(&self, cli: &Cli<C>, _name: &str, args: &[String], text: &str) -> Vec<Completion> {
        if !args.is_empty() {
            return Vec::new();
        }
        cli.complete_command(text)
            .into_iter()
            .map(Completion::word)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::testing::{TestContext, captured_cli};

    struct Noop;

    impl Command<TestContext> for Noop {
        fn run(&self, _: &mut Cli<TestContext>, _: &str, _: &[String], _: &str) -> Result<i32> {
            Ok(0)
        }

        fn help(&self, cli: &mut Cli<TestContext>, name: &str, _: &[String], _: &str) {
            cli.output(&format!("{name} does nothing"));
        }
    }

    #[test]
    fn help_without_args_lists_commands_sorted() {
        let (mut cli, out, _) = captured_cli();
        cli.add_command("zap", Noop).unwrap();
        cli.add_command("help", HelpCommand).unwrap();
        cli.add_command("alpha", Noop).unwrap();

        assert_eq!(cli.run_command(Some("help")), 0);
        assert_eq!(out.contents(), "alpha\nhelp\nzap\n");
    }

    #[test]
    fn help_for_prefix_uses_typed_name() {
        let (mut cli, out, _) = captured_cli();
        cli.add_command("zap", Noop).unwrap();
        cli.add_command("help", HelpCommand).unwrap();

        assert_eq!(cli.run_command(Some("help za")), 0);
        assert_eq!(out.contents(), "za does nothing\n");
    }

    #[test]
    fn help_for_unknown_command_reports_error() {
        let (mut cli, _, err) = captured_cli();
        cli.add_command("help", HelpCommand).unwrap();

        assert_eq!(cli.run_command(Some("help nope")), 1);
        assert_eq!(err.contents(), "error: no such command 'nope'\n");
    }

    #[test]
    fn help_completes_command_names_with_space() {
        let (mut cli, _, _) = captured_cli();
        cli.add_command("next", Noop).unwrap();
        cli.add_command("nextfoo", Noop).unwrap();
        cli.add_command("help", HelpCommand).unwrap();

        let completions = HelpCommand.complete(&cli, "help", &[], "nex");
        assert_eq!(
            completions,
            vec![Completion::word("next"), Completion::word("nextfoo")]
        );
        assert!(
            HelpCommand
                .complete(&cli, "help", &["next".to_string()], "")
                .is_empty()
        );
    }
}
