//! Interactive command interpreter.
//!
//! [`Cli`] owns a registry of named [`Command`]s and a context value `C`
//! that commands operate on. Lines are tokenized, the first token is
//! resolved to a command (exact match or unique prefix), and the command is
//! run with the remaining tokens. [`run_loop`] drives a [`LineSource`]
//! until a command requests a stop or input ends.

pub mod args;
pub mod command;
pub mod line_editor;
pub mod tokenize;

use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::{self, Write};
use std::rc::Rc;

use anyhow::Result;
use tracing::debug;

pub use args::{ArgCommand, ArgSpec, ArgValue, Argument, IntArgument, ParsedArgs, RunParsed, StringArgument};
pub use command::{Command, Completion, HelpCommand};
pub use line_editor::{LineSource, PlainLineSource, RustylineSource};
pub use tokenize::{escape_arg, escape_args, tokenize, tokenize_partial};

use crate::errors::{ArgumentError, CliError};

/// Hooks a context type can provide to the interpreter.
pub trait ShellContext {
    /// Called before every command dispatch.
    fn before_dispatch(&mut self) {}

    /// Line to run for an empty input line.
    ///
    /// `None` falls back to repeating the previous command.
    fn empty_line_command(&self) -> Option<String> {
        None
    }

    /// Prompt to show, overriding the interpreter's fixed prompt.
    fn prompt(&self) -> Option<String> {
        None
    }
}

/// A completion candidate prepared for a line editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineCompletion {
    /// The full candidate, for listing.
    pub display: String,
    /// Escaped text to insert at the cursor.
    pub insert: String,
}

pub struct Cli<C> {
    context: C,
    commands: BTreeMap<String, Rc<dyn Command<C>>>,
    prompt: String,
    stop: bool,
    prev_line: Option<String>,
    remember_empty_line: bool,
    color: bool,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl<C> Cli<C> {
    pub fn new(context: C) -> Self {
        Self {
            context,
            commands: BTreeMap::new(),
            prompt: "> ".to_string(),
            stop: false,
            prev_line: None,
            remember_empty_line: false,
            color: false,
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
        }
    }

    /// Redirect command output and error output.
    pub fn with_output(mut self, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        self.out = out;
        self.err = err;
        self
    }

    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// Treat empty lines as no-op history entries instead of repeating the
    /// previous command.
    pub fn set_remember_empty_line(&mut self, remember: bool) {
        self.remember_empty_line = remember;
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn prev_line(&self) -> Option<&str> {
        self.prev_line.as_deref()
    }

    pub fn is_stopped(&self) -> bool {
        self.stop
    }

    pub fn request_stop(&mut self) {
        self.stop = true;
    }

    pub fn add_command(
        &mut self,
        name: impl Into<String>,
        command: impl Command<C> + 'static,
    ) -> Result<(), CliError> {
        let name = name.into();
        if self.commands.contains_key(&name) {
            return Err(CliError::DuplicateCommand(name));
        }
        self.commands.insert(name, Rc::new(command));
        Ok(())
    }

    /// Register one command under several names.
    pub fn add_command_aliases(
        &mut self,
        names: &[&str],
        command: impl Command<C> + 'static,
    ) -> Result<(), CliError> {
        let command: Rc<dyn Command<C>> = Rc::new(command);
        for name in names {
            if self.commands.contains_key(*name) {
                return Err(CliError::DuplicateCommand(name.to_string()));
            }
            self.commands.insert(name.to_string(), Rc::clone(&command));
        }
        Ok(())
    }

    /// Registered command names, sorted.
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Resolve a command by exact name or unique prefix.
    pub fn get_command(&self, name: &str) -> Result<Rc<dyn Command<C>>, CliError> {
        if let Some(command) = self.commands.get(name) {
            return Ok(Rc::clone(command));
        }

        let matches = self.complete_command(name);
        match matches.as_slice() {
            [] => Err(CliError::NoSuchCommand(name.to_string())),
            [only] => Ok(Rc::clone(&self.commands[only])),
            _ => Err(CliError::AmbiguousCommand {
                name: name.to_string(),
                matches,
            }),
        }
    }

    /// Registered names starting with `text`, sorted.
    pub fn complete_command(&self, text: &str) -> Vec<String> {
        self.commands
            .keys()
            .filter(|name| name.starts_with(text))
            .cloned()
            .collect()
    }

    pub fn output(&mut self, msg: &str) {
        let _ = writeln!(self.out, "{msg}");
    }

    pub fn output_error(&mut self, msg: &dyn Display) {
        let label = if self.color {
            console::style("error:").red().bold().force_styling(true).to_string()
        } else {
            "error:".to_string()
        };
        let _ = writeln!(self.err, "{label} {msg}");
    }

}

impl<C: ShellContext> Cli<C> {
    pub fn prompt(&self) -> String {
        self.context.prompt().unwrap_or_else(|| self.prompt.clone())
    }

    /// Run one input line. `None` means end of input.
    pub fn run_command(&mut self, line: Option<&str>) -> i32 {
        let Some(line) = line else {
            return self.handle_eof();
        };
        if line.is_empty() {
            return self.handle_empty_line();
        }

        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                self.output_error(&err);
                return -1;
            }
        };
        let Some((name, args)) = tokens.split_first() else {
            return 0;
        };

        let rc = self.invoke_command(name, args, line);
        self.prev_line = Some(line.to_string());
        rc
    }

    /// Resolve and run a command, converting any failure into a status code.
    pub fn invoke_command(&mut self, name: &str, args: &[String], line: &str) -> i32 {
        self.context.before_dispatch();

        let command = match self.get_command(name) {
            Ok(command) => command,
            Err(err) => {
                self.output_error(&err);
                return -1;
            }
        };

        debug!(command = name, args = args.len(), "dispatching");
        match command.run(self, name, args, line) {
            Ok(rc) => rc,
            Err(err) => self.handle_command_error(err),
        }
    }

    fn handle_command_error(&mut self, err: anyhow::Error) -> i32 {
        if let Some(arg_err) = err.downcast_ref::<ArgumentError>() {
            self.output_error(arg_err);
            return -1;
        }
        debug!(error = %err, "command failed unexpectedly");
        self.output_error(&format!("{err:?}"));
        -2
    }

    fn handle_eof(&mut self) -> i32 {
        self.output("");
        self.stop = true;
        0
    }

    fn handle_empty_line(&mut self) -> i32 {
        if self.remember_empty_line {
            self.prev_line = Some(String::new());
            return 0;
        }
        if let Some(line) = self.context.empty_line_command() {
            return self.run_command(Some(&line));
        }
        match self.prev_line.clone() {
            Some(prev) if !prev.is_empty() => self.run_command(Some(&prev)),
            _ => 0,
        }
    }

    /// Completion candidates for `line`, which ends at the cursor.
    ///
    /// Candidates that do not extend the partial token are dropped; the
    /// remainder is escaped so that the inserted text tokenizes back to the
    /// candidate.
    pub fn completions(&self, line: &str) -> Vec<LineCompletion> {
        let (tokens, partial) = tokenize_partial(line);
        let text = partial.unwrap_or_default();

        let candidates: Vec<Completion> = match tokens.split_first() {
            None => self
                .complete_command(&text)
                .into_iter()
                .map(Completion::word)
                .collect(),
            Some((name, args)) => match self.get_command(name) {
                Ok(command) => command.complete(self, name, args, &text),
                Err(_) => Vec::new(),
            },
        };

        candidates
            .into_iter()
            .filter_map(|candidate| {
                let suffix = candidate.text.strip_prefix(text.as_str())?;
                let mut insert = escape_suffix(suffix);
                if candidate.add_space {
                    insert.push(' ');
                }
                Some(LineCompletion {
                    display: candidate.text,
                    insert,
                })
            })
            .collect()
    }
}

/// Escape a completion suffix without wrapping it in quotes, so it can be
/// appended to whatever the user already typed.
fn escape_suffix(suffix: &str) -> String {
    let mut escaped = String::with_capacity(suffix.len());
    for c in suffix.chars() {
        if c.is_whitespace() || matches!(c, '"' | '\'' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Read and run lines until a command requests a stop or input ends.
///
/// Returns the status of the last command run.
pub fn run_loop<C: ShellContext>(
    cli: &std::cell::RefCell<Cli<C>>,
    input: &mut dyn LineSource,
) -> Result<i32> {
    cli.borrow_mut().stop = false;
    let mut rc = 0;
    while !cli.borrow().is_stopped() {
        let prompt = cli.borrow().prompt();
        let line = input.read_line(&prompt)?;
        rc = cli.borrow_mut().run_command(line.as_deref());
    }
    Ok(rc)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    use super::{Cli, ShellContext};

    /// A `Write` sink whose contents can be inspected after the fact.
    #[derive(Clone, Default)]
    pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl SharedBuffer {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }

        pub fn clear(&self) {
            self.0.borrow_mut().clear();
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct TestContext {
        pub dispatches: usize,
        pub default_line: Option<String>,
    }

    impl ShellContext for TestContext {
        fn before_dispatch(&mut self) {
            self.dispatches += 1;
        }

        fn empty_line_command(&self) -> Option<String> {
            self.default_line.clone()
        }
    }

    pub fn captured<C: ShellContext>(context: C) -> (Cli<C>, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::default();
        let err = SharedBuffer::default();
        let cli = Cli::new(context).with_output(Box::new(out.clone()), Box::new(err.clone()));
        (cli, out, err)
    }

    pub fn captured_cli() -> (Cli<TestContext>, SharedBuffer, SharedBuffer) {
        captured(TestContext::default())
    }

    /// Feeds scripted lines, then end of input.
    pub struct ScriptedSource {
        pub lines: std::collections::VecDeque<String>,
        pub prompts: Vec<String>,
    }

    impl ScriptedSource {
        pub fn new(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|l| l.to_string()).collect(),
                prompts: Vec::new(),
            }
        }
    }

    impl super::LineSource for ScriptedSource {
        fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
            self.prompts.push(prompt.to_string());
            Ok(self.lines.pop_front())
        }
    }
}
