//! Line sources for the shell loop.
//!
//! [`RustylineSource`] provides history and tab completion on a terminal;
//! [`PlainLineSource`] reads raw lines from any `BufRead`, which keeps the
//! tool scriptable through a pipe.

use std::cell::RefCell;
use std::io::BufRead;
use std::rc::Rc;

use anyhow::{Context as _, Result};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

use super::{Cli, ShellContext};

/// Where the shell loop gets its input lines.
pub trait LineSource {
    /// Read one line without its terminator. `None` means end of input.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Completion helper that forwards to [`Cli::completions`].
pub struct ShellHelper<C> {
    cli: Rc<RefCell<Cli<C>>>,
}

impl<C: ShellContext> Completer for ShellHelper<C> {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Completion never runs while a command holds the interpreter, but
        // a failed borrow must not take the editor down.
        let Ok(cli) = self.cli.try_borrow() else {
            return Ok((pos, Vec::new()));
        };
        let pairs = cli
            .completions(&line[..pos])
            .into_iter()
            .map(|c| Pair {
                display: c.display,
                replacement: c.insert,
            })
            .collect();
        Ok((pos, pairs))
    }
}

impl<C: ShellContext> Hinter for ShellHelper<C> {
    type Hint = String;
}

impl<C: ShellContext> Highlighter for ShellHelper<C> {}
impl<C: ShellContext> Validator for ShellHelper<C> {}
impl<C: ShellContext> Helper for ShellHelper<C> {}

/// Interactive input with history and completion.
pub struct RustylineSource<C: ShellContext> {
    editor: Editor<ShellHelper<C>, DefaultHistory>,
}

impl<C: ShellContext> RustylineSource<C> {
    pub fn new(cli: Rc<RefCell<Cli<C>>>, history_size: usize) -> Result<Self> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .max_history_size(history_size)
            .context("Invalid history size")?
            .build();
        let mut editor =
            Editor::with_config(config).context("Failed to initialize line editor")?;
        editor.set_helper(Some(ShellHelper { cli }));
        Ok(Self { editor })
    }
}

impl<C: ShellContext> LineSource for RustylineSource<C> {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        loop {
            match self.editor.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = self.editor.add_history_entry(line.as_str());
                    }
                    return Ok(Some(line));
                }
                // Ctrl-C abandons the line being edited.
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Ok(None),
                Err(err) => return Err(err).context("Failed to read input line"),
            }
        }
    }
}

/// Reads lines from a buffered reader, without echoing a prompt.
pub struct PlainLineSource<R> {
    reader: R,
}

impl<R: BufRead> PlainLineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for PlainLineSource<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .reader
            .read_line(&mut line)
            .context("Failed to read input line")?;
        if read == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_source_strips_terminators_and_signals_eof() {
        let mut source = PlainLineSource::new("list\r\nnext\n\nlast".as_bytes());
        assert_eq!(source.read_line("> ").unwrap().as_deref(), Some("list"));
        assert_eq!(source.read_line("> ").unwrap().as_deref(), Some("next"));
        assert_eq!(source.read_line("> ").unwrap().as_deref(), Some(""));
        assert_eq!(source.read_line("> ").unwrap().as_deref(), Some("last"));
        assert_eq!(source.read_line("> ").unwrap(), None);
    }
}
