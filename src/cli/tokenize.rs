//! Line tokenizer with quoting and backslash escapes.
//!
//! Tokens are separated by unquoted whitespace. Single or double quotes group
//! text (including whitespace) into the current token, and a backslash makes
//! the following character literal both inside and outside of quotes.
//!
//! The tokenizer can run in two modes. Full tokenization processes the end of
//! the input, which terminates the last token (or fails when a quote or escape
//! is still open). Partial tokenization stops before processing the end, which
//! leaves the in-progress text available as the *partial token*; this is what
//! tab completion uses.

use std::collections::VecDeque;
use std::str::Chars;

use crate::errors::{PartialTokenKind, TokenizeError};

const DELIMITERS: [char; 4] = [' ', '\t', '\n', '\r'];
const QUOTES: [char; 2] = ['"', '\''];
const ESCAPE: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    Quote(char),
    Escape,
}

/// Incremental tokenizer over a single input line.
///
/// States are kept on a stack so that an escape entered inside a quote
/// returns to that quote once the escaped character has been consumed.
pub struct Tokenizer<'a> {
    chars: Chars<'a>,
    states: Vec<State>,
    current: Option<String>,
    ready: VecDeque<String>,
    processed_end: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            chars: line.chars(),
            states: vec![State::Normal],
            current: None,
            ready: VecDeque::new(),
            processed_end: false,
        }
    }

    /// Return all remaining tokens, processing the end of input.
    pub fn tokens(&mut self) -> Result<Vec<String>, TokenizeError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Return all tokens that have been terminated by a delimiter.
    ///
    /// The end of input is not processed, so trailing text stays in
    /// [`Tokenizer::partial_token`]. This never fails: an open quote or
    /// escape simply remains open.
    pub fn partial_tokens(&mut self) -> Vec<String> {
        let mut tokens = Vec::new();
        loop {
            while let Some(token) = self.ready.pop_front() {
                tokens.push(token);
            }
            match self.chars.next() {
                Some(c) => self.feed(c),
                None => break,
            }
        }
        tokens
    }

    /// Return the next complete token, or `None` once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Option<String>, TokenizeError> {
        while self.ready.is_empty() {
            if self.processed_end {
                return Ok(None);
            }
            match self.chars.next() {
                Some(c) => self.feed(c),
                None => self.end_of_input()?,
            }
        }
        Ok(self.ready.pop_front())
    }

    /// The text of the token currently being built, if one has been started.
    pub fn partial_token(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn state(&self) -> State {
        self.states.last().copied().unwrap_or(State::Normal)
    }

    fn feed(&mut self, c: char) {
        match self.state() {
            State::Normal => {
                if c == ESCAPE {
                    self.states.push(State::Escape);
                } else if QUOTES.contains(&c) {
                    // A quote always starts a token, even an empty one.
                    self.current.get_or_insert_with(String::new);
                    self.states.push(State::Quote(c));
                } else if DELIMITERS.contains(&c) {
                    self.end_token();
                } else {
                    self.push_char(c);
                }
            }
            State::Quote(quote) => {
                if c == quote {
                    self.states.pop();
                } else if c == ESCAPE {
                    self.states.push(State::Escape);
                } else {
                    self.push_char(c);
                }
            }
            State::Escape => {
                self.push_char(c);
                self.states.pop();
            }
        }
    }

    fn end_of_input(&mut self) -> Result<(), TokenizeError> {
        self.processed_end = true;
        let kind = match self.state() {
            State::Normal => {
                self.end_token();
                return Ok(());
            }
            State::Quote(_) => PartialTokenKind::UnterminatedQuote,
            State::Escape => PartialTokenKind::UnterminatedEscape,
        };
        Err(TokenizeError::PartialToken {
            token: self.current.clone(),
            kind,
        })
    }

    fn push_char(&mut self, c: char) {
        self.current.get_or_insert_with(String::new).push(c);
    }

    fn end_token(&mut self) {
        if let Some(token) = self.current.take() {
            self.ready.push_back(token);
        }
    }
}

/// Tokenize a complete line.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    Tokenizer::new(line).tokens()
}

/// Tokenize a line that may end in the middle of a token.
///
/// Returns the terminated tokens plus the partial token, if any.
pub fn tokenize_partial(line: &str) -> (Vec<String>, Option<String>) {
    let mut tokenizer = Tokenizer::new(line);
    let tokens = tokenizer.partial_tokens();
    let partial = tokenizer.partial_token().map(str::to_string);
    (tokens, partial)
}

/// Quote a single argument so that [`tokenize`] reads it back unchanged.
///
/// Arguments containing a double quote are wrapped in single quotes, and
/// arguments containing a single quote (but no double quote) in double quotes.
/// Whitespace and empty arguments are wrapped in double quotes. Inside the
/// quotes only backslashes and the quote character itself need escaping.
/// Plain arguments are returned as-is, with any backslashes doubled.
///
/// This is not sufficient for passing strings to a POSIX shell.
pub fn escape_arg(arg: &str) -> String {
    let needs_quotes =
        arg.is_empty() || arg.contains(|c: char| QUOTES.contains(&c) || DELIMITERS.contains(&c));
    if !needs_quotes {
        return arg.replace(ESCAPE, "\\\\");
    }

    let quote = if arg.contains('"') { '\'' } else { '"' };
    let mut escaped = String::with_capacity(arg.len() + 2);
    escaped.push(quote);
    for c in arg.chars() {
        if c == ESCAPE || c == quote {
            escaped.push(ESCAPE);
        }
        escaped.push(c);
    }
    escaped.push(quote);
    escaped
}

/// Quote and join several arguments with single spaces.
pub fn escape_args<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|arg| escape_arg(arg.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
