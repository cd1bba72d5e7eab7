//! Declarative command arguments.
//!
//! An [`ArgCommand`] owns an ordered list of [`Argument`]s. Raw tokens are
//! matched to arguments by position and parsed into [`ArgValue`]s; missing
//! optional arguments take their defaults. The parsed result is handed to a
//! [`RunParsed`] handler.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use anyhow::Result;

use super::Cli;
use super::command::{Command, Completion};
use super::tokenize::escape_args;
use crate::errors::ArgumentError;

const HELP_WIDTH: usize = 78;

/// A parsed argument value.
#[derive(Clone, Default)]
pub enum ArgValue {
    /// The argument was not supplied and has no default.
    #[default]
    None,
    Str(String),
    Int(i64),
    /// A value of an argument type defined outside this module.
    Custom(Rc<dyn Any>),
}

impl ArgValue {
    pub fn custom<T: Any>(value: T) -> Self {
        ArgValue::Custom(Rc::new(value))
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::None => write!(f, "None"),
            ArgValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            ArgValue::Int(i) => f.debug_tuple("Int").field(i).finish(),
            ArgValue::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Name, display name, optionality and default of one argument.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: String,
    pub hr_name: String,
    pub optional: bool,
    pub default: ArgValue,
}

impl ArgSpec {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            hr_name: format!("<{name}>"),
            name,
            optional: false,
            default: ArgValue::None,
        }
    }

    pub fn hr_name(mut self, hr_name: impl Into<String>) -> Self {
        self.hr_name = hr_name.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Make the argument optional with the given default.
    pub fn default(mut self, value: ArgValue) -> Self {
        self.optional = true;
        self.default = value;
        self
    }
}

/// A positional argument accepted by an [`ArgCommand`].
pub trait Argument<C> {
    fn spec(&self) -> &ArgSpec;

    /// Convert a raw token. The returned error message is shown to the user.
    fn parse(&self, cli: &Cli<C>, raw: &str) -> Result<ArgValue, ArgumentError>;

    fn complete(&self, _cli: &Cli<C>, _text: &str) -> Vec<Completion> {
        Vec::new()
    }
}

/// Any string.
pub struct StringArgument {
    spec: ArgSpec,
}

impl StringArgument {
    pub fn new(spec: ArgSpec) -> Self {
        Self { spec }
    }
}

impl<C> Argument<C> for StringArgument {
    fn spec(&self) -> &ArgSpec {
        &self.spec
    }

    fn parse(&self, _cli: &Cli<C>, raw: &str) -> Result<ArgValue, ArgumentError> {
        Ok(ArgValue::Str(raw.to_string()))
    }
}

/// A decimal integer with optional inclusive bounds.
pub struct IntArgument {
    spec: ArgSpec,
    min: Option<i64>,
    max: Option<i64>,
}

impl IntArgument {
    pub fn new(spec: ArgSpec) -> Self {
        Self {
            spec,
            min: None,
            max: None,
        }
    }

    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn parse_value(&self, raw: &str) -> Result<i64, ArgumentError> {
        let hr = &self.spec.hr_name;
        let value: i64 = raw
            .trim()
            .parse()
            .map_err(|_| ArgumentError::new(format!("{hr} must be an integer")))?;
        if let Some(min) = self.min
            && value < min
        {
            return Err(ArgumentError::new(format!("{hr} must be at least {min}")));
        }
        if let Some(max) = self.max
            && value > max
        {
            return Err(ArgumentError::new(format!("{hr} must be at most {max}")));
        }
        Ok(value)
    }
}

impl<C> Argument<C> for IntArgument {
    fn spec(&self) -> &ArgSpec {
        &self.spec
    }

    fn parse(&self, _cli: &Cli<C>, raw: &str) -> Result<ArgValue, ArgumentError> {
        self.parse_value(raw).map(ArgValue::Int)
    }
}

/// Parsed arguments keyed by argument name.
#[derive(Debug, Default)]
pub struct ParsedArgs {
    values: HashMap<String, ArgValue>,
}

impl ParsedArgs {
    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn custom<T: Any>(&self, name: &str) -> Option<&T> {
        match self.values.get(name) {
            Some(ArgValue::Custom(value)) => value.downcast_ref(),
            _ => None,
        }
    }
}

/// The body of an [`ArgCommand`], invoked once all arguments parsed.
pub trait RunParsed<C> {
    fn run_parsed(&self, cli: &mut Cli<C>, name: &str, args: &ParsedArgs) -> Result<i32>;
}

/// A command with a declared argument list.
pub struct ArgCommand<C> {
    arguments: Vec<Box<dyn Argument<C>>>,
    help: String,
    handler: Box<dyn RunParsed<C>>,
}

impl<C> ArgCommand<C> {
    pub fn new(help: impl Into<String>, handler: impl RunParsed<C> + 'static) -> Self {
        Self {
            arguments: Vec::new(),
            help: help.into(),
            handler: Box::new(handler),
        }
    }

    /// Append a positional argument.
    ///
    /// # Panics
    ///
    /// Panics if a required argument follows an optional one.
    pub fn arg(mut self, argument: impl Argument<C> + 'static) -> Self {
        if let Some(last) = self.arguments.last() {
            assert!(
                !last.spec().optional || argument.spec().optional,
                "required argument {} follows an optional argument",
                argument.spec().name
            );
        }
        self.arguments.push(Box::new(argument));
        self
    }

    pub fn parse_args(&self, cli: &Cli<C>, args: &[String]) -> Result<ParsedArgs, ArgumentError> {
        if args.len() > self.arguments.len() {
            return Err(ArgumentError::new(format!(
                "trailing arguments: {}",
                escape_args(&args[self.arguments.len()..])
            )));
        }

        let mut parsed = ParsedArgs::default();
        for (argument, raw) in self.arguments.iter().zip(args) {
            let value = argument.parse(cli, raw)?;
            parsed.insert(argument.spec().name.clone(), value);
        }

        if let Some(next) = self.arguments.get(args.len())
            && !next.spec().optional
        {
            return Err(ArgumentError::new(format!("missing {}", next.spec().hr_name)));
        }
        for argument in &self.arguments[args.len()..] {
            let spec = argument.spec();
            parsed.insert(spec.name.clone(), spec.default.clone());
        }

        Ok(parsed)
    }

    /// One-line synopsis, e.g. `diff [<commit> [<commit>]]`.
    pub fn syntax(&self, name: &str) -> String {
        let mut syntax = name.to_string();
        let mut closing = String::new();
        for argument in &self.arguments {
            let spec = argument.spec();
            syntax.push(' ');
            if spec.optional {
                syntax.push('[');
                closing.push(']');
            }
            syntax.push_str(&spec.hr_name);
        }
        syntax + &closing
    }
}

impl<C> Command<C> for ArgCommand<C> {
    fn run(&self, cli: &mut Cli<C>, name: &str, args: &[String], _line: &str) -> Result<i32> {
        let parsed = self.parse_args(cli, args)?;
        self.handler.run_parsed(cli, name, &parsed)
    }

    fn help(&self, cli: &mut Cli<C>, name: &str, _args: &[String], _line: &str) {
        cli.output(&self.syntax(name));
        cli.output("");
        cli.output(&textwrap::fill(&self.help, HELP_WIDTH));
    }

    fn complete(&self, cli: &Cli<C>, _name: &str, args: &[String], text: &str) -> Vec<Completion> {
        match self.arguments.get(args.len()) {
            Some(argument) => argument.complete(cli, text),
            None => Vec::new(),
        }
    }
}
