//! Configuration for git-review.
//!
//! Settings are layered: the optional `config.toml` in the user's config
//! directory, then environment variables, then command-line flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [tools]
//! view = "less -R"
//! diff = "vimdiff -R"
//!
//! [shell]
//! history_size = 200
//! ```
//!
//! Tool command lines are split with the shell tokenizer, so quoting works
//! the same way it does at the review prompt.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::tokenize;

const DEFAULT_HISTORY_SIZE: usize = 1000;

/// `[tools]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsSection {
    /// Program used by `view`
    #[serde(default)]
    pub view: Option<String>,
    /// Program used by `diff`
    #[serde(default)]
    pub diff: Option<String>,
}

/// `[shell]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellSection {
    /// Number of lines kept in interactive history
    #[serde(default = "default_history_size")]
    pub history_size: usize,
}

impl Default for ShellSection {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_HISTORY_SIZE,
        }
    }
}

fn default_history_size() -> usize {
    DEFAULT_HISTORY_SIZE
}

/// The complete config.toml structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewToml {
    #[serde(default)]
    pub tools: ToolsSection,
    #[serde(default)]
    pub shell: ShellSection,
}

impl ReviewToml {
    /// Location of the user's config file, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("git-review").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    /// Load `path`, or the defaults if it does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (key, value) in [("view", &self.tools.view), ("diff", &self.tools.diff)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                warnings.push(format!("Empty tools.{key} entry is ignored"));
            }
        }
        if self.shell.history_size == 0 {
            warnings.push("shell.history_size is 0: history is disabled".to_string());
        }
        warnings
    }
}

/// Values given on the command line, which override everything else.
#[derive(Debug, Clone, Default)]
pub struct ToolOverrides {
    pub viewer: Option<String>,
    pub differ: Option<String>,
}

/// Tokenized external program command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommands {
    pub view: Vec<String>,
    pub diff: Vec<String>,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub tools: ToolCommands,
    pub history_size: usize,
}

impl ReviewConfig {
    /// Load from the default config file and the process environment.
    pub fn load(overrides: &ToolOverrides) -> Result<Self> {
        let path = ReviewToml::default_path();
        let file = ReviewToml::load_or_default(path.as_deref())?;
        Self::resolve(&file, |name| std::env::var(name).ok(), overrides)
    }

    /// Resolve each setting from its layers.
    ///
    /// Viewer: `--viewer`, `GIT_REVIEW_VIEW`, `tools.view`, `GIT_EDITOR`,
    /// `VISUAL`, `EDITOR`, then `vi`. Diff: `--differ`, `GIT_REVIEW_DIFF`,
    /// `tools.diff`, then `tkdiff` under X or `vimdiff -R` otherwise.
    pub fn resolve(
        file: &ReviewToml,
        env: impl Fn(&str) -> Option<String>,
        overrides: &ToolOverrides,
    ) -> Result<Self> {
        let env = |name: &str| env(name).filter(|value| !value.trim().is_empty());
        let from_file = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());

        let view = overrides
            .viewer
            .clone()
            .or_else(|| env("GIT_REVIEW_VIEW"))
            .or_else(|| from_file(&file.tools.view))
            .or_else(|| env("GIT_EDITOR"))
            .or_else(|| env("VISUAL"))
            .or_else(|| env("EDITOR"))
            .unwrap_or_else(|| "vi".to_string());

        let diff = overrides
            .differ
            .clone()
            .or_else(|| env("GIT_REVIEW_DIFF"))
            .or_else(|| from_file(&file.tools.diff))
            .unwrap_or_else(|| {
                if env("DISPLAY").is_some() {
                    "tkdiff".to_string()
                } else {
                    "vimdiff -R".to_string()
                }
            });

        Ok(Self {
            tools: ToolCommands {
                view: split_command("viewer", &view)?,
                diff: split_command("diff", &diff)?,
            },
            history_size: file.shell.history_size,
        })
    }
}

fn split_command(what: &str, command: &str) -> Result<Vec<String>> {
    let argv = tokenize(command).with_context(|| format!("Invalid {what} command: {command}"))?;
    if argv.first().is_none_or(|program| program.is_empty()) {
        bail!("Empty {what} command");
    }
    Ok(argv)
}
