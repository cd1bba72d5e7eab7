//! Running the external viewer and diff programs.

use std::io;
use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::errors::SpawnError;

/// Run `argv` followed by `files` and wait for it to exit.
///
/// Returns the program's exit code, or -1 if it was killed by a signal.
pub fn run_tool(argv: &[String], files: &[&Path]) -> Result<i32, SpawnError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(SpawnError {
            program: String::new(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty command line"),
        });
    };

    debug!(program = %program, ?args, ?files, "running external program");
    let status = Command::new(program)
        .args(args)
        .args(files)
        .status()
        .map_err(|source| SpawnError {
            program: program.clone(),
            source,
        })?;
    debug!(program = %program, %status, "external program exited");
    Ok(status.code().unwrap_or(-1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn exit_code_is_returned() {
        assert_eq!(run_tool(&argv(&["true"]), &[]).unwrap(), 0);
        assert_eq!(run_tool(&argv(&["sh", "-c", "exit 3"]), &[]).unwrap(), 3);
    }

    #[test]
    fn files_are_appended_to_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "x").unwrap();
        assert_eq!(run_tool(&argv(&["test", "-f"]), &[&file]).unwrap(), 0);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = run_tool(&argv(&["git-review-no-such-program"]), &[]).unwrap_err();
        assert!(
            err.to_string()
                .starts_with("failed to invoke 'git-review-no-such-program'")
        );
        assert!(run_tool(&[], &[]).is_err());
    }
}
