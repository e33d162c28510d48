//! completions command - Shell completion scripts
//!
//! Needs neither a device nor a configuration file, so it runs before either
//! is loaded.

use std::io::Write;

use clap::{Args, CommandFactory};
use clap_complete::Shell;

use super::Cli;
use crate::exit_code::ExitCode;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Execute the completions command
pub fn execute(args: &CompletionsArgs) -> ExitCode {
    let mut stdout = std::io::stdout().lock();
    write_script(args.shell, &mut stdout);
    if stdout.flush().is_err() {
        return ExitCode::GeneralError;
    }
    ExitCode::Success
}

/// Write the completion script for `shell` into `out`
fn write_script(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        let mut buf = Vec::new();
        write_script(shell, &mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_every_shell_knows_the_transfer_commands() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell, Shell::Elvish] {
            let script = script(shell);
            for command in ["ls", "stat", "mkdir", "put", "get", "du"] {
                assert!(script.contains(command), "{shell:?} script lacks {command}");
            }
        }
    }

    #[test]
    fn test_global_flags_are_offered() {
        let bash = script(Shell::Bash);
        assert!(bash.contains("--device"));
        assert!(bash.contains("--storage"));
        assert!(bash.contains("--no-progress"));
    }
}
