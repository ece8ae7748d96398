//! Shell completion generation
//!
//! Generate shell completion scripts for bash, zsh, fish, and powershell.
//! The scripts cover the `sync`/`plan` settings flags, so CI job authors can
//! tab-complete `--local-path`, `--exclude-regex` and friends.

use clap::CommandFactory;
use clap_complete::Shell;

use super::Cli;
use crate::exit_code::ExitCode;

/// Arguments for the completions command
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Generate shell completions and print to stdout
pub fn execute(args: CompletionsArgs) -> ExitCode {
    print!("{}", render(args.shell));
    ExitCode::Success
}

/// Completion script for `shell`, registered under the `bsync` binary name
fn render(shell: Shell) -> String {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, name, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}
