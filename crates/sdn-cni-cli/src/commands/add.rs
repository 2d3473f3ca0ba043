//! `ADD` — attach a sandbox and print the result.

use std::io::{Read, Write};

use super::{Cli, CniCommand, process_environment, read_network_config};

/// Executes the `ADD` command.
///
/// # Errors
///
/// Returns an error if the environment is incomplete, the plugin fails,
/// or the result cannot be written.
pub fn execute(cli: &Cli, stdin: &mut dyn Read, stdout: &mut dyn Write) -> anyhow::Result<()> {
    let stdin_data = read_network_config(stdin)?;
    let args = cli.cmd_args(CniCommand::Add, stdin_data, process_environment())?;
    let result = cli.plugin()?.cmd_add(&args)?;

    let json = result.to_json()?;
    tracing::debug!(output = %json, "ADD result");
    writeln!(stdout, "{json}")?;
    Ok(())
}
