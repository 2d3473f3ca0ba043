//! `DEL` — detach a sandbox.

use std::io::Read;

use super::{Cli, CniCommand, process_environment, read_network_config};

/// Executes the `DEL` command.
///
/// # Errors
///
/// Returns an error if the environment is incomplete or the server rejects
/// the request.
pub fn execute(cli: &Cli, stdin: &mut dyn Read) -> anyhow::Result<()> {
    let stdin_data = read_network_config(stdin)?;
    let args = cli.cmd_args(CniCommand::Del, stdin_data, process_environment())?;
    cli.plugin()?.cmd_del(&args)?;
    Ok(())
}
