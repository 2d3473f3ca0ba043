//! # sdn-cni — SDN network attachment plugin
//!
//! Invoked by the container runtime with `CNI_*` variables and the network
//! configuration on stdin. Results and errors are printed to stdout.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod commands;
mod output;

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use sdn_cni_common::error::CniError;

use crate::commands::Cli;

/// Appends JSON logs to `log_file`. Stdout belongs to the runtime, so
/// without a file nothing is installed.
fn init_logging(log_file: Option<&Path>) {
    let Some(path) = log_file else {
        return;
    };
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(Mutex::new(file)),
        )
        .try_init();
}

fn run(cli: &Cli, stdout: &mut dyn std::io::Write) -> anyhow::Result<()> {
    let mut stdin = std::io::stdin().lock();
    commands::execute(cli, &mut stdin, stdout)
}

fn main() -> ExitCode {
    let mut stdout = std::io::stdout().lock();

    let outcome = match Cli::try_parse() {
        Ok(cli) => {
            init_logging(cli.log_file.as_deref());
            tracing::debug!(command = ?cli.command, container = ?cli.container_id, "invoked");
            run(&cli, &mut stdout)
        }
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => Err(CniError::InvalidEnvironment {
            message: e.to_string().trim_end().to_owned(),
        }
        .into()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            tracing::error!(error = %failure, "command failed");
            let _ = output::report_error(&mut stdout, &failure);
            ExitCode::FAILURE
        }
    }
}
