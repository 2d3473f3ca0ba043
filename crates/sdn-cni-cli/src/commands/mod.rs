//! CNI command definitions and dispatch.
//!
//! The runtime passes everything through `CNI_*` environment variables;
//! each one also has a long flag for manual invocation.

pub mod add;
pub mod del;
pub mod version;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use sdn_cni_common::constants::{DEFAULT_CONFIG_PATH, DEFAULT_SOCKET_PATH};
use sdn_cni_common::error::{CniError, Result};
use sdn_cni_core::namespace::{NetNamespace, NetNs};
use sdn_cni_core::netlink::Netlink;
use sdn_cni_plugin::{CmdArgs, SdnCniPlugin, Transport};
use sdn_cni_result::version::{decode_config_version, schema_family};

/// sdn-cni — attaches pod sandboxes to the SDN overlay network.
#[derive(Parser, Debug)]
#[command(name = "sdn-cni", version, about, long_about = None)]
pub struct Cli {
    /// Command requested by the runtime.
    #[arg(long, env = "CNI_COMMAND", value_enum)]
    pub command: Option<CniCommand>,

    /// Container identifier.
    #[arg(long, env = "CNI_CONTAINERID")]
    pub container_id: Option<String>,

    /// Path of the sandbox network namespace.
    #[arg(long, env = "CNI_NETNS")]
    pub netns: Option<PathBuf>,

    /// Interface name to create inside the sandbox.
    #[arg(long, env = "CNI_IFNAME")]
    pub ifname: Option<String>,

    /// Extra `KEY=VALUE;...` arguments.
    #[arg(long, env = "CNI_ARGS", default_value = "")]
    pub cni_args: String,

    /// Plugin search path.
    #[arg(long, env = "CNI_PATH")]
    pub cni_path: Option<String>,

    /// Network server socket.
    #[arg(long, env = "SDN_CNI_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    pub socket: PathBuf,

    /// Network server configuration file.
    #[arg(long, env = "SDN_CNI_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Append JSON logs to this file. Logging is off when unset.
    #[arg(long, env = "SDN_CNI_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

/// Commands of the invocation convention.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CniCommand {
    /// Attach a sandbox.
    #[value(name = "ADD")]
    Add,
    /// Detach a sandbox.
    #[value(name = "DEL")]
    Del,
    /// Report supported versions.
    #[value(name = "VERSION")]
    Version,
}

fn required<'a>(value: Option<&'a str>, var: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(CniError::InvalidEnvironment {
            message: format!("required env variable {var} missing"),
        }),
    }
}

impl Cli {
    /// Validates the environment for `command` and bundles it with stdin.
    ///
    /// # Errors
    ///
    /// Returns an invalid-environment error naming the first missing variable.
    pub fn cmd_args(
        &self,
        command: CniCommand,
        stdin_data: Vec<u8>,
        environment: Vec<String>,
    ) -> Result<CmdArgs> {
        let container_id = required(self.container_id.as_deref(), "CNI_CONTAINERID")?;
        let netns = self.netns.as_deref().and_then(Path::to_str);
        let netns = if command == CniCommand::Add {
            required(netns, "CNI_NETNS")?
        } else {
            netns.unwrap_or_default()
        };
        let ifname = required(self.ifname.as_deref(), "CNI_IFNAME")?;
        let path = required(self.cni_path.as_deref(), "CNI_PATH")?;

        Ok(CmdArgs {
            container_id: container_id.to_owned(),
            netns: PathBuf::from(netns),
            ifname: ifname.to_owned(),
            args: self.cni_args.clone(),
            path: path.to_owned(),
            stdin_data,
            environment,
        })
    }

    /// Builds the plugin against the real kernel and network server.
    ///
    /// # Errors
    ///
    /// Returns an error if the starting network namespace cannot be opened.
    pub fn plugin(&self) -> Result<SdnCniPlugin> {
        let host_ns = NetNs::current()?;
        Ok(SdnCniPlugin::new(
            Transport::new(&self.socket),
            Box::new(host_ns),
            Box::new(Netlink),
            Box::new(|path: &Path| -> Result<Box<dyn NetNamespace>> {
                Ok(Box::new(NetNs::open(path)?))
            }),
            &self.config,
        ))
    }
}

/// Reads the network configuration and rejects unsupported versions.
///
/// # Errors
///
/// Returns an error if stdin cannot be read, the configuration is not
/// JSON, or its `cniVersion` is not supported.
pub fn read_network_config(stdin: &mut dyn Read) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let _ = stdin.read_to_end(&mut data).map_err(|e| CniError::Io {
        path: PathBuf::from("<stdin>"),
        source: e,
    })?;
    let _ = schema_family(&decode_config_version(&data)?)?;
    Ok(data)
}

/// Returns the process environment as `KEY=VALUE` entries.
pub fn process_environment() -> Vec<String> {
    std::env::vars_os()
        .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
        .collect()
}

/// Dispatches the requested command.
///
/// # Errors
///
/// Returns an error if the command is missing or fails.
pub fn execute(cli: &Cli, stdin: &mut dyn Read, stdout: &mut dyn Write) -> anyhow::Result<()> {
    let command = cli.command.ok_or_else(|| CniError::InvalidEnvironment {
        message: "required env variable CNI_COMMAND missing".into(),
    })?;
    match command {
        CniCommand::Add => add::execute(cli, stdin, stdout),
        CniCommand::Del => del::execute(cli, stdin),
        CniCommand::Version => version::execute(stdout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["sdn-cni"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn add_requires_netns() {
        let cli = parse(&[
            "--command", "ADD", "--container-id", "c1", "--ifname", "eth0", "--cni-path", "/opt/cni/bin",
        ]);
        let err = cli.cmd_args(CniCommand::Add, Vec::new(), Vec::new()).unwrap_err();
        assert!(err.to_string().contains("CNI_NETNS"));
        assert_eq!(err.code(), sdn_cni_common::error::CODE_INVALID_ENVIRONMENT);
    }

    #[test]
    fn del_tolerates_missing_netns() {
        let cli = parse(&[
            "--command", "DEL", "--container-id", "c1", "--ifname", "eth0", "--cni-path", "/opt/cni/bin",
        ]);
        let args = cli.cmd_args(CniCommand::Del, Vec::new(), Vec::new()).unwrap();
        assert_eq!(args.netns, PathBuf::new());
        assert_eq!(args.ifname, "eth0");
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["sdn-cni", "--command", "CHECK"]).is_err());
    }

    #[test]
    fn check_capable_config_version_is_rejected() {
        let mut stdin: &[u8] = br#"{"cniVersion":"0.4.0"}"#;
        let err = read_network_config(&mut stdin).unwrap_err();
        assert_eq!(err.code(), sdn_cni_common::error::CODE_INCOMPATIBLE_VERSION);
    }

    #[test]
    fn unsupported_config_version_is_rejected() {
        let mut stdin: &[u8] = br#"{"cniVersion":"1.1.0"}"#;
        let err = read_network_config(&mut stdin).unwrap_err();
        assert_eq!(err.code(), sdn_cni_common::error::CODE_INCOMPATIBLE_VERSION);
    }

    #[test]
    fn supported_config_is_returned_verbatim() {
        let raw = br#"{"cniVersion":"0.3.1","name":"sdn-cni"}"#;
        let mut stdin: &[u8] = raw;
        assert_eq!(read_network_config(&mut stdin).unwrap(), raw.to_vec());
    }

    #[test]
    fn missing_command_is_invalid_environment() {
        let cli = parse(&[]);
        let mut stdin: &[u8] = b"";
        let mut stdout = Vec::new();
        let err = execute(&cli, &mut stdin, &mut stdout).unwrap_err();
        let cni = err.downcast_ref::<CniError>().unwrap();
        assert_eq!(cni.code(), sdn_cni_common::error::CODE_INVALID_ENVIRONMENT);
    }
}
