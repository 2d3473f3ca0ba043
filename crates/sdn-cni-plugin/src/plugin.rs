//! ADD and DEL command sequencing.

use std::path::{Path, PathBuf};

use sdn_cni_common::config::ServerConfig;
use sdn_cni_common::error::Result;
use sdn_cni_common::types::CniRequest;
use sdn_cni_core::configure::NamespaceConfigurator;
use sdn_cni_core::fastpath::FastPathTargets;
use sdn_cni_core::link::LinkOps;
use sdn_cni_core::namespace::NetNamespace;
use sdn_cni_core::veth;
use sdn_cni_result::convert::legacy_to_current;
use sdn_cni_result::types::Interface;
use sdn_cni_result::version::{decode_config_version, schema_family};
use sdn_cni_result::{CniResult, CurrentResult, LegacyResult, negotiate};

use crate::transport::Transport;

/// Opens a network namespace by path.
pub type NamespaceOpener = Box<dyn Fn(&Path) -> Result<Box<dyn NetNamespace>>>;

/// Arguments of one invocation, as handed over by the runtime.
#[derive(Debug, Clone, Default)]
pub struct CmdArgs {
    /// Container identifier.
    pub container_id: String,
    /// Path of the sandbox network namespace.
    pub netns: PathBuf,
    /// Interface name to create inside the sandbox.
    pub ifname: String,
    /// Extra `KEY=VALUE;...` arguments.
    pub args: String,
    /// Plugin search path.
    pub path: String,
    /// Network configuration read from stdin.
    pub stdin_data: Vec<u8>,
    /// Process environment as `KEY=VALUE` entries.
    pub environment: Vec<String>,
}

impl CmdArgs {
    fn request(&self) -> CniRequest {
        CniRequest::from_environment(&self.environment, &self.stdin_data, None)
    }
}

/// The network plugin: one instance per process, one command per instance.
pub struct SdnCniPlugin {
    transport: Transport,
    host_ns: Box<dyn NetNamespace>,
    links: Box<dyn LinkOps>,
    open_ns: NamespaceOpener,
    config_path: PathBuf,
}

impl SdnCniPlugin {
    /// Creates a plugin.
    ///
    /// `host_ns` must be the namespace the process started in.
    pub fn new(
        transport: Transport,
        host_ns: Box<dyn NetNamespace>,
        links: Box<dyn LinkOps>,
        open_ns: NamespaceOpener,
        config_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            host_ns,
            links,
            open_ns,
            config_path: config_path.into(),
        }
    }

    /// Attaches the sandbox and returns the result in the requested version.
    ///
    /// # Errors
    ///
    /// Returns the first failure. Kernel state created before the failure
    /// is left for DEL to clean up, except the host veth, which is removed
    /// when the server does not return a usable result.
    pub fn cmd_add(&self, args: &CmdArgs) -> Result<CniResult> {
        tracing::info!(container_id = %args.container_id, ifname = %args.ifname, "ADD");
        tracing::debug!(cni_args = %args.args, cni_path = %args.path, "invocation");
        let request = args.request();
        let _ = schema_family(&decode_config_version(&request.config)?)?;
        let config = ServerConfig::load(&self.config_path)?;
        let service_network = config.service_network()?;
        let dns = config.dns_address()?;

        let container_ns = (self.open_ns)(&args.netns)?;
        let configurator = NamespaceConfigurator::new(
            self.links.as_ref(),
            self.host_ns.as_ref(),
            container_ns.as_ref(),
            &args.ifname,
        );

        let host_veth = configurator.create_veth_pair(config.mtu)?;
        let reported = match self.server_add(&request, &host_veth) {
            Ok(result) => result,
            Err(e) => {
                configurator.remove_host_veth(&host_veth);
                return Err(e);
            }
        };

        let mut ipam = reported.clone();
        let gateway = ipam.take_default_gateway()?;
        let interface = sandbox_interface(&ipam, args)?;
        ipam.attach_sandbox_interface(interface.clone());

        let targets = FastPathTargets {
            service_network,
            dns,
            gateway,
        };
        let fast_path_routes = configurator.configure(&interface.mac, &ipam, &targets)?;

        let mut reported = reported;
        reported.attach_sandbox_interface(interface);
        let result = negotiate(&request.config, &CniResult::Current(reported))?;
        tracing::info!(
            container_id = %args.container_id,
            host_veth = %host_veth,
            fast_path_routes,
            version = result.version(),
            "ADD complete"
        );
        Ok(result)
    }

    /// Detaches the sandbox.
    ///
    /// # Errors
    ///
    /// Returns the server's error.
    pub fn cmd_del(&self, args: &CmdArgs) -> Result<()> {
        tracing::info!(container_id = %args.container_id, ifname = %args.ifname, "DEL");
        tracing::debug!(cni_args = %args.args, cni_path = %args.path, "invocation");
        let _ = self.transport.post(self.host_ns.as_ref(), &args.request())?;
        Ok(())
    }

    /// Sends the attach request and normalizes the server's legacy result.
    fn server_add(&self, request: &CniRequest, host_veth: &str) -> Result<CurrentResult> {
        let body = self
            .transport
            .post(self.host_ns.as_ref(), &request.with_host_veth(host_veth))?;
        let legacy = LegacyResult::from_slice(&body)?;
        legacy_to_current(&legacy)
    }
}

fn sandbox_interface(result: &CurrentResult, args: &CmdArgs) -> Result<Interface> {
    Ok(Interface {
        name: args.ifname.clone(),
        mac: veth::mac_from_ipv4(result.sole_ipv4_addr()?),
        sandbox: args.netns.to_string_lossy().into_owned(),
    })
}
