//! System-wide constants and default paths.

/// Unix socket on which the per-host network server listens.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/sdn-cni/cni-server.sock";

/// Server-owned configuration file carrying MTU, service CIDR, and DNS address.
pub const DEFAULT_CONFIG_PATH: &str = "/var/run/sdn-cni/config.json";

/// Request URL used for every call; the host part is ignored by the socket connector.
pub const SERVER_URL_PATH: &str = "/";

/// Current-schema version this plugin normalizes results into.
pub const IMPLEMENTED_VERSION: &str = "0.3.1";

/// Version reported by the `VERSION` command.
pub const PLUGIN_VERSION: &str = "0.3.1";

/// Version assumed when a network configuration does not declare one.
pub const DEFAULT_CONFIG_VERSION: &str = "0.1.0";

/// Result schema versions using one block per address family.
pub const LEGACY_VERSIONS: &[&str] = &["0.1.0", "0.2.0"];

/// Result schema versions using flat address and route lists.
pub const CURRENT_VERSIONS: &[&str] = &["0.3.0", "0.3.1"];

/// Every result schema version the plugin accepts and emits.
pub const SUPPORTED_VERSIONS: &[&str] = &["0.1.0", "0.2.0", "0.3.0", "0.3.1"];

/// Name of the optional fast-path interface inside the sandbox.
pub const FAST_PATH_INTERFACE: &str = "macvlan0";

/// Name of the loopback interface.
pub const LOOPBACK_INTERFACE: &str = "lo";

/// Prefix of generated host-side veth names.
pub const HOST_VETH_PREFIX: &str = "veth";

/// Locally administered OUI prefix used for MACs derived from IPv4 addresses.
pub const IPV4_MAC_PREFIX: [u8; 2] = [0x0a, 0x58];

/// Returns the supported versions as a comma-separated list.
pub fn supported_versions_list() -> String {
    SUPPORTED_VERSIONS.join(", ")
}
