//! # sdn-cni-plugin
//!
//! Command logic of the network plugin. ADD creates the veth pair,
//! delegates address allocation and host-side plumbing to the per-host
//! network server, configures the sandbox, and answers in the version the
//! runtime asked for. DEL only delegates.

pub mod plugin;
pub mod transport;

pub use plugin::{CmdArgs, NamespaceOpener, SdnCniPlugin};
pub use transport::Transport;
