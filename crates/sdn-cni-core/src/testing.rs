//! Recording doubles for [`LinkOps`] and [`NetNamespace`].
//!
//! Both write into one shared event log so tests can assert the order of
//! namespace switches and kernel operations.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ipnetwork::IpNetwork;

use sdn_cni_common::constants::FAST_PATH_INTERFACE;
use sdn_cni_common::error::{CniError, Result};

use crate::link::{LinkInfo, LinkOps, RouteSpec};
use crate::namespace::NetNamespace;

/// Ordered log shared between doubles and, where needed, a test server.
pub type EventLog = Arc<Mutex<Vec<String>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Appends an event to a log.
pub fn record(log: &EventLog, event: impl Into<String>) {
    lock(log).push(event.into());
}

/// Namespace double that logs `enter <name>` / `leave <name>`.
#[derive(Debug)]
pub struct RecordingNamespace {
    name: String,
    path: PathBuf,
    log: EventLog,
}

impl RecordingNamespace {
    /// Creates a namespace double named `name` with path `/var/run/netns/<name>`.
    pub fn new(name: &str, log: EventLog) -> Self {
        Self::at(name, PathBuf::from(format!("/var/run/netns/{name}")), log)
    }

    /// Creates a namespace double with an explicit path.
    pub fn at(name: &str, path: impl Into<PathBuf>, log: EventLog) -> Self {
        Self {
            name: name.to_owned(),
            path: path.into(),
            log,
        }
    }
}

impl NetNamespace for RecordingNamespace {
    fn path(&self) -> &Path {
        &self.path
    }

    fn run(&self, f: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        record(&self.log, format!("enter {}", self.name));
        let outcome = f();
        record(&self.log, format!("leave {}", self.name));
        outcome
    }
}

/// In-memory [`LinkOps`] that records every mutating call.
#[derive(Debug, Default)]
pub struct RecordingLinks {
    log: EventLog,
    links: Mutex<BTreeMap<String, LinkInfo>>,
    addresses: BTreeMap<u32, Vec<Ipv4Addr>>,
    routes: Mutex<Vec<RouteSpec>>,
    failing: Option<String>,
}

impl RecordingLinks {
    /// Returns a handle to the shared event log.
    pub fn log(&self) -> EventLog {
        Arc::clone(&self.log)
    }

    /// Returns a snapshot of the recorded events.
    pub fn events(&self) -> Vec<String> {
        lock(&self.log).clone()
    }

    /// Returns the routes installed so far.
    pub fn routes(&self) -> Vec<RouteSpec> {
        lock(&self.routes).clone()
    }

    /// Pre-creates a link named `name`.
    #[must_use]
    pub fn with_link(self, name: &str) -> Self {
        self.insert(name, None);
        self
    }

    /// Adds a fast-path interface whose parent link has `index` and carries
    /// `addresses`.
    #[must_use]
    pub fn with_macvlan(mut self, parent_index: u32, addresses: Vec<Ipv4Addr>) -> Self {
        self.insert(FAST_PATH_INTERFACE, Some(parent_index));
        let _ = self.addresses.insert(parent_index, addresses);
        self
    }

    /// Makes every operation whose event starts with `operation` fail.
    #[must_use]
    pub fn failing(mut self, operation: &str) -> Self {
        self.failing = Some(operation.to_owned());
        self
    }

    fn insert(&self, name: &str, parent_index: Option<u32>) {
        let mut links = lock(&self.links);
        let index = u32::try_from(links.len()).unwrap_or(u32::MAX).saturating_add(10);
        let _ = links.insert(
            name.to_owned(),
            LinkInfo {
                index,
                parent_index,
            },
        );
    }

    fn call(&self, event: String) -> Result<()> {
        let fails = self
            .failing
            .as_deref()
            .is_some_and(|op| event.starts_with(op));
        record(&self.log, event.clone());
        if fails {
            return Err(CniError::kernel(event, "injected failure"));
        }
        Ok(())
    }
}

impl LinkOps for RecordingLinks {
    fn create_veth_pair(
        &self,
        host_name: &str,
        container_name: &str,
        mtu: u32,
        container_ns: &Path,
    ) -> Result<()> {
        self.call(format!(
            "create_veth_pair {container_name} {mtu} {}",
            container_ns.display()
        ))?;
        self.insert(host_name, None);
        self.insert(container_name, None);
        Ok(())
    }

    fn delete_link(&self, name: &str) -> Result<()> {
        self.call(format!("delete_link {name}"))?;
        let _ = lock(&self.links).remove(name);
        Ok(())
    }

    fn link_by_name(&self, name: &str) -> Result<Option<LinkInfo>> {
        Ok(lock(&self.links).get(name).cloned())
    }

    fn set_link_up(&self, name: &str) -> Result<()> {
        self.call(format!("set_link_up {name}"))
    }

    fn set_hw_addr(&self, name: &str, mac: &str) -> Result<()> {
        self.call(format!("set_hw_addr {name} {mac}"))
    }

    fn add_address(&self, name: &str, address: &IpNetwork) -> Result<()> {
        self.call(format!("add_address {name} {address}"))
    }

    fn add_route(&self, route: &RouteSpec) -> Result<()> {
        let via = route.gw.map_or_else(|| "on-link".to_owned(), |gw| gw.to_string());
        self.call(format!("add_route {} via {via}", route.dst))?;
        lock(&self.routes).push(route.clone());
        Ok(())
    }

    fn ipv4_addresses(&self, index: u32) -> Result<Vec<Ipv4Addr>> {
        self.call(format!("ipv4_addresses {index}"))?;
        Ok(self.addresses.get(&index).cloned().unwrap_or_default())
    }
}
