//! [`LinkOps`] over route netlink.
//!
//! Each call opens its own netlink socket on a current-thread runtime. A
//! socket is bound to the network namespace of the thread that creates it,
//! so calls issued inside [`crate::namespace::within`] act on that
//! namespace. Kernel refusals are classified by errno, never by message.

use std::fs::File;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr};
use std::os::fd::AsRawFd;
use std::path::Path;

use futures::TryStreamExt;
use ipnetwork::IpNetwork;
use netlink_packet_route::address::{AddressAttribute, AddressMessage};
use netlink_packet_route::link::{LinkAttribute, LinkMessage};
use netlink_packet_route::route::RouteScope;
use nix::errno::Errno;
use rtnetlink::Handle;

use sdn_cni_common::error::{CniError, Result};

use crate::link::{LinkInfo, LinkOps, RouteSpec};

type NetlinkResult<T> = std::result::Result<T, rtnetlink::Error>;

/// Drives the kernel through rtnetlink.
#[derive(Debug, Clone, Copy, Default)]
pub struct Netlink;

impl Netlink {
    fn run<T, F, Fut>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnOnce(Handle) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CniError::kernel(operation, e))?;
        runtime.block_on(async {
            let (connection, handle, _) = rtnetlink::new_connection()
                .map_err(|e| CniError::kernel("open netlink socket", e))?;
            let _connection = tokio::spawn(connection);
            f(handle).await
        })
    }
}

fn errno(err: &rtnetlink::Error) -> Option<Errno> {
    match err {
        rtnetlink::Error::NetlinkError(message) => {
            message.code.map(|code| Errno::from_raw(code.get().abs()))
        }
        _ => None,
    }
}

/// Maps "no such device" to `None`.
fn absent_as_none<T>(lookup: NetlinkResult<Option<T>>) -> NetlinkResult<Option<T>> {
    match lookup {
        Err(e) if errno(&e) == Some(Errno::ENODEV) => Ok(None),
        other => other,
    }
}

/// Treats an already-present route as installed.
fn tolerate_existing(outcome: NetlinkResult<()>, dst: &IpNetwork) -> Result<()> {
    match outcome {
        Ok(()) => Ok(()),
        Err(e) if errno(&e) == Some(Errno::EEXIST) => {
            tracing::debug!(dst = %dst, "route already present");
            Ok(())
        }
        Err(e) => Err(CniError::kernel(format!("add route to {dst}"), e)),
    }
}

fn parse_mac(mac: &str) -> Result<Vec<u8>> {
    let octets = mac
        .split(':')
        .map(|octet| u8::from_str_radix(octet, 16))
        .collect::<std::result::Result<Vec<u8>, _>>()
        .ok()
        .filter(|octets| octets.len() == 6);
    octets.ok_or_else(|| CniError::Config {
        message: format!("invalid hardware address '{mac}'"),
    })
}

fn parent_index(link: &LinkMessage) -> Option<u32> {
    link.attributes.iter().find_map(|attr| match attr {
        LinkAttribute::Link(index) => Some(*index),
        _ => None,
    })
}

fn local_ipv4(address: &AddressMessage) -> Option<Ipv4Addr> {
    address.attributes.iter().find_map(|attr| match attr {
        AddressAttribute::Local(IpAddr::V4(ip)) => Some(*ip),
        _ => None,
    })
}

async fn find_link(handle: &Handle, name: &str) -> Result<Option<LinkMessage>> {
    let lookup = handle
        .link()
        .get()
        .match_name(name.to_owned())
        .execute()
        .try_next()
        .await;
    absent_as_none(lookup).map_err(|e| CniError::kernel(format!("look up link {name}"), e))
}

async fn link_index(handle: &Handle, name: &str) -> Result<u32> {
    find_link(handle, name)
        .await?
        .map(|link| link.header.index)
        .ok_or_else(|| CniError::kernel(format!("look up link {name}"), "no such device"))
}

async fn install_route(handle: &Handle, route: &RouteSpec, oif: Option<u32>) -> Result<()> {
    let outcome = match (route.dst, route.gw) {
        (IpNetwork::V4(dst), gw @ (None | Some(IpAddr::V4(_)))) => {
            let mut request = handle
                .route()
                .add()
                .v4()
                .destination_prefix(dst.network(), dst.prefix());
            request = match gw {
                Some(IpAddr::V4(gw)) => request.gateway(gw),
                _ => request.scope(RouteScope::Link),
            };
            if let Some(index) = oif {
                request = request.output_interface(index);
            }
            request.execute().await
        }
        (IpNetwork::V6(dst), gw @ (None | Some(IpAddr::V6(_)))) => {
            let mut request = handle
                .route()
                .add()
                .v6()
                .destination_prefix(dst.network(), dst.prefix());
            request = match gw {
                Some(IpAddr::V6(gw)) => request.gateway(gw),
                _ => request.scope(RouteScope::Link),
            };
            if let Some(index) = oif {
                request = request.output_interface(index);
            }
            request.execute().await
        }
        (dst, Some(gw)) => {
            return Err(CniError::kernel(
                format!("add route to {dst}"),
                format!("gateway {gw} is in another address family"),
            ));
        }
    };
    tolerate_existing(outcome, &route.dst)
}

impl LinkOps for Netlink {
    fn create_veth_pair(
        &self,
        host_name: &str,
        container_name: &str,
        mtu: u32,
        container_ns: &Path,
    ) -> Result<()> {
        let netns = File::open(container_ns).map_err(|e| CniError::Namespace {
            path: container_ns.to_path_buf(),
            source: e,
        })?;
        self.run("create container veth", |handle| async move {
            handle
                .link()
                .add()
                .veth(host_name.to_owned(), container_name.to_owned())
                .execute()
                .await
                .map_err(|e| CniError::kernel("create container veth", e))?;

            for name in [host_name, container_name] {
                let index = link_index(&handle, name).await?;
                handle
                    .link()
                    .set(index)
                    .mtu(mtu)
                    .execute()
                    .await
                    .map_err(|e| CniError::kernel(format!("set {name} MTU"), e))?;
            }

            let peer = link_index(&handle, container_name).await?;
            handle
                .link()
                .set(peer)
                .setns_by_fd(netns.as_raw_fd())
                .execute()
                .await
                .map_err(|e| CniError::kernel(format!("move {container_name} to container namespace"), e))
        })
    }

    fn delete_link(&self, name: &str) -> Result<()> {
        self.run("delete link", |handle| async move {
            let index = link_index(&handle, name).await?;
            handle
                .link()
                .del(index)
                .execute()
                .await
                .map_err(|e| CniError::kernel(format!("delete link {name}"), e))
        })
    }

    fn link_by_name(&self, name: &str) -> Result<Option<LinkInfo>> {
        self.run("look up link", |handle| async move {
            Ok(find_link(&handle, name).await?.map(|link| LinkInfo {
                index: link.header.index,
                parent_index: parent_index(&link),
            }))
        })
    }

    fn set_link_up(&self, name: &str) -> Result<()> {
        self.run("set link up", |handle| async move {
            let index = link_index(&handle, name).await?;
            handle
                .link()
                .set(index)
                .up()
                .execute()
                .await
                .map_err(|e| CniError::kernel(format!("set {name} up"), e))
        })
    }

    fn set_hw_addr(&self, name: &str, mac: &str) -> Result<()> {
        let octets = parse_mac(mac)?;
        self.run("set MAC address", |handle| async move {
            let index = link_index(&handle, name).await?;
            handle
                .link()
                .set(index)
                .address(octets)
                .execute()
                .await
                .map_err(|e| CniError::kernel(format!("set {name} MAC address"), e))
        })
    }

    fn add_address(&self, name: &str, address: &IpNetwork) -> Result<()> {
        self.run("add address", |handle| async move {
            let index = link_index(&handle, name).await?;
            handle
                .address()
                .add(index, address.ip(), address.prefix())
                .execute()
                .await
                .map_err(|e| CniError::kernel(format!("add IP addr {address} to {name}"), e))
        })
    }

    fn add_route(&self, route: &RouteSpec) -> Result<()> {
        self.run("add route", |handle| async move {
            let oif = match route.dev.as_deref() {
                Some(dev) => Some(link_index(&handle, dev).await?),
                None => None,
            };
            install_route(&handle, route, oif).await
        })
    }

    fn ipv4_addresses(&self, index: u32) -> Result<Vec<Ipv4Addr>> {
        self.run("list IPv4 addresses", |handle| async move {
            let addresses: Vec<AddressMessage> = handle
                .address()
                .get()
                .set_link_index_filter(index)
                .execute()
                .try_collect()
                .await
                .map_err(|e| CniError::kernel("list IPv4 addresses", e))?;
            Ok(addresses.iter().filter_map(local_ipv4).collect())
        })
    }
}
