//! Veth naming and hardware addressing.

use std::net::Ipv4Addr;

use sdn_cni_common::constants::{HOST_VETH_PREFIX, IPV4_MAC_PREFIX};

/// Generates a host-side veth name such as `veth1a2b3c4d`.
pub fn random_host_veth_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{HOST_VETH_PREFIX}{}", &id[..8])
}

/// Derives the MAC address of a pod interface from its IPv4 address.
///
/// The address bytes follow a fixed locally administered prefix, so the
/// MAC is stable for a given IP.
pub fn mac_from_ipv4(ip: Ipv4Addr) -> String {
    let [a, b] = IPV4_MAC_PREFIX;
    let [c, d, e, f] = ip.octets();
    format!("{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{f:02x}")
}
