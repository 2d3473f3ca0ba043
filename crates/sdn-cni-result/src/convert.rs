//! Conversions between the legacy and current result schemas.
//!
//! Each family's gateway stays with that family's address. Route next hops
//! are copied as declared: a route without `gw` never picks up a gateway
//! during conversion, in either direction.

use sdn_cni_common::constants::IMPLEMENTED_VERSION;
use sdn_cni_common::error::{CniError, Result};

use crate::current::CurrentResult;
use crate::legacy::LegacyResult;
use crate::types::{IpBlock, IpConfig, IpFamily};

fn no_addresses() -> CniError {
    CniError::Conversion {
        message: "no valid IP addresses".into(),
    }
}

/// Normalizes a legacy result into the current schema.
///
/// # Errors
///
/// Returns a conversion error if neither an IPv4 nor an IPv6 block is present.
pub fn legacy_to_current(legacy: &LegacyResult) -> Result<CurrentResult> {
    let mut current = CurrentResult {
        cni_version: IMPLEMENTED_VERSION.to_owned(),
        dns: legacy.dns.clone(),
        ..CurrentResult::default()
    };

    let blocks = [(IpFamily::V4, &legacy.ip4), (IpFamily::V6, &legacy.ip6)];
    for (family, block) in blocks {
        let Some(block) = block else { continue };
        current.ips.push(IpConfig {
            version: family,
            interface: None,
            address: block.ip,
            gateway: block.gateway,
        });
        current.routes.extend(block.routes.iter().cloned());
    }

    if current.ips.is_empty() {
        return Err(no_addresses());
    }
    tracing::debug!(addresses = current.ips.len(), routes = current.routes.len(), "normalized legacy result");
    Ok(current)
}

/// Projects a current result onto the legacy schema at `version`.
///
/// Only the first address of each family survives; routes go to the block
/// of their destination's family and are dropped if that family has no
/// address.
///
/// # Errors
///
/// Returns a conversion error if the result has no addresses.
pub fn current_to_legacy(current: &CurrentResult, version: &str) -> Result<LegacyResult> {
    let mut legacy = LegacyResult {
        cni_version: version.to_owned(),
        dns: current.dns.clone(),
        ..LegacyResult::default()
    };

    for ip in &current.ips {
        let slot = match ip.version {
            IpFamily::V4 => &mut legacy.ip4,
            IpFamily::V6 => &mut legacy.ip6,
        };
        if slot.is_none() {
            *slot = Some(IpBlock {
                ip: ip.address,
                gateway: ip.gateway,
                routes: Vec::new(),
            });
        }
    }

    for route in &current.routes {
        let slot = match IpFamily::of(&route.dst) {
            IpFamily::V4 => &mut legacy.ip4,
            IpFamily::V6 => &mut legacy.ip6,
        };
        if let Some(block) = slot {
            block.routes.push(route.clone());
        }
    }

    if legacy.ip4.is_none() && legacy.ip6.is_none() {
        return Err(no_addresses());
    }
    Ok(legacy)
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::types::Route;

    fn route(dst: &str, gw: Option<&str>) -> Route {
        Route {
            dst: dst.parse().unwrap(),
            gw: gw.map(|g| g.parse().unwrap()),
        }
    }

    fn block(ip: &str, gateway: &str, routes: Vec<Route>) -> IpBlock {
        IpBlock {
            ip: ip.parse().unwrap(),
            gateway: Some(gateway.parse().unwrap()),
            routes,
        }
    }

    #[test]
    fn ipv4_only_yields_one_address_with_its_gateway() {
        let legacy = LegacyResult {
            cni_version: "0.2.0".into(),
            ip4: Some(block("10.128.0.5/23", "10.128.0.1", vec![route("0.0.0.0/0", None)])),
            ..LegacyResult::default()
        };

        let current = legacy_to_current(&legacy).unwrap();
        assert_eq!(current.cni_version, IMPLEMENTED_VERSION);
        assert_eq!(current.ips.len(), 1);
        assert_eq!(current.ips[0].version, IpFamily::V4);
        assert_eq!(current.ips[0].gateway, Some("10.128.0.1".parse::<IpAddr>().unwrap()));
        assert!(current.ips.iter().all(|ip| ip.version != IpFamily::V6));
        assert_eq!(current.routes, vec![route("0.0.0.0/0", None)]);
    }

    #[test]
    fn dual_stack_keeps_gateways_and_routes_per_family() {
        let legacy = LegacyResult {
            cni_version: "0.2.0".into(),
            ip4: Some(block(
                "10.128.0.5/23",
                "10.128.0.1",
                vec![route("10.128.0.0/14", None), route("192.168.0.0/16", Some("10.128.0.254"))],
            )),
            ip6: Some(block("fd01::5/64", "fd01::1", vec![route("fd02::/48", None)])),
            ..LegacyResult::default()
        };

        let current = legacy_to_current(&legacy).unwrap();
        assert_eq!(current.ips.len(), 2);
        assert_eq!(current.ips[0].gateway, Some("10.128.0.1".parse().unwrap()));
        assert_eq!(current.ips[1].version, IpFamily::V6);
        assert_eq!(current.ips[1].gateway, Some("fd01::1".parse().unwrap()));

        assert_eq!(
            current.routes,
            vec![
                route("10.128.0.0/14", None),
                route("192.168.0.0/16", Some("10.128.0.254")),
                route("fd02::/48", None),
            ]
        );
        for r in &current.routes {
            if let Some(gw) = r.gw {
                assert_eq!(gw.is_ipv4(), r.dst.is_ipv4());
            }
        }
    }

    #[test]
    fn empty_legacy_result_is_rejected() {
        let err = legacy_to_current(&LegacyResult::default()).unwrap_err();
        assert!(matches!(err, CniError::Conversion { .. }));
        assert!(err.to_string().contains("no valid IP addresses"));
    }

    #[test]
    fn dns_is_copied_verbatim() {
        let mut legacy = LegacyResult {
            ip4: Some(block("10.128.0.5/23", "10.128.0.1", Vec::new())),
            ..LegacyResult::default()
        };
        legacy.dns.nameservers = vec!["172.30.0.10".into()];
        legacy.dns.search = vec!["cluster.local".into()];

        let current = legacy_to_current(&legacy).unwrap();
        assert_eq!(current.dns, legacy.dns);
    }

    #[test]
    fn current_to_legacy_sorts_routes_by_destination_family() {
        let legacy = LegacyResult {
            ip4: Some(block("10.128.0.5/23", "10.128.0.1", vec![route("0.0.0.0/0", None)])),
            ip6: Some(block("fd01::5/64", "fd01::1", vec![route("::/0", Some("fd01::fe"))])),
            ..LegacyResult::default()
        };
        let current = legacy_to_current(&legacy).unwrap();

        let back = current_to_legacy(&current, "0.2.0").unwrap();
        assert_eq!(back.cni_version, "0.2.0");
        assert_eq!(back.ip4, legacy.ip4);
        assert_eq!(back.ip6, legacy.ip6);
    }

    #[test]
    fn current_to_legacy_drops_routes_of_absent_family() {
        let mut current = legacy_to_current(&LegacyResult {
            ip4: Some(block("10.128.0.5/23", "10.128.0.1", Vec::new())),
            ..LegacyResult::default()
        })
        .unwrap();
        current.routes.push(route("fd02::/48", None));

        let legacy = current_to_legacy(&current, "0.1.0").unwrap();
        assert!(legacy.ip6.is_none());
        assert!(legacy.ip4.unwrap().routes.is_empty());
    }

    #[test]
    fn current_to_legacy_keeps_first_address_per_family() {
        let mut current = legacy_to_current(&LegacyResult {
            ip4: Some(block("10.128.0.5/23", "10.128.0.1", Vec::new())),
            ..LegacyResult::default()
        })
        .unwrap();
        current.ips.push(IpConfig {
            version: IpFamily::V4,
            interface: None,
            address: "10.129.0.9/23".parse().unwrap(),
            gateway: None,
        });

        let legacy = current_to_legacy(&current, "0.2.0").unwrap();
        assert_eq!(legacy.ip4.unwrap().ip.to_string(), "10.128.0.5/23");
    }

    #[test]
    fn current_to_legacy_without_addresses_fails() {
        assert!(current_to_legacy(&CurrentResult::default(), "0.2.0").is_err());
    }
}
