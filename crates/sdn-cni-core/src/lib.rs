//! # sdn-cni-core
//!
//! Linux network primitives for the sdn-cni plugin.
//!
//! This crate provides:
//! - **Namespace scoping**: run a block inside a network namespace and
//!   always return to the previous one (`setns(2)`).
//! - **Link operations**: the [`link::LinkOps`] capability surface and its
//!   rtnetlink implementation.
//! - **Sandbox setup**: veth creation, IPAM application, loopback, and
//!   fast-path host routes.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod configure;
pub mod fastpath;
pub mod ipam;
pub mod link;
pub mod namespace;
pub mod netlink;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod veth;
