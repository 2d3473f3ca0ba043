//! # sdn-cni-result
//!
//! Result schemas exchanged with the network server and the container
//! runtime, and the conversions between them:
//! - **Legacy** (0.1.0, 0.2.0): one block per address family.
//! - **Current** (0.3.0, 0.3.1): flat address, route, and interface lists.
//!
//! Results flow server-native (legacy) → internal (current) → requested.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod convert;
pub mod current;
pub mod legacy;
pub mod types;
pub mod version;

pub use current::CurrentResult;
pub use legacy::LegacyResult;
pub use version::{CniResult, negotiate};
