//! Legacy result schema (0.1.0 and 0.2.0): one block per address family.

use serde::{Deserialize, Serialize};

use sdn_cni_common::error::{CniError, Result};

use crate::types::{Dns, IpBlock};

/// Result as returned by the network server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyResult {
    /// Declared schema version.
    #[serde(rename = "cniVersion", default)]
    pub cni_version: String,
    /// IPv4 configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip4: Option<IpBlock>,
    /// IPv6 configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip6: Option<IpBlock>,
    /// DNS settings.
    #[serde(default)]
    pub dns: Dns,
}

impl LegacyResult {
    /// Decodes a legacy result from a server response body.
    ///
    /// # Errors
    ///
    /// Returns a decode error quoting the body if it is not a legacy result.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| CniError::Decode {
            what: "server result",
            message: format!(
                "failed to unmarshal response '{}': {e}",
                String::from_utf8_lossy(body)
            ),
        })
    }
}
