//! Request envelope exchanged with the per-host network server.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single plugin invocation as seen by the network server.
///
/// Built once from the process environment and the configuration read
/// from stdin, then serialized into the body of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CniRequest {
    /// Every environment variable of the plugin process.
    #[serde(rename = "Env")]
    pub env: BTreeMap<String, String>,
    /// Raw network configuration bytes, passed through untouched.
    #[serde(rename = "Config", with = "base64_bytes")]
    pub config: Vec<u8>,
    /// Host-side veth name, only present for ADD.
    #[serde(rename = "HostVeth", default, skip_serializing_if = "Option::is_none")]
    pub host_veth: Option<String>,
}

impl CniRequest {
    /// Assembles a request from `KEY=VALUE` environment entries.
    ///
    /// Entries are split on the first `=`; those without one, or with an
    /// empty key, are dropped.
    pub fn from_environment<I, S>(vars: I, config: &[u8], host_veth: Option<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let env = vars
            .into_iter()
            .filter_map(|item| {
                let (key, value) = item.as_ref().split_once('=')?;
                let key = key.trim();
                (!key.is_empty()).then(|| (key.to_owned(), value.to_owned()))
            })
            .collect();
        Self {
            env,
            config: config.to_vec(),
            host_veth,
        }
    }

    /// Returns a copy of this request carrying the host veth name.
    #[must_use]
    pub fn with_host_veth(&self, host_veth: impl Into<String>) -> Self {
        Self {
            host_veth: Some(host_veth.into()),
            ..self.clone()
        }
    }
}

mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::decode(encoded).map_err(serde::de::Error::custom)
    }
}
