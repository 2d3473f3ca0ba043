//! Version negotiation: reading the requested schema version from a network
//! configuration and re-projecting results into it.

use serde::{Deserialize, Serialize};

use sdn_cni_common::constants::{
    CURRENT_VERSIONS, DEFAULT_CONFIG_VERSION, LEGACY_VERSIONS, supported_versions_list,
};
use sdn_cni_common::error::{CniError, Result};

use crate::convert::{current_to_legacy, legacy_to_current};
use crate::current::CurrentResult;
use crate::legacy::LegacyResult;

/// A result in one of the supported schema families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CniResult {
    /// 0.1.0 / 0.2.0 schema.
    Legacy(LegacyResult),
    /// 0.3.0 and later schema.
    Current(CurrentResult),
}

/// Schema family a version string belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFamily {
    /// One block per address family.
    Legacy,
    /// Flat address and route lists.
    Current,
}

/// Classifies a version string.
///
/// # Errors
///
/// Returns an incompatible-version error for versions outside the supported set.
pub fn schema_family(version: &str) -> Result<SchemaFamily> {
    if LEGACY_VERSIONS.contains(&version) {
        Ok(SchemaFamily::Legacy)
    } else if CURRENT_VERSIONS.contains(&version) {
        Ok(SchemaFamily::Current)
    } else {
        Err(CniError::IncompatibleVersion {
            version: version.to_owned(),
            supported: supported_versions_list(),
        })
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    #[serde(rename = "cniVersion", default)]
    cni_version: String,
}

/// Reads the `cniVersion` a network configuration asks for.
///
/// A configuration without a version, or with an empty one, asks for 0.1.0.
///
/// # Errors
///
/// Returns a decode error if the configuration is not a JSON object.
pub fn decode_config_version(raw: &[u8]) -> Result<String> {
    let probe: VersionProbe = serde_json::from_slice(raw).map_err(|e| CniError::Decode {
        what: "version from network config",
        message: e.to_string(),
    })?;
    if probe.cni_version.is_empty() {
        Ok(DEFAULT_CONFIG_VERSION.to_owned())
    } else {
        Ok(probe.cni_version)
    }
}

impl CniResult {
    /// Returns the declared schema version.
    pub fn version(&self) -> &str {
        match self {
            Self::Legacy(r) => &r.cni_version,
            Self::Current(r) => &r.cni_version,
        }
    }

    /// Decodes a result, choosing the schema from its `cniVersion`.
    ///
    /// # Errors
    ///
    /// Returns an error if the version is unsupported or the body does not
    /// match its declared schema.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let version = decode_config_version(body)?;
        match schema_family(&version)? {
            SchemaFamily::Legacy => LegacyResult::from_slice(body).map(Self::Legacy),
            SchemaFamily::Current => serde_json::from_slice(body)
                .map(Self::Current)
                .map_err(|e| CniError::Decode {
                    what: "result",
                    message: e.to_string(),
                }),
        }
    }

    /// Re-expresses this result in `version`.
    ///
    /// # Errors
    ///
    /// Returns an error if `version` is unsupported or the result has no
    /// addresses to project.
    pub fn as_version(&self, version: &str) -> Result<Self> {
        let converted = match (self, schema_family(version)?) {
            (Self::Legacy(r), SchemaFamily::Legacy) => Self::Legacy(LegacyResult {
                cni_version: version.to_owned(),
                ..r.clone()
            }),
            (Self::Legacy(r), SchemaFamily::Current) => Self::Current(CurrentResult {
                cni_version: version.to_owned(),
                ..legacy_to_current(r)?
            }),
            (Self::Current(r), SchemaFamily::Legacy) => {
                Self::Legacy(current_to_legacy(r, version)?)
            }
            (Self::Current(r), SchemaFamily::Current) => Self::Current(CurrentResult {
                cni_version: version.to_owned(),
                ..r.clone()
            }),
        };
        Ok(converted)
    }

    /// Serializes the result for standard output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Projects `result` into the version requested by the raw network
/// configuration.
///
/// # Errors
///
/// Returns an error if the requested version cannot be decoded or is not
/// supported.
pub fn negotiate(raw_config: &[u8], result: &CniResult) -> Result<CniResult> {
    let requested = decode_config_version(raw_config)?;
    tracing::debug!(from = result.version(), to = %requested, "negotiating result version");
    result.as_version(&requested)
}
