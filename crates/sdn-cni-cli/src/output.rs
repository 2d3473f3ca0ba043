//! CNI error reporting on stdout.
//!
//! Failures are printed as `{cniVersion, code, msg, details}` so the
//! runtime can surface them; the process then exits non-zero.

use std::io::Write;

use serde::Serialize;

use sdn_cni_common::constants::PLUGIN_VERSION;
use sdn_cni_common::error::{CODE_PLUGIN_FAILURE, CniError};

/// Error object of the invocation convention.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorReport {
    /// Version of the error schema.
    #[serde(rename = "cniVersion")]
    pub cni_version: String,
    /// Well-known error code.
    pub code: u32,
    /// Short message.
    pub msg: String,
    /// Underlying causes, outermost first.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorReport {
    /// Builds a report from a command failure.
    #[must_use]
    pub fn from_failure(failure: &anyhow::Error) -> Self {
        let code = failure
            .chain()
            .find_map(|cause| cause.downcast_ref::<CniError>())
            .map_or(CODE_PLUGIN_FAILURE, CniError::code);
        let causes: Vec<String> = failure.chain().skip(1).map(ToString::to_string).collect();

        Self {
            cni_version: PLUGIN_VERSION.to_owned(),
            code,
            msg: failure.to_string(),
            details: (!causes.is_empty()).then(|| causes.join(": ")),
        }
    }
}

/// Writes the error report for `failure` to `out`.
///
/// # Errors
///
/// Returns an error if the report cannot be serialized or written.
pub fn report_error(out: &mut dyn Write, failure: &anyhow::Error) -> anyhow::Result<()> {
    let report = ErrorReport::from_failure(failure);
    writeln!(out, "{}", serde_json::to_string(&report)?)?;
    Ok(())
}
