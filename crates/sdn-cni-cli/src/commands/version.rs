//! `VERSION` — report the result versions this plugin speaks.

use std::io::Write;

use serde::Serialize;

use sdn_cni_common::constants::{PLUGIN_VERSION, SUPPORTED_VERSIONS};

#[derive(Serialize)]
struct VersionInfo {
    #[serde(rename = "cniVersion")]
    cni_version: &'static str,
    #[serde(rename = "supportedVersions")]
    supported_versions: &'static [&'static str],
}

/// Executes the `VERSION` command.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn execute(stdout: &mut dyn Write) -> anyhow::Result<()> {
    let info = VersionInfo {
        cni_version: PLUGIN_VERSION,
        supported_versions: SUPPORTED_VERSIONS,
    };
    writeln!(stdout, "{}", serde_json::to_string(&info)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_supported_version() {
        let mut out = Vec::new();
        execute(&mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["cniVersion"], "0.3.1");
        assert_eq!(
            value["supportedVersions"],
            serde_json::json!(["0.1.0", "0.2.0", "0.3.0", "0.3.1"])
        );
    }
}
