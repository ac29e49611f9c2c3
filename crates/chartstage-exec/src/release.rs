//! Release state as reported by `helm status` and `helm list`
//!
//! Output is captured with stderr merged in, so warnings may precede the
//! JSON document. Parsing skips ahead to the first line that opens one.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A deployed release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseStatus {
    pub name: String,
    pub namespace: String,
    pub revision: Option<u64>,
    /// Lifecycle status (`deployed`, `failed`, `pending-install`, ...)
    pub status: Option<String>,
    pub chart: Option<String>,
    pub chart_version: Option<String>,
    pub app_version: Option<String>,
}

impl ReleaseStatus {
    /// Parse `helm status -o json` output
    ///
    /// Anything that is not a release document (empty output, `{}`, an
    /// error message) yields `None`.
    pub fn parse(output: &str) -> Option<Self> {
        let payload = json_payload(output, '{')?;
        let raw: RawStatus = match serde_json::from_str(payload) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("status output is not a release document: {}", e);
                return None;
            }
        };

        let metadata = raw.chart.and_then(|c| c.metadata);
        Some(Self {
            name: raw.name,
            namespace: raw.namespace,
            revision: raw.version,
            status: raw.info.and_then(|i| i.status),
            chart: metadata.as_ref().and_then(|m| m.name.clone()),
            chart_version: metadata.as_ref().and_then(|m| m.version.clone()),
            app_version: metadata.and_then(|m| m.app_version),
        })
    }

    /// Check for the `deployed` status
    pub fn is_deployed(&self) -> bool {
        self.status.as_deref() == Some("deployed")
    }
}

/// One row of `helm list -o json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSummary {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub revision: String,
    #[serde(default)]
    pub updated: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub chart: String,
    #[serde(default)]
    pub app_version: String,
}

impl ReleaseSummary {
    /// Parse `helm list -o json` output; malformed output yields nothing
    pub fn parse_list(output: &str) -> Vec<Self> {
        let Some(payload) = json_payload(output, '[') else {
            return Vec::new();
        };
        serde_json::from_str(payload).unwrap_or_else(|e| {
            debug!("list output is not a release list: {}", e);
            Vec::new()
        })
    }
}

#[derive(Deserialize)]
struct RawStatus {
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    version: Option<u64>,
    #[serde(default)]
    info: Option<RawInfo>,
    #[serde(default)]
    chart: Option<RawChart>,
}

#[derive(Deserialize)]
struct RawInfo {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct RawChart {
    #[serde(default)]
    metadata: Option<RawMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    app_version: Option<String>,
}

/// Slice of `output` starting at the first line that opens with `open`
fn json_payload(output: &str, open: char) -> Option<&str> {
    let mut offset = 0;
    for line in output.split_inclusive('\n') {
        if line.trim_start().starts_with(open) {
            return Some(output[offset..].trim());
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = r#"{"name":"label-studio","info":{"first_deployed":"2024-01-01T00:00:00Z","status":"deployed","description":"Install complete"},"chart":{"metadata":{"name":"label-studio","version":"0.1.0","appVersion":"0.1.0","apiVersion":"v2"}},"config":{},"version":3,"namespace":"dev"}"#;

    #[test]
    fn test_parse_status() {
        let status = ReleaseStatus::parse(STATUS).unwrap();

        assert_eq!(status.name, "label-studio");
        assert_eq!(status.namespace, "dev");
        assert_eq!(status.revision, Some(3));
        assert!(status.is_deployed());
        assert_eq!(status.chart.as_deref(), Some("label-studio"));
        assert_eq!(status.chart_version.as_deref(), Some("0.1.0"));
        assert_eq!(status.app_version.as_deref(), Some("0.1.0"));
    }

    #[test]
    fn test_parse_status_after_warnings() {
        let output = format!(
            "WARNING: Kubernetes configuration file is group-readable. This is insecure.\n{}\n",
            STATUS
        );
        assert_eq!(ReleaseStatus::parse(&output).unwrap().revision, Some(3));
    }

    #[test]
    fn test_absent_outputs() {
        assert!(ReleaseStatus::parse("").is_none());
        assert!(ReleaseStatus::parse("{}").is_none());
        assert!(ReleaseStatus::parse("Error: release: not found\n").is_none());
        assert!(ReleaseStatus::parse("{ truncated").is_none());
    }

    #[test]
    fn test_parse_list() {
        let output = r#"[{"name":"web","namespace":"dev","revision":"2","updated":"2024-01-01 00:00:00 +0000 UTC","status":"deployed","chart":"web-1.0.0","app_version":"1.0.0"}]"#;

        let releases = ReleaseSummary::parse_list(output);

        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].name, "web");
        assert_eq!(releases[0].revision, "2");
        assert_eq!(releases[0].chart, "web-1.0.0");
    }

    #[test]
    fn test_parse_list_malformed() {
        assert!(ReleaseSummary::parse_list("").is_empty());
        assert!(ReleaseSummary::parse_list("[]").is_empty());
        assert!(ReleaseSummary::parse_list("Error: Kubernetes cluster unreachable\n").is_empty());
    }
}
