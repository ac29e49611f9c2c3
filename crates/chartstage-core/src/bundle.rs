//! Bundle descriptors and repository locators

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{CoreError, Result};
use crate::values::Values;

/// Where a bundle is fetched from
///
/// Descriptor files carry optional `path`, `url` and `repository` fields;
/// when several are set the precedence is local path, then URL, then
/// named repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryLocator {
    /// Chart directory on the local filesystem
    Local { path: PathBuf },

    /// Chart repository URL (`https://...`) or OCI registry (`oci://...`)
    Url { url: String },

    /// Repository registered with the package manager under a name
    Named { repo: String },
}

impl RepositoryLocator {
    /// Apply locator precedence to the optional descriptor fields
    pub fn from_fields(
        name: &str,
        path: Option<PathBuf>,
        url: Option<String>,
        repository: Option<String>,
    ) -> Result<Self> {
        let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

        if let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) {
            return Ok(Self::Local { path });
        }

        if let Some(url) = non_empty(url) {
            let parsed = url::Url::parse(&url).map_err(|e| CoreError::InvalidLocator {
                name: name.to_string(),
                message: format!("invalid URL '{}': {}", url, e),
            })?;
            return match parsed.scheme() {
                "http" | "https" | "oci" => Ok(Self::Url {
                    url: url.trim_end_matches('/').to_string(),
                }),
                other => Err(CoreError::InvalidLocator {
                    name: name.to_string(),
                    message: format!("unsupported URL scheme '{}'", other),
                }),
            };
        }

        if let Some(repo) = non_empty(repository) {
            return Ok(Self::Named { repo });
        }

        Err(CoreError::InvalidLocator {
            name: name.to_string(),
            message: "one of `path`, `url` or `repository` is required".to_string(),
        })
    }

    /// Check for an OCI registry reference
    pub fn is_oci(&self) -> bool {
        matches!(self, Self::Url { url } if url.starts_with("oci://"))
    }

    /// Check whether fetching requires the package manager
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::Local { .. })
    }
}

impl fmt::Display for RepositoryLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { path } => write!(f, "{}", path.display()),
            Self::Url { url } => write!(f, "{}", url),
            Self::Named { repo } => write!(f, "{}", repo),
        }
    }
}

/// A bundle to be staged: name, source, version and its own value overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BundleSpec", into = "BundleSpec")]
pub struct BundleDescriptor {
    pub name: String,
    pub version: String,
    pub locator: RepositoryLocator,
    pub overrides: Values,
}

impl BundleDescriptor {
    /// Create a descriptor with no overrides
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        locator: RepositoryLocator,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            locator,
            overrides: Values::new(),
        }
    }

    /// Attach value overrides
    pub fn with_overrides(mut self, overrides: Values) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Reason `value` cannot name a single directory, if any
pub fn path_component_problem(value: &str) -> Option<&'static str> {
    if value.trim().is_empty() {
        Some("must not be empty")
    } else if value.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if value == "." || value == ".." {
        Some("must not be a relative path component")
    } else {
        None
    }
}

/// Check that a bundle name can be used as a directory under `charts/`
pub fn check_name(name: &str) -> Result<()> {
    match path_component_problem(name) {
        Some(reason) => Err(CoreError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Serialized descriptor form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BundleSpec {
    name: String,

    version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    repository: Option<String>,

    #[serde(default, skip_serializing_if = "Values::is_empty")]
    overrides: Values,
}

impl TryFrom<BundleSpec> for BundleDescriptor {
    type Error = CoreError;

    fn try_from(spec: BundleSpec) -> Result<Self> {
        check_name(&spec.name)?;

        let locator =
            RepositoryLocator::from_fields(&spec.name, spec.path, spec.url, spec.repository)?;

        Ok(Self {
            name: spec.name,
            version: spec.version,
            locator,
            overrides: Values::from_value(spec.overrides.into_inner()),
        })
    }
}

impl From<BundleDescriptor> for BundleSpec {
    fn from(desc: BundleDescriptor) -> Self {
        let (path, url, repository) = match desc.locator {
            RepositoryLocator::Local { path } => (Some(path), None, None),
            RepositoryLocator::Url { url } => (None, Some(url), None),
            RepositoryLocator::Named { repo } => (None, None, Some(repo)),
        };

        Self {
            name: desc.name,
            version: desc.version,
            path,
            url,
            repository,
            overrides: desc.overrides,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_repository() {
        let desc: BundleDescriptor = serde_yaml::from_str(
            r#"
name: label-studio
repository: heartex
version: 1.1.4
overrides:
  ci: true
"#,
        )
        .unwrap();

        assert_eq!(
            desc.locator,
            RepositoryLocator::Named {
                repo: "heartex".into()
            }
        );
        assert_eq!(desc.overrides.get("ci").unwrap().as_bool(), Some(true));
    }

    #[test]
    fn test_url_wins_over_named_repository() {
        let desc: BundleDescriptor = serde_yaml::from_str(
            r#"
name: label-studio
repository: heartex
url: https://charts.heartex.com/
version: 1.1.4
"#,
        )
        .unwrap();

        assert_eq!(
            desc.locator,
            RepositoryLocator::Url {
                url: "https://charts.heartex.com".into()
            }
        );
        assert!(desc.overrides.is_empty());
    }

    #[test]
    fn test_local_path_wins_over_everything() {
        let locator = RepositoryLocator::from_fields(
            "redis",
            Some(PathBuf::from("./vendor/redis")),
            Some("https://charts.example.com".into()),
            Some("bitnami".into()),
        )
        .unwrap();

        assert_eq!(
            locator,
            RepositoryLocator::Local {
                path: PathBuf::from("./vendor/redis")
            }
        );
        assert!(!locator.is_remote());
    }

    #[test]
    fn test_oci_url() {
        let locator = RepositoryLocator::from_fields(
            "redis",
            None,
            Some("oci://registry-1.docker.io/bitnamicharts".into()),
            None,
        )
        .unwrap();
        assert!(locator.is_oci());
        assert!(locator.is_remote());
    }

    #[test]
    fn test_missing_locator_rejected() {
        let err =
            serde_yaml::from_str::<BundleDescriptor>("name: redis\nversion: 1.0.0\n").unwrap_err();
        assert!(err.to_string().contains("one of `path`, `url` or `repository`"));
    }

    #[test]
    fn test_unsupported_scheme_rejected() {
        let err =
            RepositoryLocator::from_fields("redis", None, Some("ftp://example.com".into()), None)
                .unwrap_err();
        assert!(matches!(err, CoreError::InvalidLocator { .. }));
    }

    #[test]
    fn test_empty_fields_are_ignored() {
        let locator =
            RepositoryLocator::from_fields("redis", None, Some("  ".into()), Some("bitnami".into()))
                .unwrap();
        assert_eq!(
            locator,
            RepositoryLocator::Named {
                repo: "bitnami".into()
            }
        );
    }

    #[test]
    fn test_serialize_keeps_single_locator_field() {
        let desc = BundleDescriptor::new(
            "redis",
            "17.0.0",
            RepositoryLocator::Named {
                repo: "bitnami".into(),
            },
        );

        let yaml = serde_yaml::to_string(&desc).unwrap();
        assert_eq!(yaml, "name: redis\nversion: 17.0.0\nrepository: bitnami\n");
    }

    #[test]
    fn test_name_must_be_a_single_directory() {
        for name in ["../templates", "a/b", "..", ".", ""] {
            let yaml = format!("name: '{}'\nrepository: bitnami\nversion: 1.0.0\n", name);
            let err = serde_yaml::from_str::<BundleDescriptor>(&yaml).unwrap_err();
            assert!(err.to_string().contains("Invalid bundle name"), "{}: {}", name, err);
        }

        assert!(check_name("redis").is_ok());
        assert!(matches!(
            check_name("../../etc"),
            Err(CoreError::InvalidName { .. })
        ));
    }
}
