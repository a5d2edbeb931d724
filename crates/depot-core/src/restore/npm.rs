//! npm registry layout.
//!
//! Tarballs live at `<name>/-/<name>-<version>.tgz` (`@scope/name/-/name-<version>.tgz` for
//! scoped packages). Everything else, such as the package root metadata, has no component.

use serde_json::{json, Value};

use super::{archive::read_tgz_entry, ComponentQuery, RestoreBlobData, RestoreBlobStrategy};
use crate::{
    error::{DepotError, ErrorContext},
    DepotResult,
};

const PACKAGE_JSON: &str = "package/package.json";

/// Name and version parsed from a tarball path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmTarball {
    pub scope: Option<String>,
    pub name: String,
    pub version: String,
}

impl NpmTarball {
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.trim_start_matches('/');
        let (package, file_name) = path.split_once("/-/")?;

        let (scope, name) = match package.strip_prefix('@') {
            Some(scoped) => {
                let (scope, name) = scoped.split_once('/')?;
                (Some(scope.to_string()), name)
            }
            None => (None, package),
        };
        if name.is_empty() || name.contains('/') || scope.as_deref() == Some("") {
            return None;
        }

        let version = file_name
            .strip_prefix(name)?
            .strip_prefix('-')?
            .strip_suffix(".tgz")?;
        if version.is_empty() || version.contains('/') {
            return None;
        }

        Some(Self {
            scope,
            name: name.to_string(),
            version: version.to_string(),
        })
    }

    /// Full package name as npm prints it, e.g. `@types/node`.
    pub fn package_name(&self) -> String {
        match &self.scope {
            Some(scope) => format!("@{scope}/{}", self.name),
            None => self.name.clone(),
        }
    }
}

pub struct NpmRestoreBlobStrategy;

impl NpmRestoreBlobStrategy {
    fn read_package_json(data: &RestoreBlobData) -> DepotResult<Value> {
        let content = data.blob.open_content()?;
        let raw = read_tgz_entry(content, |path| path == PACKAGE_JSON)
            .with_context(|| format!("reading npm tarball {}", data.blob_name))?
            .ok_or_else(|| {
                DepotError::invalid_data(
                    format!("reading npm tarball {}", data.blob_name),
                    "no package/package.json",
                )
            })?;

        serde_json::from_slice(&raw).map_err(|err| {
            DepotError::invalid_data(
                format!("parsing package.json of {}", data.blob_name),
                err.to_string(),
            )
        })
    }
}

impl RestoreBlobStrategy for NpmRestoreBlobStrategy {
    fn format(&self) -> &'static str {
        "npm"
    }

    fn component_required(&self, path: &str) -> bool {
        NpmTarball::parse(path).is_some()
    }

    fn extract_attributes(&self, data: &RestoreBlobData) -> DepotResult<Value> {
        if NpmTarball::parse(&data.blob_name).is_none() {
            return Ok(json!({}));
        }

        let package = Self::read_package_json(data)?;
        let name = package.get("name").and_then(Value::as_str);
        let version = package.get("version").and_then(Value::as_str);
        let (Some(name), Some(version)) = (name, version) else {
            return Err(DepotError::invalid_data(
                format!("parsing package.json of {}", data.blob_name),
                "name and version are required",
            ));
        };

        let mut attributes = json!({ "name": name, "version": version });
        for field in ["description", "license", "keywords", "author"] {
            if let Some(value) = package.get(field) {
                attributes[field] = value.clone();
            }
        }
        Ok(attributes)
    }

    fn component_query(&self, path: &str, attributes: &Value) -> Option<ComponentQuery> {
        let tarball = NpmTarball::parse(path)?;
        let version = attributes
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or(&tarball.version);
        Some(ComponentQuery {
            namespace: tarball.scope.clone().unwrap_or_default(),
            name: tarball.name.clone(),
            version: version.to_string(),
            kind: None,
        })
    }

    fn asset_kind(&self, path: &str) -> Option<&'static str> {
        Some(if NpmTarball::parse(path).is_some() {
            "TARBALL"
        } else {
            "PACKAGE_ROOT"
        })
    }
}

#[cfg(test)]
mod tests {
    use depot_db::repository::content::ContentRepository;

    use super::*;
    use crate::restore::{
        archive::tests::{gzip, tar_with},
        restore_blob,
        test_support::Fixture,
        RestoreOptions, RestoreOutcome,
    };

    fn tarball(package_json: &str) -> Vec<u8> {
        gzip(&tar_with(&[
            ("package/package.json", package_json.as_bytes()),
            ("package/index.js", b"module.exports = 1;".as_slice()),
        ]))
    }

    #[test]
    fn test_parse_tarball_paths() {
        let plain = NpmTarball::parse("left-pad/-/left-pad-1.3.0.tgz").unwrap();
        assert_eq!(plain.scope, None);
        assert_eq!(plain.name, "left-pad");
        assert_eq!(plain.version, "1.3.0");

        let scoped = NpmTarball::parse("@types/node/-/node-20.1.0-beta.1.tgz").unwrap();
        assert_eq!(scoped.scope.as_deref(), Some("types"));
        assert_eq!(scoped.package_name(), "@types/node");
        assert_eq!(scoped.version, "20.1.0-beta.1");
    }

    #[test]
    fn test_parse_rejects_other_paths() {
        assert!(NpmTarball::parse("left-pad").is_none());
        assert!(NpmTarball::parse("left-pad/-/other-1.0.0.tgz").is_none());
        assert!(NpmTarball::parse("left-pad/-/left-pad-1.0.0.tar").is_none());
        assert!(NpmTarball::parse("@/x/-/x-1.0.0.tgz").is_none());
    }

    #[test]
    fn test_restore_scoped_tarball() {
        let fixture = Fixture::new();
        let data = fixture.put(
            "npm-hosted",
            "@acme/widget/-/widget-2.1.0.tgz",
            &tarball(r#"{"name":"@acme/widget","version":"2.1.0","license":"MIT"}"#),
        );

        let outcome = restore_blob(
            &NpmRestoreBlobStrategy,
            &data,
            &fixture.content,
            &RestoreOptions::default(),
        )
        .unwrap();
        assert!(matches!(outcome, RestoreOutcome::Restored { component_id: Some(_), .. }));

        let component = fixture
            .content
            .with_conn(|conn| {
                ContentRepository::find_component(conn, "npm-hosted", "acme", "widget", "2.1.0")
            })
            .unwrap()
            .unwrap();
        assert_eq!(component.attributes["npm"]["license"], "MIT");
    }

    #[test]
    fn test_package_root_has_no_component() {
        let fixture = Fixture::new();
        let data = fixture.put("npm-hosted", "left-pad", br#"{"name":"left-pad"}"#);
        let outcome = restore_blob(
            &NpmRestoreBlobStrategy,
            &data,
            &fixture.content,
            &RestoreOptions::default(),
        )
        .unwrap();
        assert_eq!(
            outcome,
            RestoreOutcome::Restored {
                path: "left-pad".into(),
                component_id: None,
            }
        );
    }

    #[test]
    fn test_tarball_without_version_is_invalid() {
        let fixture = Fixture::new();
        let data = fixture.put(
            "npm-hosted",
            "left-pad/-/left-pad-1.0.0.tgz",
            &tarball(r#"{"name":"left-pad"}"#),
        );
        let err = NpmRestoreBlobStrategy.extract_attributes(&data).unwrap_err();
        assert!(matches!(err, DepotError::IoError { .. }));
    }

    #[test]
    fn test_corrupt_tarball_is_io_error() {
        let fixture = Fixture::new();
        let data = fixture.put("npm-hosted", "left-pad/-/left-pad-1.0.0.tgz", b"not gzip");
        let err = restore_blob(
            &NpmRestoreBlobStrategy,
            &data,
            &fixture.content,
            &RestoreOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DepotError::IoError { .. }));
    }
}
