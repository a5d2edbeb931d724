//! Maven 2 layout: `<group path>/<artifactId>/<version>/<artifactId>-<version>[-classifier].<ext>`.

use std::{collections::HashMap, io::Read, sync::OnceLock};

use regex::Regex;
use serde_json::{json, Value};

use super::{archive::MAX_METADATA_SIZE, ComponentQuery, RestoreBlobData, RestoreBlobStrategy};
use crate::{error::ErrorContext, DepotResult};

const METADATA_FILE: &str = "maven-metadata.xml";
const HASH_SUFFIXES: [&str; 4] = [".sha1", ".md5", ".sha256", ".sha512"];
const SIGNATURE_SUFFIX: &str = ".asc";

/// Coordinates parsed from an artifact path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MavenCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub base_version: String,
    pub version: String,
    pub classifier: Option<String>,
    pub extension: String,
}

impl MavenCoordinates {
    fn to_value(&self) -> Value {
        json!({
            "groupId": self.group_id,
            "artifactId": self.artifact_id,
            "baseVersion": self.base_version,
            "version": self.version,
            "classifier": self.classifier,
            "extension": self.extension,
        })
    }
}

fn snapshot_version_re() -> &'static Regex {
    static SNAPSHOT_VERSION_RE: OnceLock<Regex> = OnceLock::new();
    SNAPSHOT_VERSION_RE.get_or_init(|| Regex::new(r"^\d{8}\.\d{6}-\d+").unwrap())
}

fn packaging_re() -> &'static Regex {
    static PACKAGING_RE: OnceLock<Regex> = OnceLock::new();
    PACKAGING_RE.get_or_init(|| Regex::new(r"<packaging>\s*([^<\s]+)\s*</packaging>").unwrap())
}

pub struct MavenRestoreBlobStrategy {
    packaging_extensions: HashMap<String, String>,
}

impl MavenRestoreBlobStrategy {
    pub fn new(packaging_extensions: HashMap<String, String>) -> Self {
        Self {
            packaging_extensions,
        }
    }

    /// Extension of the main artifact for a packaging type.
    pub fn packaging_extension<'a>(&'a self, packaging: &'a str) -> &'a str {
        self.packaging_extensions
            .get(packaging)
            .map(String::as_str)
            .unwrap_or(packaging)
    }

    fn strip_subordinate(path: &str) -> &str {
        for suffix in HASH_SUFFIXES.iter().chain([&SIGNATURE_SUFFIX]) {
            if let Some(stripped) = path.strip_suffix(suffix) {
                return stripped;
            }
        }
        path
    }

    fn is_metadata(path: &str) -> bool {
        Self::strip_subordinate(path)
            .rsplit('/')
            .next()
            .is_some_and(|name| name == METADATA_FILE)
    }

    /// Parses artifact coordinates. Hash and signature files resolve to the artifact they
    /// belong to, with their own suffix kept in the extension.
    pub fn parse_path(&self, path: &str) -> Option<MavenCoordinates> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        if segments.len() < 4 || segments.iter().any(|s| s.is_empty()) {
            return None;
        }

        let file_name = segments[segments.len() - 1];
        let base_version = segments[segments.len() - 2];
        let artifact_id = segments[segments.len() - 3];
        let group_id = segments[..segments.len() - 3].join(".");

        let rest = file_name.strip_prefix(artifact_id)?.strip_prefix('-')?;
        let (version, rest) = Self::split_version(base_version, rest)?;

        let (classifier, extension) = match rest.strip_prefix('-') {
            Some(classified) => {
                let (classifier, extension) = classified.split_once('.')?;
                (Some(classifier.to_string()), extension)
            }
            None => (None, rest.strip_prefix('.')?),
        };
        if extension.is_empty() {
            return None;
        }

        Some(MavenCoordinates {
            group_id,
            artifact_id: artifact_id.to_string(),
            base_version: base_version.to_string(),
            version,
            classifier,
            extension: extension.to_string(),
        })
    }

    /// Splits the version off `rest`. Snapshot directories hold timestamped versions.
    fn split_version<'a>(base_version: &str, rest: &'a str) -> Option<(String, &'a str)> {
        if let Some(tail) = rest.strip_prefix(base_version) {
            return Some((base_version.to_string(), tail));
        }

        let prefix = base_version.strip_suffix("SNAPSHOT")?;
        let tail = rest.strip_prefix(prefix)?;
        let stamp = snapshot_version_re().find(tail)?;
        let version = format!("{prefix}{}", stamp.as_str());
        Some((version, &tail[stamp.end()..]))
    }

    fn read_packaging(&self, data: &RestoreBlobData) -> DepotResult<Option<String>> {
        let mut pom = String::new();
        data.blob
            .open_content()?
            .take(MAX_METADATA_SIZE)
            .read_to_string(&mut pom)
            .with_context(|| format!("reading pom {}", data.blob_name))?;
        Ok(packaging_re()
            .captures(&pom)
            .map(|captures| captures[1].to_string()))
    }
}

impl RestoreBlobStrategy for MavenRestoreBlobStrategy {
    fn format(&self) -> &'static str {
        "maven2"
    }

    fn can_attempt_restore(&self, data: &RestoreBlobData) -> bool {
        Self::is_metadata(&data.blob_name) || self.parse_path(&data.blob_name).is_some()
    }

    fn component_required(&self, path: &str) -> bool {
        !Self::is_metadata(path) && self.parse_path(path).is_some()
    }

    fn extract_attributes(&self, data: &RestoreBlobData) -> DepotResult<Value> {
        let Some(coordinates) = self.parse_path(&data.blob_name) else {
            return Ok(json!({}));
        };

        let mut attributes = coordinates.to_value();
        if coordinates.extension == "pom" {
            let packaging = self
                .read_packaging(data)?
                .unwrap_or_else(|| "jar".to_string());
            if let Value::Object(map) = &mut attributes {
                map.insert(
                    "packagingExtension".into(),
                    self.packaging_extension(&packaging).into(),
                );
                map.insert("packaging".into(), packaging.into());
            }
        }
        Ok(attributes)
    }

    fn component_query(&self, path: &str, attributes: &Value) -> Option<ComponentQuery> {
        let coordinates = self.parse_path(path)?;
        let kind = attributes
            .get("packaging")
            .and_then(Value::as_str)
            .map(str::to_string);
        Some(ComponentQuery {
            namespace: coordinates.group_id,
            name: coordinates.artifact_id,
            version: coordinates.version,
            kind,
        })
    }

    fn asset_kind(&self, path: &str) -> Option<&'static str> {
        let kind = if Self::is_metadata(path) {
            "REPOSITORY_METADATA"
        } else if Self::strip_subordinate(path) != path {
            "SUBORDINATE"
        } else {
            "ARTIFACT"
        };
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use depot_db::repository::content::ContentRepository;

    use super::*;
    use crate::restore::{restore_blob, test_support::Fixture, RestoreOptions, RestoreOutcome};

    fn strategy() -> MavenRestoreBlobStrategy {
        MavenRestoreBlobStrategy::new(HashMap::from([(
            "maven-plugin".to_string(),
            "jar".to_string(),
        )]))
    }

    #[test]
    fn test_parse_release_path() {
        let coordinates = strategy()
            .parse_path("org/example/app/1.2.0/app-1.2.0-sources.jar")
            .unwrap();
        assert_eq!(coordinates.group_id, "org.example");
        assert_eq!(coordinates.artifact_id, "app");
        assert_eq!(coordinates.version, "1.2.0");
        assert_eq!(coordinates.classifier.as_deref(), Some("sources"));
        assert_eq!(coordinates.extension, "jar");
    }

    #[test]
    fn test_parse_snapshot_path() {
        let coordinates = strategy()
            .parse_path("org/example/app/1.0-SNAPSHOT/app-1.0-20240102.030405-7.pom")
            .unwrap();
        assert_eq!(coordinates.base_version, "1.0-SNAPSHOT");
        assert_eq!(coordinates.version, "1.0-20240102.030405-7");
        assert_eq!(coordinates.classifier, None);
        assert_eq!(coordinates.extension, "pom");
    }

    #[test]
    fn test_parse_checksum_keeps_suffix() {
        let coordinates = strategy()
            .parse_path("org/example/app/1.2.0/app-1.2.0.jar.sha1")
            .unwrap();
        assert_eq!(coordinates.extension, "jar.sha1");
    }

    #[test]
    fn test_parse_rejects_foreign_paths() {
        let strategy = strategy();
        assert!(strategy.parse_path("app-1.0.jar").is_none());
        assert!(strategy.parse_path("org/example/app/1.0/other-1.0.jar").is_none());
        assert!(strategy.parse_path("org/example/app/1.0/app-2.0.jar").is_none());
        assert!(strategy.parse_path("org/example/app/1.0/app-1.0").is_none());
    }

    #[test]
    fn test_metadata_is_component_less() {
        let strategy = strategy();
        assert!(!strategy.component_required("org/example/app/maven-metadata.xml"));
        assert!(!strategy.component_required("org/example/app/maven-metadata.xml.sha1"));
        assert!(strategy.component_required("org/example/app/1.0/app-1.0.jar.md5"));
        assert_eq!(
            strategy.asset_kind("org/example/app/maven-metadata.xml"),
            Some("REPOSITORY_METADATA")
        );
        assert_eq!(strategy.asset_kind("org/example/app/1.0/app-1.0.jar.asc"), Some("SUBORDINATE"));
    }

    #[test]
    fn test_packaging_extension_map() {
        let strategy = strategy();
        assert_eq!(strategy.packaging_extension("maven-plugin"), "jar");
        assert_eq!(strategy.packaging_extension("war"), "war");
    }

    #[test]
    fn test_restore_pom_reads_packaging() {
        let fixture = Fixture::new();
        let strategy = strategy();
        let pom = b"<project><artifactId>plugin</artifactId><packaging> maven-plugin </packaging></project>";
        let data = fixture.put("maven-releases", "org/example/plugin/2.0/plugin-2.0.pom", pom);

        let attributes = strategy.extract_attributes(&data).unwrap();
        assert_eq!(attributes["packaging"], "maven-plugin");
        assert_eq!(attributes["packagingExtension"], "jar");

        let outcome =
            restore_blob(&strategy, &data, &fixture.content, &RestoreOptions::default()).unwrap();
        let RestoreOutcome::Restored { component_id, .. } = outcome else {
            panic!("expected restore, got {outcome:?}");
        };
        assert!(component_id.is_some());

        let component = fixture
            .content
            .with_conn(|conn| {
                ContentRepository::find_component(
                    conn,
                    "maven-releases",
                    "org.example",
                    "plugin",
                    "2.0",
                )
            })
            .unwrap()
            .unwrap();
        assert_eq!(component.kind.as_deref(), Some("maven-plugin"));
    }

    #[test]
    fn test_artifacts_share_component() {
        let fixture = Fixture::new();
        let strategy = strategy();
        let jar = fixture.put("maven-releases", "org/example/app/1.0/app-1.0.jar", b"jar");
        let sha1 = fixture.put("maven-releases", "org/example/app/1.0/app-1.0.jar.sha1", b"abc");
        let metadata = fixture.put("maven-releases", "org/example/app/maven-metadata.xml", b"<m/>");

        for data in [&jar, &sha1, &metadata] {
            restore_blob(&strategy, data, &fixture.content, &RestoreOptions::default()).unwrap();
        }

        let (components, assets) = fixture
            .content
            .with_conn(|conn| {
                Ok::<_, diesel::result::Error>((
                    ContentRepository::count_components(conn, "maven-releases")?,
                    ContentRepository::count_assets(conn, "maven-releases")?,
                ))
            })
            .unwrap();
        assert_eq!(components, 1);
        assert_eq!(assets, 3);
    }

    #[test]
    fn test_foreign_path_cannot_be_restored() {
        let fixture = Fixture::new();
        let data = fixture.put("maven-releases", "README.md", b"hi");
        let outcome =
            restore_blob(&strategy(), &data, &fixture.content, &RestoreOptions::default()).unwrap();
        assert!(matches!(outcome, RestoreOutcome::Skipped { .. }));
    }
}
