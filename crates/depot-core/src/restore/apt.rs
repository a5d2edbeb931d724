//! Debian repositories.
//!
//! Packages (`*.deb`) carry their identity in the `control` file of the `control.tar.*`
//! member. Release files and package indexes under `dists/` have no component.

use std::io::{Cursor, Read};

use flate2::read::GzDecoder;
use serde_json::{Map, Value};

use super::{
    archive::{parse_control, read_ar_member, read_tar_entry},
    ComponentQuery, RestoreBlobData, RestoreBlobStrategy,
};
use crate::{
    error::{DepotError, ErrorContext},
    DepotResult,
};

const CONTROL_FIELDS: [&str; 8] = [
    "Package",
    "Version",
    "Architecture",
    "Maintainer",
    "Section",
    "Priority",
    "Depends",
    "Description",
];

pub struct AptRestoreBlobStrategy;

impl AptRestoreBlobStrategy {
    fn is_package(path: &str) -> bool {
        path.ends_with(".deb") || path.ends_with(".udeb")
    }

    fn read_control(data: &RestoreBlobData) -> DepotResult<String> {
        let action = || format!("reading debian package {}", data.blob_name);

        let content = data.blob.open_content()?;
        let (member, archive) = read_ar_member(content, "control.tar")
            .with_context(action)?
            .ok_or_else(|| DepotError::invalid_data(action(), "no control.tar member"))?;

        let reader: Box<dyn Read> = match member.as_str() {
            "control.tar" => Box::new(Cursor::new(archive)),
            "control.tar.gz" => Box::new(GzDecoder::new(Cursor::new(archive))),
            "control.tar.zst" => {
                let decoder =
                    zstd::stream::read::Decoder::new(Cursor::new(archive)).with_context(action)?;
                Box::new(decoder)
            }
            other => {
                return Err(DepotError::invalid_data(
                    action(),
                    format!("unsupported control archive '{other}'"),
                ))
            }
        };

        let control = read_tar_entry(reader, |path| path == "control")
            .with_context(action)?
            .ok_or_else(|| DepotError::invalid_data(action(), "no control file"))?;
        String::from_utf8(control)
            .map_err(|_| DepotError::invalid_data(action(), "control file is not UTF-8"))
    }
}

impl RestoreBlobStrategy for AptRestoreBlobStrategy {
    fn format(&self) -> &'static str {
        "apt"
    }

    fn component_required(&self, path: &str) -> bool {
        Self::is_package(path)
    }

    fn extract_attributes(&self, data: &RestoreBlobData) -> DepotResult<Value> {
        if !Self::is_package(&data.blob_name) {
            return Ok(Value::Object(Map::new()));
        }

        let control = Self::read_control(data)?;
        let attributes: Map<String, Value> = parse_control(&control)
            .into_iter()
            .filter(|(key, _)| CONTROL_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        Ok(Value::Object(attributes))
    }

    fn component_query(&self, _path: &str, attributes: &Value) -> Option<ComponentQuery> {
        let field = |name: &str| attributes.get(name).and_then(Value::as_str).map(str::to_string);
        Some(ComponentQuery {
            namespace: field("Architecture")?,
            name: field("Package")?,
            version: field("Version")?,
            kind: None,
        })
    }

    fn asset_kind(&self, path: &str) -> Option<&'static str> {
        Some(if Self::is_package(path) {
            "DEB"
        } else if path.starts_with("dists/") {
            "METADATA"
        } else {
            "OTHER"
        })
    }
}

#[cfg(test)]
mod tests {
    use depot_db::repository::content::ContentRepository;

    use super::*;
    use crate::restore::{
        archive::tests::{ar_with, gzip, tar_with},
        restore_blob,
        test_support::Fixture,
        RestoreOptions, RestoreOutcome,
    };

    const CONTROL: &[u8] = b"Package: hello\nVersion: 2.10-3\nArchitecture: amd64\nMaintainer: Someone <a@b.c>\nDescription: greeter\n classic hello\n";

    fn deb(member: &str, control_tar: Vec<u8>) -> Vec<u8> {
        ar_with(&[
            ("debian-binary", b"2.0\n".as_slice()),
            (member, control_tar.as_slice()),
            ("data.tar.gz", gzip(&tar_with(&[])).as_slice()),
        ])
    }

    #[test]
    fn test_gzip_control() {
        let fixture = Fixture::new();
        let package = deb("control.tar.gz", gzip(&tar_with(&[("./control", CONTROL)])));
        let data = fixture.put("apt-hosted", "pool/main/h/hello/hello_2.10-3_amd64.deb", &package);

        let attributes = AptRestoreBlobStrategy.extract_attributes(&data).unwrap();
        assert_eq!(attributes["Package"], "hello");
        assert_eq!(attributes["Description"], "greeter\nclassic hello");

        let outcome = restore_blob(
            &AptRestoreBlobStrategy,
            &data,
            &fixture.content,
            &RestoreOptions::default(),
        )
        .unwrap();
        assert!(matches!(outcome, RestoreOutcome::Restored { component_id: Some(_), .. }));

        let component = fixture
            .content
            .with_conn(|conn| {
                ContentRepository::find_component(conn, "apt-hosted", "amd64", "hello", "2.10-3")
            })
            .unwrap();
        assert!(component.is_some());
    }

    #[test]
    fn test_zstd_control() {
        let fixture = Fixture::new();
        let control_tar = zstd::encode_all(tar_with(&[("control", CONTROL)]).as_slice(), 0).unwrap();
        let package = deb("control.tar.zst", control_tar);
        let data = fixture.put("apt-hosted", "pool/main/h/hello/hello_2.10-3_amd64.deb", &package);

        let attributes = AptRestoreBlobStrategy.extract_attributes(&data).unwrap();
        assert_eq!(attributes["Version"], "2.10-3");
        assert_eq!(attributes["Architecture"], "amd64");
    }

    #[test]
    fn test_xz_control_unsupported() {
        let fixture = Fixture::new();
        let package = deb("control.tar.xz", b"xz".to_vec());
        let data = fixture.put("apt-hosted", "pool/main/h/hello/hello_2.10-3_amd64.deb", &package);

        let err = AptRestoreBlobStrategy.extract_attributes(&data).unwrap_err();
        assert!(matches!(err, DepotError::IoError { .. }));
    }

    #[test]
    fn test_index_files_have_no_component() {
        let fixture = Fixture::new();
        let data = fixture.put("apt-hosted", "dists/stable/Release", b"Origin: depot\n");

        assert!(!AptRestoreBlobStrategy.component_required("dists/stable/Release"));
        assert_eq!(AptRestoreBlobStrategy.asset_kind("dists/stable/Release"), Some("METADATA"));
        let outcome = restore_blob(
            &AptRestoreBlobStrategy,
            &data,
            &fixture.content,
            &RestoreOptions::default(),
        )
        .unwrap();
        assert!(matches!(outcome, RestoreOutcome::Restored { component_id: None, .. }));
    }

    #[test]
    fn test_control_without_architecture_is_skipped() {
        let fixture = Fixture::new();
        let control = b"Package: hello\nVersion: 1\n".as_slice();
        let package = deb("control.tar.gz", gzip(&tar_with(&[("control", control)])));
        let data = fixture.put("apt-hosted", "pool/main/h/hello/hello_1_all.deb", &package);

        let outcome = restore_blob(
            &AptRestoreBlobStrategy,
            &data,
            &fixture.content,
            &RestoreOptions::default(),
        )
        .unwrap();
        assert!(matches!(outcome, RestoreOutcome::Skipped { .. }));
    }
}
