use std::{fmt, path::PathBuf, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use uuid::Uuid;

use crate::error::DepotError;

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M";
const VOLUMES: u32 = 43;
const CHAPTERS: u32 = 47;

/// Identifier of a blob within a store.
///
/// New ids are `<uuid-v4>@<YYYY-MM-DDTHH:MM>`; the suffix names the date-sharded directory the
/// blob lives in. Ids without a suffix predate date sharding and are spread over
/// `vol-NN/chap-NN` directories by hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobId(String);

impl BlobId {
    /// Generates a fresh id sharded under `now`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        Self(format!("{}@{}", Uuid::new_v4(), now.format(DATE_FORMAT)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation minute encoded in the id, if any.
    pub fn created(&self) -> Option<NaiveDateTime> {
        let (_, suffix) = self.0.split_once('@')?;
        NaiveDateTime::parse_from_str(suffix, DATE_FORMAT).ok()
    }

    /// `YYYY/MM/DD/HH/mm` for date-sharded ids.
    pub fn date_path(&self) -> Option<String> {
        self.created().map(|at| {
            format!(
                "{:04}/{:02}/{:02}/{:02}/{:02}",
                at.year(),
                at.month(),
                at.day(),
                at.hour(),
                at.minute()
            )
        })
    }

    /// Directory relative to the store root holding this blob's files.
    pub fn relative_dir(&self) -> PathBuf {
        let content = PathBuf::from("content");
        match self.date_path() {
            Some(date_path) => content.join(date_path),
            None => {
                let hash = blake3::hash(self.0.as_bytes());
                let bytes = hash.as_bytes();
                let n = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                content
                    .join(format!("vol-{:02}", n % VOLUMES + 1))
                    .join(format!("chap-{:02}", (n / VOLUMES) % CHAPTERS + 1))
            }
        }
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BlobId {
    type Err = DepotError;

    /// Accepts anything usable as a file name stem.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && !s.starts_with('.')
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '@' | ':' | '.'));
        if valid && !s.ends_with(".json") && !s.ends_with(".bytes") {
            Ok(Self(s.to_string()))
        } else {
            Err(DepotError::InvalidBlobId(s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_generate_embeds_date() {
        let now = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 42).unwrap();
        let id = BlobId::generate(now);

        assert!(id.as_str().ends_with("@2026-03-07T09:05"));
        assert_eq!(id.date_path().as_deref(), Some("2026/03/07/09/05"));
        assert_eq!(
            id.relative_dir(),
            PathBuf::from("content/2026/03/07/09/05")
        );
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let now = Utc::now();
        assert_ne!(BlobId::generate(now), BlobId::generate(now));
    }

    #[test]
    fn test_legacy_id_uses_volume_layout() {
        let id: BlobId = "0bf7a6d2-5c8f-4d4e-9d6c-1f8a2b3c4d5e".parse().unwrap();
        assert!(id.date_path().is_none());

        let dir = id.relative_dir();
        let parts: Vec<_> = dir.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "content");
        assert!(parts[1].starts_with("vol-"));
        assert!(parts[2].starts_with("chap-"));
        assert_eq!(dir, id.relative_dir());
    }

    #[test]
    fn test_garbled_suffix_is_legacy() {
        let id: BlobId = "abc@not-a-date".parse().unwrap();
        assert!(id.created().is_none());
    }

    #[test]
    fn test_parse_rejects_paths() {
        assert!("".parse::<BlobId>().is_err());
        assert!("../etc/passwd".parse::<BlobId>().is_err());
        assert!("a/b".parse::<BlobId>().is_err());
        assert!("x.json".parse::<BlobId>().is_err());
    }
}
