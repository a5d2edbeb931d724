use std::{io::Write, path::Path};

use sha2::{Digest, Sha256};

use crate::error::{HashError, HashResult};

/// Digests computed over a blob's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigest {
    pub sha256: String,
    pub blake3: String,
    pub size: u64,
}

/// A writer that hashes everything passing through it.
///
/// Content is forwarded to the inner writer unchanged while SHA-256 and BLAKE3 digests and
/// the byte count are accumulated, so a blob can be hashed in the same pass that stores it.
///
/// # Example
///
/// ```
/// use std::io::Write;
/// use depot_utils::hash::HashingWriter;
///
/// let mut writer = HashingWriter::new(Vec::new());
/// writer.write_all(b"hello world\n").unwrap();
/// let (content, digest) = writer.finish();
///
/// assert_eq!(content, b"hello world\n");
/// assert_eq!(digest.size, 12);
/// ```
pub struct HashingWriter<W> {
    inner: W,
    sha256: Sha256,
    blake3: blake3::Hasher,
    size: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            sha256: Sha256::new(),
            blake3: blake3::Hasher::new(),
            size: 0,
        }
    }

    /// Consumes the writer, returning the inner writer and the final digests.
    pub fn finish(self) -> (W, ContentDigest) {
        let digest = ContentDigest {
            sha256: format!("{:x}", self.sha256.finalize()),
            blake3: self.blake3.finalize().to_hex().to_string(),
            size: self.size,
        };
        (self.inner, digest)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.sha256.update(&buf[..written]);
        self.blake3.update(&buf[..written]);
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Calculates the BLAKE3 checksum of a file, returned hex-encoded.
///
/// # Errors
///
/// * [`HashError::ReadFailed`] if the file cannot be read.
pub fn calculate_checksum<P: AsRef<Path>>(file_path: P) -> HashResult<String> {
    let file_path = file_path.as_ref();
    let mut hasher = blake3::Hasher::new();
    hasher.update_mmap(file_path).map_err(|err| {
        HashError::ReadFailed {
            path: file_path.to_path_buf(),
            source: err,
        }
    })?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Verifies a file's BLAKE3 checksum against an expected value, case-insensitively.
pub fn verify_checksum<P: AsRef<Path>>(file_path: P, expected: &str) -> HashResult<bool> {
    let actual = calculate_checksum(file_path)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    const HELLO_BLAKE3: &str = "dc5a4edb8240b018124052c330270696f96771a63b45250a5c17d3000e823355";
    const HELLO_SHA256: &str = "a948904f2f0f479b8f8197694b30184b0d2ed1c1cd2a1ec0fb85d299a192a447";

    #[test]
    fn test_hashing_writer_digests() {
        let mut writer = HashingWriter::new(Vec::new());
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world\n").unwrap();
        let (content, digest) = writer.finish();

        assert_eq!(content, b"hello world\n");
        assert_eq!(digest.size, 12);
        assert_eq!(digest.blake3, HELLO_BLAKE3);
        assert_eq!(digest.sha256, HELLO_SHA256);
    }

    #[test]
    fn test_hashing_writer_empty() {
        let (_, digest) = HashingWriter::new(Vec::new()).finish();
        assert_eq!(digest.size, 0);
        assert_eq!(
            digest.sha256,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_calculate_checksum_matches_writer() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world\n").unwrap();

        assert_eq!(calculate_checksum(file.path()).unwrap(), HELLO_BLAKE3);
        assert!(verify_checksum(file.path(), &HELLO_BLAKE3.to_uppercase()).unwrap());
        assert!(!verify_checksum(file.path(), "deadbeef").unwrap());
    }

    #[test]
    fn test_calculate_checksum_file_not_found() {
        let result = calculate_checksum("/path/to/nonexistent/blob");
        assert!(matches!(result, Err(HashError::ReadFailed { .. })));
    }
}
