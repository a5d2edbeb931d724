//! Just enough archive reading to pull package metadata out of a blob.

use std::io::{self, Read};

use flate2::read::GzDecoder;

/// Metadata files larger than this are rejected rather than buffered.
pub const MAX_METADATA_SIZE: u64 = 16 * 1024 * 1024;

const AR_MAGIC: &[u8; 8] = b"!<arch>\n";
const AR_HEADER_LEN: usize = 60;

fn invalid(reason: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason.into())
}

fn read_limited<R: Read>(reader: R, size: u64) -> io::Result<Vec<u8>> {
    if size > MAX_METADATA_SIZE {
        return Err(invalid(format!("metadata entry of {size} bytes is too large")));
    }
    let mut buf = Vec::with_capacity(size as usize);
    reader.take(size).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Returns the contents of the first tar entry whose path satisfies `matches`.
pub fn read_tar_entry<R, F>(reader: R, mut matches: F) -> io::Result<Option<Vec<u8>>>
where
    R: Read,
    F: FnMut(&str) -> bool,
{
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let matched = {
            let path = entry.path()?;
            matches(path.to_string_lossy().trim_start_matches("./"))
        };
        if matched {
            let size = entry.size();
            return read_limited(entry, size).map(Some);
        }
    }
    Ok(None)
}

/// Like [`read_tar_entry`] for a gzip-compressed tarball.
pub fn read_tgz_entry<R, F>(reader: R, matches: F) -> io::Result<Option<Vec<u8>>>
where
    R: Read,
    F: FnMut(&str) -> bool,
{
    read_tar_entry(GzDecoder::new(reader), matches)
}

/// Returns the name and contents of the first `ar` member whose name starts with `prefix`.
///
/// Only the common (System V / GNU) layout used by `.deb` packages is understood.
pub fn read_ar_member<R: Read>(mut reader: R, prefix: &str) -> io::Result<Option<(String, Vec<u8>)>> {
    let mut magic = [0u8; 8];
    reader
        .read_exact(&mut magic)
        .map_err(|_| invalid("not an ar archive"))?;
    if &magic != AR_MAGIC {
        return Err(invalid("not an ar archive"));
    }

    let mut header = [0u8; AR_HEADER_LEN];
    loop {
        match read_full(&mut reader, &mut header)? {
            0 => return Ok(None),
            AR_HEADER_LEN => {}
            _ => return Err(invalid("truncated ar member header")),
        }

        let name = String::from_utf8_lossy(&header[0..16])
            .trim_end()
            .trim_end_matches('/')
            .to_string();
        let size: u64 = String::from_utf8_lossy(&header[48..58])
            .trim()
            .parse()
            .map_err(|_| invalid(format!("bad size for ar member '{name}'")))?;
        let padding = size % 2;

        if name.starts_with(prefix) {
            let data = read_limited(&mut reader, size)?;
            if data.len() as u64 != size {
                return Err(invalid(format!("truncated ar member '{name}'")));
            }
            return Ok(Some((name, data)));
        }

        io::copy(&mut (&mut reader).take(size + padding), &mut io::sink())?;
    }
}

fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Parses an RFC 822 style stanza (Debian control file) into `(field, value)` pairs.
///
/// Continuation lines are appended to the previous value.
pub fn parse_control(content: &str) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            break;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = fields.last_mut() {
                value.push('\n');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            fields.push((key.trim().to_string(), value.trim().to_string()));
        }
    }
    fields
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{Cursor, Write};

    use flate2::{write::GzEncoder, Compression};

    use super::*;

    pub fn tar_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    pub fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    pub fn ar_with(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut out = AR_MAGIC.to_vec();
        for (name, data) in members {
            let header = format!(
                "{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n",
                format!("{name}/"),
                0,
                0,
                0,
                "100644",
                data.len()
            );
            assert_eq!(header.len(), AR_HEADER_LEN);
            out.extend_from_slice(header.as_bytes());
            out.extend_from_slice(data);
            if data.len() % 2 == 1 {
                out.push(b'\n');
            }
        }
        out
    }

    #[test]
    fn test_read_tgz_entry() {
        let tgz = gzip(&tar_with(&[
            ("package/README.md", b"readme".as_slice()),
            ("package/package.json", b"{}".as_slice()),
        ]));

        let found = read_tgz_entry(Cursor::new(tgz), |p| p == "package/package.json").unwrap();
        assert_eq!(found.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_read_tar_entry_missing() {
        let tar = tar_with(&[("a.txt", b"a".as_slice())]);
        assert!(read_tar_entry(Cursor::new(tar), |p| p == "b.txt")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_read_tgz_garbage_is_error() {
        assert!(read_tgz_entry(Cursor::new(b"definitely not gzip".to_vec()), |_| true).is_err());
    }

    #[test]
    fn test_read_ar_member_skips_odd_padding() {
        let ar = ar_with(&[
            ("debian-binary", b"2.0\n".as_slice()),
            ("odd", b"abc".as_slice()),
            ("control.tar.gz", b"xyz".as_slice()),
        ]);

        let (name, data) = read_ar_member(Cursor::new(ar), "control.tar")
            .unwrap()
            .unwrap();
        assert_eq!(name, "control.tar.gz");
        assert_eq!(data, b"xyz");
    }

    #[test]
    fn test_read_ar_member_rejects_non_ar() {
        let err = read_ar_member(Cursor::new(b"PK\x03\x04zipzip".to_vec()), "control").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_parse_control() {
        let fields = parse_control(
            "Package: hello\nVersion: 2.10-3\nArchitecture: amd64\nDescription: greeting\n more text\n\nIgnored: yes\n",
        );
        assert_eq!(fields[0], ("Package".into(), "hello".into()));
        assert_eq!(fields[1], ("Version".into(), "2.10-3".into()));
        assert_eq!(fields[3].1, "greeting\nmore text");
        assert_eq!(fields.len(), 4);
    }
}
