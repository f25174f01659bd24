use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

pub const INDEX_ENTRY: &str = "index.html";
pub const READABLE_ENTRY: &str = "readable.md";
pub const MANIFEST_ENTRY: &str = "manifest.json";

pub const MANIFEST_VERSION: u32 = 1;

/// Describes a captured page. Stored as `manifest.json` inside the bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureManifest {
    pub version: u32,
    pub url: String,
    pub source_content_type: String,
    pub encoding: String,
    pub title: Option<String>,
    pub captured_utc: String,
    pub word_count: u32,
    pub entries: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub content_type: String,
}

impl CaptureManifest {
    pub fn content_type_of(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.path == path)
            .map(|entry| entry.content_type.as_str())
    }
}

/// Write `entries` as a gzip-compressed tar stream into `out`.
///
/// Headers carry a zero mtime so identical input yields identical bytes.
pub fn write_bundle<W: Write>(out: W, entries: &[(&str, &[u8])]) -> io::Result<W> {
    let encoder = GzEncoder::new(out, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        builder.append_data(&mut header, path, *data)?;
    }
    builder.into_inner()?.finish()
}

/// Upper bound on the unpacked size of a bundle.
pub const MAX_UNPACKED_BYTES: u64 = 256 * 1024 * 1024;

/// All entries of a bundle, keyed by path.
///
/// Fails with `InvalidData` once the entries together exceed
/// [`MAX_UNPACKED_BYTES`], whatever sizes the headers declare.
pub fn read_bundle(bytes: &[u8]) -> io::Result<BTreeMap<String, Vec<u8>>> {
    read_bundle_limited(bytes, MAX_UNPACKED_BYTES)
}

fn read_bundle_limited(bytes: &[u8], limit: u64) -> io::Result<BTreeMap<String, Vec<u8>>> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    let mut entries = BTreeMap::new();
    let mut remaining = limit;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().into_owned();
        if entry.size() > remaining {
            return Err(too_large(&path, entry.size()));
        }
        let mut data = Vec::new();
        (&mut entry).take(remaining + 1).read_to_end(&mut data)?;
        let read = data.len() as u64;
        if read > remaining {
            return Err(too_large(&path, read));
        }
        remaining -= read;
        entries.insert(path, data);
    }
    Ok(entries)
}

fn too_large(path: &str, size: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("bundle entry {path} ({size} bytes) exceeds the unpacked size limit"),
    )
}
