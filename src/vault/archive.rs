//! Download and in-memory extraction of export archives.

use anyhow::{Context, Result};
use std::io::{Cursor, Read};

use crate::net;
use crate::vault::export::ExportFile;

const STORAGE_BASE: &str = "https://storage.googleapis.com/storage/v1";
const ARCHIVE_SUFFIX: &str = ".zip";

/// Blob storage fetch-by-path, as exposed by the export's cloud storage sink.
pub trait BlobStore {
    fn fetch(&self, bucket: &str, object: &str) -> Result<Vec<u8>>;
}

/// Cloud Storage client backed by ureq.
pub struct GcsClient {
    token: String,
}

impl GcsClient {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

impl BlobStore for GcsClient {
    fn fetch(&self, bucket: &str, object: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{STORAGE_BASE}/b/{}/o/{}",
            net::encode_path_segment(bucket),
            net::encode_path_segment(object),
        );
        net::get_bytes(&url, &[("alt", "media")], &self.token)
    }
}

/// A decompressed archive member held in memory.
#[derive(Debug, Clone)]
pub struct ArchiveMember {
    pub name: String,
    pub data: Vec<u8>,
}

/// A fetched archive with its extracted members.
#[derive(Debug)]
pub struct FetchedArchive {
    pub name: String,
    pub members: Vec<ArchiveMember>,
}

/// The object's file name, without any bucket path prefix.
pub fn base_name(object_name: &str) -> &str {
    object_name.rsplit('/').next().unwrap_or(object_name)
}

pub fn is_archive(object_name: &str) -> bool {
    base_name(object_name)
        .to_lowercase()
        .ends_with(ARCHIVE_SUFFIX)
}

/// Decompress a ZIP archive entirely into memory, skipping directories.
pub fn unzip(data: &[u8]) -> Result<Vec<ArchiveMember>> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(data)).context("not a readable ZIP archive")?;
    let mut members = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .with_context(|| format!("unreadable archive member #{index}"))?;
        if entry.is_dir() {
            continue;
        }
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .with_context(|| format!("failed to decompress {}", entry.name()))?;
        members.push(ArchiveMember {
            name: entry.name().to_string(),
            data,
        });
    }
    Ok(members)
}

/// Download and extract every archive in the manifest. Non-archive entries are
/// skipped; a failed download or a corrupt archive is logged and skipped
/// without aborting the rest.
pub fn fetch_archives(store: &impl BlobStore, files: &[ExportFile]) -> Vec<FetchedArchive> {
    let mut archives = Vec::new();
    for file in files {
        let name = base_name(&file.object_name).to_string();
        if !is_archive(&file.object_name) {
            tracing::info!(file = %name, "skipping auxiliary file");
            continue;
        }
        let data = match store.fetch(&file.bucket_name, &file.object_name) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(file = %name, "download failed: {err:#}");
                continue;
            }
        };
        match unzip(&data) {
            Ok(members) => archives.push(FetchedArchive { name, members }),
            Err(err) => {
                tracing::warn!(file = %name, "could not unzip: {err:#}");
            }
        }
    }
    archives
}
