// Test doubles shared by the dists unit tests

use crate::dists::error::TransportError;
use crate::dists::extract::{Extractor, ZipExtractor};
use crate::dists::http::{DownloadReporter, Transport};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;
use zip::CompressionMethod;
use zip::write::{FileOptions, ZipWriter};

pub const DISTRIBUTIONS: &str = "https://services.gradle.org/distributions";
pub const CURRENT_URL: &str = "https://services.gradle.org/versions/current";
pub const ALL_URL: &str = "https://services.gradle.org/versions/all";

/// Bytes of a minimal Gradle-shaped distribution zip
pub fn distribution_zip(version: &str) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default()
        .compression_method(CompressionMethod::Stored)
        .unix_permissions(0o755);

    zip.add_directory(format!("gradle-{}/", version), options)
        .unwrap();
    zip.start_file(format!("gradle-{}/bin/gradle", version), options)
        .unwrap();
    zip.write_all(b"#!/bin/sh\necho gradle\n").unwrap();
    zip.start_file(format!("gradle-{}/lib/gradle-launcher.jar", version), options)
        .unwrap();
    zip.write_all(b"jar").unwrap();
    zip.finish().unwrap().into_inner()
}

/// In-memory transport serving fixed bodies by URL
#[derive(Default)]
pub struct FakeTransport {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    downloads: AtomicUsize,
    abort_downloads: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.into());
    }

    /// Serve both archives of `version` under the default distributions URL
    pub fn serve_distribution(&self, version: &str) {
        let zip = distribution_zip(version);
        for classifier in ["bin", "all"] {
            self.serve(
                &format!("{}/gradle-{}-{}.zip", DISTRIBUTIONS, version, classifier),
                zip.clone(),
            );
        }
    }

    /// Make every download write half its body and then fail
    pub fn abort_downloads(&self, abort: bool) {
        self.abort_downloads.store(abort, Ordering::SeqCst);
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    fn body(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        self.bodies
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| TransportError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        self.body(url)
    }

    async fn download(
        &self,
        url: &Url,
        destination: &Path,
        reporter: &dyn DownloadReporter,
    ) -> Result<u64, TransportError> {
        let body = self.body(url)?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        reporter.on_download_start(url.as_str(), Some(body.len() as u64));

        if self.abort_downloads.load(Ordering::SeqCst) {
            std::fs::write(destination, &body[..body.len() / 2])?;
            return Err(TransportError::Interrupted {
                url: url.to_string(),
            });
        }

        std::fs::write(destination, &body)?;
        reporter.on_download_progress(body.len() as u64);
        reporter.on_download_complete();
        Ok(body.len() as u64)
    }
}

/// Zip extractor that sleeps first and records whether any watched path
/// appeared while it was still working
pub struct SlowExtractor {
    pub delay: Duration,
    pub watched: Vec<PathBuf>,
    pub saw_watched: AtomicBool,
}

#[async_trait::async_trait]
impl Extractor for SlowExtractor {
    async fn extract(&self, archive: &Path, target_dir: &Path) -> anyhow::Result<()> {
        tokio::time::sleep(self.delay).await;
        if self
            .watched
            .iter()
            .any(|p| std::fs::symlink_metadata(p).is_ok())
        {
            self.saw_watched.store(true, Ordering::SeqCst);
        }
        ZipExtractor.extract(archive, target_dir).await
    }
}

/// Snapshot of a tree: relative path to "dir", "file:<len>" or "link:<target>"
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, String> {
    let mut entries = BTreeMap::new();
    walk(root, root, &mut entries);
    entries
}

fn walk(root: &Path, dir: &Path, entries: &mut BTreeMap<PathBuf, String>) {
    let Ok(read) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in read.flatten() {
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap().to_path_buf();
        let meta = std::fs::symlink_metadata(&path).unwrap();
        if meta.file_type().is_symlink() {
            let target = std::fs::read_link(&path).unwrap();
            entries.insert(relative, format!("link:{}", target.display()));
        } else if meta.is_dir() {
            entries.insert(relative, "dir".to_string());
            walk(root, &path, entries);
        } else {
            entries.insert(relative, format!("file:{}", meta.len()));
        }
    }
}
