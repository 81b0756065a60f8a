// Archive extraction

use anyhow::Context;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Unpacks a distribution archive into a directory
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, archive: &Path, target_dir: &Path) -> anyhow::Result<()>;
}

/// Extracts zip archives with the `zip` crate on the blocking pool
pub struct ZipExtractor;

#[async_trait::async_trait]
impl Extractor for ZipExtractor {
    async fn extract(&self, archive: &Path, target_dir: &Path) -> anyhow::Result<()> {
        let archive = archive.to_path_buf();
        let target_dir = target_dir.to_path_buf();
        tokio::task::spawn_blocking(move || unzip(&archive, &target_dir)).await?
    }
}

fn unzip(archive_path: &Path, target_dir: &Path) -> anyhow::Result<()> {
    let file = fs::File::open(archive_path)
        .with_context(|| format!("Failed to open {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("{} is not a valid zip archive", archive_path.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        // Reject entries that would escape the target directory
        let Some(relative) = entry.enclosed_name() else {
            anyhow::bail!("Unsafe path in archive: {}", entry.name());
        };
        let out_path: PathBuf = target_dir.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)
            .with_context(|| format!("Failed to create {}", out_path.display()))?;
        io::copy(&mut entry, &mut out)?;

        // Keep the executable bit on bin/gradle and friends
        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&out_path, fs::Permissions::from_mode(mode & 0o7777))?;
        }
    }

    Ok(())
}
