// Materializer: turns a resolved target into a satisfied cache entry

use crate::dists::distribution::DistributionTarget;
use crate::dists::error::Error;
use crate::dists::extract::Extractor;
use crate::dists::http::{DownloadReporter, Transport};
use crate::dists::links;
use log::{debug, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outcome of [`Materializer::ensure`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterializeResult {
    /// Marker and home were already in place, or an existing home was adopted
    AlreadySatisfied,
    /// The archive was fetched (or a complete earlier download reused) and unpacked
    Downloaded,
    /// The home was linked to the canonical home
    Linked,
}

pub struct Materializer {
    transport: Arc<dyn Transport>,
    extractor: Arc<dyn Extractor>,
    reporter: Arc<dyn DownloadReporter>,
}

impl Materializer {
    pub fn new(
        transport: Arc<dyn Transport>,
        extractor: Arc<dyn Extractor>,
        reporter: Arc<dyn DownloadReporter>,
    ) -> Self {
        Self {
            transport,
            extractor,
            reporter,
        }
    }

    /// Make `target` satisfied.
    ///
    /// With `canonical_home == None` the target is canonical and gets a real
    /// download and unpack. Otherwise its home becomes a relative symlink to
    /// `canonical_home`.
    pub async fn ensure(
        &self,
        target: &DistributionTarget,
        canonical_home: Option<&Path>,
    ) -> Result<MaterializeResult, Error> {
        match canonical_home {
            None => self.ensure_canonical(target).await,
            Some(home) => self.ensure_dependent(target, home).await,
        }
    }

    async fn ensure_canonical(
        &self,
        target: &DistributionTarget,
    ) -> Result<MaterializeResult, Error> {
        let name = target.qualified_name();
        let home = target.extracted_home_path();

        // A canonical home must be a real tree, never a link left by an older run
        if is_satisfied(target).await && !is_symlink(&home).await {
            debug!("{} already satisfied", name);
            return Ok(MaterializeResult::AlreadySatisfied);
        }

        let bucket = target.bucket_dir();
        tokio::fs::create_dir_all(&bucket)
            .await
            .map_err(|e| Error::fs(&name, "create directory", &bucket, e))?;

        let archive = target.local_archive_path();
        let reused = archive_is_usable(&archive).await;
        if reused {
            info!("Reusing downloaded archive {}", archive.display());
        } else {
            self.download(target).await?;
        }

        if let Err(err) = self.unpack(target).await {
            // A reused archive that cannot be unpacked would fail every later run too
            if reused && matches!(err, Error::Extract { .. }) {
                warn!("Discarding unreadable archive {}", archive.display());
                if let Err(e) = tokio::fs::remove_file(&archive).await {
                    warn!("Failed to remove {}: {}", archive.display(), e);
                }
            }
            return Err(err);
        }
        write_marker(target).await?;

        info!("{} downloaded and unpacked into {}", name, home.display());
        Ok(MaterializeResult::Downloaded)
    }

    async fn ensure_dependent(
        &self,
        target: &DistributionTarget,
        canonical_home: &Path,
    ) -> Result<MaterializeResult, Error> {
        let name = target.qualified_name();

        if is_satisfied(target).await {
            debug!("{} already satisfied", name);
            return Ok(MaterializeResult::AlreadySatisfied);
        }

        // Never leave a marker next to a link that resolves nowhere
        if !has_entry_point(canonical_home).await {
            return Err(Error::MissingHome {
                name,
                expected: launcher_path(canonical_home),
            });
        }

        let bucket = target.bucket_dir();
        tokio::fs::create_dir_all(&bucket)
            .await
            .map_err(|e| Error::fs(&name, "create directory", &bucket, e))?;

        let home = target.extracted_home_path();
        let result = match tokio::fs::symlink_metadata(&home).await {
            Ok(meta) if meta.file_type().is_symlink() => {
                debug!("Replacing existing link {}", home.display());
                links::remove_symlink(&home)
                    .await
                    .map_err(|e| Error::fs(&name, "remove stale link", &home, e))?;
                link_home(&name, &home, canonical_home).await?;
                MaterializeResult::Linked
            }
            Ok(meta) if meta.is_dir() => {
                if !has_entry_point(&home).await {
                    return Err(Error::InvalidHome { name, path: home });
                }
                info!("Adopting existing Gradle home {}", home.display());
                MaterializeResult::AlreadySatisfied
            }
            Ok(_) => return Err(Error::InvalidHome { name, path: home }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                link_home(&name, &home, canonical_home).await?;
                MaterializeResult::Linked
            }
            Err(e) => return Err(Error::fs(&name, "inspect", &home, e)),
        };

        write_marker(target).await?;
        Ok(result)
    }

    /// Download into a temporary file next to the archive, then rename it into place
    async fn download(&self, target: &DistributionTarget) -> Result<(), Error> {
        let name = target.qualified_name();
        let bucket = target.bucket_dir();
        let archive = target.local_archive_path();

        // Deleted on drop, so an aborted transfer leaves nothing behind
        let temp = tempfile::Builder::new()
            .prefix(&format!("{}_", target.canonical_name()))
            .suffix(".part")
            .tempfile_in(&bucket)
            .map_err(|e| Error::fs(&name, "create temporary file in", &bucket, e))?
            .into_temp_path();

        info!("Downloading {} from {}", name, target.remote_url());
        let bytes = self
            .transport
            .download(target.remote_url(), &temp, self.reporter.as_ref())
            .await
            .map_err(|source| Error::Download {
                name: name.clone(),
                url: target.remote_url().to_string(),
                source,
            })?;
        debug!("Fetched {} bytes for {}", bytes, name);

        temp.persist(&archive)
            .map_err(|e| Error::fs(&name, "move archive into", &archive, e.error))?;
        Ok(())
    }

    /// Unpack into a staging directory, then rename the distribution root into place
    async fn unpack(&self, target: &DistributionTarget) -> Result<(), Error> {
        let name = target.qualified_name();
        let bucket = target.bucket_dir();
        let home = target.extracted_home_path();

        links::remove_path(&home)
            .await
            .map_err(|e| Error::fs(&name, "remove", &home, e))?;

        let staging = tempfile::Builder::new()
            .prefix(".unpack-")
            .tempdir_in(&bucket)
            .map_err(|e| Error::fs(&name, "create staging directory in", &bucket, e))?;

        self.extractor
            .extract(&target.local_archive_path(), staging.path())
            .await
            .map_err(|source| Error::Extract {
                name: name.clone(),
                source,
            })?;

        let unpacked = staging.path().join(target.canonical_name());
        if !has_entry_point(&unpacked).await {
            return Err(Error::MissingHome {
                name,
                expected: launcher_path(Path::new(&target.canonical_name())),
            });
        }

        tokio::fs::rename(&unpacked, &home)
            .await
            .map_err(|e| Error::fs(&name, "move unpacked distribution to", &home, e))?;
        Ok(())
    }
}

/// Marker present and the home resolves to a tree with a launcher
pub async fn is_satisfied(target: &DistributionTarget) -> bool {
    let marker = tokio::fs::try_exists(target.marker_path())
        .await
        .unwrap_or(false);
    marker && has_entry_point(&target.extracted_home_path()).await
}

fn launcher_path(home: &Path) -> PathBuf {
    home.join("bin").join("gradle")
}

async fn has_entry_point(home: &Path) -> bool {
    tokio::fs::metadata(launcher_path(home))
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

async fn is_symlink(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path)
        .await
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

/// An earlier download counts only when it reached its final path and is non-empty
async fn archive_is_usable(archive: &Path) -> bool {
    tokio::fs::metadata(archive)
        .await
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

async fn link_home(name: &str, home: &Path, canonical_home: &Path) -> Result<(), Error> {
    let relative = links::create_relative_symlink(home, canonical_home)
        .await
        .map_err(|e| Error::fs(name, "create symlink", home, e))?;
    debug!("Linked {} -> {}", home.display(), relative.display());
    Ok(())
}

async fn write_marker(target: &DistributionTarget) -> Result<(), Error> {
    let marker = target.marker_path();
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&marker)
        .await
        .map_err(|e| Error::fs(target.qualified_name(), "write marker", &marker, e))?;
    Ok(())
}
