// Cache path resolution for wrapper distributions

use crate::constants;
use crate::dists::error::Error;
use crate::dists::hash::dist_url_hash;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Which archive variant of a version is addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classifier {
    /// Runtime only (`-bin.zip`)
    Binary,
    /// Runtime plus sources and docs (`-all.zip`)
    Full,
}

impl Classifier {
    pub const ALL: [Classifier; 2] = [Classifier::Full, Classifier::Binary];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classifier::Binary => "bin",
            Classifier::Full => "all",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bin" | "binary" => Some(Classifier::Binary),
            "all" | "full" => Some(Classifier::Full),
            _ => None,
        }
    }
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One addressable cache entry for a (version, classifier) pair.
///
/// Every path is derived from the pair and the cache root; nothing here is
/// persisted except the file-system projections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionTarget {
    version: String,
    classifier: Classifier,
    remote_url: Url,
    bucket: String,
    dists_dir: PathBuf,
}

impl DistributionTarget {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn classifier(&self) -> Classifier {
        self.classifier
    }

    /// `gradle-<version>`
    pub fn canonical_name(&self) -> String {
        format!("gradle-{}", self.version)
    }

    /// `gradle-<version>-<classifier>`
    pub fn qualified_name(&self) -> String {
        format!("{}-{}", self.canonical_name(), self.classifier)
    }

    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.qualified_name())
    }

    /// Download URL with any user-info removed
    pub fn remote_url(&self) -> &Url {
        &self.remote_url
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `<dists>/<qualified_name>/<bucket>`
    pub fn bucket_dir(&self) -> PathBuf {
        self.dists_dir.join(self.qualified_name()).join(&self.bucket)
    }

    pub fn local_archive_path(&self) -> PathBuf {
        self.bucket_dir().join(self.archive_file_name())
    }

    /// Extraction directory, shared name for both classifiers of a version
    pub fn extracted_home_path(&self) -> PathBuf {
        self.bucket_dir().join(self.canonical_name())
    }

    pub fn marker_path(&self) -> PathBuf {
        self.bucket_dir().join(format!(
            "{}{}",
            self.archive_file_name(),
            constants::MARKER_SUFFIX
        ))
    }
}

impl fmt::Display for DistributionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gradle-{}-{}", self.version, self.classifier)
    }
}

/// Both distribution targets of one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDistributions {
    pub binary: DistributionTarget,
    pub full: DistributionTarget,
}

impl VersionDistributions {
    pub fn get(&self, classifier: Classifier) -> &DistributionTarget {
        match classifier {
            Classifier::Binary => &self.binary,
            Classifier::Full => &self.full,
        }
    }

    pub fn version(&self) -> &str {
        self.full.version()
    }

    /// Targets in fixed order: full, then binary
    pub fn iter(&self) -> impl Iterator<Item = &DistributionTarget> {
        Classifier::ALL.into_iter().map(|classifier| self.get(classifier))
    }
}

impl IntoIterator for VersionDistributions {
    type Item = DistributionTarget;
    type IntoIter = std::array::IntoIter<DistributionTarget, 2>;

    fn into_iter(self) -> Self::IntoIter {
        [self.full, self.binary].into_iter()
    }
}

/// Maps versions to the wrapper's on-disk cache layout
#[derive(Debug, Clone)]
pub struct CachePathResolver {
    dists_dir: PathBuf,
    distributions_url: Url,
}

impl CachePathResolver {
    pub fn new(gradle_user_home: &Path, distributions_url: &Url) -> Result<Self, Error> {
        if distributions_url.cannot_be_a_base() {
            return Err(Error::Url {
                url: distributions_url.to_string(),
                message: "distributions URL cannot be used as a base".to_string(),
            });
        }

        let mut dists_dir = gradle_user_home.to_path_buf();
        for segment in constants::DISTS_DIR {
            dists_dir.push(segment);
        }

        Ok(Self {
            dists_dir,
            distributions_url: safe_url(distributions_url),
        })
    }

    pub fn dists_dir(&self) -> &Path {
        &self.dists_dir
    }

    /// Informational link to the canonical full distribution
    pub fn current_link(&self) -> PathBuf {
        self.dists_dir.join(constants::CURRENT_LINK)
    }

    /// Derive the target for `version`; versions that could leave the cache are rejected
    pub fn resolve(
        &self,
        version: &str,
        classifier: Classifier,
    ) -> Result<DistributionTarget, Error> {
        if !is_valid_version(version) {
            return Err(Error::InvalidVersion {
                version: version.to_string(),
            });
        }
        let archive = format!("gradle-{}-{}.zip", version, classifier);

        let mut remote_url = self.distributions_url.clone();
        if let Ok(mut segments) = remote_url.path_segments_mut() {
            segments.pop_if_empty().push(&archive);
        }
        let remote_url = safe_url(&remote_url);
        let bucket = dist_url_hash(remote_url.as_str());

        Ok(DistributionTarget {
            version: version.to_string(),
            classifier,
            remote_url,
            bucket,
            dists_dir: self.dists_dir.clone(),
        })
    }

    pub fn resolve_all(&self, version: &str) -> Result<VersionDistributions, Error> {
        Ok(VersionDistributions {
            binary: self.resolve(version, Classifier::Binary)?,
            full: self.resolve(version, Classifier::Full)?,
        })
    }
}

/// A version is one path segment of `[0-9A-Za-z._+-]`, and neither `.` nor `..`
fn is_valid_version(version: &str) -> bool {
    !version.is_empty()
        && version != "."
        && version != ".."
        && version
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '-'))
}

/// Strip user-info so credentials never reach file names, hashes or logs
pub fn safe_url(url: &Url) -> Url {
    let mut url = url.clone();
    // Both setters only fail for cannot-be-a-base URLs, which carry no user-info
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url
}
