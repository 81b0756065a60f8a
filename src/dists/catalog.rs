// Version catalog fetched from the Gradle services endpoints

use crate::dists::error::Error;
use crate::dists::http::Transport;
use log::debug;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// One entry of the version catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub version: String,
    pub download_url: Option<String>,
    is_release: bool,
}

impl Version {
    /// A version built from a bare version string
    #[cfg(test)]
    pub fn release(version: impl Into<String>) -> Self {
        let version = version.into();
        let is_release = !version.contains('-');
        Self {
            version,
            download_url: None,
            is_release,
        }
    }

    pub fn is_release(&self) -> bool {
        self.is_release
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(VersionVisitor)
    }
}

struct VersionVisitor;

impl<'de> Visitor<'de> for VersionVisitor {
    type Value = Version;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a version object")
    }

    // Release status is folded over every flag as it is read, so the order of
    // fields in the document never matters.
    fn visit_map<A>(self, mut map: A) -> Result<Version, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut version: Option<String> = None;
        let mut download_url: Option<String> = None;
        let mut release = true;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "version" => {
                    let value: String = map.next_value()?;
                    if value.contains('-') {
                        release = false;
                    }
                    version = Some(value);
                }
                "downloadUrl" => {
                    download_url = map.next_value::<Option<String>>()?;
                }
                "snapshot" | "nightly" | "releaseNightly" | "activeRc" => {
                    if map.next_value::<Option<bool>>()?.unwrap_or(false) {
                        release = false;
                    }
                }
                "rcFor" | "milestoneFor" => {
                    let value = map.next_value::<Option<String>>()?;
                    if value.is_some_and(|v| !v.is_empty()) {
                        release = false;
                    }
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        let version = version.ok_or_else(|| de::Error::missing_field("version"))?;
        Ok(Version {
            version,
            download_url,
            is_release: release,
        })
    }
}

/// Parse the single-object "current version" document
pub fn parse_current(bytes: &[u8]) -> Result<Version, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Parse the array "all versions" document
pub fn parse_all(bytes: &[u8]) -> Result<Vec<Version>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Remote catalog of Gradle versions
pub struct VersionCatalog {
    transport: Arc<dyn Transport>,
    current_url: Url,
    all_url: Url,
}

impl VersionCatalog {
    pub fn new(transport: Arc<dyn Transport>, current_url: Url, all_url: Url) -> Self {
        Self {
            transport,
            current_url,
            all_url,
        }
    }

    pub async fn fetch_current(&self) -> Result<Version, Error> {
        let bytes = self.fetch(&self.current_url).await?;
        let current = parse_current(&bytes).map_err(|source| Error::CatalogParse {
            url: self.current_url.to_string(),
            source,
        })?;
        debug!("Current version from {}: {}", self.current_url, current);
        Ok(current)
    }

    pub async fn fetch_all(&self) -> Result<Vec<Version>, Error> {
        let bytes = self.fetch(&self.all_url).await?;
        let versions = parse_all(&bytes).map_err(|source| Error::CatalogParse {
            url: self.all_url.to_string(),
            source,
        })?;
        debug!(
            "Catalog {} lists {} version(s), {} release(s)",
            self.all_url,
            versions.len(),
            versions.iter().filter(|v| v.is_release()).count()
        );
        Ok(versions)
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, Error> {
        self.transport
            .fetch(url)
            .await
            .map_err(|source| Error::CatalogFetch {
                url: url.to_string(),
                source,
            })
    }
}
