// Config module for resolving runtime settings from flags, environment and config file

use crate::constants;
use crate::dists::error::Error;
use crate::dists::http::{Credentials, ProxySettings, TransportConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const CONFIG_ENV: &str = "DISTSHARE_CONFIG";
pub const GRADLE_USER_HOME_ENV: &str = "GRADLE_USER_HOME";
pub const WRAPPER_USER_ENV: &str = "GRADLE_WRAPPER_USER";
pub const WRAPPER_PASSWORD_ENV: &str = "GRADLE_WRAPPER_PASSWORD";

/// Values given on the command line; `None` means "not given"
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub gradle_user_home: Option<PathBuf>,
    pub services_url: Option<String>,
    pub distributions_url: Option<String>,
    pub jobs: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    gradle_user_home: Option<PathBuf>,
    services_url: Option<String>,
    distributions_url: Option<String>,
    jobs: Option<usize>,
    connect_timeout_secs: Option<u64>,
    read_timeout_secs: Option<u64>,
    wrapper: Option<FileCredentials>,
    proxy: FileProxies,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileCredentials {
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileProxies {
    http: Option<FileProxy>,
    https: Option<FileProxy>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileProxy {
    url: String,
    user: Option<String>,
    password: Option<String>,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub gradle_user_home: PathBuf,
    pub services_url: Url,
    pub distributions_url: Url,
    pub jobs: usize,
    pub transport: TransportConfig,
}

impl Settings {
    /// Resolve from the process environment
    pub fn load(overrides: &Overrides) -> Result<Self, Error> {
        Self::resolve(overrides, |key| std::env::var(key).ok(), home::home_dir())
    }

    /// Precedence: flag, then environment, then config file, then defaults
    pub fn resolve(
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
        user_home: Option<PathBuf>,
    ) -> Result<Self, Error> {
        let env = |key: &str| env(key).filter(|value| !value.is_empty());

        let config_path = overrides
            .config
            .clone()
            .or_else(|| env(CONFIG_ENV).map(PathBuf::from));
        let file = match &config_path {
            Some(path) => read_config(path)?,
            None => FileConfig::default(),
        };
        let origin = config_path.unwrap_or_else(|| PathBuf::from("<defaults>"));

        let gradle_user_home = match overrides
            .gradle_user_home
            .clone()
            .or_else(|| env(GRADLE_USER_HOME_ENV).map(PathBuf::from))
            .or(file.gradle_user_home)
        {
            Some(path) => path,
            None => user_home
                .map(|home| home.join(constants::DEFAULT_GRADLE_USER_HOME_DIR))
                .ok_or_else(|| Error::Config {
                    path: origin.clone(),
                    message: format!(
                        "cannot determine the user home directory; set {}",
                        GRADLE_USER_HOME_ENV
                    ),
                })?,
        };

        let services_url = parse_base_url(
            overrides
                .services_url
                .as_deref()
                .or(file.services_url.as_deref())
                .unwrap_or(constants::DEFAULT_SERVICES_URL),
        )?;
        let distributions_url = parse_base_url(
            overrides
                .distributions_url
                .as_deref()
                .or(file.distributions_url.as_deref())
                .unwrap_or(constants::DEFAULT_DISTRIBUTIONS_URL),
        )?;

        let jobs = overrides
            .jobs
            .or(file.jobs)
            .unwrap_or(constants::DEFAULT_JOBS);
        if jobs == 0 {
            return Err(Error::Config {
                path: origin,
                message: "jobs must be at least 1".to_string(),
            });
        }

        let file_wrapper = file.wrapper.unwrap_or_default();
        let wrapper_credentials = credentials(
            env(WRAPPER_USER_ENV).or(file_wrapper.user),
            env(WRAPPER_PASSWORD_ENV).or(file_wrapper.password),
        );

        let transport = TransportConfig {
            connect_timeout: Duration::from_secs(
                file.connect_timeout_secs
                    .unwrap_or(constants::DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            read_timeout: Duration::from_secs(
                file.read_timeout_secs
                    .unwrap_or(constants::DEFAULT_READ_TIMEOUT_SECS),
            ),
            wrapper_credentials,
            http_proxy: file.proxy.http.map(|p| proxy(p, "HTTP", &env)),
            https_proxy: file.proxy.https.map(|p| proxy(p, "HTTPS", &env)),
        };

        Ok(Self {
            gradle_user_home,
            services_url,
            distributions_url,
            jobs,
            transport,
        })
    }

    pub fn current_version_url(&self) -> Url {
        child_url(&self.services_url, constants::CURRENT_VERSION_PATH)
    }

    pub fn all_versions_url(&self) -> Url {
        child_url(&self.services_url, constants::ALL_VERSIONS_PATH)
    }
}

fn read_config(path: &Path) -> Result<FileConfig, Error> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    toml::from_str(&content).map_err(|e| Error::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn parse_base_url(value: &str) -> Result<Url, Error> {
    let url = Url::parse(value).map_err(|e| Error::Url {
        url: value.to_string(),
        message: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(Error::Url {
            url: value.to_string(),
            message: "not a hierarchical URL".to_string(),
        });
    }
    Ok(url)
}

/// Append `path` below `base`, keeping every segment of `base`
fn child_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().extend(path.split('/'));
    }
    url
}

fn credentials(user: Option<String>, password: Option<String>) -> Option<Credentials> {
    user.map(|user| Credentials::new(user, password.unwrap_or_default()))
}

fn proxy(file: FileProxy, scheme: &str, env: &impl Fn(&str) -> Option<String>) -> ProxySettings {
    let user = env(format!("DISTSHARE_{}_PROXY_USER", scheme).as_str()).or(file.user);
    let password = env(format!("DISTSHARE_{}_PROXY_PASSWORD", scheme).as_str()).or(file.password);
    ProxySettings {
        url: file.url,
        credentials: credentials(user, password),
    }
}
