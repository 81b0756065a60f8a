// HTTP transport for catalog documents and distribution archives

use crate::constants;
use crate::dists::distribution::safe_url;
use crate::dists::error::TransportError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, HeaderValue};
use reqwest::{Client, Proxy, Response};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;

lazy_static::lazy_static! {
    /// User-Agent string sent with every request
    static ref USER_AGENT: String = format!(
        "{}/{} ({};{};{})",
        constants::APP_NAME,
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::FAMILY,
        std::env::consts::ARCH,
    );
}

pub fn user_agent() -> &'static str {
    &USER_AGENT
}

/// Progress sink for archive downloads
pub trait DownloadReporter: Send + Sync {
    fn on_download_start(&self, name: &str, total: Option<u64>);
    fn on_download_progress(&self, inc: u64);
    fn on_download_complete(&self);
}

/// Reporter that drops every event
#[cfg(test)]
pub struct NoReporter;

#[cfg(test)]
impl DownloadReporter for NoReporter {
    fn on_download_start(&self, _name: &str, _total: Option<u64>) {}
    fn on_download_progress(&self, _inc: u64) {}
    fn on_download_complete(&self) {}
}

/// Network capability used by the catalog and the materializer
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// GET a small document into memory
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError>;

    /// GET `url` and stream the body into `destination`, returning the byte count.
    ///
    /// `destination` is truncated first. On error its content is unspecified; the
    /// caller owns cleanup.
    async fn download(
        &self,
        url: &Url,
        destination: &Path,
        reporter: &dyn DownloadReporter,
    ) -> Result<u64, TransportError>;
}

/// Username and password pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Value for an `Authorization` header
    pub fn basic_header(&self) -> String {
        let raw = format!("{}:{}", self.user, self.password);
        format!("Basic {}", STANDARD.encode(raw.as_bytes()))
    }

    fn from_url(url: &Url) -> Option<Self> {
        if url.username().is_empty() {
            return None;
        }
        Some(Self::new(url.username(), url.password().unwrap_or_default()))
    }
}

/// Proxy endpoint for one protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub url: String,
    pub credentials: Option<Credentials>,
}

/// Everything the HTTP transport needs, passed in explicitly
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub wrapper_credentials: Option<Credentials>,
    pub http_proxy: Option<ProxySettings>,
    pub https_proxy: Option<ProxySettings>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(constants::DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(constants::DEFAULT_READ_TIMEOUT_SECS),
            wrapper_credentials: None,
            http_proxy: None,
            https_proxy: None,
        }
    }
}

/// `reqwest` backed transport
pub struct HttpTransport {
    client: Client,
    wrapper_credentials: Option<Credentials>,
    cancel: CancellationToken,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig, cancel: CancellationToken) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .user_agent(user_agent())
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout);

        if let Some(proxy) = &config.http_proxy {
            builder = builder.proxy(build_proxy(Proxy::http(&proxy.url)?, proxy));
        }
        if let Some(proxy) = &config.https_proxy {
            builder = builder.proxy(build_proxy(Proxy::https(&proxy.url)?, proxy));
        }

        Ok(Self {
            client: builder.build()?,
            wrapper_credentials: config.wrapper_credentials.clone(),
            cancel,
        })
    }

    async fn get(&self, url: &Url) -> Result<Response, TransportError> {
        let safe = safe_url(url);
        let mut request = self.client.get(safe.clone());

        if let Some(credentials) = self.credentials_for(url) {
            if safe.scheme() != "https" {
                warn!(
                    "Using HTTP Basic Authentication over an insecure connection to {}. Please consider using HTTPS.",
                    safe
                );
            }
            let header = HeaderValue::from_str(&credentials.basic_header()).map_err(|_| {
                TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "credentials contain characters not allowed in a header",
                ))
            })?;
            request = request.header(AUTHORIZATION, header);
        }

        debug!("GET {}", safe);
        let response = request
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(safe.as_str(), e))?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                url: safe.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }

    /// Configured wrapper credentials win over user-info embedded in the URL
    fn credentials_for(&self, url: &Url) -> Option<Credentials> {
        self.wrapper_credentials
            .clone()
            .or_else(|| Credentials::from_url(url))
    }
}

fn build_proxy(proxy: Proxy, settings: &ProxySettings) -> Proxy {
    match &settings.credentials {
        Some(c) => proxy.basic_auth(&c.user, &c.password),
        None => proxy,
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, TransportError> {
        let response = self.get(url).await?;
        let safe = safe_url(url);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(safe.as_str(), e))?;
        Ok(bytes.to_vec())
    }

    async fn download(
        &self,
        url: &Url,
        destination: &Path,
        reporter: &dyn DownloadReporter,
    ) -> Result<u64, TransportError> {
        let safe = safe_url(url);
        let mut response = self.get(url).await?;

        let total = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        let name = safe
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("download")
            .to_string();

        let mut file = tokio::fs::File::create(destination).await?;
        reporter.on_download_start(&name, total);

        let mut written = 0u64;
        loop {
            let chunk = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(TransportError::Interrupted { url: safe.to_string() });
                }
                chunk = response.chunk() => {
                    chunk.map_err(|e| TransportError::from_reqwest(safe.as_str(), e))?
                }
            };
            let Some(chunk) = chunk else { break };

            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            reporter.on_download_progress(chunk.len() as u64);
        }

        file.flush().await?;
        file.sync_all().await?;
        reporter.on_download_complete();

        debug!("Downloaded {} bytes from {}", written, safe);
        Ok(written)
    }
}
