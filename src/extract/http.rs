//! HTTP client for fetching pages and oEmbed endpoints

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode, redirect};
use thiserror::Error;
use tracing::{debug, warn};
use url::{Host, Url};

use super::policy::IpPolicy;

const MAX_REDIRECTS: usize = 10;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("address {0} is not permitted by network policy")]
    Blocked(IpAddr),

    #[error("no permitted address for host {0}")]
    NoPermittedAddress(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Too many redirects")]
    TooManyRedirects,
}

pub type Result<T> = std::result::Result<T, FetchError>;

/// Fetch limits, fixed for the life of a client
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Bytes read from HTML (and JSON) responses
    pub max_html_bytes: u64,
    /// Bytes read from any other content
    pub max_binary_bytes: u64,
    /// Bound on connecting and on the whole request
    pub wait_timeout: Duration,
    pub user_agent: String,
    pub policy: IpPolicy,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_html_bytes: 50_000,
            max_binary_bytes: 4096,
            wait_timeout: Duration::from_secs(7),
            user_agent: concat!("ProcLink/", env!("CARGO_PKG_VERSION")).to_string(),
            policy: IpPolicy::default(),
        }
    }
}

/// A fetched response with a size-capped body
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: StatusCode,
    /// Final URL after redirects
    pub url: Url,
    pub content_type: Option<mime::Mime>,
    pub body: Bytes,
}

impl Fetched {
    pub fn is_html(&self) -> bool {
        is_html(self.content_type.as_ref())
    }

    pub fn is_image(&self) -> bool {
        self.content_type
            .as_ref()
            .is_some_and(|mime| mime.type_() == mime::IMAGE)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Resolver that drops every address the policy does not permit
struct PolicyResolver {
    policy: Arc<IpPolicy>,
}

impl Resolve for PolicyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let policy = self.policy.clone();
        Box::pin(async move {
            let host = name.as_str().to_string();
            let resolved: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0)).await?.collect();

            let permitted: Vec<SocketAddr> = resolved
                .iter()
                .copied()
                .filter(|addr| policy.permits(addr.ip()))
                .collect();

            if permitted.len() < resolved.len() {
                warn!(
                    host,
                    resolved = resolved.len(),
                    permitted = permitted.len(),
                    "Dropped addresses outside network policy"
                );
            }

            if permitted.is_empty() {
                return Err(Box::new(FetchError::NoPermittedAddress(host)) as BoxError);
            }

            let addrs: Addrs = Box::new(permitted.into_iter());
            Ok::<Addrs, BoxError>(addrs)
        })
    }
}

/// Policy-enforcing HTTP fetcher
pub struct HttpClient {
    client: Client,
    config: HttpConfig,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(config: HttpConfig) -> Result<Self> {
        let policy = Arc::new(config.policy.clone());
        let redirect_policy = policy.clone();

        let client = Client::builder()
            .connect_timeout(config.wait_timeout)
            .timeout(config.wait_timeout)
            .user_agent(&config.user_agent)
            // A proxy would resolve names on our behalf and bypass the policy
            .no_proxy()
            .dns_resolver(Arc::new(PolicyResolver { policy }))
            .redirect(redirect::Policy::custom(move |attempt| {
                if attempt.previous().len() >= MAX_REDIRECTS {
                    return attempt.error(FetchError::TooManyRedirects);
                }
                match literal_ip(attempt.url()) {
                    Some(ip) if !redirect_policy.permits(ip) => attempt.error(FetchError::Blocked(ip)),
                    _ => attempt.follow(),
                }
            }))
            .build()
            .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Check a URL against scheme and literal-address rules before any I/O.
    ///
    /// Hostnames are checked later, at resolution time.
    pub fn check(&self, url: &Url) -> Result<()> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!("unsupported scheme: {}", url.scheme())));
        }
        if url.host().is_none() {
            return Err(FetchError::InvalidUrl(format!("missing host: {url}")));
        }
        if let Some(ip) = literal_ip(url) {
            if !self.config.policy.permits(ip) {
                return Err(FetchError::Blocked(ip));
            }
        }
        Ok(())
    }

    /// GET a URL, reading at most the configured number of bytes for its
    /// content type. Bodies of non-success responses are not read.
    pub async fn fetch(&self, url: &Url) -> Result<Fetched> {
        self.check(url)?;
        debug!(%url, "Starting fetch");

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<mime::Mime>().ok());

        let body = if status.is_success() {
            let limit = if is_html(content_type.as_ref()) || is_json(content_type.as_ref()) {
                self.config.max_html_bytes
            } else {
                self.config.max_binary_bytes
            };
            read_limited(&mut response, limit).await?
        } else {
            Bytes::new()
        };

        debug!(%url, status = status.as_u16(), size = body.len(), "Fetch completed");

        Ok(Fetched {
            status,
            url: final_url,
            content_type,
            body,
        })
    }
}

async fn read_limited(response: &mut Response, limit: u64) -> Result<Bytes> {
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let mut buf = BytesMut::new();

    while buf.len() < limit {
        let Some(chunk) = response.chunk().await.map_err(map_request_error)? else {
            break;
        };
        let remaining = limit - buf.len();
        buf.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
    }

    Ok(buf.freeze())
}

fn map_request_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_redirect() {
        FetchError::RequestFailed(format!("redirect rejected: {e}"))
    } else {
        FetchError::RequestFailed(e.to_string())
    }
}

fn literal_ip(url: &Url) -> Option<IpAddr> {
    match url.host()? {
        Host::Ipv4(ip) => Some(IpAddr::V4(ip)),
        Host::Ipv6(ip) => Some(IpAddr::V6(ip)),
        Host::Domain(_) => None,
    }
}

fn is_html(content_type: Option<&mime::Mime>) -> bool {
    content_type.is_some_and(|mime| mime.essence_str() == "text/html" || mime.subtype().as_str() == "xhtml")
}

fn is_json(content_type: Option<&mime::Mime>) -> bool {
    content_type.is_some_and(|mime| mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON))
}
