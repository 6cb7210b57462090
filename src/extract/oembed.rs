use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use super::Extractor;
use super::html::PageInfo;
use super::http::{FetchError, HttpClient, HttpConfig};
use super::metadata::Metadata;
use super::providers::{Provider, ProviderRegistry};

/// Production extractor: oEmbed providers first, then the page itself.
///
/// Build one per worker; each owns its HTTP client.
pub struct OembedExtractor {
    client: HttpClient,
    providers: Arc<ProviderRegistry>,
}

impl OembedExtractor {
    pub fn new(config: HttpConfig, providers: Arc<ProviderRegistry>) -> Result<Self, FetchError> {
        Ok(Self {
            client: HttpClient::new(config)?,
            providers,
        })
    }

    async fn from_provider(&self, provider: &Provider, url: &Url) -> Option<Metadata> {
        let endpoint = match provider.endpoint_for(url.as_str()) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                warn!(provider = %provider.name, error = %err, "Invalid provider endpoint");
                return None;
            }
        };

        let mut info = self.fetch_oembed(&endpoint).await?;
        if info.status < 300 {
            info.provider_name.get_or_insert_with(|| provider.name.clone());
            if !provider.url.is_empty() {
                info.provider_url.get_or_insert_with(|| provider.url.clone());
            }
        }
        Some(info)
    }

    async fn from_page(&self, url: &Url) -> Option<Metadata> {
        let page = match self.client.fetch(url).await {
            Ok(page) => page,
            Err(err) => {
                debug!(%url, error = %err, "Page fetch failed");
                return None;
            }
        };

        let status = page.status.as_u16();
        if status >= 300 {
            return Some(Metadata::with_status(status));
        }

        if page.is_html() {
            let parsed = PageInfo::parse(&page.text(), &page.url);

            if let Some(discovery) = &parsed.oembed_url {
                match self.fetch_oembed(discovery).await {
                    Some(info) if info.status < 300 => return Some(info),
                    _ => debug!(%url, %discovery, "Discovery link unusable, using page metadata"),
                }
            }

            return Some(parsed.into_metadata(&page.url));
        }

        let kind = if page.is_image() { "photo" } else { "link" };
        Some(Metadata {
            status,
            kind: kind.to_string(),
            version: Some("1.0".to_string()),
            url: Some(page.url.to_string()),
            provider_name: page.url.host_str().map(str::to_string),
            provider_url: Some(page.url.origin().ascii_serialization()),
            ..Default::default()
        })
    }

    async fn fetch_oembed(&self, endpoint: &Url) -> Option<Metadata> {
        let response = match self.client.fetch(endpoint).await {
            Ok(response) => response,
            Err(err) => {
                debug!(%endpoint, error = %err, "oEmbed request failed");
                return None;
            }
        };

        let status = response.status.as_u16();
        if status >= 300 {
            return Some(Metadata::with_status(status));
        }

        match serde_json::from_slice::<Metadata>(&response.body) {
            Ok(mut info) => {
                info.status = status;
                Some(info)
            }
            Err(err) => {
                debug!(%endpoint, error = %err, "oEmbed response is not valid JSON");
                None
            }
        }
    }
}

#[async_trait]
impl Extractor for OembedExtractor {
    async fn extract(&self, url: &str) -> Option<Metadata> {
        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(url, error = %err, "Unparseable url");
                return None;
            }
        };

        if let Err(err) = self.client.check(&parsed) {
            warn!(url, error = %err, "Url rejected");
            return None;
        }

        match self.providers.find(url) {
            Some(provider) => {
                debug!(url, provider = %provider.name, "Using oEmbed provider");
                self.from_provider(provider, &parsed).await
            }
            None => self.from_page(&parsed).await,
        }
    }
}
