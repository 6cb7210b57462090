//! oEmbed provider registry
//!
//! Reads the `providers.json` list published at <https://oembed.com/providers.json>:
//!
//! ```json
//! [{
//!   "provider_name": "YouTube",
//!   "provider_url": "https://www.youtube.com/",
//!   "endpoints": [{
//!     "schemes": ["https://*.youtube.com/watch*"],
//!     "url": "https://www.youtube.com/oembed"
//!   }]
//! }]
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to read providers file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse providers: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct ProviderRecord {
    provider_name: String,
    #[serde(default)]
    provider_url: String,
    #[serde(default)]
    endpoints: Vec<EndpointRecord>,
}

#[derive(Debug, Deserialize)]
struct EndpointRecord {
    #[serde(default)]
    schemes: Vec<String>,
    url: String,
}

/// One endpoint of one provider, with the URL schemes it serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub name: String,
    pub url: String,
    endpoint: String,
    schemes: Vec<String>,
}

impl Provider {
    pub fn matches(&self, url: &str) -> bool {
        self.schemes.iter().any(|scheme| wildcard_match(scheme, url))
    }

    /// Endpoint URL asking for the JSON representation of `target`
    pub fn endpoint_for(&self, target: &str) -> Result<Url, url::ParseError> {
        let mut endpoint = Url::parse(&self.endpoint.replace("{format}", "json"))?;
        endpoint
            .query_pairs_mut()
            .append_pair("url", target)
            .append_pair("format", "json");
        Ok(endpoint)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Provider>,
}

impl ProviderRegistry {
    pub fn load(path: &Path) -> Result<Self, ProviderError> {
        let bytes = std::fs::read(path).map_err(|source| ProviderError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&bytes)
    }

    /// Endpoints without schemes can only be reached through discovery and
    /// are skipped.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ProviderError> {
        let records: Vec<ProviderRecord> = serde_json::from_slice(bytes)?;

        let providers = records
            .into_iter()
            .flat_map(|record| {
                let ProviderRecord {
                    provider_name,
                    provider_url,
                    endpoints,
                } = record;
                endpoints
                    .into_iter()
                    .filter(|endpoint| !endpoint.schemes.is_empty())
                    .map(move |endpoint| Provider {
                        name: provider_name.clone(),
                        url: provider_url.clone(),
                        endpoint: endpoint.url,
                        schemes: endpoint.schemes,
                    })
            })
            .collect();

        Ok(Self { providers })
    }

    /// First provider whose schemes match `url`
    pub fn find(&self, url: &str) -> Option<&Provider> {
        self.providers.iter().find(|provider| provider.matches(url))
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Glob match where `*` stands for any run of characters
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern = pattern.as_bytes();
    let text = text.as_bytes();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p].eq_ignore_ascii_case(&text[t]) {
            p += 1;
            t += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, t));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}
