//! Link metadata extraction
//!
//! The pool only depends on the [`Extractor`] trait. The production
//! implementation, [`OembedExtractor`], resolves a URL through a registered
//! oEmbed provider when one matches, and otherwise fetches the page and reads
//! oEmbed discovery links, OpenGraph/Twitter tags and the document title.
//!
//! All network access goes through [`HttpClient`], which enforces the
//! [`IpPolicy`] on every resolved address, caps the number of bytes read and
//! bounds every request by the configured wait timeout.

mod html;
mod http;
mod metadata;
mod oembed;
mod policy;
mod providers;

use async_trait::async_trait;

pub use html::PageInfo;
pub use http::{FetchError, Fetched, HttpClient, HttpConfig};
pub use metadata::Metadata;
pub use oembed::OembedExtractor;
pub use policy::{IpPolicy, PolicyError};
pub use providers::{Provider, ProviderError, ProviderRegistry};

/// Turns a URL into metadata.
///
/// Implementations bound their own network waits. Each worker owns one
/// instance, so implementations need no internal locking.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// `None` means no information could be obtained. Otherwise
    /// [`Metadata::status`] carries the upstream status code.
    async fn extract(&self, url: &str) -> Option<Metadata>;
}
