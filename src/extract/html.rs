//! HTML metadata parsing

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use super::metadata::Metadata;

static META: LazyLock<Selector> = LazyLock::new(|| Selector::parse("meta").expect("valid selector"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static OEMBED_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"link[rel~="alternate"][type="application/json+oembed"]"#).expect("valid selector")
});

/// Metadata found in a page's markup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
    /// JSON oEmbed discovery link, resolved against the page URL
    pub oembed_url: Option<Url>,
}

impl PageInfo {
    pub fn parse(html: &str, base: &Url) -> Self {
        let document = Html::parse_document(html);

        let mut og = Tags::default();
        let mut twitter = Tags::default();
        let mut description = None;

        for element in document.select(&META) {
            let value = element.value();
            let Some(content) = value.attr("content").map(str::trim).filter(|c| !c.is_empty()) else {
                continue;
            };
            let key = value
                .attr("property")
                .or_else(|| value.attr("name"))
                .unwrap_or_default()
                .to_ascii_lowercase();

            match key.as_str() {
                "og:title" => og.title.get_or_insert_with(|| content.to_string()),
                "og:description" => og.description.get_or_insert_with(|| content.to_string()),
                "og:image" | "og:image:url" => og.image.get_or_insert_with(|| content.to_string()),
                "og:site_name" => og.site_name.get_or_insert_with(|| content.to_string()),
                "twitter:title" => twitter.title.get_or_insert_with(|| content.to_string()),
                "twitter:description" => twitter.description.get_or_insert_with(|| content.to_string()),
                "twitter:image" | "twitter:image:src" => {
                    twitter.image.get_or_insert_with(|| content.to_string())
                }
                "description" => description.get_or_insert_with(|| content.to_string()),
                _ => continue,
            };
        }

        let title = document
            .select(&TITLE)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let oembed_url = document
            .select(&OEMBED_LINK)
            .filter_map(|el| el.value().attr("href"))
            .find_map(|href| base.join(href.trim()).ok());

        Self {
            title: og.title.or(twitter.title).or(title),
            description: og.description.or(twitter.description).or(description),
            image: og
                .image
                .or(twitter.image)
                .and_then(|src| base.join(&src).ok())
                .map(String::from),
            site_name: og.site_name,
            oembed_url,
        }
    }

    /// Build `link` metadata for the page at `url`
    pub fn into_metadata(self, url: &Url) -> Metadata {
        let host = url.host_str().map(str::to_string);

        Metadata {
            status: 200,
            kind: "link".to_string(),
            version: Some("1.0".to_string()),
            url: Some(url.to_string()),
            title: self.title,
            description: self.description,
            provider_name: self.site_name.or(host),
            provider_url: Some(url.origin().ascii_serialization()),
            thumbnail_url: self.image,
            ..Default::default()
        }
    }
}

#[derive(Default)]
struct Tags {
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    site_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/articles/42").unwrap()
    }

    #[test]
    fn opengraph_wins_over_fallbacks() {
        let html = r#"<html><head>
            <title>Plain title</title>
            <meta name="description" content="Plain description">
            <meta property="og:title" content="OG title">
            <meta property="og:description" content="OG description">
            <meta property="og:image" content="/img/cover.png">
            <meta property="og:site_name" content="Example Site">
        </head><body></body></html>"#;

        let page = PageInfo::parse(html, &base());
        assert_eq!(page.title.as_deref(), Some("OG title"));
        assert_eq!(page.description.as_deref(), Some("OG description"));
        assert_eq!(page.image.as_deref(), Some("https://example.com/img/cover.png"));
        assert_eq!(page.site_name.as_deref(), Some("Example Site"));
        assert!(page.oembed_url.is_none());
    }

    #[test]
    fn falls_back_to_twitter_then_document() {
        let html = r#"<html><head>
            <title>  Document title </title>
            <meta name="twitter:description" content="Tweet description">
            <meta name="description" content="Plain description">
        </head></html>"#;

        let page = PageInfo::parse(html, &base());
        assert_eq!(page.title.as_deref(), Some("Document title"));
        assert_eq!(page.description.as_deref(), Some("Tweet description"));
        assert!(page.image.is_none());
    }

    #[test]
    fn finds_json_discovery_link() {
        let html = r#"<html><head>
            <link rel="alternate" type="text/xml+oembed" href="/oembed.xml?u=1">
            <link rel="alternate" type="application/json+oembed" href="/oembed?url=x&amp;format=json">
        </head></html>"#;

        let page = PageInfo::parse(html, &base());
        assert_eq!(
            page.oembed_url.unwrap().as_str(),
            "https://example.com/oembed?url=x&format=json"
        );
    }

    #[test]
    fn link_metadata_uses_host_without_site_name() {
        let page = PageInfo {
            title: Some("Hello".to_string()),
            ..Default::default()
        };
        let url = Url::parse("https://blog.example.com:8443/post").unwrap();

        let info = page.into_metadata(&url);
        assert_eq!(info.status, 200);
        assert_eq!(info.kind, "link");
        assert_eq!(info.provider_name.as_deref(), Some("blog.example.com"));
        assert_eq!(info.provider_url.as_deref(), Some("https://blog.example.com:8443"));
        assert_eq!(info.url.as_deref(), Some("https://blog.example.com:8443/post"));
    }
}
