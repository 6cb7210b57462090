use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extract::{HttpConfig, IpPolicy, PolicyError};
use crate::humanize::ByteSize;
use crate::pool::PoolConfig;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pool: PoolSettings,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Read/write deadline per request; defaults to the extractor wait timeout
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: None,
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Worker pool sizing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolSettings {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Defaults to `worker_count`
    #[serde(default)]
    pub queue_capacity: Option<usize>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: None,
        }
    }
}

fn default_worker_count() -> usize {
    1000
}

/// Settings shared by every worker's extractor
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    /// oEmbed providers list
    #[serde(default = "default_providers_file")]
    pub providers_file: PathBuf,
    #[serde(default = "default_html_bytes_to_read")]
    pub html_bytes_to_read: ByteSize,
    #[serde(default = "default_binary_bytes_to_read")]
    pub binary_bytes_to_read: ByteSize,
    #[serde(default = "default_wait_timeout_secs")]
    pub wait_timeout_secs: u64,
    /// Space-separated CIDR ranges the extractor may contact
    #[serde(default)]
    pub whitelist_ranges: String,
    /// Space-separated CIDR ranges the extractor must never contact
    #[serde(default)]
    pub blacklist_ranges: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            providers_file: default_providers_file(),
            html_bytes_to_read: default_html_bytes_to_read(),
            binary_bytes_to_read: default_binary_bytes_to_read(),
            wait_timeout_secs: default_wait_timeout_secs(),
            whitelist_ranges: String::new(),
            blacklist_ranges: String::new(),
        }
    }
}

fn default_providers_file() -> PathBuf {
    PathBuf::from("providers.json")
}

fn default_html_bytes_to_read() -> ByteSize {
    ByteSize(50_000)
}

fn default_binary_bytes_to_read() -> ByteSize {
    ByteSize(4096)
}

fn default_wait_timeout_secs() -> u64 {
    7
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.server
                .request_timeout_secs
                .unwrap_or(self.extractor.wait_timeout_secs),
        )
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            worker_count: self.pool.worker_count,
            queue_capacity: self.pool.queue_capacity.unwrap_or(self.pool.worker_count),
        }
    }

    /// Fetch settings handed to every worker's extractor
    pub fn http_config(&self) -> Result<HttpConfig, PolicyError> {
        let policy = IpPolicy::from_ranges(
            &self.extractor.whitelist_ranges,
            &self.extractor.blacklist_ranges,
        )?;

        Ok(HttpConfig {
            max_html_bytes: self.extractor.html_bytes_to_read.as_u64(),
            max_binary_bytes: self.extractor.binary_bytes_to_read.as_u64(),
            wait_timeout: Duration::from_secs(self.extractor.wait_timeout_secs),
            policy,
            ..HttpConfig::default()
        })
    }
}
