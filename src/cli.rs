use clap::{Parser, Subcommand};
use std::path::PathBuf;

use proclink::config::{ByteSize, Config};

#[derive(Parser, Debug)]
#[command(name = "proclink")]
#[command(about = "ProcLink link metadata service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Server(ServerArgs),
}

/// Flags given here override the configuration file and environment
#[derive(clap::Args, Debug, Default)]
pub struct ServerArgs {
    /// Configuration file (default: $PROCLINK_CONFIG or config/proclink.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// oEmbed providers list
    #[arg(long)]
    pub providers_file: Option<PathBuf>,

    /// Number of workers, i.e. concurrent extractions
    #[arg(long)]
    pub worker_count: Option<usize>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Bytes read from HTML pages, e.g. 50000 or 48KB
    #[arg(long)]
    pub html_bytes_to_read: Option<ByteSize>,

    /// Bytes read from other content
    #[arg(long)]
    pub binary_bytes_to_read: Option<ByteSize>,

    /// Network timeout in seconds
    #[arg(long)]
    pub wait_timeout: Option<u64>,

    /// Space-separated CIDR ranges the extractor may contact
    #[arg(long)]
    pub whitelist_ranges: Option<String>,

    /// Space-separated CIDR ranges the extractor must never contact
    #[arg(long)]
    pub blacklist_ranges: Option<String>,
}

impl ServerArgs {
    pub fn apply(self, config: &mut Config) {
        if let Some(providers_file) = self.providers_file {
            config.extractor.providers_file = providers_file;
        }
        if let Some(worker_count) = self.worker_count {
            config.pool.worker_count = worker_count;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(size) = self.html_bytes_to_read {
            config.extractor.html_bytes_to_read = size;
        }
        if let Some(size) = self.binary_bytes_to_read {
            config.extractor.binary_bytes_to_read = size;
        }
        if let Some(secs) = self.wait_timeout {
            config.extractor.wait_timeout_secs = secs;
        }
        if let Some(ranges) = self.whitelist_ranges {
            config.extractor.whitelist_ranges = ranges;
        }
        if let Some(ranges) = self.blacklist_ranges {
            config.extractor.blacklist_ranges = ranges;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "proclink",
            "server",
            "--worker-count",
            "4",
            "--port",
            "9100",
            "--html-bytes-to-read",
            "48KB",
            "--blacklist-ranges",
            "10.0.0.0/8 127.0.0.0/8",
        ]);
        let Commands::Server(args) = cli.command;

        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.pool.worker_count, 4);
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.extractor.html_bytes_to_read, ByteSize(48 * 1024));
        assert_eq!(config.extractor.blacklist_ranges, "10.0.0.0/8 127.0.0.0/8");
        assert_eq!(config.extractor.wait_timeout_secs, 7);
    }
}
