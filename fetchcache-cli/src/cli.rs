use clap::Parser;
use fetchcache_engine::ProxyType;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "Fetch resources by URL through a persistent disk cache",
    long_about = "Downloads each URL once and keeps the bytes in a local disk cache keyed by\n\
                  the URL. Later runs for the same URL are served from the cache without\n\
                  touching the network. Downloaded bytes are written to the output directory."
)]
pub struct CliArgs {
    /// URLs (or identifiers relative to --base-url) to fetch
    #[arg(required = true, help = "URL(s) to fetch")]
    pub input: Vec<String>,

    /// Output directory for fetched files
    #[arg(
        short,
        long,
        help = "Directory where fetched files will be saved (default: current directory)"
    )]
    pub output_dir: Option<PathBuf>,

    /// Base URL for relative identifiers
    #[arg(long, help = "Base URL that relative inputs are resolved against")]
    pub base_url: Option<String>,

    /// Custom HTTP headers for requests
    #[arg(
        long = "header",
        short = 'H',
        help = "Add custom HTTP header to requests (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    /// Scale attached to each request
    #[arg(long, default_value = "1.0", help = "Scale of the requested resources")]
    pub scale: f64,

    /// Cache directory
    #[arg(
        long,
        help = "Directory for the disk cache (default: <system temp>/fetchcache)"
    )]
    pub cache_dir: Option<PathBuf>,

    /// Disable the disk cache
    #[arg(long, help = "Always fetch from the network and never write the cache")]
    pub no_cache: bool,

    /// Overall timeout in seconds
    #[arg(
        long,
        default_value = "0",
        help = "Overall timeout in seconds for HTTP requests (0 disables it)"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// Proxy URL (e.g., "http://proxy.example.com:8080")
    #[arg(long, help = "Proxy server URL (e.g., \"http://proxy.example.com:8080\")")]
    pub proxy: Option<String>,

    /// Proxy type
    #[arg(long, value_enum, default_value = "http", help = "Proxy type")]
    pub proxy_type: ProxyType,

    /// Proxy username
    #[arg(long, help = "Username for proxy authentication")]
    pub proxy_user: Option<String>,

    /// Proxy password
    #[arg(long, help = "Password for proxy authentication")]
    pub proxy_pass: Option<String>,

    /// Disable all proxy settings
    #[arg(
        long,
        help = "Disable all proxy settings (including system proxy)"
    )]
    pub no_proxy: bool,

    /// Show progress bars
    #[arg(
        short = 'P',
        long = "progress",
        default_value = "false",
        help = "Show progress bars for downloads"
    )]
    pub show_progress: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,
}
