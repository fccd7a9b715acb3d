use std::{path::Path, path::PathBuf, time::Duration};

use bytes::Bytes;
use clap::Parser;
use error::AppError;
use fetchcache_engine::{
    CacheKey, FetchError, Fetcher, FetcherConfig, ProxyAuth, ProxyConfig, RawDecoder, ResourceLoad,
    ResourceRequest,
};
use futures::future::join_all;
use indicatif::MultiProgress;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use url::Url;

mod cli;
mod error;
mod utils;

use cli::CliArgs;
use utils::progress::ProgressManager;
use utils::{create_dirs, format_bytes, output_file_name, parse_headers, unique_file_names};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    // Parse command-line arguments
    let args = CliArgs::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("fetchcache.log")?;

    let multi_writer = MakeWriterExt::and(std::io::stdout, log_file);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(multi_writer)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    info!("fetchcache {}", env!("CARGO_PKG_VERSION"));

    info!(
        "HTTP timeout configuration: overall={}s, connect={}s",
        args.timeout, args.connect_timeout
    );

    let config = build_config(&args)?;
    let fetcher = Fetcher::new(&config)?;
    info!(
        cache_enabled = fetcher.cache().is_enabled(),
        cache_dir = %fetcher.cache().root().display(),
        "Fetcher ready"
    );

    // Determine output directory
    let output_dir = args.output_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    create_dirs(&output_dir).await?;

    // Create a progress manager based on show_progress flag
    let multi = MultiProgress::new();
    let progress_manager = if args.show_progress {
        ProgressManager::new(multi.clone())
    } else {
        ProgressManager::new_disabled(multi.clone())
    };

    let headers = parse_headers(&args.headers);

    // Names are assigned up front so concurrent downloads never share a file
    let file_names = unique_file_names(args.input.iter().map(|input| {
        fetcher
            .resolve_uri(input)
            .map(|uri| output_file_name(&uri, input))
            .unwrap_or_else(|_| CacheKey::for_identifier(input).to_string())
    }));

    let outcomes = join_all(args.input.iter().zip(&file_names).map(|(input, file_name)| {
        fetch_one(
            &fetcher,
            &progress_manager,
            input,
            file_name,
            &headers,
            args.scale,
            &output_dir,
        )
    }))
    .await;

    let total = outcomes.len();
    let failed = outcomes
        .into_iter()
        .zip(&args.input)
        .filter_map(|(outcome, input)| {
            outcome
                .inspect_err(|e| error!(input = %input, error = %e, "Fetch failed"))
                .err()
        })
        .count();

    if failed > 0 {
        return Err(AppError::Incomplete { failed, total });
    }

    info!("All {} resources fetched", total);
    Ok(())
}

/// Translate command-line flags into a fetcher configuration.
fn build_config(args: &CliArgs) -> Result<FetcherConfig, AppError> {
    let mut builder = FetcherConfig::builder()
        .with_timeout(Duration::from_secs(args.timeout))
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_caching_enabled(!args.no_cache);

    if let Some(dir) = &args.cache_dir {
        builder = builder.with_cache_dir(dir);
    }

    if let Some(base) = &args.base_url {
        let base = Url::parse(base)
            .map_err(|e| AppError::InvalidInput(format!("Invalid base URL '{base}': {e}")))?;
        builder = builder.with_base_url(base);
    }

    // Handle proxy configuration
    if args.no_proxy {
        // No proxy flag overrides everything else
        info!("All proxy settings disabled (--no-proxy flag)");
        builder = builder.with_system_proxy(false);
    } else if let Some(proxy_url) = &args.proxy {
        // Configure proxy authentication if both username and password are provided
        let auth = match (&args.proxy_user, &args.proxy_pass) {
            (Some(username), Some(password)) => Some(ProxyAuth {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, None) => None,
            _ => {
                warn!("Proxy authentication needs both --proxy-user and --proxy-pass, ignoring");
                None
            }
        };

        info!(
            proxy_url = %proxy_url,
            proxy_type = ?args.proxy_type,
            has_auth = auth.is_some(),
            "Using explicit proxy configuration"
        );

        builder = builder.with_proxy(ProxyConfig {
            url: proxy_url.clone(),
            proxy_type: args.proxy_type,
            auth,
        });
    } else {
        info!("Using system proxy settings");
        builder = builder.with_system_proxy(true);
    }

    Ok(builder.build())
}

/// Fetch a single input and write its bytes into `output_dir`.
async fn fetch_one(
    fetcher: &Fetcher,
    progress_manager: &ProgressManager,
    input: &str,
    file_name: &str,
    headers: &[(String, String)],
    scale: f64,
    output_dir: &Path,
) -> Result<PathBuf, AppError> {
    let uri = fetcher.resolve_uri(input)?;

    let request = ResourceRequest::new(input)
        .with_scale(scale)?
        .with_headers(headers.iter().cloned());

    let ResourceLoad { progress, result } = fetcher.load(request, RawDecoder);
    let (_, joined) = tokio::join!(progress_manager.follow(file_name, progress), result);

    let bytes: Bytes = joined.map_err(|e| {
        warn!(error = %e, "Load task did not complete");
        FetchError::Cancelled
    })??;

    let path = output_dir.join(file_name);
    tokio::fs::write(&path, &bytes).await?;

    info!(
        uri = %uri,
        path = %path.display(),
        size = %format_bytes(bytes.len() as u64),
        "Saved resource"
    );
    Ok(path)
}
