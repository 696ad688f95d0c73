//! xsearch - search X/Twitter from the terminal
//!
//! Parses the command line, wires the HTTP transport and result cache into a
//! fetcher, runs the requested command and prints the result as JSON.

use std::error::Error;
use std::process;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use xsearch::api::{EnvCredentials, Fetcher, HttpTransport};
use xsearch::cache::CacheManager;
use xsearch::cli::{timeline_options, CacheAction, Cli, Command, SearchRequest};
use xsearch::transform::{filter_engagement, sort_by};

/// Sets up logging; `RUST_LOG` overrides the default `warn` level
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();
}

/// Resolves the cache directory from the flags, falling back to the XDG path
fn cache_manager(cli: &Cli) -> Option<CacheManager> {
    match &cli.cache_dir {
        Some(dir) => Some(CacheManager::with_dir(dir.clone())),
        None => CacheManager::new(),
    }
}

/// Prints a value as pretty JSON on stdout
fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct Removed {
    removed: usize,
}

/// Builds a fetcher backed by the HTTP transport
fn build_fetcher(
    cli: &Cli,
    cache: Option<CacheManager>,
) -> Result<Fetcher<HttpTransport>, Box<dyn Error>> {
    let config = cli.fetch_config();
    let cache = if cli.no_cache { None } else { cache };
    let transport = HttpTransport::new(
        config.base_url.clone(),
        Box::new(EnvCredentials::new()),
        config.request_timeout,
    )?;
    Ok(Fetcher::new(transport, cache, config))
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let cache = cache_manager(&cli);

    match &cli.command {
        Command::Cache { action } => {
            let cache = cache.ok_or("could not determine a cache directory; pass --cache-dir")?;
            let removed = match action {
                CacheAction::Clear => cache.clear(),
                CacheAction::Prune { ttl } => {
                    let ttl = ttl
                        .map(|minutes| Duration::from_secs(minutes.saturating_mul(60)))
                        .unwrap_or(cli.fetch_config().cache_ttl);
                    cache.prune(ttl)
                }
            };
            print_json(&Removed { removed })
        }
        Command::Search(args) => {
            let request = SearchRequest::from_args(args)?;
            let fetcher = build_fetcher(&cli, cache)?;
            let mut tweets = fetcher.search(&request.options).await?;
            if !request.filter.is_empty() {
                tweets = filter_engagement(&tweets, &request.filter);
            }
            if let Some(metric) = request.sort {
                tweets = sort_by(&tweets, metric);
            }
            print_json(&tweets)
        }
        Command::Thread { tweet_id, pages } => {
            let fetcher = build_fetcher(&cli, cache)?;
            print_json(&fetcher.thread(tweet_id, *pages).await?)
        }
        Command::Profile {
            username,
            count,
            replies,
        } => {
            let fetcher = build_fetcher(&cli, cache)?;
            let profile = fetcher
                .profile(username, &timeline_options(*count, *replies))
                .await?;
            print_json(&profile)
        }
        Command::Tweet { ids } => {
            let fetcher = build_fetcher(&cli, cache)?;
            print_json(&fetcher.tweets(ids).await?)
        }
    }
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}
