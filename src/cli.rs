//! Command-line interface parsing for xsearch
//!
//! This module defines the clap argument structure and converts raw argument
//! strings (recency windows, sort metrics, search order) into the typed options
//! the fetch pipeline understands.

use chrono::{Duration as ChronoDuration, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::api::{FetchConfig, SearchOptions, SearchOrder, TimelineOptions};
use crate::transform::{EngagementFilter, SortMetric};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The recency window could not be parsed
    #[error("Invalid --since value: '{0}'. Use a number followed by m, h, d or w (e.g. 30m, 24h, 7d)")]
    InvalidSince(String),

    /// The sort metric is not recognized
    #[error("Invalid sort metric: '{0}'. Valid metrics: likes, retweets, replies, quotes, impressions, bookmarks")]
    InvalidSort(String),

    /// The search order is not recognized
    #[error("Invalid search order: '{0}'. Valid orders: top, latest")]
    InvalidOrder(String),
}

/// xsearch - search X/Twitter from the terminal with cached, paginated fetches
#[derive(Parser, Debug)]
#[command(name = "xsearch")]
#[command(about = "Search X/Twitter via twitterapi.io with an on-disk result cache")]
#[command(version)]
pub struct Cli {
    /// Directory for cached results (defaults to the XDG cache dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Skip reading and writing the cache for this run
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Maximum age of cached results, in minutes
    #[arg(long, global = true, value_name = "MINUTES", default_value_t = 15)]
    pub ttl: u64,

    /// Pause between consecutive page requests, in milliseconds
    #[arg(long, global = true, value_name = "MS", default_value_t = 200)]
    pub delay_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search recent tweets
    Search(SearchArgs),

    /// Fetch the conversation around a tweet
    Thread {
        /// Id of any tweet in the conversation
        tweet_id: String,

        /// Maximum number of pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Show a user's profile and recent tweets
    Profile {
        /// Handle, with or without the leading @
        username: String,

        /// Number of recent tweets to fetch
        #[arg(long, default_value_t = 20)]
        count: usize,

        /// Include replies in the timeline
        #[arg(long)]
        replies: bool,
    },

    /// Look up tweets by id
    Tweet {
        /// One or more tweet ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Maintain the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Remove every cached result
    Clear,

    /// Remove cached results older than the TTL
    Prune {
        /// Age limit in minutes (defaults to the global --ttl)
        #[arg(long, value_name = "MINUTES")]
        ttl: Option<u64>,
    },
}

/// Arguments of the search command
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query in X advanced search syntax
    pub query: String,

    /// Ranking requested from the API: top or latest
    #[arg(long, default_value = "top")]
    pub order: String,

    /// Maximum number of pages to fetch
    #[arg(long, default_value_t = 1)]
    pub pages: usize,

    /// Maximum number of tweets to return
    #[arg(long)]
    pub limit: Option<usize>,

    /// Only tweets from this window, e.g. 1h, 24h, 7d
    #[arg(long, value_name = "WINDOW")]
    pub since: Option<String>,

    /// Exclude retweets
    #[arg(long)]
    pub no_retweets: bool,

    /// Sort results by an engagement metric
    #[arg(long, value_name = "METRIC")]
    pub sort: Option<String>,

    /// Minimum like count
    #[arg(long)]
    pub min_likes: Option<u64>,

    /// Minimum impression count
    #[arg(long)]
    pub min_impressions: Option<u64>,
}

/// Fully parsed search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub options: SearchOptions,
    pub sort: Option<SortMetric>,
    pub filter: EngagementFilter,
}

impl SearchRequest {
    /// Validates raw search arguments
    pub fn from_args(args: &SearchArgs) -> Result<Self, CliError> {
        let options = SearchOptions {
            query: args.query.clone(),
            order: parse_order_arg(&args.order)?,
            pages: args.pages,
            limit: args.limit,
            since: args.since.as_deref().map(parse_since_arg).transpose()?,
            exclude_retweets: args.no_retweets,
        };

        Ok(SearchRequest {
            options,
            sort: args.sort.as_deref().map(parse_sort_arg).transpose()?,
            filter: EngagementFilter {
                min_likes: args.min_likes,
                min_impressions: args.min_impressions,
            },
        })
    }
}

impl Cli {
    /// Pipeline settings derived from the global flags
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            page_delay: Duration::from_millis(self.delay_ms),
            cache_ttl: Duration::from_secs(self.ttl.saturating_mul(60)),
            ..FetchConfig::default()
        }
    }
}

/// Builds timeline options for the profile command
pub fn timeline_options(count: usize, include_replies: bool) -> TimelineOptions {
    TimelineOptions {
        count,
        include_replies,
    }
}

/// Parses a recency window such as `30m`, `24h`, `7d` or `2w`
pub fn parse_since_arg(s: &str) -> Result<ChronoDuration, CliError> {
    let invalid = || CliError::InvalidSince(s.to_string());
    let trimmed = s.trim().to_lowercase();
    let unit = trimmed.chars().last().ok_or_else(invalid)?;
    let amount: i64 = trimmed[..trimmed.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    let duration = match unit {
        'm' => ChronoDuration::try_minutes(amount),
        'h' => ChronoDuration::try_hours(amount),
        'd' => ChronoDuration::try_days(amount),
        'w' => ChronoDuration::try_weeks(amount),
        _ => None,
    };
    // The cutoff `now - window` must stay inside chrono's date range
    duration
        .filter(|d| Utc::now().checked_sub_signed(*d).is_some())
        .ok_or_else(invalid)
}

/// Parses a sort metric name
pub fn parse_sort_arg(s: &str) -> Result<SortMetric, CliError> {
    SortMetric::from_name(s).ok_or_else(|| CliError::InvalidSort(s.to_string()))
}

/// Parses a search order name
pub fn parse_order_arg(s: &str) -> Result<SearchOrder, CliError> {
    SearchOrder::from_name(s).ok_or_else(|| CliError::InvalidOrder(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_args(argv: &[&str]) -> SearchArgs {
        let mut full = vec!["xsearch", "search"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Command::Search(args) => args,
            other => panic!("expected search command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_since_arg_units() {
        assert_eq!(parse_since_arg("30m").unwrap(), ChronoDuration::minutes(30));
        assert_eq!(parse_since_arg("24h").unwrap(), ChronoDuration::hours(24));
        assert_eq!(parse_since_arg("7d").unwrap(), ChronoDuration::days(7));
        assert_eq!(parse_since_arg("2w").unwrap(), ChronoDuration::weeks(2));
        assert_eq!(parse_since_arg(" 1H ").unwrap(), ChronoDuration::hours(1));
    }

    #[test]
    fn test_parse_since_arg_invalid() {
        for bad in ["", "h", "24", "0h", "-1d", "1y", "abc"] {
            let err = parse_since_arg(bad).expect_err(bad);
            assert!(err.to_string().contains("Invalid --since"));
        }
    }

    #[test]
    fn test_parse_since_arg_rejects_window_beyond_date_range() {
        let err = parse_since_arg("100000000d").expect_err("Window should be rejected");
        assert!(matches!(err, CliError::InvalidSince(_)));
        assert!(parse_since_arg("520w").is_ok());
    }

    #[test]
    fn test_parse_sort_arg() {
        assert_eq!(parse_sort_arg("likes").unwrap(), SortMetric::Likes);
        assert_eq!(parse_sort_arg("impressions").unwrap(), SortMetric::Impressions);
        let err = parse_sort_arg("followers").unwrap_err();
        assert!(err.to_string().contains("followers"));
    }

    #[test]
    fn test_parse_order_arg() {
        assert_eq!(parse_order_arg("latest").unwrap(), SearchOrder::Latest);
        assert!(parse_order_arg("random").is_err());
    }

    #[test]
    fn test_cli_search_defaults() {
        let args = search_args(&["rust"]);
        let request = SearchRequest::from_args(&args).unwrap();

        assert_eq!(request.options, SearchOptions::new("rust"));
        assert!(request.sort.is_none());
        assert!(request.filter.is_empty());
    }

    #[test]
    fn test_cli_search_all_flags() {
        let args = search_args(&[
            "rust lang",
            "--order",
            "latest",
            "--pages",
            "3",
            "--limit",
            "25",
            "--since",
            "24h",
            "--no-retweets",
            "--sort",
            "likes",
            "--min-likes",
            "10",
            "--min-impressions",
            "500",
        ]);
        let request = SearchRequest::from_args(&args).unwrap();

        assert_eq!(request.options.query, "rust lang");
        assert_eq!(request.options.order, SearchOrder::Latest);
        assert_eq!(request.options.pages, 3);
        assert_eq!(request.options.limit, Some(25));
        assert_eq!(request.options.since, Some(ChronoDuration::hours(24)));
        assert!(request.options.exclude_retweets);
        assert_eq!(request.sort, Some(SortMetric::Likes));
        assert_eq!(request.filter.min_likes, Some(10));
        assert_eq!(request.filter.min_impressions, Some(500));
    }

    #[test]
    fn test_cli_search_invalid_since() {
        let args = search_args(&["rust", "--since", "yesterday"]);
        assert!(SearchRequest::from_args(&args).is_err());
    }

    #[test]
    fn test_cli_global_flags_into_fetch_config() {
        let cli = Cli::parse_from(["xsearch", "--ttl", "60", "--delay-ms", "500", "cache", "clear"]);
        let config = cli.fetch_config();

        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.page_delay, Duration::from_millis(500));
        assert!(matches!(cli.command, Command::Cache { action: CacheAction::Clear }));
    }

    #[test]
    fn test_cli_default_fetch_config() {
        let cli = Cli::parse_from(["xsearch", "tweet", "1"]);
        let config = cli.fetch_config();
        assert_eq!(config.cache_ttl, Duration::from_secs(15 * 60));
        assert_eq!(config.page_delay, Duration::from_millis(200));
        assert!(!cli.no_cache);
    }

    #[test]
    fn test_cli_cache_prune() {
        let cli = Cli::parse_from(["xsearch", "cache", "prune", "--ttl", "5"]);
        match cli.command {
            Command::Cache { action } => assert_eq!(action, CacheAction::Prune { ttl: Some(5) }),
            other => panic!("expected cache command, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_profile() {
        let cli = Cli::parse_from(["xsearch", "profile", "@ferris", "--count", "45", "--replies"]);
        match cli.command {
            Command::Profile {
                username,
                count,
                replies,
            } => {
                assert_eq!(username, "@ferris");
                assert_eq!(timeline_options(count, replies).page_budget(), 3);
                assert!(replies);
            }
            other => panic!("expected profile command, got {:?}", other),
        }
    }
}
