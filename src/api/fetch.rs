//! Paginated fetch pipeline
//!
//! Walks the cursor-based endpoints one page at a time, merges the pages into
//! a single result set and caches it. Every fetch follows the same loop:
//!
//! 1. call the endpoint with the current cursor (none on the first page)
//! 2. append the page's records
//! 3. stop when the page budget is spent, the API reports no next page, or
//!    no cursor came back; otherwise sleep `page_delay` and go again
//!
//! Any transport failure aborts the whole fetch and discards earlier pages.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::transport::{Transport, TransportError, DEFAULT_BASE_URL};
use crate::cache::{CacheManager, DEFAULT_TTL};
use crate::data::{Normalizer, Tweet, UserProfile};
use crate::transform::dedupe;

/// Number of tweets the timeline endpoint returns per page
pub const TIMELINE_PAGE_SIZE: usize = 20;

/// Default pause between two consecutive page requests
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(200);

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Signature of a function locating the record list inside a response body
type RecordsExtractor = fn(&Value) -> Option<&Vec<Value>>;

/// A remote endpoint and where its records live in the response
struct Endpoint {
    path: &'static str,
    records: RecordsExtractor,
}

const SEARCH: Endpoint = Endpoint {
    path: "/twitter/tweet/advanced_search",
    records: top_level_tweets,
};

const THREAD: Endpoint = Endpoint {
    path: "/twitter/tweet/thread_context",
    records: thread_tweets,
};

const TIMELINE: Endpoint = Endpoint {
    path: "/twitter/user/last_tweets",
    records: timeline_tweets,
};

const TWEET_LOOKUP: Endpoint = Endpoint {
    path: "/twitter/tweets",
    records: top_level_tweets,
};

const USER_INFO_PATH: &str = "/twitter/user/info";

fn top_level_tweets(body: &Value) -> Option<&Vec<Value>> {
    body.get("tweets")?.as_array()
}

fn thread_tweets(body: &Value) -> Option<&Vec<Value>> {
    top_level_tweets(body).or_else(|| body.get("replies")?.as_array())
}

fn timeline_tweets(body: &Value) -> Option<&Vec<Value>> {
    top_level_tweets(body).or_else(|| body.get("data")?.get("tweets")?.as_array())
}

/// Settings shared by every fetch
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Base URL of the remote API
    pub base_url: String,
    /// Pause inserted between consecutive page requests
    pub page_delay: Duration,
    /// Maximum age of a cache entry that may be served
    pub cache_ttl: Duration,
    /// Per-request timeout applied by the HTTP transport
    pub request_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_delay: DEFAULT_PAGE_DELAY,
            cache_ttl: DEFAULT_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Ranking mode requested from the search endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchOrder {
    /// Relevance ranking
    #[default]
    Top,
    /// Newest first
    Latest,
}

impl SearchOrder {
    /// Parses an order name (case-insensitive)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "top" | "relevance" | "relevancy" => Some(SearchOrder::Top),
            "latest" | "recent" | "recency" => Some(SearchOrder::Latest),
            _ => None,
        }
    }

    /// Value of the `queryType` parameter
    pub fn api_value(&self) -> &'static str {
        match self {
            SearchOrder::Top => "Top",
            SearchOrder::Latest => "Latest",
        }
    }
}

/// Parameters of a keyword search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Search query in the API's advanced search syntax
    pub query: String,
    pub order: SearchOrder,
    /// Page budget
    pub pages: usize,
    /// Ceiling on the number of returned tweets
    pub limit: Option<usize>,
    /// Only keep tweets newer than this
    pub since: Option<ChronoDuration>,
    pub exclude_retweets: bool,
}

impl SearchOptions {
    /// One page of top results for `query`
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            order: SearchOrder::default(),
            pages: 1,
            limit: None,
            since: None,
            exclude_retweets: false,
        }
    }

    /// Query string sent to the API, with operators for the requested filters
    pub fn remote_query(&self, now: DateTime<Utc>) -> String {
        let mut query = self.query.trim().to_string();
        if self.exclude_retweets {
            query.push_str(" -filter:retweets");
        }
        if let Some(cutoff) = self.cutoff(now) {
            query.push_str(&format!(" since:{}", cutoff.format("%Y-%m-%d_%H:%M:%S_UTC")));
        }
        query
    }

    /// Oldest creation time a result may have, if a window is set
    ///
    /// A window reaching past the earliest representable date yields no
    /// cutoff, which keeps everything.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_sub_signed(self.since?)
    }

    /// Stable serialization of everything but the query, used as cache params
    pub fn cache_params(&self) -> String {
        format!(
            "order={};pages={};limit={};since={};noretweets={}",
            self.order.api_value(),
            self.pages,
            self.limit.map_or_else(|| "all".to_string(), |l| l.to_string()),
            self.since
                .map_or_else(|| "none".to_string(), |s| format!("{}m", s.num_minutes())),
            self.exclude_retweets,
        )
    }
}

/// Parameters of a user timeline fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelineOptions {
    /// Number of tweets wanted
    pub count: usize,
    pub include_replies: bool,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            count: TIMELINE_PAGE_SIZE,
            include_replies: false,
        }
    }
}

impl TimelineOptions {
    /// Pages needed to collect `count` tweets
    pub fn page_budget(&self) -> usize {
        self.count.div_ceil(TIMELINE_PAGE_SIZE)
    }
}

/// A user's profile together with their recent tweets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user: UserProfile,
    pub tweets: Vec<Tweet>,
}

/// One decoded response page
struct Page {
    tweets: Vec<Tweet>,
    has_next_page: bool,
    next_cursor: Option<String>,
}

impl Page {
    /// Decodes a page body; a missing record list counts as zero records
    fn parse(body: &Value, records: RecordsExtractor, normalize: Normalizer) -> Self {
        let tweets = records(body)
            .map(|items| items.iter().map(normalize).collect())
            .unwrap_or_default();
        let has_next_page = body
            .get("has_next_page")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let next_cursor = body
            .get("next_cursor")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Self {
            tweets,
            has_next_page,
            next_cursor,
        }
    }
}

/// Fetches tweets through a [`Transport`], consulting the cache first
pub struct Fetcher<T: Transport> {
    transport: T,
    cache: Option<CacheManager>,
    config: FetchConfig,
    normalize: Normalizer,
}

impl<T: Transport> Fetcher<T> {
    /// Creates a fetcher; pass `None` to disable caching
    pub fn new(transport: T, cache: Option<CacheManager>, config: FetchConfig) -> Self {
        Self {
            transport,
            cache,
            config,
            normalize: Tweet::from_raw,
        }
    }

    /// Replaces the raw-to-tweet mapping
    pub fn with_normalizer(mut self, normalize: Normalizer) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Runs a keyword search
    ///
    /// Pages are merged and deduplicated. When `since` is set, tweets older
    /// than the cutoff are dropped client-side, since the server's own time
    /// filter lets some through. `limit` truncates the final list.
    pub async fn search(&self, options: &SearchOptions) -> Result<Vec<Tweet>, TransportError> {
        let query = options.query.trim();
        let params = options.cache_params();
        if let Some(tweets) = self.cached(query, &params) {
            return Ok(tweets);
        }

        let now = Utc::now();
        let base_params = vec![
            ("query".to_string(), options.remote_query(now)),
            ("queryType".to_string(), options.order.api_value().to_string()),
        ];
        let mut tweets = dedupe(&self.paginate(&SEARCH, base_params, options.pages).await?);

        if let Some(cutoff) = options.cutoff(now) {
            let before = tweets.len();
            tweets.retain(|t| t.created_at.is_some_and(|created| created >= cutoff));
            if tweets.len() < before {
                log::debug!("Dropped {} tweets older than {}", before - tweets.len(), cutoff);
            }
        }

        if let Some(limit) = options.limit {
            tweets.truncate(limit);
        }

        self.store(query, &params, &tweets);
        Ok(tweets)
    }

    /// Fetches the conversation around a tweet
    pub async fn thread(&self, tweet_id: &str, pages: usize) -> Result<Vec<Tweet>, TransportError> {
        let query = format!("thread:{}", tweet_id);
        let params = format!("pages={}", pages);
        if let Some(tweets) = self.cached(&query, &params) {
            return Ok(tweets);
        }

        let base_params = vec![("tweetId".to_string(), tweet_id.to_string())];
        let tweets = dedupe(&self.paginate(&THREAD, base_params, pages).await?);

        self.store(&query, &params, &tweets);
        Ok(tweets)
    }

    /// Fetches a user's most recent tweets
    pub async fn timeline(
        &self,
        username: &str,
        options: &TimelineOptions,
    ) -> Result<Vec<Tweet>, TransportError> {
        let username = username.trim_start_matches('@');
        let query = format!("timeline:{}", username.to_lowercase());
        let params = format!("count={};replies={}", options.count, options.include_replies);
        if let Some(tweets) = self.cached(&query, &params) {
            return Ok(tweets);
        }

        let tweets = self.fetch_timeline(username, options).await?;

        self.store(&query, &params, &tweets);
        Ok(tweets)
    }

    /// Fetches a user's profile
    pub async fn user_info(&self, username: &str) -> Result<UserProfile, TransportError> {
        let username = username.trim_start_matches('@');
        let params = vec![("userName".to_string(), username.to_string())];
        let body = self.transport.call(USER_INFO_PATH, &params).await?;

        match body.get("data") {
            Some(data) if data.is_object() => Ok(UserProfile::from_raw(data)),
            _ => Err(TransportError::NotFound(format!("user @{}", username))),
        }
    }

    /// Fetches a profile and its recent tweets as one cached unit
    pub async fn profile(
        &self,
        username: &str,
        options: &TimelineOptions,
    ) -> Result<Profile, TransportError> {
        let username = username.trim_start_matches('@');
        let query = format!("profile:{}", username.to_lowercase());
        let params = format!("count={};replies={}", options.count, options.include_replies);
        if let Some(profile) = self.cached(&query, &params) {
            return Ok(profile);
        }

        let user = self.user_info(username).await?;
        self.pause().await;
        let tweets = self.fetch_timeline(username, options).await?;
        let profile = Profile { user, tweets };

        self.store(&query, &params, &profile);
        Ok(profile)
    }

    /// Looks up specific tweets by id in a single request
    pub async fn tweets(&self, ids: &[String]) -> Result<Vec<Tweet>, TransportError> {
        let joined = ids.join(",");
        let query = format!("tweets:{}", joined);
        if let Some(tweets) = self.cached(&query, "") {
            return Ok(tweets);
        }

        let params = vec![("tweet_ids".to_string(), joined)];
        let body = self.transport.call(TWEET_LOOKUP.path, &params).await?;
        let tweets = Page::parse(&body, TWEET_LOOKUP.records, self.normalize).tweets;

        self.store(&query, "", &tweets);
        Ok(tweets)
    }

    async fn fetch_timeline(
        &self,
        username: &str,
        options: &TimelineOptions,
    ) -> Result<Vec<Tweet>, TransportError> {
        let base_params = vec![
            ("userName".to_string(), username.to_string()),
            ("includeReplies".to_string(), options.include_replies.to_string()),
        ];
        let mut tweets = dedupe(&self.paginate(&TIMELINE, base_params, options.page_budget()).await?);
        tweets.truncate(options.count);
        Ok(tweets)
    }

    /// Drives the cursor loop for one endpoint
    ///
    /// `max_pages` is a hard ceiling; a budget of 0 still issues one request.
    async fn paginate(
        &self,
        endpoint: &Endpoint,
        base_params: Vec<(String, String)>,
        max_pages: usize,
    ) -> Result<Vec<Tweet>, TransportError> {
        let max_pages = max_pages.max(1);
        let mut accumulated = Vec::new();
        let mut cursor = String::new();
        let mut page = 0;

        loop {
            let mut params = base_params.clone();
            if !cursor.is_empty() {
                params.push(("cursor".to_string(), cursor.clone()));
            }

            let body = self.transport.call(endpoint.path, &params).await?;
            let Page {
                tweets,
                has_next_page,
                next_cursor,
            } = Page::parse(&body, endpoint.records, self.normalize);

            page += 1;
            log::debug!(
                "{} page {}/{}: {} tweets, has_next_page={}",
                endpoint.path,
                page,
                max_pages,
                tweets.len(),
                has_next_page
            );
            accumulated.extend(tweets);

            if page >= max_pages || !has_next_page {
                break;
            }
            let Some(next) = next_cursor else {
                break;
            };

            cursor = next;
            self.pause().await;
        }

        Ok(accumulated)
    }

    /// Waits out the configured gap between two requests
    async fn pause(&self) {
        if !self.config.page_delay.is_zero() {
            tokio::time::sleep(self.config.page_delay).await;
        }
    }

    fn cached<D: DeserializeOwned>(&self, query: &str, params: &str) -> Option<D> {
        self.cache
            .as_ref()?
            .get(query, params, Some(self.config.cache_ttl))
    }

    /// Best-effort cache write; failures are logged and ignored
    fn store<D: Serialize>(&self, query: &str, params: &str, data: &D) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(query, params, data) {
                log::warn!("Failed to write cache entry for {:?}: {}", query, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_search_order_from_name() {
        assert_eq!(SearchOrder::from_name("top"), Some(SearchOrder::Top));
        assert_eq!(SearchOrder::from_name("LATEST"), Some(SearchOrder::Latest));
        assert_eq!(SearchOrder::from_name("recent"), Some(SearchOrder::Latest));
        assert_eq!(SearchOrder::from_name("oldest"), None);
    }

    #[test]
    fn test_remote_query_appends_operators() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let options = SearchOptions {
            since: Some(ChronoDuration::hours(24)),
            exclude_retweets: true,
            ..SearchOptions::new("  rust async ")
        };

        assert_eq!(
            options.remote_query(now),
            "rust async -filter:retweets since:2025-02-28_12:00:00_UTC"
        );
        assert_eq!(SearchOptions::new("rust").remote_query(now), "rust");
    }

    #[test]
    fn test_out_of_range_window_has_no_cutoff() {
        let options = SearchOptions {
            since: ChronoDuration::try_days(100_000_000),
            ..SearchOptions::new("rust")
        };
        let now = Utc::now();

        assert!(options.since.is_some());
        assert_eq!(options.cutoff(now), None);
        assert_eq!(options.remote_query(now), "rust");
    }

    #[test]
    fn test_cache_params_distinguish_options() {
        let base = SearchOptions::new("rust");
        let latest = SearchOptions {
            order: SearchOrder::Latest,
            ..base.clone()
        };
        let limited = SearchOptions {
            limit: Some(10),
            ..base.clone()
        };

        assert_eq!(base.cache_params(), base.clone().cache_params());
        assert_ne!(base.cache_params(), latest.cache_params());
        assert_ne!(base.cache_params(), limited.cache_params());
        assert!(!base.cache_params().contains("rust"));
    }

    #[test]
    fn test_timeline_page_budget_rounds_up() {
        let budget = |count| TimelineOptions {
            count,
            include_replies: false,
        }
        .page_budget();

        assert_eq!(budget(1), 1);
        assert_eq!(budget(20), 1);
        assert_eq!(budget(21), 2);
        assert_eq!(budget(100), 5);
    }

    #[test]
    fn test_page_parse_reads_continuation() {
        let body = json!({
            "tweets": [{ "id": "1" }, { "id": "2" }],
            "has_next_page": true,
            "next_cursor": "abc"
        });
        let page = Page::parse(&body, top_level_tweets, Tweet::from_raw);

        assert_eq!(page.tweets.len(), 2);
        assert!(page.has_next_page);
        assert_eq!(page.next_cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn test_page_parse_tolerates_missing_fields() {
        let page = Page::parse(&json!({ "status": "success" }), top_level_tweets, Tweet::from_raw);

        assert!(page.tweets.is_empty());
        assert!(!page.has_next_page);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_page_parse_empty_cursor_is_none() {
        let body = json!({ "tweets": [], "has_next_page": true, "next_cursor": "" });
        let page = Page::parse(&body, top_level_tweets, Tweet::from_raw);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_timeline_records_nested_under_data() {
        let body = json!({ "data": { "tweets": [{ "id": "7" }] } });
        let page = Page::parse(&body, timeline_tweets, Tweet::from_raw);
        assert_eq!(page.tweets.len(), 1);
        assert_eq!(page.tweets[0].id, "7");
    }
}
