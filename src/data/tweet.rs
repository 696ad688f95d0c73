//! Normalization of raw twitterapi.io tweet payloads
//!
//! The API does not guarantee the presence of any field, so every access here
//! is optional with an explicit default. This is the only place that knows
//! about the raw field names.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{Metrics, Tweet};

/// Date format used by the Twitter-style `createdAt` field,
/// e.g. `Tue Dec 10 07:00:30 +0000 2024`
const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Converts one raw API object into a [`Tweet`]
///
/// The pipeline takes this as a plain function pointer so tests can swap in
/// their own mapping.
pub type Normalizer = fn(&Value) -> Tweet;

impl Tweet {
    /// Builds a tweet from a raw API object. Never fails; absent fields
    /// become empty strings, zero counters or empty lists.
    pub fn from_raw(raw: &Value) -> Self {
        let id = str_field(raw, "id");
        let author = raw.get("author").unwrap_or(&Value::Null);
        let username = str_field(author, "userName");

        let tweet_url = match raw.get("url").and_then(Value::as_str) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => format!("https://x.com/{}/status/{}", username, id),
        };

        let entities = raw.get("entities").unwrap_or(&Value::Null);

        Tweet {
            text: str_field(raw, "text"),
            author_id: str_field(author, "id"),
            name: str_field(author, "name"),
            created_at: raw.get("createdAt").and_then(Value::as_str).and_then(normalize_timestamp),
            conversation_id: str_field(raw, "conversationId"),
            metrics: Metrics {
                likes: count_field(raw, "likeCount"),
                retweets: count_field(raw, "retweetCount"),
                replies: count_field(raw, "replyCount"),
                quotes: count_field(raw, "quoteCount"),
                impressions: count_field(raw, "viewCount"),
                bookmarks: count_field(raw, "bookmarkCount"),
            },
            urls: entity_list(entities, "urls", "expanded_url"),
            mentions: entity_list(entities, "user_mentions", "screen_name"),
            hashtags: entity_list(entities, "hashtags", "text"),
            tweet_url,
            username,
            id,
        }
    }
}

/// Parses an API timestamp into UTC with second precision
///
/// Accepts the Twitter `createdAt` format and RFC 3339. Anything else maps
/// to `None`.
pub fn normalize_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let parsed = DateTime::parse_from_str(raw, TWITTER_DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()?;
    DateTime::from_timestamp(parsed.timestamp(), 0)
}

/// Reads a string field, accepting numbers for id-like fields
pub(crate) fn str_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Reads a counter that may be encoded as a number or a numeric string
pub(crate) fn count_field(value: &Value, key: &str) -> u64 {
    match value.get(key) {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Collects `entities.<list>[].<field>` into a list of non-empty strings
fn entity_list(entities: &Value, list: &str, field: &str) -> Vec<String> {
    entities
        .get(list)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(field).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
