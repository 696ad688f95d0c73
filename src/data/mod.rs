//! Core data models for xsearch
//!
//! This module contains the normalized record types produced from raw
//! twitterapi.io payloads. Everything downstream of normalization works on
//! these types and never mutates them in place.

pub mod profile;
pub mod tweet;

pub use tweet::{normalize_timestamp, Normalizer};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Engagement counters attached to a tweet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    /// Like count (primary engagement)
    pub likes: u64,
    /// Retweet count (secondary engagement)
    pub retweets: u64,
    /// Reply count
    pub replies: u64,
    /// Quote tweet count
    pub quotes: u64,
    /// View count as reported by the API
    pub impressions: u64,
    /// Bookmark count
    pub bookmarks: u64,
}

/// A normalized tweet
///
/// Produced only by [`Tweet::from_raw`]. `created_at` is `None` when the
/// source date could not be parsed; it serializes as RFC 3339 UTC otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    /// Tweet identifier
    pub id: String,
    /// Full text body
    pub text: String,
    /// Author's numeric user id
    pub author_id: String,
    /// Author's handle, without the leading `@`
    pub username: String,
    /// Author's display name
    pub name: String,
    /// Creation time, truncated to whole seconds
    pub created_at: Option<DateTime<Utc>>,
    /// Root tweet id of the conversation this tweet belongs to
    pub conversation_id: String,
    /// Engagement counters
    pub metrics: Metrics,
    /// Expanded outbound links
    pub urls: Vec<String>,
    /// Mentioned handles
    pub mentions: Vec<String>,
    /// Hashtags, without the leading `#`
    pub hashtags: Vec<String>,
    /// Canonical permalink
    pub tweet_url: String,
}

/// A normalized user profile from the user info endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub name: String,
    pub description: String,
    pub followers: u64,
    pub following: u64,
    pub tweet_count: u64,
    pub verified: bool,
    /// Account creation time, if known
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_metrics_default_is_zeroed() {
        let metrics = Metrics::default();
        assert_eq!(metrics.likes, 0);
        assert_eq!(metrics.impressions, 0);
        assert_eq!(metrics.bookmarks, 0);
    }

    #[test]
    fn test_tweet_serialization_roundtrip() {
        let tweet = Tweet {
            id: "1".to_string(),
            text: "hello #rust".to_string(),
            author_id: "42".to_string(),
            username: "ferris".to_string(),
            name: "Ferris".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 12, 10, 7, 0, 30).single(),
            conversation_id: "1".to_string(),
            metrics: Metrics {
                likes: 10,
                retweets: 2,
                replies: 1,
                quotes: 0,
                impressions: 500,
                bookmarks: 3,
            },
            urls: vec!["https://www.rust-lang.org".to_string()],
            mentions: vec![],
            hashtags: vec!["rust".to_string()],
            tweet_url: "https://x.com/ferris/status/1".to_string(),
        };

        let json = serde_json::to_string(&tweet).expect("Failed to serialize Tweet");
        assert!(json.contains(r#""created_at":"2024-12-10T07:00:30Z""#), "{}", json);
        let deserialized: Tweet = serde_json::from_str(&json).expect("Failed to deserialize Tweet");

        assert_eq!(deserialized, tweet);
    }
}
