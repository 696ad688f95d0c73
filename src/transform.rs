//! Pure operations over fetched tweets
//!
//! Every function takes a slice and returns a new `Vec`; inputs are never
//! modified.

use std::collections::HashSet;

use crate::data::Tweet;

/// Engagement counter used for ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMetric {
    Likes,
    Retweets,
    Replies,
    Quotes,
    Impressions,
    Bookmarks,
}

impl SortMetric {
    /// Parses a metric name, accepting singular forms and a few aliases
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "likes" | "like" => Some(SortMetric::Likes),
            "retweets" | "retweet" | "rts" => Some(SortMetric::Retweets),
            "replies" | "reply" => Some(SortMetric::Replies),
            "quotes" | "quote" => Some(SortMetric::Quotes),
            "impressions" | "impression" | "views" => Some(SortMetric::Impressions),
            "bookmarks" | "bookmark" => Some(SortMetric::Bookmarks),
            _ => None,
        }
    }

    /// Reads this counter from a tweet
    pub fn value(&self, tweet: &Tweet) -> u64 {
        let m = &tweet.metrics;
        match self {
            SortMetric::Likes => m.likes,
            SortMetric::Retweets => m.retweets,
            SortMetric::Replies => m.replies,
            SortMetric::Quotes => m.quotes,
            SortMetric::Impressions => m.impressions,
            SortMetric::Bookmarks => m.bookmarks,
        }
    }
}

/// Minimum engagement thresholds; `None` means no constraint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngagementFilter {
    pub min_likes: Option<u64>,
    pub min_impressions: Option<u64>,
}

impl EngagementFilter {
    /// True when no threshold is set
    pub fn is_empty(&self) -> bool {
        self.min_likes.is_none() && self.min_impressions.is_none()
    }

    fn passes(&self, tweet: &Tweet) -> bool {
        self.min_likes.map_or(true, |min| tweet.metrics.likes >= min)
            && self
                .min_impressions
                .map_or(true, |min| tweet.metrics.impressions >= min)
    }
}

/// Sorts descending by `metric`; ties keep their original order
pub fn sort_by(tweets: &[Tweet], metric: SortMetric) -> Vec<Tweet> {
    let mut sorted = tweets.to_vec();
    sorted.sort_by(|a, b| metric.value(b).cmp(&metric.value(a)));
    sorted
}

/// Keeps tweets meeting every threshold in `filter`, in original order
pub fn filter_engagement(tweets: &[Tweet], filter: &EngagementFilter) -> Vec<Tweet> {
    tweets.iter().filter(|t| filter.passes(t)).cloned().collect()
}

/// Drops repeated ids, keeping the first occurrence of each
pub fn dedupe(tweets: &[Tweet]) -> Vec<Tweet> {
    let mut seen = HashSet::with_capacity(tweets.len());
    let mut unique = Vec::with_capacity(tweets.len());
    for tweet in tweets {
        if seen.insert(tweet.id.as_str()) {
            unique.push(tweet.clone());
        }
    }
    unique
}
