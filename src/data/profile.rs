//! Normalization of the user info payload

use serde_json::Value;

use super::tweet::{count_field, normalize_timestamp, str_field};
use super::UserProfile;

impl UserProfile {
    /// Builds a profile from the `data` object of the user info response
    pub fn from_raw(raw: &Value) -> Self {
        UserProfile {
            id: str_field(raw, "id"),
            username: str_field(raw, "userName"),
            name: str_field(raw, "name"),
            description: str_field(raw, "description"),
            followers: count_field(raw, "followers"),
            following: count_field(raw, "following"),
            tweet_count: count_field(raw, "statusesCount"),
            verified: raw
                .get("isBlueVerified")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            created_at: raw.get("createdAt").and_then(Value::as_str).and_then(normalize_timestamp),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_profile_from_raw() {
        let profile = UserProfile::from_raw(&json!({
            "id": "9001",
            "userName": "ferris",
            "name": "Ferris the Crab",
            "description": "Rustacean",
            "followers": 1500,
            "following": 12,
            "statusesCount": 321,
            "isBlueVerified": true,
            "createdAt": "Mon Jan 02 10:00:00 +0000 2017"
        }));

        assert_eq!(profile.username, "ferris");
        assert_eq!(profile.followers, 1500);
        assert_eq!(profile.following, 12);
        assert_eq!(profile.tweet_count, 321);
        assert!(profile.verified);
        assert_eq!(profile.created_at, Utc.with_ymd_and_hms(2017, 1, 2, 10, 0, 0).single());
    }

    #[test]
    fn test_profile_from_missing_data() {
        let profile = UserProfile::from_raw(&Value::Null);
        assert_eq!(profile.username, "");
        assert_eq!(profile.followers, 0);
        assert!(!profile.verified);
        assert!(profile.created_at.is_none());
    }
}
