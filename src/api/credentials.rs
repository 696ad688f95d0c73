//! API key lookup
//!
//! The key comes from the `TWITTERAPI_KEY` environment variable, falling back
//! to a `KEY=value` line in `<config dir>/xsearch/credentials.env`.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use super::TransportError;

/// Environment variable (and file key) holding the API key
pub const API_KEY_VAR: &str = "TWITTERAPI_KEY";

/// Name of the fallback credentials file inside the config directory
const CREDENTIALS_FILE: &str = "credentials.env";

/// Source of the API key sent with every request
pub trait CredentialProvider: Send + Sync {
    /// Resolves the key, or fails with [`TransportError::MissingCredential`]
    fn api_key(&self) -> Result<String, TransportError>;
}

/// A fixed key, mostly useful in tests
#[derive(Debug, Clone)]
pub struct StaticCredentials(pub String);

impl CredentialProvider for StaticCredentials {
    fn api_key(&self) -> Result<String, TransportError> {
        if self.0.trim().is_empty() {
            return Err(TransportError::MissingCredential(
                "configured API key is empty".to_string(),
            ));
        }
        Ok(self.0.clone())
    }
}

/// Environment variable with a config file fallback
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
    fallback_file: Option<PathBuf>,
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvCredentials {
    /// Reads `TWITTERAPI_KEY`, falling back to the XDG config file
    pub fn new() -> Self {
        let fallback_file = ProjectDirs::from("", "", "xsearch")
            .map(|dirs| dirs.config_dir().join(CREDENTIALS_FILE));
        Self {
            var: API_KEY_VAR.to_string(),
            fallback_file,
        }
    }

    /// Uses a custom variable name and fallback file
    pub fn with_sources(var: impl Into<String>, fallback_file: Option<PathBuf>) -> Self {
        Self {
            var: var.into(),
            fallback_file,
        }
    }
}

impl CredentialProvider for EnvCredentials {
    fn api_key(&self) -> Result<String, TransportError> {
        if let Ok(value) = std::env::var(&self.var) {
            let value = value.trim();
            if !value.is_empty() {
                return Ok(value.to_string());
            }
        }

        if let Some(path) = &self.fallback_file {
            if let Some(value) = read_key_from_file(path, &self.var) {
                log::debug!("Loaded API key from {}", path.display());
                return Ok(value);
            }
        }

        let location = self
            .fallback_file
            .as_ref()
            .map(|p| format!(" or a {}=... line in {}", self.var, p.display()))
            .unwrap_or_default();
        Err(TransportError::MissingCredential(format!(
            "set the {} environment variable{}",
            self.var, location
        )))
    }
}

/// Looks up `key` in a dotenv-style file; the last non-empty assignment wins
fn read_key_from_file(path: &Path, key: &str) -> Option<String> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("No credentials file at {}: {}", path.display(), e);
            return None;
        }
    };

    entries
        .filter_map(Result::ok)
        .filter(|(name, value)| name == key && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_env_credentials_fall_back_to_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("credentials.env");
        fs::write(&path, "XSEARCH_TEST_FILE_ONLY_KEY=from-file\n").expect("Should write file");

        // Variable name chosen so no real environment defines it
        let provider = EnvCredentials::with_sources("XSEARCH_TEST_FILE_ONLY_KEY", Some(path));
        assert_eq!(provider.api_key().expect("Should resolve key"), "from-file");
    }

    #[test]
    fn test_credentials_file_quotes_comments_and_reassignment() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("credentials.env");
        fs::write(
            &path,
            "# XSEARCH_TEST_QUOTED_KEY=commented\n\
             XSEARCH_TEST_QUOTED_KEY=first\n\
             export XSEARCH_TEST_QUOTED_KEY=\"second\"\n",
        )
        .expect("Should write file");

        let provider = EnvCredentials::with_sources("XSEARCH_TEST_QUOTED_KEY", Some(path));
        assert_eq!(provider.api_key().expect("Should resolve key"), "second");
    }

    #[test]
    fn test_env_credentials_missing_everywhere() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let provider = EnvCredentials::with_sources(
            "XSEARCH_TEST_UNSET_KEY",
            Some(temp_dir.path().join("absent.env")),
        );

        let err = provider.api_key().expect_err("Should fail without any source");
        assert!(matches!(err, TransportError::MissingCredential(_)));
        assert!(err.to_string().contains("XSEARCH_TEST_UNSET_KEY"));
    }

    #[test]
    fn test_static_credentials() {
        assert_eq!(StaticCredentials("k".to_string()).api_key().expect("Should resolve"), "k");
        assert!(StaticCredentials("  ".to_string()).api_key().is_err());
    }
}
