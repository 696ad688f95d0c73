//! Cache module for storing fetched result sets on disk
//!
//! This module provides a cache manager that persists record sets to the
//! filesystem, one file per (query, params) pair. Freshness is evaluated at
//! read time against a caller supplied TTL, and reads fail open: anything
//! unreadable is simply a miss.

mod manager;

pub use manager::{CacheError, CacheManager, DEFAULT_TTL};
