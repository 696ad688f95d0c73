//! xsearch library
//!
//! Fetches tweets from twitterapi.io through a paginated, rate-paced pipeline
//! with an on-disk result cache. Exposed as a library for the binary and
//! integration tests.

pub mod api;
pub mod cache;
pub mod cli;
pub mod data;
pub mod transform;
