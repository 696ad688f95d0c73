//! Access to the twitterapi.io endpoints
//!
//! Split into credential lookup, a single-request transport, and the
//! paginated fetch pipeline built on top of it.

pub mod credentials;
pub mod fetch;
pub mod transport;

pub use credentials::{CredentialProvider, EnvCredentials, StaticCredentials, API_KEY_VAR};
pub use fetch::{
    FetchConfig, Fetcher, Profile, SearchOptions, SearchOrder, TimelineOptions,
    DEFAULT_PAGE_DELAY, TIMELINE_PAGE_SIZE,
};
pub use transport::{HttpTransport, Transport, TransportError, DEFAULT_BASE_URL};
