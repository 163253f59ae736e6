//! Shared constants used across rusty-object-storage crates.

/// Default number of entries requested per listing page.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

/// Default expiry for presigned URLs and transfer configs (one hour).
pub const DEFAULT_URL_EXPIRY_SECS: u64 = 3600;

/// Default concurrency for directory copies (sequential).
pub const DEFAULT_COPY_CONCURRENCY: usize = 1;
