//! Application-wide constants
//!
//! Centralized location for tunable values that are used across
//! multiple modules.

/// Quiet period an incremental search input must hold before a remote
/// lookup is issued.
pub const SEARCH_SETTLE_MS: u64 = 450;

/// Minimum query length that triggers a remote lookup. Shorter input
/// clears the visible result set instead of searching.
pub const SEARCH_MIN_CHARS: usize = 2;

/// Page size requested from list endpoints
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Query parameter carrying the requested page number
pub const PAGE_PARAM: &str = "page";

/// Request timeout for the REST client
pub const HTTP_TIMEOUT_SECS: u64 = 30;
