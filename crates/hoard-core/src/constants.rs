//! Shared constants.

/// Upper bound on items in one batch. Enforced by callers before the engine runs.
pub const MAX_FILES_PER_BATCH: usize = 40;

/// Media type used when neither content sniffing nor the caller can name one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Filename used for URL fetches whose path has no usable last segment.
pub const DEFAULT_DOWNLOAD_FILENAME: &str = "download";

/// Filename used when sanitizing leaves nothing behind.
pub const FALLBACK_FILENAME: &str = "file";

/// Longest filename (in characters) kept after sanitizing.
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Default page size for upload listings.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Prefix shared by every storage key.
pub const STORAGE_KEY_PREFIX: &str = "media";

/// Largest page size accepted for upload listings.
pub const MAX_PAGE_SIZE: i64 = 200;
