//! Shared constants for things
//!

/// Number of image generation attempts before giving up on server errors.
pub const MAX_IMAGE_ATTEMPTS: u32 = 3;

/// Text model used for the description and title completions.
pub const COMPLETION_MODEL: &str = "gpt-3.5-turbo-instruct";

/// Sampling temperature for both completions.
pub const COMPLETION_TEMPERATURE: f32 = 0.7;

/// Token cap for the description completion.
pub const DESCRIPTION_MAX_TOKENS: u32 = 150;

/// Token cap for the title completion.
pub const TITLE_MAX_TOKENS: u32 = 10;

/// Resolution requested from the image endpoint.
pub const IMAGE_SIZE: &str = "512x512";

/// Used when the description completion comes back empty.
pub const DESCRIPTION_FALLBACK: &str = "No description available.";

/// Used when the title completion comes back empty.
pub const TITLE_FALLBACK: &str = "No title available.";

/// Token ids are drawn from `0..MAX_RANDOM_TOKEN_ID` when the caller does not pick one.
pub const MAX_RANDOM_TOKEN_ID: u64 = 1_000_000_000;

/// Quantity passed to the contract's mint entry point.
pub const MINT_QUANTITY: u64 = 1;

/// Default base URL for resolving relative image paths.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Upload endpoint of the thirdweb IPFS gateway.
pub const THIRDWEB_UPLOAD_URL: &str = "https://storage.thirdweb.com/ipfs/upload";

/// File name used when the image URL has no usable last path segment.
pub const DEFAULT_IMAGE_FILE_NAME: &str = "uploaded_image.png";

/// Content-Disposition sent by the download proxy.
pub const PROXY_CONTENT_DISPOSITION: &str = "attachment; filename=\"downloaded-image.png\"";

/// Content-Type used when upstream does not send one.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Query parameter holding the signed URL expiry.
pub const EXPIRY_QUERY_PARAM: &str = "se";

/// Maximum number of entries kept in the generation history.
pub const HISTORY_LIMIT: usize = 10;

/// File name of the history store inside the data directory.
pub const HISTORY_FILE_NAME: &str = "history.json";
