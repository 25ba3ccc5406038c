//! Constants used throughout the console
//!
//! Configuration paths, cookie names, upstream defaults and lifetimes.

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "console.config.json";

/// Default HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Default host to bind to
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";

/// Default directory holding mirrored library versions
pub const DEFAULT_VERSIONS_DIR: &str = "versions";

/// Sub-directory of the versions dir holding published versions
pub const RELEASES_DIR: &str = "releases";

/// Sub-directory of the versions dir used to stage downloads (same filesystem as releases)
pub const STAGING_DIR: &str = ".staging";

/// File name of the mirror job record inside the versions dir
pub const MIRROR_RECORD_FILE: &str = "mirror-state.json";

/// Archive file name written into each staging directory
pub const ARCHIVE_FILE_NAME: &str = "archive.zip";

/// Sub-directory of a staging directory the archive is unpacked into
pub const EXTRACT_DIR: &str = "extracted";

// ============================================================================
// COOKIES & SESSIONS
// ============================================================================

/// Cookie persisting the selected library version
pub const VERSION_COOKIE: &str = "version";

/// Lifetime of the version cookie (30 days)
pub const VERSION_COOKIE_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

/// Cookie carrying the console session id
pub const SESSION_COOKIE: &str = "console_session";

/// Default session lifetime in hours (30 days)
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 720;

/// Default lifetime of a pending authorization handshake (15 minutes)
pub const DEFAULT_PENDING_TTL_SECS: u64 = 900;

// ============================================================================
// UPSTREAM SOURCE HOST
// ============================================================================

/// Default source host API base URL
pub const DEFAULT_SOURCE_API_URL: &str = "https://api.github.com";

/// Default upstream repository mirrored into the versions dir
pub const DEFAULT_REPOSITORY: &str = "Lusitanian/PHPoAuthLib";

/// Default prefix of the top-level directory inside upstream archives
pub const DEFAULT_ARCHIVE_PREFIX: &str = "Lusitanian-PHPoAuthLib-";

/// Default branch snapshot mirrored alongside releases
pub const DEFAULT_BRANCH: &str = "master";

/// User agent sent to the source host (mandatory for the GitHub API)
pub const DEFAULT_USER_AGENT: &str = "OAuthConsole (https://github.com/PeeHaa/oauth-console)";

/// Page size used when listing upstream tags
pub const TAGS_PER_PAGE: u32 = 100;

// ============================================================================
// SCOPE INTROSPECTION
// ============================================================================

/// Prefix of constants holding scope values in library service sources
pub const SCOPE_CONSTANT_PREFIX: &str = "SCOPE_";

/// Suffix of namespaced scopes that cannot be requested verbatim
pub const NAMESPACED_SCOPE_SUFFIX: &str = ":APP_NAMESPACE";

// ============================================================================
// HTTP
// ============================================================================

/// Path segment of the handshake route
pub const AUTHORIZE_SEGMENT: &str = "authorize";

/// Path segment of the clear-all-tokens route
pub const CLEAR_ALL_TOKENS_SEGMENT: &str = "clearAllTokens";

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "oauth_console=info";
