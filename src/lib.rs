//! OAuth Console - exercise OAuth provider APIs across library versions
//!
//! A browser console for trying third-party OAuth 1/2 integrations: pick a
//! provider, complete the authorization round-trip, then send ad-hoc
//! authenticated requests and inspect the raw and prettified responses.
//!
//! The console runs against several mirrored versions of an upstream OAuth
//! client library side by side:
//! - [`mirror`] syncs releases, the branch snapshot and custom forks into
//!   `<versions>/releases/<tag>`
//! - [`version`] resolves which version a request runs against
//! - [`console`] ties providers, sessions and tokens together per version
//! - [`http`] serves the console pages
//!
//! # Example
//!
//! ```rust,no_run
//! use oauth_console::config::Config;
//! use oauth_console::console::Console;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_from_path("console.config.json")?;
//!     let console = Console::from_config(&config)?;
//!
//!     let version = console.resolve_version(None, None)?;
//!     let opened = console.open(&version)?;
//!     for provider in opened.overview("session-id").await? {
//!         println!("{} is {}", provider.display_name, provider.state);
//!     }
//!     Ok(())
//! }
//! ```

// Core modules
pub mod constants;
pub mod error;
pub mod model;
pub mod version;

// Providers and authorization
pub mod auth;
pub mod dispatch;
pub mod provider;
pub mod registry;
pub mod token;

// Facade and interfaces
pub mod cli;
pub mod console;
pub mod http;

// Release mirror
pub mod mirror;

// Infrastructure
pub mod config;
pub mod telemetry;
pub mod testing;
pub mod utils;

// Re-exports for convenience
pub use console::{Console, VersionConsole};
pub use error::{ConsoleError, Result};
pub use model::{AccessToken, AuthorizationState, DetectedType, DispatchResult, ProtocolVersion};
pub use version::{VersionLayout, VersionTag};

/// Initialize logging for the application
///
/// `RUST_LOG` wins over `filter`, which wins over the crate default.
pub fn init_logging(filter: Option<&str>) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter.unwrap_or(constants::DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(constants::DEFAULT_LOG_FILTER));

    // A subscriber may already be installed (tests, embedding applications)
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
