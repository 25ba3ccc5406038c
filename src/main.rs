//! OAuth Console CLI
//!
//! Run with: cargo run --bin console -- <command>
//! Or after build: ./target/release/console <command>

#[tokio::main]
async fn main() {
    // Client secrets are usually referenced as `$env:NAME` in the config
    let _ = dotenvy::dotenv();

    // Logging is initialized once the config is loaded
    if let Err(e) = oauth_console::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
