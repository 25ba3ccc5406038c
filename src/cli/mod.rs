//! Command-line interface
//!
//! `console serve` runs the browser console, `console mirror` syncs library
//! versions from the source host and `console versions` lists what is
//! installed.

use crate::config::Config;
use crate::constants::CONFIG_FILE_NAME;
use crate::mirror::{JobScope, Mirror, MirrorReport, schedule};
use crate::version::{VersionKind, most_recent};
use crate::{ConsoleError, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_json::json;

/// Main CLI entry point
pub async fn run() -> Result<()> {
    let matches = build_cli().get_matches();
    run_with(&matches).await
}

/// Run an already-parsed command line
pub async fn run_with(matches: &ArgMatches) -> Result<()> {
    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or(CONFIG_FILE_NAME);
    let config = Config::load_from_path(config_path)?;
    crate::init_logging(config.log_filter().as_deref());

    match matches.subcommand() {
        Some(("serve", sub)) => handle_serve_command(sub, config).await,
        Some(("mirror", sub)) => handle_mirror_command(sub, &config).await,
        Some(("versions", sub)) => handle_versions_command(sub, &config),
        _ => {
            eprintln!("No command specified. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

/// Build the command tree
pub fn build_cli() -> Command {
    Command::new("console")
        .about("OAuth Console - exercise OAuth provider APIs across library versions")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .env("CONSOLE_CONFIG")
                .help("Path to the configuration file (JSON or YAML)"),
        )
        .subcommand(
            Command::new("serve")
                .about("Start the console server")
                .arg(Arg::new("host").long("host").help("Server host"))
                .arg(
                    Arg::new("port")
                        .long("port")
                        .short('p')
                        .value_parser(clap::value_parser!(u16))
                        .help("Server port"),
                ),
        )
        .subcommand(
            Command::new("mirror")
                .about("Mirror upstream releases into the versions directory")
                .arg(
                    Arg::new("releases-only")
                        .long("releases-only")
                        .action(ArgAction::SetTrue)
                        .help("Skip the branch snapshot and custom versions"),
                )
                .arg(
                    Arg::new("watch")
                        .long("watch")
                        .action(ArgAction::SetTrue)
                        .help("Keep running on the configured mirror schedule"),
                ),
        )
        .subcommand(
            Command::new("versions")
                .about("List installed library versions")
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue)),
        )
}

async fn handle_serve_command(matches: &ArgMatches, mut config: Config) -> Result<()> {
    // CLI overrides config
    if let Some(host) = matches.get_one::<String>("host") {
        config.http.host = host.clone();
    }
    if let Some(port) = matches.get_one::<u16>("port") {
        config.http.port = *port;
    }
    config.validate()?;

    println!(
        "Starting OAuth Console on {}:{}",
        config.http.host, config.http.port
    );
    println!("   Versions: {}", config.versions.dir);
    println!("   Providers: {}", config.providers.len());
    println!("   Press Ctrl+C to stop\n");

    crate::http::start_server(config).await
}

async fn handle_mirror_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    let scope = if matches.get_flag("releases-only") {
        JobScope::ReleasesOnly
    } else {
        JobScope::All
    };
    let mirror = Mirror::from_config(config)?;

    if matches.get_flag("watch") {
        let expression = config.mirror.schedule.as_deref().ok_or_else(|| {
            ConsoleError::config("mirror --watch requires mirror.schedule in the config")
        })?;
        let schedule = schedule::parse_schedule(expression)?;

        // Run once up front so a fresh install does not wait for the first tick
        print_report(&mirror.run_job(scope).await?);
        return schedule::watch(&mirror, &schedule, scope, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;
    }

    let report = mirror.run_job(scope).await?;
    print_report(&report);
    if report.is_success() {
        Ok(())
    } else {
        Err(ConsoleError::Other(anyhow::anyhow!(
            "{} version(s) failed to mirror",
            report.failed.len()
        )))
    }
}

fn print_report(report: &MirrorReport) {
    println!("Mirror run: {}", report);
    for version in report.installed.iter().chain(&report.refreshed) {
        println!("  + {} ({})", version.tag, version.source_url);
    }
    for failure in &report.failed {
        println!("  ! {}: {}", failure.tag, failure.reason);
    }
}

fn handle_versions_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    let installed = config.versions.layout().installed()?;
    let latest = most_recent(&installed);

    if matches.get_flag("json") {
        let versions: Vec<_> = installed
            .iter()
            .map(|tag| {
                json!({
                    "tag": tag.as_str(),
                    "kind": kind_label(&tag.kind()),
                    "latest": latest.as_ref() == Some(tag),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }

    if installed.is_empty() {
        println!("No versions installed in {}", config.versions.dir);
        return Ok(());
    }

    println!("\nInstalled versions:");
    for tag in &installed {
        let marker = if latest.as_ref() == Some(tag) { " (default)" } else { "" };
        println!("  {:<12} {}{}", tag.as_str(), kind_label(&tag.kind()), marker);
    }
    Ok(())
}

fn kind_label(kind: &VersionKind) -> &'static str {
    match kind {
        VersionKind::Release(_) => "release",
        VersionKind::Master => "branch",
        VersionKind::Custom(_) => "custom",
    }
}
