//! CLI entry point for the plugin mirror.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::HumanBytes;
use plugin_mirror::{MirrorReport, MirrorSession};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");
    info!(builds = ?args.builds, output = %args.output.display(), "plugin mirror starting");

    let session = MirrorSession::new(args.to_config()).context("invalid mirror configuration")?;

    let cancel = session.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling in-flight downloads");
            cancel.cancel();
        }
    });

    let report = session.mirror().await.context("mirror session failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !args.quiet {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &MirrorReport) {
    println!(
        "Mirrored {} build(s): {} downloaded ({}), {} skipped, {} failed",
        report.builds.len(),
        report.downloaded,
        HumanBytes(report.bytes_downloaded),
        report.skipped,
        report.failed,
    );
    println!(
        "Icons: {} downloaded, {} skipped, {} failed",
        report.icons_downloaded, report.icons_skipped, report.icons_failed
    );
    for build in &report.failed_builds {
        println!("  build {}: {}", build.build, build.reason);
    }
    for failure in &report.failures {
        println!(
            "  {} {} [{}]: {}",
            failure.name, failure.version, failure.kind, failure.reason
        );
    }
    if report.cancelled {
        println!("Run was cancelled; re-run to resume.");
    }
    println!("Manifest: {}", report.manifest_path.display());
}
