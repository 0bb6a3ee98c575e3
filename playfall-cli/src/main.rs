mod cli;
mod error;
mod output;

use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use playfall_engine::config::ResolverConfig;
use playfall_engine::session::{PlaybackResolver, RequestHints, SessionPhase};
use playfall_engine::sniff::SniffSurface;

use crate::cli::{Args, OutputFormat};
use crate::error::Result;
use crate::output::OutputManager;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let format = args.output;
    let colored = !args.no_color;

    if let Err(e) = init_logging(args.verbose, args.quiet) {
        eprintln!("Error: {e}");
        process::exit(1);
    }

    match run(args).await {
        // Exit nonzero when the cascade ended exhausted, so scripts can
        // branch on the outcome without parsing the report.
        Ok(true) => process::exit(2),
        Ok(false) => {}
        Err(e) => {
            match format {
                OutputFormat::Json | OutputFormat::JsonCompact => {
                    let error_json = serde_json::json!({
                        "status": "error",
                        "message": e.to_string(),
                    });
                    println!("{error_json}");
                }
                OutputFormat::Pretty => {
                    if colored {
                        eprintln!("{} {e}", "Error:".red().bold());
                    } else {
                        eprintln!("Error: {e}");
                    }
                }
            }
            process::exit(1);
        }
    }
}

async fn run(args: Args) -> Result<bool> {
    let mut config =
        ResolverConfig::default().with_probe_timeout(Duration::from_secs(args.probe_timeout));
    if let Some(origin) = args.origin {
        config = config.with_origin(origin);
    }
    if let Some(user_agent) = args.user_agent {
        config = config.with_user_agent(user_agent);
    }

    // The CLI has no media element; the sniffing surface stands in for one
    // by checking container magic bytes against the asserted MIME.
    let client = config.build_client()?;
    let surface = Arc::new(SniffSurface::new(client));
    let resolver = PlaybackResolver::new(config, surface)?;

    let mut updates = resolver.subscribe();
    let progress = tokio::spawn(async move {
        while let Ok(update) = updates.recv().await {
            match update.phase {
                SessionPhase::Probing => info!("probing accessibility"),
                SessionPhase::Attempting(backend) => info!(%backend, "attempting backend"),
                _ => {}
            }
        }
    });

    let hints = RequestHints {
        declared_id: args.id,
    };
    let report = resolver.resolve(&args.url, hints).await?;
    progress.abort();

    let manager = OutputManager::new(!args.no_color);
    println!("{}", manager.format_report(&report, args.output)?);

    Ok(report.phase == SessionPhase::Exhausted)
}

fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("playfall={level},playfall_engine={level}"))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .map_err(|e| crate::error::AppError::Logging(e.to_string()))?;

    Ok(())
}
