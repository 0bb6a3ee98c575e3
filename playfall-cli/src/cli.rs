use clap::{Parser, ValueEnum};

/// How the final report is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored where the terminal allows.
    Pretty,
    /// Pretty-printed JSON.
    Json,
    /// Single-line JSON for piping.
    JsonCompact,
}

#[derive(Debug, Parser)]
#[command(
    name = "playfall",
    about = "Resolve a media URL through the playback cascade and report how (or why not) it plays",
    version
)]
pub struct Args {
    /// Media URL to resolve.
    pub url: String,

    /// Origin to present for cross-origin checks, e.g. https://app.example.com.
    #[arg(long)]
    pub origin: Option<String>,

    /// Caller-side media identifier to carry through into the report.
    #[arg(long)]
    pub id: Option<String>,

    /// Report output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Accessibility probe timeout in seconds.
    #[arg(long, default_value_t = 8)]
    pub probe_timeout: u64,

    /// Override the User-Agent sent with every request.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
