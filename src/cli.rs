use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable detailed debug logging (global)
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Enable verbose logging (global)
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run a passive CT-log scan against a root domain
    Scan {
        /// Root domain to scan (e.g. example.com)
        domain: String,

        /// SQLite database path for change tracking
        #[arg(long, default_value = "ct_hunter.db")]
        db: String,

        /// Write a CSV report of the findings to this path
        #[arg(short = 'o', long)]
        out: Option<String>,

        /// Concurrent enrichment workers
        #[arg(long, default_value_t = 8_usize)]
        concurrency: usize,

        /// Per-attempt HTTP metadata timeout in seconds
        #[arg(long, default_value_t = 5_u64)]
        timeout: u64,

        /// Process at most N subdomains this scan
        #[arg(long)]
        limit: Option<usize>,

        /// Require a dot-boundary suffix match against the root domain
        /// (excludes e.g. notexample.com for root example.com)
        #[arg(long, default_value_t = false)]
        dot_boundary: bool,
    },

    /// Show every subdomain ever recorded for a root domain
    History {
        /// Root domain (e.g. example.com)
        domain: String,

        /// SQLite database path for change tracking
        #[arg(long, default_value = "ct_hunter.db")]
        db: String,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
