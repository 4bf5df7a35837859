//! CLI parser and dispatch to command-specific modules.

mod captcha;
mod catalog;
mod ping;
mod search;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use dhc_case_status::provider::ProviderKind;
use dhc_case_status::Config;

#[derive(Parser)]
#[command(name = "dhc")]
#[command(about = "Delhi High Court case status lookup")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a case by type, number and filing year
    Search {
        /// Case type as listed by `dhc case-types` (e.g. "W.P.(C)", "CRL.A.")
        case_type: String,
        /// Case number (digits only)
        case_number: String,
        /// Four digit filing year
        filing_year: String,
        /// Serve the search from bundled fixtures instead of the portal
        #[arg(long)]
        mock: bool,
        /// Print the `{success, record, error}` response as JSON
        #[arg(long)]
        json: bool,
        /// Download linked order PDFs into this directory
        #[arg(short, long)]
        download: Option<PathBuf>,
    },

    /// List the case types the portal accepts
    CaseTypes {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the portal and the local tools are reachable
    Ping,

    /// Run the CAPTCHA solver over a saved image
    Captcha {
        /// CAPTCHA image (PNG, JPEG, ...)
        image: PathBuf,
        /// Save the preprocessed image here
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Search {
            case_type,
            case_number,
            filing_year,
            mock,
            json,
            download,
        } => {
            if mock {
                config.provider = ProviderKind::Mock;
            }
            let args = search::SearchArgs {
                case_type,
                case_number,
                filing_year,
                json,
                download,
            };
            search::cmd_search(&config, args).await
        }
        Commands::CaseTypes { json } => catalog::cmd_case_types(json),
        Commands::Ping => ping::cmd_ping(&config).await,
        Commands::Captcha { image, save } => captcha::cmd_captcha(&config, &image, save).await,
    }
}
