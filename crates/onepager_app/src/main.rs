//! One-pager: build a company one-pager deck from the terminal.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use onepager_engine::WorkflowRequest;
use onepager_logging::wizard_info;

mod platform;

use platform::config::{AppConfig, Overrides, DEFAULT_CONFIG_FILE};
use platform::logging::{self, LogDestination};

/// Company one-pager client
#[derive(Parser)]
#[command(name = "onepager")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Backend base URL, tried before the local development defaults
    #[arg(long, global = true, env = "ONEPAGER_BACKEND_BASE_URL")]
    backend_url: Option<String>,

    /// Secret key for the logo search API
    #[arg(long, global = true, env = "ONEPAGER_LOGO_DEV_KEY", hide_env_values = true)]
    logo_key: Option<String>,

    /// Where generated files are saved
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Where log output goes
    #[arg(long, global = true, value_enum)]
    log: Option<LogDestination>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk through the one-pager wizard (default)
    OnePager,

    /// Turn a chart screenshot into an Excel workbook
    ScreenshotToExcel {
        /// PNG, JPEG, GIF, WebP or BMP image
        image: PathBuf,
    },

    /// Extract financial statements from an annual report PDF
    FinancialExtraction {
        pdf: PathBuf,
    },

    /// Generate a peer-set analysis workbook for a company
    PeerSet {
        company_name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let file_config = AppConfig::load(&cli.config)?;

    logging::initialize(
        cli.log.or(file_config.log).unwrap_or_default(),
        cli.verbose,
    );
    wizard_info!("onepager {} starting", env!("CARGO_PKG_VERSION"));

    let backend = file_config.backend(Overrides {
        backend_base_url: cli.backend_url,
        logo_api_key: cli.logo_key,
        output_dir: cli.output,
    });

    match cli.command {
        None | Some(Commands::OnePager) => platform::app::run_wizard(backend),
        Some(Commands::ScreenshotToExcel { image }) => {
            platform::app::run_workflow(backend, WorkflowRequest::ScreenshotToExcel { image })
        }
        Some(Commands::FinancialExtraction { pdf }) => {
            platform::app::run_workflow(backend, WorkflowRequest::FinancialExtraction { pdf })
        }
        Some(Commands::PeerSet { company_name }) => {
            platform::app::run_workflow(backend, WorkflowRequest::PeerSet { company_name })
        }
    }
}
