use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use paysync::core::log::init_logging;
use paysync::jobs::Job;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for paysync::AppCommand {
    fn from(cmd: Commands) -> paysync::AppCommand {
        match cmd {
            Commands::Bootstrap => paysync::AppCommand::Bootstrap,
            Commands::Serve => paysync::AppCommand::Serve,
            Commands::Reconcile => paysync::AppCommand::Run(Job::Reconcile),
            Commands::Expire => paysync::AppCommand::Run(Job::Expire),
            Commands::BillCredits => paysync::AppCommand::Run(Job::BillCredits),
            Commands::RepayInvestments => paysync::AppCommand::Run(Job::RepayInvestments),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Create the tariff catalogue and the bank client
    Bootstrap,
    /// Serve provider callbacks and run the periodic jobs
    Serve,
    /// Check pending payments with the provider once
    Reconcile,
    /// Cancel overdue pending payments once
    Expire,
    /// Issue due credit installments once
    BillCredits,
    /// Issue payouts for matured investments once
    RepayInvestments,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => paysync::cli::setup::setup(cli.config_path.as_deref()),
        Some(cmd) => paysync::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
