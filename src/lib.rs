pub mod cli;
pub mod core;
pub mod jobs;
pub mod ledger;
pub mod providers;
pub mod server;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::provider::PaymentProvider;
use crate::jobs::{Job, Scheduler, run_job};
use crate::ledger::{Ledger, LedgerSettings};
use crate::providers::{GatewayProvider, WebhookNotifier};
use crate::store::disk::DiskStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

pub enum AppCommand {
    Bootstrap,
    Serve,
    Run(Job),
}

/// The ledger and provider wired from a loaded configuration.
pub struct App {
    pub config: AppConfig,
    pub ledger: Arc<Ledger>,
    pub provider: Arc<dyn PaymentProvider>,
}

impl App {
    pub fn open(config: AppConfig) -> Result<Self> {
        let data_path = config.default_data_path()?.join("ledger");
        let store = DiskStore::open(&data_path)?;
        debug!(path = %data_path.display(), "Opened ledger store");

        let notifier = WebhookNotifier::new(config.provider.timeout())?;
        let ledger =
            Ledger::new(Arc::new(store), LedgerSettings::from(&config)).with_hook(Arc::new(notifier));
        let provider = GatewayProvider::new(&config.provider)?;

        Ok(Self {
            config,
            ledger: Arc::new(ledger),
            provider: Arc::new(provider),
        })
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("paysync starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    let app = App::open(config)?;

    match command {
        AppCommand::Bootstrap => bootstrap(&app).await,
        AppCommand::Serve => serve(app).await,
        AppCommand::Run(job) => run_once(&app, job).await,
    }
}

async fn bootstrap(app: &App) -> Result<()> {
    let report = app.ledger.bootstrap().await?;
    let bank = app.ledger.bank_max_funds().await?;
    let accounts = app.ledger.accounts_of(bank.client).await?;
    println!("{}", report.display(&accounts));
    Ok(())
}

async fn run_once(app: &App, job: Job) -> Result<()> {
    let spinner = cli::ui::new_spinner(&format!("Running {job}"));
    let outcome = run_job(job, &app.ledger, app.provider.as_ref()).await;
    spinner.finish_and_clear();

    let outcome = outcome.with_context(|| format!("Job {job} failed"))?;
    println!("{}", outcome.display(job));
    if job == Job::Reconcile {
        let pending = app.ledger.pending_transactions().await?;
        println!("\n{}", cli::report::pending_table(&pending));
    }
    Ok(())
}

async fn serve(app: App) -> Result<()> {
    app.ledger.bootstrap().await?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let scheduler = Scheduler::new(
        Arc::clone(&app.ledger),
        Arc::clone(&app.provider),
        app.config.schedule.clone(),
    );
    let jobs = tokio::spawn(async move { scheduler.run(stop_rx).await });

    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
        }
        info!("Shutting down");
        let _ = stop_tx.send(true);
    };

    let served = server::serve(Arc::clone(&app.ledger), &app.config.server.bind, shutdown).await;
    if served.is_err() {
        // The shutdown future never ran, so the scheduler is still looping.
        jobs.abort();
        return served;
    }
    jobs.await.context("Scheduler task failed")?;
    served
}
