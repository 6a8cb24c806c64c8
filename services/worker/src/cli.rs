use crate::demo::{run_demo, DemoArgs};
use crate::infra::{off_runtime, off_runtime_until};
use crate::ops::{requeue_lead, run_single_cycle, show_jurisdiction};
use crate::server::{self, stop_requested};
use clap::{Args, Parser, Subcommand};
use lead_qualifier::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Lead Qualifier",
    about = "Qualify personal-injury intake leads and route them to the right handling tier",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the record store and serve the status API (default command)
    Run(ServeArgs),
    /// Process every pending lead once and print the outcomes (a stop signal ends it after the current record)
    Once,
    /// Print the reference data for a jurisdiction
    Jurisdiction {
        /// Jurisdiction code, e.g. SC
        code: String,
    },
    /// Reset a completed or failed lead so the next cycle qualifies it again
    Requeue {
        /// Record id in the lead store
        id: String,
    },
    /// Qualify a CSV export offline and print each decision
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the status server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the status server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Run(ServeArgs::default()));

    match command {
        Command::Run(args) => server::run(args).await,
        Command::Once => off_runtime_until(stop_requested(), run_single_cycle).await,
        Command::Jurisdiction { code } => off_runtime(move || show_jurisdiction(&code)),
        Command::Requeue { id } => off_runtime(move || requeue_lead(id)),
        Command::Demo(args) => off_runtime(move || run_demo(args)),
    }
}
