use crate::commands::{run_score, run_validate_model, ScoreArgs, ValidateModelArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use energy_credit::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "PAYG Energy Credit Scoring",
    about = "Serve and run credit risk scoring for pay-as-you-go energy customers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a customer CSV export offline and print one JSON line per customer
    Score(ScoreArgs),
    /// Load and validate a model artifact, then print its metadata
    ValidateModel(ValidateModelArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Score(args) => run_score(args),
        Command::ValidateModel(args) => run_validate_model(args),
    }
}
