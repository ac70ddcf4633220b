mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use energy_credit::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
