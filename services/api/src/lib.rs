mod cli;
mod infra;
mod report;
mod routes;
mod server;

use tiered_rate::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
