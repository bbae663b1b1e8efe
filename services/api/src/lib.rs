mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use quote_funnel::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
