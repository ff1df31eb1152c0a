mod cli;
mod demo;
mod infra;
mod routes;
mod runner;
mod telegram;

use hiring_intake::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
