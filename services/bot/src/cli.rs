use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use hiring_intake::config::AppConfig;
use hiring_intake::error::AppError;
use hiring_intake::geo::{address_variants, AddressResolver, Geocoder};

use crate::demo::{run_demo, DemoArgs};
use crate::runner;

#[derive(Parser, Debug)]
#[command(
    name = "Vacancy Intake Bot",
    about = "Run the conversational job-application intake bot",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the bot: long-poll the chat transport (default command)
    Run(RunArgs),
    /// Walk a scripted application through the engine with in-memory stubs
    Demo(DemoArgs),
    /// Resolve an address through the live geocoding chain
    Geocode(GeocodeArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Override the configured host for the health endpoints
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the health endpoints
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve site listings from a CSV export instead of Google Sheets
    #[arg(long)]
    pub(crate) sites_csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct GeocodeArgs {
    /// Free-text address, e.g. "Москва, Тверская, 1"
    #[arg(long)]
    address: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or_else(|| Command::Run(RunArgs::default()));

    match command {
        Command::Run(args) => runner::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Geocode(args) => run_geocode(args).await,
    }
}

async fn run_geocode(args: GeocodeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let resolver = AddressResolver::standard(config.geocoding.yandex_api_key);

    println!("Query variants:");
    for variant in address_variants(&args.address) {
        println!("- {variant}");
    }

    match resolver.resolve(&args.address).await {
        Some(coordinate) => {
            println!(
                "Resolved: {:.6}, {:.6}",
                coordinate.latitude, coordinate.longitude
            );
        }
        None => println!("Not found"),
    }
    Ok(())
}
