//! `campus`: command line console for the course catalog's bulk CSV jobs.
use anyhow::Result;
use clap::Parser;

mod app;
mod cli;
mod commands;
mod effects;
mod render;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    campus_logging::initialize(args.log_destination(), args.log_level());
    commands::run(args).await
}
