#![recursion_limit = "256"]

use anyhow::Result;
use clap::Parser;

pub mod cli;
pub mod pipeline;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger et valider la config
    let mut config = ac_core::config::load_config(&cli.config)?;
    if let Some(output) = cli.output {
        config.runtime.checkpoint = output;
    }

    // 4. Choisir le device
    let device = ac_model::device::select_device(&config.runtime.device)?;
    println!("Device: {device}");

    // 5. Entraîner puis sauvegarder
    let outcome = pipeline::run_on_device(&config, device)?;
    log::info!(
        "{} epochs over {} classes, checkpoint at {}",
        outcome.reports.len(),
        outcome.num_classes,
        outcome.checkpoint.display()
    );
    Ok(())
}
