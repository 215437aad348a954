use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;
use es_core::config::EngineConfig;

pub mod cli;
pub mod pipeline;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Valider la source
    if !cli.input.exists() {
        anyhow::bail!("Fichier introuvable : {}", cli.input.display());
    }

    // 4. Charger la config, puis appliquer les overrides CLI
    let mut config = resolve_config(&cli)?;
    cli.apply_overrides(&mut config);
    log::debug!("Configuration effective : {config:?}");

    // 5. Ctrl-C : arrêt propre des boucles vidéo
    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })?;

    // 6. Lancer le pipeline
    let mode = pipeline::select_mode(&cli.input, cli.output.as_deref());
    log::info!("Pipeline {mode:?} pour {}", cli.input.display());
    let options = pipeline::RunOptions {
        fit_terminal: cli.fit_terminal,
        stop,
    };
    pipeline::run(&cli.input, &mode, config, &options)
}

fn resolve_config(cli: &cli::Cli) -> Result<EngineConfig> {
    if cli.config.exists() {
        es_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(EngineConfig::default())
    }
}
