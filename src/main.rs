mod catalog;
mod cli;
mod config;
mod engine;
mod error;
mod models;
mod report;

use catalog::Catalog;
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use engine::{SelectionController, SummaryProjector};
use error::Result;
use models::{Fertilizer, Nutrient};
use report::ReportRenderer;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init => {
            Config::setup_interactive()?;
            Ok(())
        }
        Commands::Check => check(cli.config),
        Commands::Report {
            results,
            excess,
            json,
        } => run_report(cli.config, &results, excess, json),
    }
}

fn check(config_override: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config_override)?;
    let fertilizers = load_fertilizers(&config)?;
    let catalog = Catalog::new(Vec::new(), fertilizers);
    catalog.validate()?;

    let source = match &config.catalog.fertilizer_file {
        Some(path) => format!("catalog file {}", path.display()),
        None => "built-in catalog".to_string(),
    };
    println!(
        "Config OK. {} fertilizer products available from {}.",
        catalog.fertilizers().len(),
        source
    );
    Ok(())
}

fn run_report(
    config_override: Option<PathBuf>,
    results: &Path,
    excess: Option<f64>,
    json: bool,
) -> Result<()> {
    let config = Config::load(config_override)?;
    let nutrients = Catalog::load_lab_report(results)?;
    let fertilizers = load_fertilizers(&config)?;
    let catalog = Catalog::new(nutrients, fertilizers);
    catalog.validate()?;

    let excess_percent = excess.unwrap_or(config.amendment.allowed_excess_percent);
    let mut controller = SelectionController::new(catalog).with_excess_percent(excess_percent);
    auto_select(&mut controller, &config);

    if json {
        let summary = SummaryProjector::new(&controller).build_summary();
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let renderer =
            ReportRenderer::new(&controller, config.amendment.deficiency_threshold_percent);
        print!("{}", renderer.render());
    }
    Ok(())
}

fn load_fertilizers(config: &Config) -> Result<Vec<Fertilizer>> {
    match &config.catalog.fertilizer_file {
        Some(path) => Catalog::load_fertilizers(path),
        None => Ok(Catalog::builtin_fertilizers()),
    }
}

/// One greedy pass over the deficient nutrients, main nutrients first.
/// For each, stack the highest-content products until the deficit closes
/// or the per-nutrient row limit is reached. Order-dependent on purpose:
/// this mirrors how a user works down the report, not an optimizer.
fn auto_select(controller: &mut SelectionController, config: &Config) {
    let threshold = config.amendment.deficiency_threshold_percent;
    let deficient: Vec<Nutrient> = controller
        .catalog()
        .deficient_nutrients(threshold)
        .into_iter()
        .cloned()
        .collect();

    for nutrient in deficient {
        // Products below 1% content are not worth a row
        let candidates: Vec<String> = controller
            .catalog()
            .fertilizers_for(&nutrient.name)
            .iter()
            .filter(|f| f.percent_of(&nutrient.name) >= 1.0)
            .map(|f| f.name.clone())
            .collect();

        let mut rows = 0;
        for candidate in candidates {
            if rows >= config.amendment.max_products_per_nutrient {
                break;
            }
            if controller.projected_level(&nutrient) >= nutrient.ideal {
                break;
            }
            match controller.select_fertilizer(&nutrient.name, &candidate, None) {
                Some(quote) if quote.capped > 0.0 => {
                    rows += 1;
                }
                Some(_) => {
                    // Zero-rate row (deficit met, or capped to zero):
                    // take it back out rather than cluttering the plan
                    let index = controller
                        .store()
                        .selections_for(&nutrient.name)
                        .len()
                        .saturating_sub(1);
                    controller.remove_selection(&nutrient.name, index);
                }
                None => {}
            }
        }
        tracing::debug!(nutrient = %nutrient.name, rows, "selection pass complete");
    }
}
