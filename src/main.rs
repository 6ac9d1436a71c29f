use anyhow::{Context, Result};
use clap::{Arg, Command};
use grad_outcomes::{Config, OutputDocument, Pipeline, PipelineSources};
use log::{error, info, warn};
use std::fs;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("grad-outcomes")
        .version("1.0")
        .about("Builds the consolidated high school post-graduation outcomes dataset")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .get_matches();

    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");

    let config = if Path::new(config_file).exists() {
        info!("Loading configuration from: {}", config_file);
        Config::load_from_file(config_file)
            .with_context(|| format!("Failed to load configuration: {}", config_file))?
    } else {
        info!("Creating default configuration file: {}", config_file);
        Config::default()
            .save_to_file(config_file)
            .with_context(|| format!("Failed to write configuration: {}", config_file))?;
        warn!("Please edit {} to point at your source files, then run the program again.", config_file);
        return Ok(());
    };

    let sources = PipelineSources::from_config(&config);
    let run = match Pipeline::new(&config).run(&sources) {
        Ok(run) => run,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(e.into());
        }
    };

    write_document(&run.document, &config.output_path)?;
    info!("Saved to: {}", config.output_path);

    if !run.report.matches.unmatched.is_empty() {
        info!(
            "{} college-going rows had no registry match (run with RUST_LOG=debug to list them)",
            run.report.matches.unmatched.len()
        );
    }
    print_summary(&run.document);
    Ok(())
}

fn write_document(document: &OutputDocument, output_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }
    }
    let content = serde_json::to_string_pretty(document)?;
    fs::write(output_path, content).with_context(|| format!("Failed to write output: {}", output_path))?;
    Ok(())
}

fn print_summary(document: &OutputDocument) {
    let state = &document.state;
    info!("SUMMARY");
    info!("  Total schools: {}", state.schools_count);
    info!("  Counties: {}", state.counties_count);
    match state.flight_score.average {
        Some(avg) => info!("  Avg Flight Score: {:.1}", avg),
        None => info!("  Avg Flight Score: n/a"),
    }

    info!("TOP 5 IMPROVERS (Ready Grad change):");
    for (i, improver) in document.top_improvers.iter().take(5).enumerate() {
        info!(
            "  {}. {} - +{:.1}% (now {})",
            i + 1,
            improver.school,
            improver.change,
            improver.rg_end.map(|r| format!("{:.1}%", r)).unwrap_or_else(|| "n/a".to_string())
        );
    }

    info!("TOP 5 SCHOOLS BY FLIGHT SCORE:");
    let mut scored: Vec<_> = document
        .schools
        .iter()
        .filter_map(|s| s.flight_score.map(|score| (score, s)))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    for (i, (score, school)) in scored.iter().take(5).enumerate() {
        info!("  {}. {} - {:.1} ({})", i + 1, school.school, score, school.county);
    }
}
