//! Headless driver: load a dataset, type it, and print every view push as a JSON line

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dv_core::{FormatRegistry, TypeRegistry, ViewUpdate};
use dv_data::{DatasetConfig, ViewConfig, VisualizationController};

#[derive(Parser, Debug)]
#[command(name = "datavis", about = "Load a dataset and push typed views")]
struct Cli {
    /// Data file (.json, .csv or .tsv), or a dataset config with --config
    path: PathBuf,

    /// Treat PATH as a dataset configuration file
    #[arg(long)]
    config: bool,

    /// Format the records are in; detected from the first record when omitted
    #[arg(long)]
    format: Option<String>,

    /// Field to data type mapping, e.g. --map when=dataTypeDate
    #[arg(long = "map", value_parser = parse_mapping)]
    mappings: Vec<(String, String)>,

    /// List the registered data types and formats and exit
    #[arg(long)]
    list: bool,
}

fn parse_mapping(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((field, data_type)) if !field.is_empty() && !data_type.is_empty() => {
            Ok((field.to_string(), data_type.to_string()))
        }
        _ => Err(format!("expected FIELD=TYPE, got '{text}'")),
    }
}

fn dataset_config(cli: &Cli) -> Result<DatasetConfig> {
    let mut config = if cli.config {
        DatasetConfig::from_json_file(&cli.path)
            .with_context(|| format!("reading dataset config {}", cli.path.display()))?
    } else {
        DatasetConfig::new(cli.path.clone())
    };

    if cli.format.is_some() {
        config.format = cli.format.clone();
    }
    for (field, data_type) in &cli.mappings {
        config = config.with_field_type(field, data_type);
    }

    // One view per mapped type when none are configured
    if config.views.is_empty() {
        for data_type in config.field_types.values() {
            if !config.views.iter().any(|v| &v.data_type == data_type) {
                config.views.push(ViewConfig {
                    id: data_type.clone(),
                    data_type: data_type.clone(),
                });
            }
        }
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let types = Arc::new(TypeRegistry::with_defaults()?);
    let formats = Arc::new(FormatRegistry::with_defaults(&types)?);

    if cli.list {
        for data_type in types.names() {
            println!("type   {data_type}");
        }
        for format in formats.iter() {
            println!(
                "format {} available={:?} required={:?}",
                format.name(),
                format.available_data_types(),
                format.required_data_types()
            );
        }
        return Ok(());
    }

    let config = dataset_config(&cli)?;
    info!(path = %config.path.display(), "Starting datavis");

    let transport = Arc::new(|update: ViewUpdate| match serde_json::to_string(&update) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(view_id = %update.id, error = %e, "could not serialize view update"),
    });
    let controller = VisualizationController::new(types, formats, transport)
        .with_null_config(config.null_config.clone());

    let summary = controller
        .load_configured(&config)
        .await
        .map_err(|e| anyhow!("failed to load {}: {e}", config.path.display()))?;
    info!(
        rows = controller.row_count(),
        converted = summary.converted,
        failed = summary.failed,
        extracted = summary.extracted,
        "dataset ready"
    );

    if controller.views().is_empty() {
        warn!("no views registered; pass --map FIELD=TYPE or list views in the config");
    }
    let pushed = controller.update_all_views();
    info!(pushed, "views updated");

    Ok(())
}
