use std::fs;
use std::path::{Path, PathBuf};

use catalog::{BusinessRecord, count_online_only, load_businesses};
use clap::{Parser, Subcommand};
use layers::project;
use layers::style::BusinessMapStyle;
use mapview::MapViewSession;
use mapview::config::MapConfig;
use mapview::engine::RecordingEngine;
use mapview::store::{ViewStateStore, ViewportState};
use serde_json::{Map, Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod script;

#[derive(Parser, Debug)]
#[command(author, version, about = "Business map view tooling")]
struct Args {
    /// Map configuration file (JSON). Environment variables override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the GeoJSON feature collection for a business list
    Project {
        /// Business list (JSON array)
        businesses: PathBuf,
    },

    /// Print the map style: source definition and layers
    Style {
        /// Business list to embed as source data
        #[arg(long)]
        businesses: Option<PathBuf>,
    },

    /// Replay a scripted interaction session and print the outcome
    Replay {
        /// Business list (JSON array)
        businesses: PathBuf,

        /// Interaction script (JSON array of steps)
        script: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let args = Args::parse();
    let config = MapConfig::load(args.config.as_deref()).map_err(|e| e.to_string())?;
    if config.access_token.is_none() {
        info!("MAPBOX_ACCESS_TOKEN not set; output is engine-independent");
    }

    let out = match args.command {
        Command::Project { businesses } => cmd_project(&businesses)?,
        Command::Style { businesses } => cmd_style(&config, businesses.as_deref())?,
        Command::Replay { businesses, script } => cmd_replay(&config, &businesses, &script)?,
    };

    let text = serde_json::to_string_pretty(&out).map_err(|e| e.to_string())?;
    println!("{text}");
    Ok(())
}

fn read_businesses(path: &Path) -> Result<Vec<BusinessRecord>, String> {
    let businesses = load_businesses(path).map_err(|e| e.to_string())?;
    info!(
        path = %path.display(),
        businesses = businesses.len(),
        online_only = count_online_only(&businesses),
        "loaded business list"
    );
    Ok(businesses)
}

fn cmd_project(path: &Path) -> Result<Value, String> {
    let businesses = read_businesses(path)?;
    serde_json::to_value(project(&businesses)).map_err(|e| e.to_string())
}

fn cmd_style(config: &MapConfig, path: Option<&Path>) -> Result<Value, String> {
    let businesses = match path {
        Some(p) => read_businesses(p)?,
        None => Vec::new(),
    };
    let style = BusinessMapStyle::default();
    let interactive: Vec<String> = style
        .interactive_layer_ids()
        .iter()
        .map(|l| l.as_str().to_string())
        .collect();

    let mut sources = Map::new();
    sources.insert(
        style.source.as_str().to_string(),
        style.source_json(&project(&businesses)),
    );

    Ok(json!({
        "map_style": config.map_style,
        "cluster_policy_version": style.policy.version,
        "sources": sources,
        "layers": style.layers_json(),
        "interactive_layer_ids": interactive,
    }))
}

fn cmd_replay(
    config: &MapConfig,
    businesses: &Path,
    script_path: &Path,
) -> Result<Value, String> {
    let businesses = read_businesses(businesses)?;
    let raw = fs::read_to_string(script_path)
        .map_err(|e| format!("read {}: {e}", script_path.display()))?;
    let steps = script::parse_script(&raw)?;

    let store = ViewStateStore::shared(ViewportState::new(
        config.longitude,
        config.latitude,
        config.zoom,
    ));
    let mut session = MapViewSession::new(config, store, businesses);
    let mut engine = RecordingEngine::new();
    let commands = session.mount();
    session.execute(&mut engine, &commands);

    info!(steps = steps.len(), "replaying script");
    Ok(script::replay(&mut session, &mut engine, &steps))
}
