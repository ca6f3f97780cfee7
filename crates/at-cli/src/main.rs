//! AnaTools CLI

use anyhow::{Context, Result};
use at_core::objects::TrackMatchingParams;
use at_core::{CollectionKind, Event, TypeRegistry};
use at_producers::member::leading_object;
use at_producers::{ProducerSet, RootHistogramSource, read_config};
use at_root::{Histogram, RootFile};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "anatools")]
#[command(about = "AnaTools - per-event analysis variable producers")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured producers over event snapshots
    Produce {
        /// Producer configuration (YAML, or JSON by extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Events (JSON array or one JSON object per line)
        #[arg(short, long)]
        events: PathBuf,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Read one member of the leading object of a collection in every event
    Member {
        /// Events (JSON array or one JSON object per line)
        #[arg(short, long)]
        events: PathBuf,

        /// Collection name (mcparticles, pileupinfos, tracks, gsf_tracks, electrons, muons, jets)
        #[arg(long)]
        collection: CollectionKind,

        /// Member or accessor name
        #[arg(long)]
        member: String,

        /// Registered type to start the lookup from. Defaults to the
        /// collection's analysis type.
        #[arg(long = "type")]
        type_name: Option<String>,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the keys of a ROOT file, or dump one histogram
    Inspect {
        /// ROOT file
        file: PathBuf,

        /// Histogram path inside the file (`dir/name`)
        #[arg(long)]
        hist: Option<String>,
    },

    /// List registered types with their members and bases
    Types,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Produce { config, events, output } => cmd_produce(&config, &events, output.as_ref()),
        Commands::Member { events, collection, member, type_name, output } => {
            cmd_member(&events, collection, &member, type_name.as_deref(), output.as_ref())
        }
        Commands::Inspect { file, hist } => cmd_inspect(&file, hist.as_deref()),
        Commands::Types => cmd_types(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_events(path: &Path) -> Result<Vec<Event>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let events = Event::parse_many(&text).with_context(|| format!("parsing events from {}", path.display()))?;
    tracing::info!(n_events = events.len(), "events loaded");
    Ok(events)
}

#[derive(Serialize)]
struct EventRecord<T> {
    run: u32,
    lumi: u32,
    event: u64,
    #[serde(flatten)]
    payload: T,
}

impl<T> EventRecord<T> {
    fn new(event: &Event, payload: T) -> Self {
        Self { run: event.run, lumi: event.lumi, event: event.event, payload }
    }
}

#[derive(Serialize)]
struct Variables {
    variables: at_core::EventVariables,
}

#[derive(Serialize)]
struct MemberValueOut {
    value: Option<f64>,
}

fn cmd_produce(config: &Path, events: &Path, output: Option<&PathBuf>) -> Result<()> {
    let cfg = read_config(config).with_context(|| format!("loading configuration {}", config.display()))?;
    let producers = ProducerSet::from_config(
        &cfg,
        Arc::new(RootHistogramSource),
        Arc::new(TypeRegistry::with_builtin_types()),
    )?;
    tracing::info!(producers = ?producers.names(), "producers configured");

    let events = load_events(events)?;
    let mut records = Vec::with_capacity(events.len());
    for event in &events {
        let variables = producers
            .process(event)
            .with_context(|| format!("run {} lumi {} event {}", event.run, event.lumi, event.event))?;
        records.push(EventRecord::new(event, Variables { variables }));
    }
    tracing::info!(n_events = records.len(), "production complete");

    write_json(output, serde_json::to_value(records)?)
}

fn cmd_member(
    events: &Path,
    collection: CollectionKind,
    member: &str,
    type_name: Option<&str>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let registry = TypeRegistry::with_builtin_types();
    let params = TrackMatchingParams::default();
    let events = load_events(events)?;

    let mut records = Vec::with_capacity(events.len());
    for event in &events {
        let value = match leading_object(event, collection, &params)? {
            None => None,
            Some((natural, object)) => {
                let start = type_name.unwrap_or(natural);
                match registry.get_numeric_member(start, &*object, member) {
                    Ok(v) => Some(v),
                    Err(e @ at_core::Error::UnresolvedMember { .. }) => return Err(e.into()),
                    Err(e) => {
                        tracing::warn!(run = event.run, event = event.event, "{e}");
                        None
                    }
                }
            }
        };
        records.push(EventRecord::new(event, MemberValueOut { value }));
    }

    write_json(output, serde_json::to_value(records)?)
}

#[derive(Serialize)]
struct KeyEntry {
    path: String,
    class_name: String,
    title: String,
    cycle: u16,
}

fn collect_keys(file: &RootFile, dir: &str, out: &mut Vec<KeyEntry>) -> Result<()> {
    let keys = if dir.is_empty() { file.list_keys()? } else { file.list_keys_in(dir)? };
    for key in keys {
        let path = if dir.is_empty() { key.name.clone() } else { format!("{dir}/{}", key.name) };
        let is_dir = key.is_directory;
        out.push(KeyEntry { path: path.clone(), class_name: key.class_name, title: key.title, cycle: key.cycle });
        if is_dir {
            collect_keys(file, &path, out)?;
        }
    }
    Ok(())
}

fn histogram_json(h: &Histogram) -> serde_json::Value {
    let errors: Vec<f64> = (1..=h.n_bins).map(|b| h.error(b)).collect();
    serde_json::json!({
        "name": h.name,
        "title": h.title,
        "n_bins": h.n_bins,
        "bin_edges": h.bin_edges,
        "bin_content": h.bin_content,
        "bin_error": errors,
        "underflow": h.underflow,
        "overflow": h.overflow,
        "entries": h.entries,
        "integral": h.integral(),
    })
}

fn cmd_inspect(path: &Path, hist: Option<&str>) -> Result<()> {
    let file = RootFile::open(path).with_context(|| format!("opening {}", path.display()))?;
    match hist {
        Some(name) => {
            let h = file.get_histogram(name).with_context(|| format!("reading '{name}'"))?;
            write_json(None, histogram_json(&h))
        }
        None => {
            let mut keys = Vec::new();
            collect_keys(&file, "", &mut keys)?;
            write_json(None, serde_json::to_value(keys)?)
        }
    }
}

fn cmd_types() -> Result<()> {
    let registry = TypeRegistry::with_builtin_types();
    let types: Vec<serde_json::Value> = registry
        .type_names()
        .into_iter()
        .filter_map(|name| registry.get(name))
        .map(|info| {
            serde_json::json!({
                "name": info.name(),
                "data_members": info.data_member_names().collect::<Vec<_>>(),
                "methods": info.method_names().collect::<Vec<_>>(),
                "bases": info.bases().iter().map(|b| b.qualified_name()).collect::<Vec<_>>(),
            })
        })
        .collect();
    write_json(None, serde_json::Value::Array(types))
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
