use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gridboard::config::GridConfig;
use gridboard::container::{ContainerSize, ContainerSizes};
use gridboard::doc::Viewport;
use gridboard::engine::LayoutEngine;
use gridboard::error::ErrorCode;
use gridboard::registry::StaticRegistry;
use gridboard::snapshot::{DocumentExport, ImportError};
use serde_json::{Value, json};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: String, source: io::Error },
    #[error("invalid document [{code}]: {0}", code = .0.error_code())]
    Import(#[from] ImportError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("container size must be positive, got {width}x{height}")]
    InvalidContainer { width: f64, height: f64 },
}

#[derive(Parser, Debug)]
#[command(name = "gridboard", about = "Inspect, validate and convert gridboard layout documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every item's pixel rect and every canvas height for one viewport.
    Inspect(InspectArgs),
    /// Check that a document imports cleanly.
    Validate(InputArgs),
    /// Rewrite a document in canonical form (`currentViewport`, dense z-indices).
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    #[arg(default_value = "-", help = "Input file path, or - for stdin")]
    input: String,
}

#[derive(Args, Debug)]
struct InspectArgs {
    #[command(flatten)]
    input: InputArgs,

    #[arg(long, help = "Viewport to render; defaults to the document's current viewport")]
    viewport: Option<Viewport>,

    #[arg(long, env = "GRIDBOARD_CONTAINER_WIDTH", default_value_t = 1200.0)]
    width: f64,

    #[arg(long, env = "GRIDBOARD_CONTAINER_HEIGHT", default_value_t = 400.0)]
    height: f64,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    #[command(flatten)]
    input: InputArgs,

    #[arg(long, short, help = "Output file path; stdout when omitted")]
    output: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Inspect(args) => run_inspect(args),
        Command::Validate(args) => run_validate(&args),
        Command::Convert(args) => run_convert(args),
    }
}

fn run_inspect(args: InspectArgs) -> Result<(), CliError> {
    if !(args.width > 0.0 && args.height > 0.0) {
        return Err(CliError::InvalidContainer { width: args.width, height: args.height });
    }
    let text = read_input(&args.input.input)?;
    let sizes = ContainerSizes::new(ContainerSize::new(args.width, args.height));
    let mut engine = LayoutEngine::new(GridConfig::from_env(), Box::new(StaticRegistry::builtin()), Box::new(sizes));
    engine.import_json(&text)?;
    if let Some(viewport) = args.viewport {
        engine.switch_viewport(viewport);
    }
    engine.drain_actions();

    let mut canvases = Vec::new();
    for canvas_id in engine.canvas_ids() {
        let items: Vec<(String, String, String, i64)> = engine
            .items(&canvas_id)
            .unwrap_or_default()
            .iter()
            .map(|item| (item.id.clone(), item.component_type.clone(), item.name.clone(), item.z_index))
            .collect();
        let mut rendered = Vec::with_capacity(items.len());
        for (id, component_type, name, z_index) in items {
            let rect = engine.item_rect(&id);
            rendered.push(json!({
                "id": id,
                "type": component_type,
                "name": name,
                "zIndex": z_index,
                "rect": serde_json::to_value(rect)?,
            }));
        }
        let height = engine.canvas_height(&canvas_id);
        canvases.push(json!({ "id": canvas_id, "height": height, "items": rendered }));
    }
    debug!(canvases = canvases.len(), "inspected");

    print_json(&json!({
        "viewport": engine.current_viewport(),
        "container": { "width": args.width, "height": args.height },
        "canvases": canvases,
    }))
}

fn run_validate(args: &InputArgs) -> Result<(), CliError> {
    let text = read_input(&args.input)?;
    let doc = DocumentExport::from_json(&text)?;
    let canvases = doc.build_canvases()?;
    let items: usize = canvases.iter().map(|canvas| canvas.items.len()).sum();
    info!(canvases = canvases.len(), items, "document is valid");
    print_json(&json!({ "valid": true, "canvases": canvases.len(), "items": items }))
}

fn run_convert(args: ConvertArgs) -> Result<(), CliError> {
    let text = read_input(&args.input.input)?;
    let doc = DocumentExport::from_json(&text)?;
    let canvases = doc.build_canvases()?;
    let mut canonical = DocumentExport::capture(&canvases, &doc.current_viewport);
    canonical.metadata = doc.metadata;
    canonical.canvas_metadata = doc.canvas_metadata;
    let rendered = canonical.to_json()?;

    match args.output {
        Some(path) => {
            fs::write(&path, rendered + "\n")
                .map_err(|source| CliError::Write { path: path.display().to_string(), source })?;
            info!(path = %path.display(), items = canonical.item_count(), "document converted");
            Ok(())
        }
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|source| CliError::Read { path: "stdin".to_owned(), source })?;
        return Ok(text);
    }
    fs::read_to_string(input).map_err(|source| CliError::Read { path: input.to_owned(), source })
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
