use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use tracing::error;

use showtime_parser::{
    fetch_document, ExtractError, Pipeline, PipelineConfig, RawDocument, RecordKind, ShapeHint,
};

#[derive(Parser)]
#[command(
    name = "showtime-parser",
    about = "Extract title lists, cinema showtimes and title details from fetched pages"
)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "url"])))]
struct Cli {
    /// Record kind: title-list, venue-listing or item-detail
    kind: RecordKind,

    /// Read the document from a local file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Fetch the document over HTTP
    #[arg(short, long)]
    url: Option<String>,

    /// Document shape: markup-tree or embedded-structured-value
    #[arg(short, long, default_value = "markup-tree")]
    shape: ShapeHint,

    /// JSON file overriding the built-in selector chains
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pretty-print the envelope
    #[arg(long)]
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match PipelineConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => PipelineConfig::default(),
    };

    let pipeline = match Pipeline::new(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let fetched = match (&cli.file, &cli.url) {
        (Some(path), _) => std::fs::read(path)
            .map(|bytes| RawDocument::new(bytes, cli.shape))
            .map_err(|e| {
                ExtractError::transport(format!("failed to read {}: {}", path.display(), e))
            }),
        (None, Some(url)) => fetch_document(url, &config.fetch, cli.shape),
        (None, None) => Err(ExtractError::Config {
            message: "either --file or --url is required".to_string(),
        }),
    };

    let envelope = pipeline.respond(fetched, cli.kind);
    let json = if cli.pretty {
        serde_json::to_string_pretty(&envelope)
    } else {
        serde_json::to_string(&envelope)
    };

    match json {
        Ok(json) => {
            println!("{}", json);
            if envelope.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("Failed to serialize envelope: {}", e);
            ExitCode::FAILURE
        }
    }
}
