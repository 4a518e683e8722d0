//! CLI command implementations
//!
//! Every command reads batch requests as JSON from stdin and writes one JSON
//! response per request to stdout. A request names one data source and the
//! descriptors to load from it:
//!
//! ```json
//! {"source": "library", "collection": "books", "queries": [{"find": {"author": "a1"}}]}
//! ```
//!
//! A line may also hold an array of such requests; all of them are resolved
//! in the same dispatch.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::loader::{BatchError, DispatchResults, LoaderConfig, LoaderRegistry, Ticket};
use crate::observability::{init_logging, LogFormat};
use crate::pipeline::{BatchMerger, ExplainPipeline};
use crate::query::{DataSourceId, QueryDescriptor};
use crate::store::{AggregateStore, InMemoryStore};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, read_requests, write_error, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// JSON data file backing the in-memory store (required)
    pub data_file: String,

    /// Log filter directive (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log line format (optional, default "text")
    #[serde(default)]
    pub log_format: LogFormat,

    /// Loader tuning (optional)
    #[serde(default)]
    pub loader: LoaderConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_file.trim().is_empty() {
            return Err(CliError::config_error("data_file must not be empty"));
        }
        self.loader.validate()?;
        Ok(())
    }

    /// Data file path
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_file)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRequest {
    source: String,
    collection: String,
    #[serde(default)]
    queries: Vec<Value>,
}

/// One parsed batch request
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub source: DataSourceId,
    pub queries: Vec<QueryDescriptor>,
}

impl BatchRequest {
    /// Parses a request line: either one request object or an array of them
    pub fn parse_all(value: Value) -> CliResult<Vec<BatchRequest>> {
        match value {
            Value::Array(items) => items.into_iter().map(Self::parse).collect(),
            other => Ok(vec![Self::parse(other)?]),
        }
    }

    fn parse(value: Value) -> CliResult<BatchRequest> {
        let raw: RawRequest = serde_json::from_value(value)
            .map_err(|e| CliError::request_invalid(format!("Invalid batch request: {}", e)))?;
        let queries = raw
            .queries
            .iter()
            .map(QueryDescriptor::from_document)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(BatchRequest {
            source: DataSourceId::new(raw.source, raw.collection),
            queries,
        })
    }
}

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Explain { config } => explain(&config),
        Command::Load { config } => load(&config),
        Command::Serve { config } => serve(&config),
    }
}

/// Print the merged pipelines for one request without executing them.
///
/// When `loader.max_batch_size` is set, larger batches are shown chunk by chunk,
/// exactly as `load` would submit them.
pub fn explain(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let requests = BatchRequest::parse_all(read_request()?)?;

    write_response(explain_requests(&requests, &config.loader))
}

/// Builds explain output for a list of requests
pub fn explain_requests(requests: &[BatchRequest], loader: &LoaderConfig) -> Value {
    let batches: Vec<Value> = requests
        .iter()
        .map(|request| {
            let pipelines: Vec<Value> = request
                .queries
                .chunks(loader.chunk_size(request.queries.len()))
                .map(|chunk| match BatchMerger::merge(chunk) {
                    Ok(merged) => ExplainPipeline::from_pipeline(&merged).to_json(),
                    Err(err) => ExplainPipeline::from_error(&err).to_json(),
                })
                .collect();
            json!({
                "source": request.source.source,
                "collection": request.source.collection,
                "pipelines": pipelines,
            })
        })
        .collect();

    json!({ "batches": batches })
}

/// Load one request from stdin against the configured data file
pub fn load(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    init_logging(&config.log_level, config.log_format);

    let store: Arc<dyn AggregateStore> = Arc::new(InMemoryStore::load_file(&config.data_path())?);
    let requests = BatchRequest::parse_all(read_request()?)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime_failed(format!("Failed to create tokio runtime: {}", e)))?;

    let data = rt.block_on(resolve(store, &config.loader, &requests))?;
    write_response(data)
}

/// Load requests line by line until stdin closes.
///
/// Each line is its own resolution context with a fresh registry; the store
/// is shared. A bad line produces an error response and serving continues.
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    init_logging(&config.log_level, config.log_format);

    let store: Arc<dyn AggregateStore> = Arc::new(InMemoryStore::load_file(&config.data_path())?);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime_failed(format!("Failed to create tokio runtime: {}", e)))?;

    tracing::info!(data_file = %config.data_file, "serving batch requests from stdin");

    for line in read_requests() {
        let outcome = line
            .and_then(BatchRequest::parse_all)
            .and_then(|requests| {
                rt.block_on(resolve(Arc::clone(&store), &config.loader, &requests))
            });

        match outcome {
            Ok(data) => write_response(data)?,
            Err(e) => write_error(&e)?,
        }
    }

    Ok(())
}

/// Enqueues every query of every request in one registry, dispatches once,
/// and shapes the results like the input.
pub async fn resolve(
    store: Arc<dyn AggregateStore>,
    loader: &LoaderConfig,
    requests: &[BatchRequest],
) -> CliResult<Value> {
    let registry = LoaderRegistry::with_config(store, loader.clone())?;

    let tickets: Vec<Vec<Ticket>> = requests
        .iter()
        .map(|request| {
            request
                .queries
                .iter()
                .map(|query| registry.enqueue(request.source.clone(), query.clone()))
                .collect()
        })
        .collect();

    let results = registry.dispatch().await;

    let batches: Vec<Value> = requests
        .iter()
        .zip(&tickets)
        .map(|(request, tickets)| batch_response(request, tickets, &results))
        .collect();

    Ok(json!({
        "batches": batches,
        "metrics": registry.metrics().snapshot(),
    }))
}

fn batch_response(request: &BatchRequest, tickets: &[Ticket], results: &DispatchResults) -> Value {
    let collected: Result<Vec<Value>, BatchError> = tickets
        .iter()
        .map(|ticket| results.get(ticket).map(|docs| Value::Array(docs.to_vec())))
        .collect();

    let mut response = json!({
        "source": request.source.source,
        "collection": request.source.collection,
    });
    match collected {
        Ok(rows) => response["results"] = Value::Array(rows),
        Err(err) => {
            response["error"] = json!({
                "code": err.code(),
                "message": err.to_string(),
            })
        }
    }
    response
}
