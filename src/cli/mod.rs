use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::debug;

use crate::config::{RunConfig, SchemaFormat, SchemaSource};
use crate::error::CheckError;
use crate::executor::{EngineExecutor, QuerySpec, introspect};
use crate::loader::load_schema;
use crate::mock::{DEFAULT_LIST_LENGTH, MockOptions};
use crate::sdl::render_sdl;
use crate::workflow;

mod fetch;
mod render;
use render::{report_failure, report_outcome};

#[derive(Debug, Clone, Copy, ValueEnum, Serialize, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Pretty,
    Table,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

/// Checks that a GraphQL query is valid against a schema by executing it.
///
/// Without a subcommand the query is validated: the result is printed as
/// `SUCCESS <payload>` or `ERROR <payload>` and the exit code is 0 or 1.
#[derive(Debug, Clone, Parser)]
#[command(name = "gqlcheck")]
#[command(about = "Validate GraphQL queries against SDL or introspection schemas", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub schema: SchemaArgs,

    #[command(flatten)]
    pub query: QueryArgs,

    #[command(flatten)]
    pub mock: MockArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json, global = true)]
    pub output: OutputFormat,

    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    pub color: ColorMode,

    /// Log loader, mock and executor steps to stderr.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Validate the query (the default).
    Validate,
    /// Print the introspection capture of the loaded schema.
    Introspect,
    /// Print the loaded schema as SDL.
    PrintSdl,
    /// Capture the schema of a live endpoint via introspection.
    Fetch(FetchArgs),
    Version,
}

#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {
    /// SDL text or a JSON introspection capture.
    #[arg(long, global = true, env = "SCHEMA_STRING", conflicts_with = "schema_file")]
    pub schema: Option<String>,

    #[arg(long, global = true, env = "SCHEMA_FILE")]
    pub schema_file: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        env = "SCHEMA_FORMAT",
        default_value_t = SchemaFormat::Auto
    )]
    pub schema_format: SchemaFormat,
}

#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    #[arg(long, global = true, env = "QUERY_STRING", conflicts_with = "query_file")]
    pub query: Option<String>,

    #[arg(long, global = true, env = "QUERY_FILE")]
    pub query_file: Option<PathBuf>,

    /// Variable values as a JSON object.
    #[arg(long, global = true, env = "QUERY_VARIABLES")]
    pub variables: Option<String>,

    /// Operation to run when the document has several.
    #[arg(long, global = true, env = "OPERATION_NAME")]
    pub operation_name: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct MockArgs {
    /// Execute SDL schemas without placeholder resolvers.
    #[arg(long, global = true, env = "GQLCHECK_NO_MOCK", default_value_t = false)]
    pub no_mock: bool,

    /// Placeholder overrides per scalar, e.g. `{"DateTime": "2024-01-01T00:00:00Z"}`.
    #[arg(long, global = true, env = "GQLCHECK_MOCK_SCALARS")]
    pub mock_scalars: Option<String>,

    #[arg(long, global = true, default_value_t = DEFAULT_LIST_LENGTH)]
    pub mock_list_length: usize,
}

#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    #[arg(long, env = "GQLCHECK_ENDPOINT")]
    pub endpoint: Option<String>,

    #[arg(long, env = "GQLCHECK_TOKEN")]
    pub token: Option<String>,

    #[arg(long, env = "GQLCHECK_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Read the bearer token from a hidden prompt.
    #[arg(long, default_value_t = false, conflicts_with_all = ["token", "token_file"])]
    pub prompt_token: bool,

    /// Extra request header, `Name: value` (repeatable).
    #[arg(long = "header", value_name = "NAME:VALUE")]
    pub headers: Vec<String>,

    /// Write the capture to a file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    #[arg(long, env = "GQLCHECK_FIXTURES_DIR", hide = true)]
    pub fixtures_dir: Option<PathBuf>,
}

/// Runs the selected command and returns the process exit code.
pub fn run(cli: Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Some(Command::Version) => {
            println!("gqlcheck {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
        Some(Command::Fetch(args)) => fetch::run_fetch(args),
        Some(Command::Introspect) => {
            let capture = schema_source(&cli.schema)
                .and_then(|source| load_schema(&source))
                .and_then(|artifact| introspect(&EngineExecutor, &artifact));
            match capture {
                Ok(capture) => {
                    println!("{}", serde_json::to_string_pretty(&capture)?);
                    Ok(0)
                }
                Err(err) => report_failure(&cli, &err),
            }
        }
        Some(Command::PrintSdl) => {
            match schema_source(&cli.schema).and_then(|source| load_schema(&source)) {
                Ok(artifact) => {
                    print!("{}", render_sdl(artifact.model()));
                    Ok(0)
                }
                Err(err) => report_failure(&cli, &err),
            }
        }
        Some(Command::Validate) | None => {
            let outcome =
                run_config(&cli).and_then(|config| workflow::validate(&config, &EngineExecutor));
            report_outcome(&cli, outcome)
        }
    }
}

/// Collects every validation input once, before anything is parsed or executed.
pub fn run_config(cli: &Cli) -> Result<RunConfig, CheckError> {
    let schema = schema_source(&cli.schema)?;

    let document = match (&cli.query.query, &cli.query.query_file) {
        (Some(q), _) => q.clone(),
        (None, Some(path)) => read_input(path, "query")?,
        (None, None) => {
            return Err(CheckError::Config(
                "no query given; pass --query or --query-file (or set QUERY_STRING)".into(),
            ));
        }
    };
    let mut query = QuerySpec::new(document);
    if let Some(text) = cli.query.variables.as_deref() {
        query = query.with_variables(QuerySpec::parse_variables(text)?);
    }
    if let Some(name) = cli.query.operation_name.as_deref() {
        query = query.with_operation_name(name);
    }

    let mock = MockOptions {
        enabled: !cli.mock.no_mock,
        scalars: match cli.mock.mock_scalars.as_deref() {
            Some(text) => MockOptions::parse_scalar_overrides(text)?,
            None => Default::default(),
        },
        list_length: cli.mock.mock_list_length,
    };

    debug!(mock = mock.enabled, "collected run configuration");
    Ok(RunConfig {
        schema,
        query,
        mock,
    })
}

fn schema_source(args: &SchemaArgs) -> Result<SchemaSource, CheckError> {
    let text = match (&args.schema, &args.schema_file) {
        (Some(s), _) => s.clone(),
        (None, Some(path)) => read_input(path, "schema")?,
        (None, None) => {
            return Err(CheckError::Config(
                "no schema given; pass --schema or --schema-file (or set SCHEMA_STRING)".into(),
            ));
        }
    };
    Ok(SchemaSource::from_text(text, args.schema_format))
}

fn read_input(path: &Path, what: &str) -> Result<String, CheckError> {
    fs::read_to_string(path)
        .with_context(|| format!("reading {what} file {}", path.display()))
        .map_err(|e| CheckError::Config(format!("{e:#}")))
}

fn should_color(cli: &Cli) -> bool {
    match cli.color {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stdout().is_terminal(),
    }
}
