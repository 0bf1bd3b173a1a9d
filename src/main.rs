use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, ValueEnum};
use serde_json::json;

use cxxreduce::buffer::SourceBuffer;
use cxxreduce::config::{Overrides, PassConfig};
use cxxreduce::diagnostics::{ReduceError, render_error};
use cxxreduce::line_index::LineIndex;
use cxxreduce::transform::{PassOutcome, TransformError, registry};

#[derive(Parser)]
#[command(name = "cxxreduce", version, about = "Single-step C++ test-case reduction passes")]
struct Cli {
    /// C++ translation unit to transform
    #[arg(required_unless_present = "list_transformations")]
    file: Option<PathBuf>,

    /// Pass to run
    #[arg(long)]
    transformation: Option<String>,

    /// Which instance to rewrite, counting from 1
    #[arg(long)]
    counter: Option<usize>,

    /// Print the number of available instances instead of rewriting
    #[arg(long)]
    query_instances: bool,

    /// Write the rewritten program here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML file with a [pass] section; command-line flags win
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// List registered transformations and exit
    #[arg(long)]
    list_transformations: bool,

    /// -v for debug logs, -vv for trace
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_max_level(level)
        .init();
}

/// 1 mirrors the "no such instance" status reducers already check for.
fn exit_code(err: &ReduceError) -> i32 {
    match err {
        ReduceError::Transform(TransformError::OutOfRange { .. }) => 1,
        ReduceError::Transform(_) => 3,
        ReduceError::Syntax { .. } | ReduceError::Io { .. } | ReduceError::Config(_) => 2,
    }
}

fn error_kind(err: &ReduceError) -> &'static str {
    match err {
        ReduceError::Syntax { .. } => "syntax",
        ReduceError::Io { .. } => "io",
        ReduceError::Config(_) => "config",
        ReduceError::Transform(TransformError::OutOfRange { .. }) => "out_of_range",
        ReduceError::Transform(TransformError::NoEligibleOccurrence { .. }) => "no_eligible_occurrence",
        ReduceError::Transform(TransformError::PostEditInternal { .. }) => "post_edit_internal",
        ReduceError::Transform(TransformError::Buffer(_)) => "buffer",
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list_transformations {
        for (name, description) in registry::available() {
            println!("{name}: {description}");
        }
        return;
    }
    let Some(file) = cli.file.clone() else {
        eprintln!("error: no input file");
        std::process::exit(2);
    };
    std::process::exit(run(&cli, &file));
}

fn run(cli: &Cli, file: &Path) -> i32 {
    let overrides = Overrides {
        transformation: cli.transformation.clone(),
        counter: cli.counter,
        query_instances: cli.query_instances,
    };
    let config = match PassConfig::resolve(cli.config.as_deref(), overrides) {
        Ok(config) => config,
        Err(err) => return report_error(cli, file, "", &err.into()),
    };
    let source = match std::fs::read_to_string(file) {
        Ok(source) => source,
        Err(e) => {
            let err = ReduceError::io(format!("could not read {}: {e}", file.display()), file.to_path_buf());
            return report_error(cli, file, "", &err);
        }
    };

    let mut buffer = SourceBuffer::new(source.clone());
    match cxxreduce::run_pass(&mut buffer, &config) {
        Ok(outcome) => report_success(cli, file, &config, &source, &outcome, buffer),
        // A failure after the edit (the post-edit check) points into the edited text.
        Err(err) if buffer.is_modified() => report_error(cli, file, buffer.text(), &err),
        Err(err) => report_error(cli, file, &source, &err),
    }
}

fn report_success(
    cli: &Cli,
    file: &Path,
    config: &PassConfig,
    source: &str,
    outcome: &PassOutcome,
    buffer: SourceBuffer,
) -> i32 {
    let rewritten = match outcome {
        PassOutcome::Count { .. } => None,
        PassOutcome::Rewritten { .. } => Some(buffer.into_string()),
    };
    if let (Some(text), Some(path)) = (&rewritten, &cli.output) {
        if let Err(e) = std::fs::write(path, text) {
            let err = ReduceError::io(format!("could not write {}: {e}", path.display()), path.clone());
            return report_error(cli, file, source, &err);
        }
    }

    match cli.format {
        Format::Text => match outcome {
            PassOutcome::Count { instances } => println!("Available transformation instances: {instances}"),
            PassOutcome::Rewritten { .. } => {
                if cli.output.is_none() {
                    print!("{}", rewritten.unwrap_or_default());
                }
            }
        },
        Format::Json => {
            let location = match outcome {
                PassOutcome::Rewritten { span, .. } => Some(LineIndex::new(source).location(span.start)),
                PassOutcome::Count { .. } => None,
            };
            let output = if cli.output.is_some() { None } else { rewritten };
            let report = json!({
                "status": "ok",
                "file": file.display().to_string(),
                "config": config,
                "result": outcome,
                "location": location,
                "output": output,
            });
            println!("{report}");
        }
    }
    0
}

fn report_error(cli: &Cli, file: &Path, source: &str, err: &ReduceError) -> i32 {
    match cli.format {
        Format::Text => render_error(source, &file.display().to_string(), err),
        Format::Json => {
            let index = LineIndex::new(source);
            let diagnostics: Vec<serde_json::Value> = match err {
                ReduceError::Transform(TransformError::PostEditInternal { diagnostics }) => diagnostics
                    .iter()
                    .map(|d| json!({ "message": d.msg, "span": d.span, "location": index.location(d.span.start) }))
                    .collect(),
                _ => Vec::new(),
            };
            let report = json!({
                "status": "error",
                "file": file.display().to_string(),
                "kind": error_kind(err),
                "message": err.to_string(),
                "location": err.span().map(|s| index.location(s.start)),
                "diagnostics": diagnostics,
            });
            println!("{report}");
        }
    }
    exit_code(err)
}
