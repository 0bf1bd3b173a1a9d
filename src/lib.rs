pub mod buffer;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod line_index;
pub mod model;
pub mod parser;
pub mod span;
pub mod transform;
pub mod visit;

use std::path::Path;

use tracing::info;

use buffer::SourceBuffer;
use config::PassConfig;
use diagnostics::ReduceError;
use model::CxxProgram;
use transform::PassOutcome;

/// Runs the configured pass once over the buffer's text (lex → parse →
/// model → pass). On success the buffer holds the rewritten program, or is
/// untouched for a count query. On a post-edit failure the buffer keeps the
/// rejected edit so the caller can show it.
pub fn run_pass(buffer: &mut SourceBuffer, config: &PassConfig) -> Result<PassOutcome, ReduceError> {
    let mut pass = transform::registry::lookup(&config.transformation)?;
    let program = CxxProgram::analyze(buffer.text())?;
    info!(
        transformation = pass.name(),
        counter = config.counter,
        query = config.query_instances,
        templates = program.templates().len(),
        "running pass"
    );
    Ok(pass.transform(&program, buffer, config)?)
}

/// Reads `path` and runs the pass over it, returning the outcome and the
/// resulting text.
pub fn run_file(path: &Path, config: &PassConfig) -> Result<(PassOutcome, String), ReduceError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| ReduceError::io(format!("could not read {}: {e}", path.display()), path.to_path_buf()))?;
    let mut buffer = SourceBuffer::new(source);
    let outcome = run_pass(&mut buffer, config)?;
    Ok((outcome, buffer.into_string()))
}
