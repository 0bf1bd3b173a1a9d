#![allow(dead_code)]

use std::path::Path;
use std::process::Command;

use cxxreduce::buffer::SourceBuffer;
use cxxreduce::config::PassConfig;
use cxxreduce::diagnostics::ReduceError;
use cxxreduce::transform::PassOutcome;

pub fn cxxreduce() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cxxreduce"))
}

/// Output of one run of the binary.
#[derive(Debug)]
pub struct Run {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Writes `source` to a temp file and runs the binary on it with `args`.
pub fn run_binary(source: &str, args: &[&str]) -> Run {
    let dir = tempfile::tempdir().unwrap();
    let src_path = dir.path().join("input.cc");
    std::fs::write(&src_path, source).unwrap();
    run_binary_on(&src_path, args)
}

pub fn run_binary_on(path: &Path, args: &[&str]) -> Run {
    let output = cxxreduce().arg(path).args(args).output().unwrap();
    Run {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Runs the pass in-process; returns the outcome and the buffer afterwards.
pub fn run_pass(source: &str, counter: usize, query: bool) -> (Result<PassOutcome, ReduceError>, String) {
    let mut buffer = SourceBuffer::new(source);
    let config = PassConfig { counter, query_instances: query, ..PassConfig::default() };
    let result = cxxreduce::run_pass(&mut buffer, &config);
    (result, buffer.into_string())
}

pub fn count(source: &str) -> usize {
    match run_pass(source, 1, true).0 {
        Ok(PassOutcome::Count { instances }) => instances,
        other => panic!("count query failed: {other:?}"),
    }
}

/// Rewrites instance `counter`, panicking on any failure.
pub fn rewrite(source: &str, counter: usize) -> String {
    let (result, text) = run_pass(source, counter, false);
    match result {
        Ok(PassOutcome::Rewritten { .. }) => text,
        other => panic!("rewrite {counter} failed: {other:?}"),
    }
}
