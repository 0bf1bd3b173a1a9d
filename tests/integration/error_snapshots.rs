//! Snapshot tests for user-facing error messages.
//!
//! Run `cargo insta review` after an intentional wording change.

mod common;

use std::path::Path;

use cxxreduce::buffer::SourceBuffer;
use cxxreduce::config::{Overrides, PassConfig};
use cxxreduce::model::CxxProgram;
use cxxreduce::span::Span;
use insta::assert_snapshot;

fn analysis_error(source: &str) -> String {
    CxxProgram::analyze(source).unwrap_err().to_string()
}

#[test]
fn unexpected_character() {
    assert_snapshot!(analysis_error("int x = @;"), @"Syntax error: unexpected character '@'");
}

#[test]
fn builtin_used_as_scope() {
    assert_snapshot!(
        analysis_error("typedef typename int::type X;"),
        @"Syntax error: 'int' cannot be used prior to '::' because it has no members"
    );
}

#[test]
fn instance_out_of_range() {
    let (result, _) = common::run_pass("template <class T> struct Box { T v; }; Box<int> b;", 4, false);
    assert_snapshot!(result.unwrap_err().to_string(), @"instance 4 requested but only 1 available");
}

#[test]
fn rewrite_broke_the_program() {
    let (result, _) = common::run_pass("template <class T> struct Box { typename T::type v; }; Box<int> *p;", 1, false);
    assert_snapshot!(result.unwrap_err().to_string(), @"internal error: the rewrite introduced 1 new diagnostic(s)");
}

#[test]
fn zero_counter() {
    let overrides = Overrides { counter: Some(0), ..Overrides::default() };
    let err = PassConfig::resolve(None, overrides).unwrap_err();
    assert_snapshot!(err.to_string(), @"counter must be at least 1 (instances are numbered from 1)");
}

#[test]
fn unknown_transformation() {
    let mut buffer = SourceBuffer::new("int x;");
    let config = PassConfig { transformation: "rename-var".to_string(), ..PassConfig::default() };
    let err = cxxreduce::run_pass(&mut buffer, &config).unwrap_err();
    assert_snapshot!(
        err.to_string(),
        @"unknown transformation 'rename-var' (available: substitute-class-template-param)"
    );
}

#[test]
fn unreadable_config_file() {
    let err = PassConfig::load(Path::new("/nonexistent/reduce.toml")).unwrap_err();
    let text = err.to_string();
    let (prefix, _) = text.split_at(text.find(": could not").unwrap());
    assert_snapshot!(prefix, @"/nonexistent/reduce.toml");
}

#[test]
fn second_edit_is_refused() {
    let mut buffer = SourceBuffer::new("int x;");
    buffer.replace(Span::new(0, 3), "long").unwrap();
    let err = buffer.replace(Span::new(4, 5), "y").unwrap_err();
    assert_snapshot!(err.to_string(), @"buffer was already edited at 0..4");
}
