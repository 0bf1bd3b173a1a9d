use crate::config::ConfigError;
use crate::span::Span;
use crate::transform::TransformError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("Syntax error: {msg}")]
    Syntax { msg: String, span: Span },

    #[error("I/O error: {msg}")]
    Io { msg: String, path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

impl ReduceError {
    pub fn syntax(msg: impl Into<String>, span: Span) -> Self {
        Self::Syntax { msg: msg.into(), span }
    }

    pub fn io(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Io { msg: msg.into(), path }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Syntax { span, .. } => Some(*span),
            _ => None,
        }
    }
}

/// A non-fatal problem the program model found in a translation unit.
/// Collected rather than raised so the post-edit check can report all of them.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    pub msg: String,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(msg: impl Into<String>, span: Span) -> Self {
        Self { msg: msg.into(), span }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}..{}", self.msg, self.span.start, self.span.end)
    }
}

/// Render a ReduceError with ariadne for nice terminal output.
pub fn render_error(source: &str, filename: &str, err: &ReduceError) {
    match err {
        ReduceError::Syntax { msg, span } => render_labelled(source, filename, "syntax error", msg, *span),
        ReduceError::Transform(TransformError::PostEditInternal { diagnostics }) => {
            eprintln!("error: {err}");
            for d in diagnostics {
                render_labelled(source, filename, "post-edit diagnostic", &d.msg, d.span);
            }
        }
        ReduceError::Io { msg, path } => {
            eprintln!("error: {msg}");
            eprintln!("  --> {}", path.display());
        }
        ReduceError::Config(_) | ReduceError::Transform(_) => {
            eprintln!("error: {err}");
        }
    }
}

fn render_labelled(source: &str, filename: &str, title: &str, msg: &str, span: Span) {
    use ariadne::{Label, Report, ReportKind, Source};

    // Post-edit spans refer to the edited text, which may be shorter.
    let end = span.end.min(source.len());
    let start = span.start.min(end);
    let printed = Report::build(ReportKind::Error, (), start)
        .with_message(format!("{title} in {filename}"))
        .with_label(Label::new(start..end).with_message(msg))
        .finish()
        .eprint(Source::from(source));
    if printed.is_err() {
        eprintln!("error: {msg}");
    }
}
