//! The substitute-class-template-param pass.
//!
//! One run replaces a single use of a class-template type parameter with the
//! type every specialization of the template passes for it. Runs are
//! numbered: the reducer asks how many rewrites exist (`query_instances`),
//! then applies them one ordinal at a time, retesting in between.
//!
//! The pass is two walks over a closed table. `candidates::build` looks at
//! every specialization of every template before `select` looks at a single
//! use site, since a use early in the file may belong to a template whose
//! disagreeing specialization appears at the end.

pub mod candidates;
pub mod registry;
pub mod rewrite;
pub mod select;
pub mod unify;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, trace};

use crate::buffer::{BufferError, SourceBuffer};
use crate::config::PassConfig;
use crate::diagnostics::Diagnostic;
use crate::model::ProgramModel;
use crate::span::Span;
pub use registry::Transformation;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("instance {requested} requested but only {available} available")]
    OutOfRange { requested: usize, available: usize },

    /// Counting and selecting disagreed; never expected.
    #[error("internal error: no eligible occurrence for instance {requested}")]
    NoEligibleOccurrence { requested: usize },

    /// The buffer holds the edit; the caller should discard it.
    #[error("internal error: the rewrite introduced {} new diagnostic(s)", diagnostics.len())]
    PostEditInternal { diagnostics: Vec<Diagnostic> },

    #[error(transparent)]
    Buffer(#[from] BufferError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PassOutcome {
    Count {
        instances: usize,
    },
    Rewritten {
        instance: usize,
        /// Range of the replaced use site in the original text.
        span: Span,
        original: String,
        replacement: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PassState {
    Idle,
    Counting,
    Selecting,
    Rewriting,
    PostCheck,
    Done,
    Failed,
}

pub struct SubstituteClassTemplateParam {
    state: PassState,
}

impl Default for SubstituteClassTemplateParam {
    fn default() -> Self {
        Self::new()
    }
}

impl SubstituteClassTemplateParam {
    pub const NAME: &'static str = "substitute-class-template-param";
    pub const DESCRIPTION: &'static str = "This pass tries to replace template arguments with types used in code";

    pub fn new() -> Self {
        Self { state: PassState::Idle }
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    fn enter(&mut self, next: PassState) {
        trace!(from = ?self.state, to = ?next, "pass state");
        self.state = next;
    }

    fn fail(&mut self, err: TransformError) -> Result<PassOutcome, TransformError> {
        self.enter(PassState::Failed);
        Err(err)
    }

    fn run(
        &mut self,
        program: &dyn ProgramModel,
        buffer: &mut SourceBuffer,
        config: &PassConfig,
    ) -> Result<PassOutcome, TransformError> {
        self.enter(PassState::Counting);
        let table = candidates::build(program);
        let available = select::count(program, &table);
        debug!(available, "selectable use sites");

        if config.query_instances {
            self.enter(PassState::Done);
            return Ok(PassOutcome::Count { instances: available });
        }
        if config.counter > available {
            info!(requested = config.counter, available, "instance out of range");
            return self.fail(TransformError::OutOfRange { requested: config.counter, available });
        }

        self.enter(PassState::Selecting);
        let Some(selection) = select::select(program, &table, config.counter) else {
            error!(requested = config.counter, available, "selection disagrees with count");
            return self.fail(TransformError::NoEligibleOccurrence { requested: config.counter });
        };

        self.enter(PassState::Rewriting);
        let original = selection.span.text(program.source()).to_string();
        let replacement = match rewrite::apply(program, &selection, buffer) {
            Ok(text) => text,
            Err(err) => return self.fail(err.into()),
        };

        self.enter(PassState::PostCheck);
        let diagnostics = program.check_edit(buffer.text());
        if !diagnostics.is_empty() {
            for d in &diagnostics {
                debug!(msg = %d.msg, "post-edit diagnostic");
            }
            return self.fail(TransformError::PostEditInternal { diagnostics });
        }

        self.enter(PassState::Done);
        Ok(PassOutcome::Rewritten { instance: selection.ordinal, span: selection.span, original, replacement })
    }
}

impl Transformation for SubstituteClassTemplateParam {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn description(&self) -> &'static str {
        Self::DESCRIPTION
    }

    fn transform(
        &mut self,
        program: &dyn ProgramModel,
        buffer: &mut SourceBuffer,
        config: &PassConfig,
    ) -> Result<PassOutcome, TransformError> {
        self.state = PassState::Idle;
        self.run(program, buffer, config)
    }
}
