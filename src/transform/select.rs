use tracing::trace;

use super::candidates::CandidateTable;
use crate::model::{ParamId, ProgramModel, TemplateArgument, UseSite};
use crate::span::Span;

/// The use site chosen for rewriting.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// 1-based position among selectable use sites.
    pub ordinal: usize,
    pub param: ParamId,
    pub span: Span,
    pub argument: TemplateArgument,
}

/// Running state of one walk over the use sites.
#[derive(Debug, Default)]
pub struct SelectionState {
    /// Selectable use sites seen so far.
    pub count: usize,
    pub selection: Option<Selection>,
}

impl SelectionState {
    fn observe(&mut self, site: &UseSite, param: ParamId, argument: &TemplateArgument, target: usize) {
        self.count += 1;
        if self.count == target && self.selection.is_none() {
            trace!(ordinal = self.count, start = site.span.start, end = site.span.end, "selected");
            self.selection = Some(Selection {
                ordinal: self.count,
                param,
                span: site.span,
                argument: argument.clone(),
            });
        }
    }
}

/// Visits every use site in textual order, counting those whose parameter
/// has a unified argument and capturing the `target`-th.
pub fn walk<M: ProgramModel + ?Sized>(model: &M, table: &CandidateTable, target: usize, state: &mut SelectionState) {
    for site in model.use_sites() {
        let Some(param) = site.param.class_param() else { continue };
        let Some(argument) = table.get(param) else { continue };
        state.observe(site, param, argument, target);
    }
}

pub fn select<M: ProgramModel + ?Sized>(model: &M, table: &CandidateTable, target: usize) -> Option<Selection> {
    let mut state = SelectionState::default();
    walk(model, table, target, &mut state);
    state.selection
}

/// Number of selectable use sites; the walk runs with a target no count reaches.
pub fn count<M: ProgramModel + ?Sized>(model: &M, table: &CandidateTable) -> usize {
    let mut state = SelectionState::default();
    walk(model, table, usize::MAX, &mut state);
    state.count
}
