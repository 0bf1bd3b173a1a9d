use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use super::unify::unify;
use crate::model::{ParamId, ProgramModel, TemplateArgument};

/// Unified type arguments keyed by parameter identity. Filled once by
/// [`build`] and only read afterwards.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CandidateTable {
    entries: HashMap<ParamId, TemplateArgument>,
}

impl CandidateTable {
    pub fn get(&self, param: ParamId) -> Option<&TemplateArgument> {
        self.entries.get(&param)
    }

    pub fn contains(&self, param: ParamId) -> bool {
        self.entries.contains_key(&param)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn record(&mut self, param: ParamId, arg: TemplateArgument) {
        match self.entries.entry(param) {
            Entry::Vacant(slot) => {
                slot.insert(arg);
            }
            Entry::Occupied(_) => trace!(?param, "already recorded"),
        }
    }
}

/// Checks each class template once, however many times it is declared, and
/// records the parameters whose specializations agree on a type.
pub fn build<M: ProgramModel + ?Sized>(model: &M) -> CandidateTable {
    let mut seen = HashSet::new();
    let mut table = CandidateTable::default();

    for decl in model.template_decls() {
        let id = model.canonical(decl);
        if !seen.insert(id) {
            trace!(template = %model.template(id).name, "redeclaration skipped");
            continue;
        }
        let template = model.template(id);
        for index in 0..template.params.len() {
            match unify(model, id, index) {
                Some(arg @ TemplateArgument::Type(_)) => {
                    debug!(template = %template.name, index, argument = %model.render(&arg), "parameter unifies");
                    table.record(ParamId { template: id, index }, arg);
                }
                Some(other) => {
                    debug!(template = %template.name, index, kind = other.kind_name(), "unified argument is not a type");
                }
                None => trace!(template = %template.name, index, "parameter does not unify"),
            }
        }
    }

    debug!(candidates = table.len(), "candidate table built");
    table
}
