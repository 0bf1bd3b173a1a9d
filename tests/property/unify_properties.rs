// Unification against a hand-built model, independent of the C++ front end.

use cxxreduce::diagnostics::Diagnostic;
use cxxreduce::model::{
    CanonType, ClassTemplate, ParamKind, ProgramModel, Specialization, TemplateArgument, TemplateDeclRef,
    TemplateId, TemplateParamInfo, UseSite,
};
use cxxreduce::parser::ast::BuiltinType;
use cxxreduce::span::Span;
use cxxreduce::transform::unify::unify;
use proptest::prelude::*;

const POOL: [BuiltinType; 4] = [BuiltinType::Int, BuiltinType::Char, BuiltinType::Double, BuiltinType::Bool];

struct TableModel {
    template: ClassTemplate,
}

impl TableModel {
    fn new(arity: usize, rows: &[Vec<usize>]) -> Self {
        let params = (0..arity)
            .map(|i| TemplateParamInfo { name: Some(format!("P{i}")), kind: ParamKind::Type, is_pack: false })
            .collect();
        let mut template = ClassTemplate::new("T", params);
        for row in rows {
            let args = row.iter().map(|&k| TemplateArgument::Type(CanonType::Builtin(POOL[k]))).collect();
            template.specializations.push(Specialization { args, span: Span::dummy() });
        }
        Self { template }
    }
}

impl ProgramModel for TableModel {
    fn source(&self) -> &str {
        ""
    }

    fn template_decls(&self) -> &[TemplateDeclRef] {
        &[]
    }

    fn template(&self, _id: TemplateId) -> &ClassTemplate {
        &self.template
    }

    fn use_sites(&self) -> &[UseSite] {
        &[]
    }

    fn check_edit(&self, _edited: &str) -> Vec<Diagnostic> {
        Vec::new()
    }
}

fn rows(arity: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(0..POOL.len(), arity), 0..6)
}

proptest! {
    #[test]
    fn unifies_exactly_when_all_rows_agree((arity, rows) in (1usize..4).prop_flat_map(|a| (Just(a), rows(a)))) {
        let model = TableModel::new(arity, &rows);
        for index in 0..arity {
            let agreed = !rows.is_empty() && rows.iter().all(|r| r[index] == rows[0][index]);
            let result = unify(&model, TemplateId(0), index);
            prop_assert_eq!(result.is_some(), agreed);
            if let Some(arg) = result {
                prop_assert_eq!(arg, TemplateArgument::Type(CanonType::Builtin(POOL[rows[0][index]])));
            }
        }
    }

    #[test]
    fn order_of_specializations_does_not_matter((arity, rows) in (1usize..4).prop_flat_map(|a| (Just(a), rows(a)))) {
        let forward = TableModel::new(arity, &rows);
        let reversed: Vec<Vec<usize>> = rows.iter().rev().cloned().collect();
        let backward = TableModel::new(arity, &reversed);
        for index in 0..arity {
            prop_assert_eq!(unify(&forward, TemplateId(0), index), unify(&backward, TemplateId(0), index));
        }
    }
}
