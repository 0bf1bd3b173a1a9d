use crate::model::{ProgramModel, TemplateArgument, TemplateId};

/// The argument every specialization of `template` passes at `index`, if
/// they all agree. A template with no specializations has nothing to agree
/// on; one specialization always agrees with itself.
///
/// # Panics
///
/// If `index` is not a parameter position of the template.
pub fn unify<M: ProgramModel + ?Sized>(model: &M, template: TemplateId, index: usize) -> Option<TemplateArgument> {
    let decl = model.template(template);
    assert!(
        index < decl.params.len(),
        "parameter index {index} out of range for '{}' ({} parameters)",
        decl.name,
        decl.params.len()
    );

    let mut specs = decl.specializations.iter();
    let candidate = specs.next()?.args.get(index)?;
    for spec in specs {
        match spec.args.get(index) {
            Some(arg) if model.structurally_equal(candidate, arg) => {}
            _ => return None,
        }
    }
    Some(candidate.clone())
}
