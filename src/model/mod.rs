//! Program model: the semantic view of one translation unit that the
//! substitution pass queries. Built in two visitor passes over the AST (see
//! `build`): declarations and scopes first, then name resolution into
//! parameter use sites and class-template specializations.

pub mod build;
pub mod eval;
pub mod scope;
pub mod types;

use std::collections::HashMap;

use serde::Serialize;

use crate::diagnostics::{Diagnostic, ReduceError};
use crate::span::Span;
pub use types::{CanonType, ConstValue, ParamDeclId, ParamId, ParamKey, TemplateArgument, TemplateId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamKind {
    Type,
    NonType,
    Template,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateParamInfo {
    pub name: Option<String>,
    pub kind: ParamKind,
    pub is_pack: bool,
}

/// One argument list a class template is used with, canonicalized and with
/// defaults filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct Specialization {
    pub args: Vec<TemplateArgument>,
    /// First place the argument list was spelled.
    pub span: Span,
}

/// A canonical class template: every declaration of it maps here.
#[derive(Debug, Clone)]
pub struct ClassTemplate {
    /// Qualified name (`ns::Box`).
    pub name: String,
    pub params: Vec<TemplateParamInfo>,
    /// In order of first appearance, deduplicated by argument list.
    pub specializations: Vec<Specialization>,
    pub(crate) body_scope: Option<scope::ScopeId>,
}

impl ClassTemplate {
    /// A template with no specializations and no member scope, for models
    /// built outside the C++ front end.
    pub fn new(name: impl Into<String>, params: Vec<TemplateParamInfo>) -> Self {
        Self { name: name.into(), params, specializations: Vec::new(), body_scope: None }
    }
}

/// One declaration of a class template (forward declaration, redeclaration
/// or definition), in textual order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemplateDeclRef {
    pub template: TemplateId,
    pub span: Span,
}

/// An identifier in the source that names a template type parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UseSite {
    pub param: ParamKey,
    pub span: Span,
}

/// Queries the substitution pass makes against a program.
pub trait ProgramModel {
    /// The text the model was built from.
    fn source(&self) -> &str;

    /// Every class-template declaration occurrence in textual order.
    fn template_decls(&self) -> &[TemplateDeclRef];

    fn canonical(&self, decl: &TemplateDeclRef) -> TemplateId {
        decl.template
    }

    fn template(&self, id: TemplateId) -> &ClassTemplate;

    /// Use sites of template type parameters, sorted by position.
    fn use_sites(&self) -> &[UseSite];

    fn structurally_equal(&self, a: &TemplateArgument, b: &TemplateArgument) -> bool {
        a == b
    }

    fn render(&self, arg: &TemplateArgument) -> String {
        arg.to_string()
    }

    /// Diagnostics the edited text has that this program did not.
    fn check_edit(&self, edited: &str) -> Vec<Diagnostic>;
}

#[derive(Debug)]
pub struct CxxProgram {
    source: String,
    templates: Vec<ClassTemplate>,
    decls: Vec<TemplateDeclRef>,
    use_sites: Vec<UseSite>,
    diagnostics: Vec<Diagnostic>,
}

impl CxxProgram {
    /// Lex, parse and analyze one translation unit.
    pub fn analyze(source: &str) -> Result<Self, ReduceError> {
        let tu = crate::parser::parse(source)?;
        Ok(build::build(source, &tu))
    }

    pub fn templates(&self) -> &[ClassTemplate] {
        &self.templates
    }

    pub fn find_template(&self, name: &str) -> Option<TemplateId> {
        self.templates.iter().position(|t| t.name == name).map(TemplateId)
    }

    /// Semantic problems found while building the model. The program is
    /// still usable; they matter for comparing edits.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

impl ProgramModel for CxxProgram {
    fn source(&self) -> &str {
        &self.source
    }

    fn template_decls(&self) -> &[TemplateDeclRef] {
        &self.decls
    }

    fn template(&self, id: TemplateId) -> &ClassTemplate {
        &self.templates[id.0]
    }

    fn use_sites(&self) -> &[UseSite] {
        &self.use_sites
    }

    fn check_edit(&self, edited: &str) -> Vec<Diagnostic> {
        let edited = match CxxProgram::analyze(edited) {
            Ok(program) => program,
            Err(ReduceError::Syntax { msg, span }) => {
                return vec![Diagnostic::new(msg, span)];
            }
            Err(other) => return vec![Diagnostic::new(other.to_string(), Span::dummy())],
        };
        let mut known: HashMap<&str, usize> = HashMap::new();
        for d in &self.diagnostics {
            *known.entry(d.msg.as_str()).or_default() += 1;
        }
        edited
            .diagnostics
            .into_iter()
            .filter(|d| match known.get_mut(d.msg.as_str()) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    false
                }
                _ => true,
            })
            .collect()
    }
}
