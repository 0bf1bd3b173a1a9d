//! Two-pass model construction.
//!
//! `Collector` walks the AST once to create scopes and declare every name:
//! namespaces, records, enums, aliases, template parameters, class and alias
//! templates. Redeclarations of a class template are merged onto one
//! `TemplateId` and their parameter declarations (and those of out-of-line
//! member definitions) are keyed by the canonical `ParamId`.
//!
//! `Resolver` walks it again with the complete tables, recording every name
//! that resolves to a template type parameter and every non-dependent
//! template-id as a specialization of its class template. Template-ids that
//! still mention a class template's parameters are kept per template and
//! instantiated once the walk is over, so `A<int>` also yields the `B<int>`
//! its member `B<T> b;` names.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, trace};

use super::eval;
use super::scope::{AliasId, AliasTemplateId, Entity, ScopeArena, ScopeId};
use super::types::{CanonType, ConstValue, Cosmetic, ParamDeclId, ParamId, ParamKey, TemplateArgument, TemplateId};
use super::{ClassTemplate, CxxProgram, ParamKind, Specialization, TemplateDeclRef, TemplateParamInfo, UseSite};
use crate::diagnostics::Diagnostic;
use crate::lexer::token::Token;
use crate::parser::ast::*;
use crate::span::{Span, Spanned};
use crate::visit::{Visitor, walk_namespace, walk_path, walk_soup, walk_template};

/// Nesting limit for type canonicalization; self-referential defaults and
/// aliases in malformed input stop here. Also bounds how many times
/// specializations are instantiated from other specializations.
const MAX_DEPTH: usize = 64;

struct ParamDecl {
    kind: ParamKind,
    is_pack: bool,
    key: ParamKey,
}

#[derive(Clone)]
struct DefaultArg {
    arg: TemplateArg,
    scope: ScopeId,
}

struct AliasDef {
    name: String,
    target: TypeExpr,
    scope: ScopeId,
}

struct AliasTemplateDef {
    name: String,
    params: Vec<ParamDeclId>,
    target: TypeExpr,
    scope: ScopeId,
}

#[derive(Default)]
struct Tables {
    scopes: ScopeArena,
    templates: Vec<ClassTemplate>,
    defaults: Vec<Vec<Option<DefaultArg>>>,
    decls: Vec<TemplateDeclRef>,
    params: Vec<ParamDecl>,
    aliases: Vec<AliasDef>,
    alias_templates: Vec<AliasTemplateDef>,
    /// Keyed by the namespace name's span; reopened namespaces share a scope.
    namespace_scopes: HashMap<Span, ScopeId>,
    record_scopes: HashMap<Span, ScopeId>,
    template_scopes: HashMap<Span, ScopeId>,
    diagnostics: Vec<Diagnostic>,
}

impl Tables {
    /// Looks `name` up inside a namespace or class.
    fn member(&self, entity: &Entity, name: &str) -> Option<Entity> {
        let scope = match entity {
            Entity::Namespace(id) => *id,
            Entity::Record { scope: Some(id), .. } => *id,
            Entity::ClassTemplate(id) => self.templates[id.0].body_scope?,
            _ => return None,
        };
        self.scopes.get_local(scope, name).cloned()
    }

    fn lookup_first(&self, path: &Path, scope: ScopeId) -> Option<Entity> {
        let name = &path.segments[0].name.node;
        if path.global {
            self.scopes.get_local(ScopeArena::GLOBAL, name).cloned()
        } else {
            self.scopes.lookup(scope, name).cloned()
        }
    }

    /// The entity named by segments `0..=upto` of `path`.
    fn lookup_prefix(&self, path: &Path, upto: usize, scope: ScopeId) -> Option<Entity> {
        let mut entity = self.lookup_first(path, scope)?;
        for seg in &path.segments[1..=upto] {
            entity = self.member(&entity, &seg.name.node)?;
        }
        Some(entity)
    }
}

pub(crate) fn build(source: &str, tu: &TranslationUnit) -> CxxProgram {
    let mut collector = Collector { t: Tables::default(), stack: vec![ScopeArena::GLOBAL], class_template: None };
    collector.visit_translation_unit(tu);

    let implied = vec![Vec::new(); collector.t.templates.len()];
    let mut resolver = Resolver {
        source,
        t: collector.t,
        stack: vec![ScopeArena::GLOBAL],
        use_sites: Vec::new(),
        alias_cache: HashMap::new(),
        resolving: HashSet::new(),
        reported: HashSet::new(),
        implied,
        depth: 0,
    };
    resolver.visit_translation_unit(tu);
    resolver.close_specializations();
    resolver.finish()
}

// ============================================================================
// Pass 1: declarations
// ============================================================================

struct Collector {
    t: Tables,
    stack: Vec<ScopeId>,
    /// Set while visiting the record a class-template header introduces.
    class_template: Option<TemplateId>,
}

impl Collector {
    fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(ScopeArena::GLOBAL)
    }

    fn declare_param(&mut self, param: &Spanned<TemplateParam>, header: ScopeId) -> ParamDeclId {
        let id = ParamDeclId(self.t.params.len());
        if let Some(name) = &param.node.name {
            self.t.scopes.declare(header, &name.node, Entity::Param(id));
        }
        self.t.params.push(ParamDecl {
            kind: param_kind(&param.node.kind),
            is_pack: param.node.is_pack,
            key: ParamKey::Other(id),
        });
        id
    }

    fn declare_class_template(
        &mut self,
        record: &RecordDecl,
        template: &TemplateDecl,
        ids: &[ParamDeclId],
        enclosing: ScopeId,
        header: ScopeId,
        span: Span,
    ) -> TemplateId {
        let name = record.simple_name().map(|n| n.node.clone()).unwrap_or_default();
        let id = match self.t.scopes.get_local(enclosing, &name) {
            Some(Entity::ClassTemplate(id)) => *id,
            _ => {
                let id = TemplateId(self.t.templates.len());
                let params = template
                    .params
                    .iter()
                    .map(|p| TemplateParamInfo {
                        name: p.node.name.as_ref().map(|n| n.node.clone()),
                        kind: param_kind(&p.node.kind),
                        is_pack: p.node.is_pack,
                    })
                    .collect();
                let qualified = self.t.scopes.qualify(enclosing, &name);
                debug!(template = %qualified, params = template.params.len(), "class template");
                self.t.templates.push(ClassTemplate {
                    name: qualified,
                    params,
                    specializations: Vec::new(),
                    body_scope: None,
                });
                self.t.defaults.push(vec![None; template.params.len()]);
                self.t.scopes.declare(enclosing, &name, Entity::ClassTemplate(id));
                id
            }
        };
        self.t.decls.push(TemplateDeclRef { template: id, span });

        if self.t.templates[id.0].params.len() != ids.len() {
            self.t.diagnostics.push(Diagnostic::new(
                format!("redeclaration of '{name}' with a different template parameter list"),
                span,
            ));
            return id;
        }
        for (index, (param, decl)) in template.params.iter().zip(ids).enumerate() {
            self.t.params[decl.0].key = ParamKey::ClassTemplate(ParamId { template: id, index });
            let info = &mut self.t.templates[id.0].params[index];
            if info.name.is_none() {
                info.name = param.node.name.as_ref().map(|n| n.node.clone());
            }
            let slot = &mut self.t.defaults[id.0][index];
            if slot.is_none() {
                *slot = param.node.default.as_ref().map(|d| DefaultArg { arg: d.node.clone(), scope: header });
            }
        }
        id
    }

    /// `template <class U> void Box<U>::f(U)`: the header's parameters are
    /// the class template's parameters under new names.
    fn alias_out_of_line(&mut self, ids: &[ParamDeclId], params: &[Spanned<TemplateParam>], decl: &Decl, header: ScopeId) {
        let names: Vec<&Path> = match decl {
            Decl::Record(record) => record.name.iter().map(|n| &n.node).collect(),
            Decl::Other(soup) => soup
                .iter()
                .filter_map(|f| match &f.node {
                    Fragment::Name(path) if path.segments.len() > 1 => Some(path),
                    _ => None,
                })
                .collect(),
            Decl::Template(inner) => return self.alias_out_of_line(ids, params, &inner.innermost().node, header),
            _ => Vec::new(),
        };
        for path in names {
            for (k, seg) in path.segments[..path.segments.len() - 1].iter().enumerate() {
                let Some(args) = &seg.args else { continue };
                let Some(Entity::ClassTemplate(id)) = self.t.lookup_prefix(path, k, header) else { continue };
                if self.t.templates[id.0].params.len() != ids.len() || !args_name_params(&args.node, params) {
                    continue;
                }
                trace!(template = %self.t.templates[id.0].name, "out-of-line member parameters");
                for (index, decl) in ids.iter().enumerate() {
                    self.t.params[decl.0].key = ParamKey::ClassTemplate(ParamId { template: id, index });
                }
                return;
            }
        }
    }
}

fn param_kind(kind: &TemplateParamKind) -> ParamKind {
    match kind {
        TemplateParamKind::Type => ParamKind::Type,
        TemplateParamKind::NonType(_) => ParamKind::NonType,
        TemplateParamKind::Template(_) => ParamKind::Template,
    }
}

/// True when `args` spell exactly `params`, in order, as bare names.
fn args_name_params(args: &[Spanned<TemplateArg>], params: &[Spanned<TemplateParam>]) -> bool {
    args.len() == params.len()
        && args.iter().zip(params).all(|(arg, param)| {
            let expected = param.node.name.as_ref().map(|n| n.node.as_str());
            expected.is_some()
                && bare_name(&arg.node) == expected
                && matches!(arg.node, TemplateArg::Expansion(_)) == param.node.is_pack
        })
}

fn bare_name(arg: &TemplateArg) -> Option<&str> {
    match arg {
        TemplateArg::Type(te) if te.cv.is_empty() && te.declarators.is_empty() => match &te.base.node {
            TypeBase::Named { path, typename: false, elaborated: false } if path.is_simple() => {
                Some(path.segments[0].name.node.as_str())
            }
            _ => None,
        },
        TemplateArg::Expr(soup) => match soup.as_slice() {
            [only] => match &only.node {
                Fragment::Name(path) if path.is_simple() => Some(path.segments[0].name.node.as_str()),
                _ => None,
            },
            _ => None,
        },
        TemplateArg::Expansion(inner) => bare_name(inner),
        TemplateArg::Type(_) => None,
    }
}

impl Visitor for Collector {
    fn visit_namespace(&mut self, ns: &NamespaceDecl, span: Span) {
        let Some(name) = &ns.name else {
            // Members of an anonymous namespace are visible in the enclosing one.
            walk_namespace(self, ns, span);
            return;
        };
        let cur = self.current();
        let scope = match self.t.scopes.get_local(cur, &name.node) {
            Some(Entity::Namespace(id)) => *id,
            _ => {
                let prefix = self.t.scopes.qualify(cur, &name.node);
                let id = self.t.scopes.push(cur, prefix);
                self.t.scopes.declare(cur, &name.node, Entity::Namespace(id));
                id
            }
        };
        self.t.namespace_scopes.insert(name.span, scope);
        self.stack.push(scope);
        walk_namespace(self, ns, span);
        self.stack.pop();
    }

    fn visit_record(&mut self, record: &RecordDecl, span: Span) {
        let cur = self.current();
        let class_template = self.class_template.take();
        if class_template.is_none() {
            if let Some(name) = record.simple_name() {
                let qualified = self.t.scopes.qualify(cur, &name.node);
                self.t.scopes.declare(cur, &name.node, Entity::Record { qualified, scope: None });
            }
        }
        let Some(body) = &record.body else { return };

        let prefix = match &record.name {
            Some(name) => self.t.scopes.qualify(cur, &name.node.last().name.node),
            None => self.t.scopes.prefix(cur).to_string(),
        };
        let scope = self.t.scopes.push(cur, prefix.clone());
        self.t.record_scopes.insert(span, scope);
        match class_template {
            Some(id) => {
                let template = &mut self.t.templates[id.0];
                if template.body_scope.is_none() {
                    template.body_scope = Some(scope);
                }
            }
            None => {
                if let Some(name) = record.simple_name() {
                    self.t.scopes.declare(cur, &name.node, Entity::Record { qualified: prefix, scope: Some(scope) });
                }
            }
        }

        self.stack.push(scope);
        for decl in body {
            self.visit_decl(decl);
        }
        self.stack.pop();
    }

    fn visit_enum(&mut self, enum_decl: &EnumDecl, _span: Span) {
        if let Some(name) = &enum_decl.name {
            let cur = self.current();
            let qualified = self.t.scopes.qualify(cur, &name.node);
            self.t.scopes.declare(cur, &name.node, Entity::Enum(qualified));
        }
    }

    fn visit_alias(&mut self, alias: &AliasDecl, _span: Span) {
        let cur = self.current();
        let id = AliasId(self.t.aliases.len());
        self.t.aliases.push(AliasDef {
            name: self.t.scopes.qualify(cur, &alias.name.node),
            target: alias.target.node.clone(),
            scope: cur,
        });
        self.t.scopes.declare(cur, &alias.name.node, Entity::Alias(id));
    }

    fn visit_template(&mut self, template: &TemplateDecl, span: Span) {
        let cur = self.current();
        let header = self.t.scopes.push(cur, self.t.scopes.prefix(cur).to_string());
        self.t.template_scopes.insert(span, header);
        let ids: Vec<ParamDeclId> = template.params.iter().map(|p| self.declare_param(p, header)).collect();

        match &template.decl.node {
            Decl::Record(record) if !template.params.is_empty() && record.simple_name().is_some() => {
                let id = self.declare_class_template(record, template, &ids, cur, header, span);
                self.class_template = Some(id);
            }
            Decl::Alias(alias) if alias.kind == AliasKind::Using && !template.params.is_empty() => {
                let id = AliasTemplateId(self.t.alias_templates.len());
                self.t.alias_templates.push(AliasTemplateDef {
                    name: self.t.scopes.qualify(cur, &alias.name.node),
                    params: ids,
                    target: alias.target.node.clone(),
                    scope: header,
                });
                self.t.scopes.declare(cur, &alias.name.node, Entity::AliasTemplate(id));
                return;
            }
            decl if !template.params.is_empty() => self.alias_out_of_line(&ids, &template.params, decl, header),
            _ => {}
        }

        self.stack.push(header);
        self.visit_decl(&template.decl);
        self.stack.pop();
    }
}

// ============================================================================
// Pass 2: resolution
// ============================================================================

enum Step {
    /// A scope-like entity not yet turned into a type (namespace, class).
    Entity(Entity),
    Type(CanonType),
}

struct Resolver<'a> {
    source: &'a str,
    t: Tables,
    stack: Vec<ScopeId>,
    use_sites: Vec<UseSite>,
    alias_cache: HashMap<AliasId, CanonType>,
    resolving: HashSet<AliasId>,
    reported: HashSet<(String, Span)>,
    /// Per class template, the dependent template-ids spelled with its
    /// parameters (`B<T>` inside `A`).
    implied: Vec<Vec<CanonType>>,
    depth: usize,
}

impl Resolver<'_> {
    fn current(&self) -> ScopeId {
        self.stack.last().copied().unwrap_or(ScopeArena::GLOBAL)
    }

    fn with_scope(&mut self, scope: Option<ScopeId>, f: impl FnOnce(&mut Self)) {
        if let Some(scope) = scope {
            self.stack.push(scope);
            f(self);
            self.stack.pop();
        } else {
            f(self);
        }
    }

    fn finish(mut self) -> CxxProgram {
        self.use_sites.sort_by_key(|u| (u.span.start, u.span.end));
        self.use_sites.dedup();
        self.t.diagnostics.sort_by_key(|d| d.span.start);
        debug!(
            templates = self.t.templates.len(),
            use_sites = self.use_sites.len(),
            diagnostics = self.t.diagnostics.len(),
            "program model built"
        );
        CxxProgram {
            source: self.source.to_string(),
            templates: self.t.templates,
            decls: self.t.decls,
            use_sites: self.use_sites,
            diagnostics: self.t.diagnostics,
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        if self.reported.insert((diagnostic.msg.clone(), diagnostic.span)) {
            trace!(msg = %diagnostic.msg, "diagnostic");
            self.t.diagnostics.push(diagnostic);
        }
    }

    fn note_use_site(&mut self, path: &Path) {
        if path.global {
            return;
        }
        let seg = &path.segments[0];
        if let Some(Entity::Param(id)) = self.t.scopes.lookup(self.current(), &seg.name.node) {
            let param = &self.t.params[id.0];
            if param.kind == ParamKind::Type {
                self.use_sites.push(UseSite { param: param.key, span: seg.name.span });
            }
        }
    }

    fn note_template_ids(&mut self, path: &Path) {
        let scope = self.current();
        let mut entity = self.t.lookup_first(path, scope);
        for (k, seg) in path.segments.iter().enumerate() {
            if k > 0 {
                entity = entity.and_then(|e| self.t.member(&e, &seg.name.node));
            }
            let (Some(found), Some(args)) = (&entity, &seg.args) else { continue };
            let site = seg.name.span.merge(args.span);
            match found {
                Entity::ClassTemplate(id) => {
                    let id = *id;
                    let (converted, diags) = self.convert_args(id, &args.node, scope, site);
                    let clean = diags.is_empty();
                    for d in diags {
                        self.report(d);
                    }
                    if clean {
                        let ty = self.specialization_type(id, converted, args.node.len());
                        self.note_dependent(&ty);
                        self.register_all(&ty, site);
                    }
                }
                Entity::AliasTemplate(id) => {
                    let ty = self.instantiate_alias(*id, &args.node, scope);
                    self.note_dependent(&ty);
                    self.register_all(&ty, site);
                }
                _ => {}
            }
        }
    }

    /// Records every non-dependent specialization inside `ty` and returns
    /// the ones not seen before.
    fn register_all(&mut self, ty: &CanonType, site: Span) -> Vec<(TemplateId, usize)> {
        let mut added = Vec::new();
        for spec in ty.specializations() {
            let CanonType::Specialization { template, args, .. } = spec else { continue };
            if spec.is_dependent() {
                continue;
            }
            let known = &mut self.t.templates[template.0].specializations;
            if !known.iter().any(|s| &s.args == args) {
                trace!(specialization = %spec, "implicit or explicit specialization");
                known.push(Specialization { args: args.clone(), span: site });
                added.push((*template, known.len() - 1));
            }
        }
        added
    }

    /// Files each dependent template-id inside `ty` under the class
    /// templates whose parameters it mentions.
    fn note_dependent(&mut self, ty: &CanonType) {
        for spec in ty.specializations() {
            if !spec.is_dependent() {
                continue;
            }
            for owner in spec.owning_templates() {
                let pending = &mut self.implied[owner.0];
                if !pending.contains(spec) {
                    pending.push(spec.clone());
                }
            }
        }
    }

    /// Instantiates the dependent template-ids of every known specialization
    /// until no new specialization appears. Chains that never settle, such
    /// as `L<T *>` inside `L`, stop after `MAX_DEPTH` steps.
    fn close_specializations(&mut self) {
        let mut queue: VecDeque<(TemplateId, usize, usize)> = VecDeque::new();
        for (index, template) in self.t.templates.iter().enumerate() {
            for k in 0..template.specializations.len() {
                queue.push_back((TemplateId(index), k, 0));
            }
        }
        while let Some((template, k, depth)) = queue.pop_front() {
            if self.implied[template.0].is_empty() || depth >= MAX_DEPTH {
                continue;
            }
            let spec = self.t.templates[template.0].specializations[k].clone();
            let bindings = class_bindings(template, &spec.args);
            for pattern in self.implied[template.0].clone() {
                let ty = self.substitute(&pattern, &bindings);
                for (id, index) in self.register_all(&ty, spec.span) {
                    queue.push_back((id, index, depth + 1));
                }
            }
        }
    }

    fn specialization_type(&self, id: TemplateId, args: Vec<TemplateArgument>, written: usize) -> CanonType {
        CanonType::Specialization {
            template: id,
            name: self.t.templates[id.0].name.clone(),
            args,
            shown: Cosmetic(written),
        }
    }

    /// Matches written arguments to the template's parameters, filling in
    /// defaults and collecting packs.
    fn convert_args(
        &mut self,
        id: TemplateId,
        written: &[Spanned<TemplateArg>],
        scope: ScopeId,
        site: Span,
    ) -> (Vec<TemplateArgument>, Vec<Diagnostic>) {
        let params = self.t.templates[id.0].params.clone();
        let name = self.t.templates[id.0].name.clone();
        let mut diags = Vec::new();

        if written.iter().any(|a| matches!(a.node, TemplateArg::Expansion(_))) {
            // Arity is unknown until the pack is expanded.
            let mut out = Vec::with_capacity(written.len());
            for (i, arg) in written.iter().enumerate() {
                let kind = params.get(i).or(params.last()).map_or(ParamKind::Type, |p| p.kind);
                out.push(self.convert_arg(kind, &arg.node, scope, &mut diags, arg.span));
            }
            return (out, diags);
        }

        let mut out = Vec::with_capacity(params.len());
        for (i, param) in params.iter().enumerate() {
            if param.is_pack {
                let mut items = Vec::new();
                for arg in written.get(i..).unwrap_or(&[]) {
                    items.push(self.convert_arg(param.kind, &arg.node, scope, &mut diags, arg.span));
                }
                out.push(TemplateArgument::Pack(items));
                return (out, diags);
            }
            if let Some(arg) = written.get(i) {
                let converted = self.convert_arg(param.kind, &arg.node, scope, &mut diags, arg.span);
                out.push(converted);
            } else if let Some(default) = self.t.defaults[id.0][i].clone() {
                let mut ignored = Vec::new();
                let converted = self.convert_arg(param.kind, &default.arg, default.scope, &mut ignored, site);
                let earlier = class_bindings(id, &out);
                out.push(self.substitute_arg(&converted, &earlier));
            } else {
                diags.push(Diagnostic::new(format!("too few template arguments for class template '{name}'"), site));
                return (out, diags);
            }
        }
        if written.len() > params.len() {
            diags.push(Diagnostic::new(
                format!("too many template arguments for class template '{name}'"),
                written[params.len()].span,
            ));
        }
        (out, diags)
    }

    fn convert_arg(
        &mut self,
        kind: ParamKind,
        arg: &TemplateArg,
        scope: ScopeId,
        diags: &mut Vec<Diagnostic>,
        span: Span,
    ) -> TemplateArgument {
        match (kind, arg) {
            (_, TemplateArg::Expansion(inner)) => self.convert_arg(kind, inner, scope, diags, span),
            (ParamKind::Type, TemplateArg::Type(te)) => TemplateArgument::Type(self.canon_type(te, scope)),
            (ParamKind::Type, TemplateArg::Expr(soup)) if soup_spells_type(soup) => {
                TemplateArgument::Type(CanonType::Opaque {
                    text: self.soup_text(soup),
                    dependent: self.soup_is_dependent(soup, scope),
                })
            }
            (ParamKind::Type, TemplateArg::Expr(soup)) => {
                diags.push(Diagnostic::new("template argument for template type parameter must be a type", span));
                TemplateArgument::Value(self.eval_soup(soup, scope))
            }
            (ParamKind::NonType, TemplateArg::Type(te)) => match self.type_arg_as_value(te, scope) {
                Some(value) => TemplateArgument::Value(value),
                None => {
                    diags.push(Diagnostic::new(
                        "template argument for non-type template parameter must be an expression",
                        span,
                    ));
                    TemplateArgument::Type(self.canon_type(te, scope))
                }
            },
            (ParamKind::NonType, TemplateArg::Expr(soup)) => TemplateArgument::Value(self.eval_soup(soup, scope)),
            (ParamKind::Template, TemplateArg::Type(te)) => self.template_name_arg(te, scope),
            (ParamKind::Template, TemplateArg::Expr(soup)) => TemplateArgument::Template {
                name: self.soup_text(soup),
                dependent: self.soup_is_dependent(soup, scope),
            },
        }
    }

    /// The parser reads a lone name as a type; for a non-type parameter it
    /// may still be a value (`N`, an enumerator, `ns::k`).
    fn type_arg_as_value(&self, te: &TypeExpr, scope: ScopeId) -> Option<ConstValue> {
        if !te.cv.is_empty() || !te.declarators.is_empty() {
            return None;
        }
        let TypeBase::Named { path, typename: false, elaborated: false } = &te.base.node else {
            return None;
        };
        let text = self.path_text(path);
        match self.t.lookup_prefix(path, path.segments.len() - 1, scope) {
            Some(Entity::Param(id)) => match self.t.params[id.0].kind {
                ParamKind::Type => None,
                ParamKind::NonType | ParamKind::Template => Some(ConstValue::Dependent(text)),
            },
            Some(_) => None,
            None if self.path_is_dependent(path, scope) => Some(ConstValue::Dependent(text)),
            None => Some(ConstValue::Expr(text)),
        }
    }

    fn template_name_arg(&mut self, te: &TypeExpr, scope: ScopeId) -> TemplateArgument {
        let TypeBase::Named { path, .. } = &te.base.node else {
            return TemplateArgument::Type(self.canon_type(te, scope));
        };
        if !te.declarators.is_empty() {
            return TemplateArgument::Type(self.canon_type(te, scope));
        }
        match self.t.lookup_prefix(path, path.segments.len() - 1, scope) {
            Some(Entity::ClassTemplate(id)) => {
                TemplateArgument::Template { name: self.t.templates[id.0].name.clone(), dependent: false }
            }
            Some(Entity::AliasTemplate(id)) => {
                TemplateArgument::Template { name: self.t.alias_templates[id.0].name.clone(), dependent: false }
            }
            Some(Entity::Param(_)) => TemplateArgument::Template { name: self.path_text(path), dependent: true },
            _ => TemplateArgument::Template {
                name: self.path_text(path),
                dependent: self.path_is_dependent(path, scope),
            },
        }
    }

    fn eval_soup(&self, soup: &Soup, scope: ScopeId) -> ConstValue {
        let text = self.soup_text(soup);
        if self.soup_is_dependent(soup, scope) {
            return ConstValue::Dependent(text);
        }
        match eval::evaluate(soup) {
            Some(n) => ConstValue::Int(n),
            None => ConstValue::Expr(text),
        }
    }

    fn canon_type(&mut self, te: &TypeExpr, scope: ScopeId) -> CanonType {
        if self.depth > MAX_DEPTH {
            return CanonType::Opaque { text: "<recursive>".to_string(), dependent: false };
        }
        self.depth += 1;
        let base = match &te.base.node {
            TypeBase::Builtin(b) => CanonType::Builtin(*b),
            TypeBase::Named { path, elaborated, .. } => self.canon_path(path, scope, *elaborated),
            TypeBase::Decltype(soup) => CanonType::Opaque {
                text: format!("decltype({})", self.soup_text(soup)),
                dependent: self.soup_is_dependent(soup, scope),
            },
        };
        self.depth -= 1;

        let mut ty = base.qualified(te.cv);
        for declarator in &te.declarators {
            ty = match &declarator.node {
                Declarator::Pointer(cv) => ty.pointer().qualified(*cv),
                Declarator::LRef => ty.lref(),
                Declarator::RRef => ty.rref(),
                Declarator::Array(size) if size.is_empty() => ty.array(None),
                Declarator::Array(size) => {
                    let size = self.eval_soup(size, scope);
                    ty.array(Some(size))
                }
            };
        }
        ty
    }

    fn canon_path(&mut self, path: &Path, scope: ScopeId, elaborated: bool) -> CanonType {
        let mut step = match self.t.lookup_first(path, scope) {
            // `struct S` ignores non-class names.
            Some(Entity::Alias(_) | Entity::Param(_)) if elaborated => None,
            Some(entity) => Some(self.entity_step(entity, &path.segments[0], scope)),
            None => None,
        };
        for seg in &path.segments[1..] {
            step = match step {
                Some(Step::Entity(entity)) => match self.t.member(&entity, &seg.name.node) {
                    Some(member) => Some(self.entity_step(member, seg, scope)),
                    None => self
                        .entity_type(&entity)
                        .map(|base| Step::Type(CanonType::Member(Box::new(base), self.segment_text(seg)))),
                },
                Some(Step::Type(base)) => Some(Step::Type(self.member_type(base, seg))),
                None => None,
            };
        }
        match step {
            Some(Step::Type(ty)) => ty,
            Some(Step::Entity(entity)) => match self.entity_type(&entity) {
                Some(ty) => ty,
                None => self.opaque_path(path, scope),
            },
            None => self.opaque_path(path, scope),
        }
    }

    fn entity_step(&mut self, entity: Entity, seg: &PathSegment, scope: ScopeId) -> Step {
        match (entity, &seg.args) {
            (Entity::ClassTemplate(id), Some(args)) => {
                let site = seg.name.span.merge(args.span);
                let (converted, _) = self.convert_args(id, &args.node, scope, site);
                Step::Type(self.specialization_type(id, converted, args.node.len()))
            }
            (Entity::AliasTemplate(id), Some(args)) => Step::Type(self.instantiate_alias(id, &args.node, scope)),
            (Entity::Alias(id), _) => Step::Type(self.resolve_alias(id)),
            (Entity::Param(id), _) => {
                let param = &self.t.params[id.0];
                match param.kind {
                    ParamKind::Type => Step::Type(CanonType::param(param.key, seg.name.node.clone())),
                    ParamKind::NonType | ParamKind::Template => {
                        Step::Type(CanonType::Opaque { text: self.segment_text(seg), dependent: true })
                    }
                }
            }
            (Entity::Enum(qualified), _) => Step::Type(CanonType::Named(qualified)),
            (entity, _) => Step::Entity(entity),
        }
    }

    fn entity_type(&self, entity: &Entity) -> Option<CanonType> {
        match entity {
            Entity::Record { qualified, .. } | Entity::Enum(qualified) => Some(CanonType::Named(qualified.clone())),
            // Injected class name inside the template's own body.
            Entity::ClassTemplate(id) => {
                Some(CanonType::Opaque { text: self.t.templates[id.0].name.clone(), dependent: true })
            }
            _ => None,
        }
    }

    fn member_type(&mut self, base: CanonType, seg: &PathSegment) -> CanonType {
        if seg.args.is_none() {
            if let Some(ty) = self.member_of(&base, &seg.name.node) {
                return ty;
            }
        }
        CanonType::Member(Box::new(base), self.segment_text(seg))
    }

    /// Member typedefs of a non-dependent specialization, instantiated.
    fn member_of(&mut self, base: &CanonType, name: &str) -> Option<CanonType> {
        let CanonType::Specialization { template, args, .. } = base else { return None };
        if base.is_dependent() {
            return None;
        }
        let body = self.t.templates[template.0].body_scope?;
        match self.t.scopes.get_local(body, name)? {
            Entity::Alias(id) => {
                let id = *id;
                let target = self.resolve_alias(id);
                let bindings = class_bindings(*template, args);
                Some(self.substitute(&target, &bindings))
            }
            _ => None,
        }
    }

    fn resolve_alias(&mut self, id: AliasId) -> CanonType {
        if let Some(ty) = self.alias_cache.get(&id) {
            return ty.clone();
        }
        if !self.resolving.insert(id) {
            return CanonType::Opaque { text: self.t.aliases[id.0].name.clone(), dependent: false };
        }
        let target = self.t.aliases[id.0].target.clone();
        let ty = self.canon_type(&target, self.t.aliases[id.0].scope);
        self.resolving.remove(&id);
        self.alias_cache.insert(id, ty.clone());
        ty
    }

    fn instantiate_alias(&mut self, id: AliasTemplateId, written: &[Spanned<TemplateArg>], scope: ScopeId) -> CanonType {
        let params = self.t.alias_templates[id.0].params.clone();
        let target = self.t.alias_templates[id.0].target.clone();
        let pattern = self.canon_type(&target, self.t.alias_templates[id.0].scope);

        let mut bindings = HashMap::new();
        let mut ignored = Vec::new();
        for (i, decl) in params.iter().enumerate() {
            let (kind, key, is_pack) = {
                let p = &self.t.params[decl.0];
                (p.kind, p.key, p.is_pack)
            };
            if is_pack {
                let mut items = Vec::new();
                for arg in written.get(i..).unwrap_or(&[]) {
                    items.push(self.convert_arg(kind, &arg.node, scope, &mut ignored, arg.span));
                }
                bindings.insert(key, TemplateArgument::Pack(items));
                break;
            }
            let Some(arg) = written.get(i) else { break };
            let converted = self.convert_arg(kind, &arg.node, scope, &mut ignored, arg.span);
            bindings.insert(key, converted);
        }
        self.substitute(&pattern, &bindings)
    }

    fn substitute(&mut self, ty: &CanonType, bindings: &HashMap<ParamKey, TemplateArgument>) -> CanonType {
        match ty {
            CanonType::Param { key, .. } => match bindings.get(key) {
                Some(TemplateArgument::Type(bound)) => bound.clone(),
                _ => ty.clone(),
            },
            CanonType::Specialization { template, name, args, shown } => CanonType::Specialization {
                template: *template,
                name: name.clone(),
                args: args.iter().map(|a| self.substitute_arg(a, bindings)).collect(),
                shown: shown.clone(),
            },
            CanonType::Member(base, name) => {
                let base = self.substitute(base, bindings);
                match self.member_of(&base, name) {
                    Some(member) => member,
                    None => CanonType::Member(Box::new(base), name.clone()),
                }
            }
            CanonType::Pointer(inner) => self.substitute(inner, bindings).pointer(),
            CanonType::LRef(inner) => self.substitute(inner, bindings).lref(),
            CanonType::RRef(inner) => self.substitute(inner, bindings).rref(),
            CanonType::Array(elem, size) => self.substitute(elem, bindings).array(size.clone()),
            CanonType::Qualified(inner, cv) => self.substitute(inner, bindings).qualified(*cv),
            CanonType::Builtin(_) | CanonType::Named(_) | CanonType::Opaque { .. } => ty.clone(),
        }
    }

    fn substitute_arg(&mut self, arg: &TemplateArgument, bindings: &HashMap<ParamKey, TemplateArgument>) -> TemplateArgument {
        match arg {
            TemplateArgument::Type(ty) => TemplateArgument::Type(self.substitute(ty, bindings)),
            TemplateArgument::Pack(items) => {
                TemplateArgument::Pack(items.iter().map(|a| self.substitute_arg(a, bindings)).collect())
            }
            // Value expressions are not rewritten; once every binding is
            // concrete the expression is keyed by its text and the bindings.
            TemplateArgument::Value(ConstValue::Dependent(text))
                if !bindings.is_empty() && bindings.values().all(|b| !b.is_dependent()) =>
            {
                let mut bound: Vec<_> = bindings.iter().collect();
                bound.sort_by_key(|(key, _)| **key);
                let values: Vec<String> = bound.iter().map(|(_, v)| v.to_string()).collect();
                TemplateArgument::Value(ConstValue::Expr(format!("{text} [{}]", values.join(", "))))
            }
            TemplateArgument::Value(_) | TemplateArgument::Template { .. } => arg.clone(),
        }
    }

    fn opaque_path(&self, path: &Path, scope: ScopeId) -> CanonType {
        CanonType::Opaque { text: self.path_text(path), dependent: self.path_is_dependent(path, scope) }
    }

    fn path_is_dependent(&self, path: &Path, scope: ScopeId) -> bool {
        if !path.global {
            if let Some(Entity::Param(_)) = self.t.scopes.lookup(scope, &path.segments[0].name.node) {
                return true;
            }
        }
        path.segments
            .iter()
            .filter_map(|seg| seg.args.as_ref())
            .flat_map(|args| args.node.iter())
            .any(|arg| self.arg_is_dependent(&arg.node, scope))
    }

    fn arg_is_dependent(&self, arg: &TemplateArg, scope: ScopeId) -> bool {
        match arg {
            TemplateArg::Type(te) => {
                let base = match &te.base.node {
                    TypeBase::Builtin(_) => false,
                    TypeBase::Named { path, .. } => self.path_is_dependent(path, scope),
                    TypeBase::Decltype(soup) => self.soup_is_dependent(soup, scope),
                };
                base || te.declarators.iter().any(|d| match &d.node {
                    Declarator::Array(size) => self.soup_is_dependent(size, scope),
                    _ => false,
                })
            }
            TemplateArg::Expr(soup) => self.soup_is_dependent(soup, scope),
            TemplateArg::Expansion(_) => true,
        }
    }

    fn soup_is_dependent(&self, soup: &Soup, scope: ScopeId) -> bool {
        soup.iter().any(|f| match &f.node {
            Fragment::Name(path) => self.path_is_dependent(path, scope),
            _ => false,
        })
    }

    fn soup_text(&self, soup: &Soup) -> String {
        let parts: Vec<&str> = soup.iter().map(|f| f.span.text(self.source)).collect();
        squeeze(&parts.join(" "))
    }

    fn path_text(&self, path: &Path) -> String {
        let start = path.segments[0].name.span.start;
        let last = path.last();
        let end = last.args.as_ref().map_or(last.name.span.end, |a| a.span.end);
        let text = squeeze(&self.source[start..end]);
        if path.global { format!("::{text}") } else { text }
    }

    fn segment_text(&self, seg: &PathSegment) -> String {
        let end = seg.args.as_ref().map_or(seg.name.span.end, |a| a.span.end);
        squeeze(&self.source[seg.name.span.start..end])
    }
}

fn class_bindings(template: TemplateId, args: &[TemplateArgument]) -> HashMap<ParamKey, TemplateArgument> {
    args.iter()
        .enumerate()
        .map(|(index, arg)| (ParamKey::ClassTemplate(ParamId { template, index }), arg.clone()))
        .collect()
}

/// Function types (`void (*)(int)`) and pointers to members (`int S::*`)
/// only parse as expressions. They are compared by their spelling.
fn soup_spells_type(soup: &Soup) -> bool {
    let punctuated = || {
        soup.iter()
            .any(|f| matches!(f.node, Fragment::Token(Token::LParen | Token::ColonColon)))
    };
    match soup.first().map(|f| &f.node) {
        Some(Fragment::Name(_)) => punctuated(),
        Some(Fragment::Token(tok)) => {
            tok.is_builtin_specifier()
                || tok.is_cv()
                || tok.is_class_key()
                || matches!(tok, Token::Typename | Token::Enum | Token::Decltype)
        }
        _ => false,
    }
}

/// `int[3] v;`: brackets between a type and the declared name.
fn misplaced_array_bound(soup: &Soup) -> Option<Span> {
    for (i, window) in soup.windows(2).enumerate() {
        let (Fragment::Token(Token::RBracket), Fragment::Name(path)) = (&window[0].node, &window[1].node) else {
            continue;
        };
        if !path.is_simple() {
            continue;
        }
        // `delete [] p` and `[[attribute]] x`
        let before = i.checked_sub(1).map(|j| &soup[j].node);
        if matches!(before, Some(Fragment::Token(Token::LBracket | Token::RBracket)) | None) {
            continue;
        }
        let ends_declarator = match soup.get(i + 2).map(|f| &f.node) {
            None => true,
            Some(Fragment::Token(tok)) => {
                matches!(tok, Token::Semi | Token::Comma | Token::Eq | Token::LBracket | Token::RParen)
            }
            Some(_) => false,
        };
        if ends_declarator {
            return Some(window[1].span);
        }
    }
    None
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Collapses whitespace to what separates tokens: `Box < int >` and
/// `Box<int>` spell the same thing.
fn squeeze(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && out.chars().last().is_some_and(is_ident_char) && is_ident_char(c) {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

impl Visitor for Resolver<'_> {
    fn visit_namespace(&mut self, ns: &NamespaceDecl, span: Span) {
        let scope = ns.name.as_ref().and_then(|n| self.t.namespace_scopes.get(&n.span).copied());
        self.with_scope(scope, |this| walk_namespace(this, ns, span));
    }

    fn visit_record(&mut self, record: &RecordDecl, span: Span) {
        if let Some(name) = &record.name {
            self.visit_path(&name.node);
        }
        for base in &record.bases {
            self.visit_type_expr(&base.node);
        }
        if let Some(body) = &record.body {
            let scope = self.t.record_scopes.get(&span).copied();
            self.with_scope(scope, |this| {
                for decl in body {
                    this.visit_decl(decl);
                }
            });
        }
        self.visit_soup(&record.declarators);
    }

    fn visit_template(&mut self, template: &TemplateDecl, span: Span) {
        let scope = self.t.template_scopes.get(&span).copied();
        self.with_scope(scope, |this| walk_template(this, template, span));
    }

    fn visit_path(&mut self, path: &Path) {
        self.note_use_site(path);
        self.note_template_ids(path);
        walk_path(self, path);
    }

    fn visit_soup(&mut self, soup: &Soup) {
        if let Some(span) = misplaced_array_bound(soup) {
            self.report(Diagnostic::new(
                "brackets are not allowed here; to declare an array, place the brackets after the name",
                span,
            ));
        }
        walk_soup(self, soup);
    }
}
