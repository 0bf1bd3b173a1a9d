//! AST visitor infrastructure
//!
//! `Visitor` is a read-only traversal over the declaration-level C++ AST. The
//! program model builder runs two visitors: one collecting declarations and
//! scopes, one resolving names into use sites and specializations.
//!
//! ## Usage
//!
//! Implement the trait for your pass, overriding only the methods you need.
//! Call the corresponding `walk_*` function inside your override to get the
//! default recursion; omit it to prune the subtree.
//!
//! ```rust
//! use cxxreduce::parser::ast::Path;
//! use cxxreduce::visit::{Visitor, walk_path};
//!
//! struct NameCollector {
//!     names: Vec<String>,
//! }
//!
//! impl Visitor for NameCollector {
//!     fn visit_path(&mut self, path: &Path) {
//!         self.names.push(path.last().name.node.clone());
//!         walk_path(self, path);
//!     }
//! }
//! ```

use crate::parser::ast::*;
use crate::span::{Span, Spanned};

/// Read-only AST visitor. Default implementations recurse into all children.
pub trait Visitor: Sized {
    fn visit_translation_unit(&mut self, tu: &TranslationUnit) {
        walk_translation_unit(self, tu);
    }

    fn visit_decl(&mut self, decl: &Spanned<Decl>) {
        walk_decl(self, decl);
    }

    fn visit_namespace(&mut self, ns: &NamespaceDecl, span: Span) {
        walk_namespace(self, ns, span);
    }

    fn visit_record(&mut self, record: &RecordDecl, span: Span) {
        walk_record(self, record, span);
    }

    fn visit_enum(&mut self, enum_decl: &EnumDecl, span: Span) {
        walk_enum(self, enum_decl, span);
    }

    fn visit_template(&mut self, template: &TemplateDecl, span: Span) {
        walk_template(self, template, span);
    }

    fn visit_template_param(&mut self, param: &Spanned<TemplateParam>) {
        walk_template_param(self, param);
    }

    fn visit_explicit_instantiation(&mut self, inst: &ExplicitInstantiation, span: Span) {
        walk_explicit_instantiation(self, inst, span);
    }

    fn visit_alias(&mut self, alias: &AliasDecl, span: Span) {
        walk_alias(self, alias, span);
    }

    fn visit_type_expr(&mut self, te: &TypeExpr) {
        walk_type_expr(self, te);
    }

    fn visit_path(&mut self, path: &Path) {
        walk_path(self, path);
    }

    fn visit_template_arg(&mut self, arg: &TemplateArg) {
        walk_template_arg(self, arg);
    }

    fn visit_soup(&mut self, soup: &Soup) {
        walk_soup(self, soup);
    }
}

pub fn walk_translation_unit<V: Visitor>(v: &mut V, tu: &TranslationUnit) {
    for decl in &tu.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<V: Visitor>(v: &mut V, decl: &Spanned<Decl>) {
    match &decl.node {
        Decl::Namespace(ns) => v.visit_namespace(ns, decl.span),
        Decl::Linkage(decls) => {
            for d in decls {
                v.visit_decl(d);
            }
        }
        Decl::Record(record) => v.visit_record(record, decl.span),
        Decl::Enum(e) => v.visit_enum(e, decl.span),
        Decl::Template(t) => v.visit_template(t, decl.span),
        Decl::ExplicitInstantiation(inst) => v.visit_explicit_instantiation(inst, decl.span),
        Decl::Alias(alias) => v.visit_alias(alias, decl.span),
        Decl::Other(soup) => v.visit_soup(soup),
    }
}

pub fn walk_namespace<V: Visitor>(v: &mut V, ns: &NamespaceDecl, _span: Span) {
    for decl in &ns.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_record<V: Visitor>(v: &mut V, record: &RecordDecl, _span: Span) {
    if let Some(name) = &record.name {
        v.visit_path(&name.node);
    }
    for base in &record.bases {
        v.visit_type_expr(&base.node);
    }
    if let Some(body) = &record.body {
        for decl in body {
            v.visit_decl(decl);
        }
    }
    v.visit_soup(&record.declarators);
}

pub fn walk_enum<V: Visitor>(v: &mut V, enum_decl: &EnumDecl, _span: Span) {
    if let Some(underlying) = &enum_decl.underlying {
        v.visit_type_expr(&underlying.node);
    }
    if let Some(body) = &enum_decl.body {
        v.visit_soup(body);
    }
    v.visit_soup(&enum_decl.declarators);
}

pub fn walk_template<V: Visitor>(v: &mut V, template: &TemplateDecl, _span: Span) {
    for param in &template.params {
        v.visit_template_param(param);
    }
    v.visit_decl(&template.decl);
}

pub fn walk_template_param<V: Visitor>(v: &mut V, param: &Spanned<TemplateParam>) {
    match &param.node.kind {
        TemplateParamKind::Type => {}
        TemplateParamKind::NonType(ty) => v.visit_type_expr(&ty.node),
        TemplateParamKind::Template(inner) => {
            for p in inner {
                v.visit_template_param(p);
            }
        }
    }
    if let Some(default) = &param.node.default {
        v.visit_template_arg(&default.node);
    }
}

pub fn walk_explicit_instantiation<V: Visitor>(v: &mut V, inst: &ExplicitInstantiation, _span: Span) {
    v.visit_decl(&inst.decl);
}

pub fn walk_alias<V: Visitor>(v: &mut V, alias: &AliasDecl, _span: Span) {
    v.visit_type_expr(&alias.target.node);
}

pub fn walk_type_expr<V: Visitor>(v: &mut V, te: &TypeExpr) {
    match &te.base.node {
        TypeBase::Builtin(_) => {}
        TypeBase::Named { path, .. } => v.visit_path(path),
        TypeBase::Decltype(soup) => v.visit_soup(soup),
    }
    for declarator in &te.declarators {
        if let Declarator::Array(size) = &declarator.node {
            v.visit_soup(size);
        }
    }
}

pub fn walk_path<V: Visitor>(v: &mut V, path: &Path) {
    for segment in &path.segments {
        if let Some(args) = &segment.args {
            for arg in &args.node {
                v.visit_template_arg(&arg.node);
            }
        }
    }
}

pub fn walk_template_arg<V: Visitor>(v: &mut V, arg: &TemplateArg) {
    match arg {
        TemplateArg::Type(te) => v.visit_type_expr(te),
        TemplateArg::Expr(soup) => v.visit_soup(soup),
        TemplateArg::Expansion(inner) => v.visit_template_arg(inner),
    }
}

pub fn walk_soup<V: Visitor>(v: &mut V, soup: &Soup) {
    for fragment in soup {
        if let Fragment::Name(path) = &fragment.node {
            v.visit_path(path);
        }
    }
}
