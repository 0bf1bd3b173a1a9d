use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::parser::ast::{BuiltinType, Cv};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TemplateId(pub usize);

/// A class-template type parameter: owning canonical template plus position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParamId {
    pub template: TemplateId,
    pub index: usize,
}

/// One `template <...>` parameter declaration anywhere in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ParamDeclId(pub usize);

/// What a template parameter name resolves to. Parameters of class templates
/// (including their redeclarations and out-of-line members) share a `ParamId`;
/// parameters of function, alias and variable templates and of partial
/// specializations stay per-declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ParamKey {
    ClassTemplate(ParamId),
    Other(ParamDeclId),
}

impl ParamKey {
    pub fn class_param(&self) -> Option<ParamId> {
        match self {
            ParamKey::ClassTemplate(id) => Some(*id),
            ParamKey::Other(_) => None,
        }
    }
}

/// Printing-only data carried inside a canonical type. Never affects
/// equality or hashing.
#[derive(Debug, Clone, Default)]
pub struct Cosmetic<T>(pub T);

impl<T> PartialEq for Cosmetic<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T> Eq for Cosmetic<T> {}

impl<T> Hash for Cosmetic<T> {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

/// A resolved, canonical C++ type. Typedefs and aliases are already expanded,
/// cv qualifiers are merged and references are collapsed, so structural
/// equality is plain `==`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonType {
    Builtin(BuiltinType),
    /// Non-template class, struct, union or enum, by qualified name.
    Named(String),
    Specialization {
        template: TemplateId,
        name: String,
        args: Vec<TemplateArgument>,
        /// Number of arguments spelled at the first site; trailing defaults
        /// beyond it are not printed.
        shown: Cosmetic<usize>,
    },
    Param {
        key: ParamKey,
        name: Cosmetic<String>,
    },
    /// `Base::name` where `Base` could not be looked into.
    Member(Box<CanonType>, String),
    Pointer(Box<CanonType>),
    LRef(Box<CanonType>),
    RRef(Box<CanonType>),
    Array(Box<CanonType>, Option<ConstValue>),
    Qualified(Box<CanonType>, Cv),
    /// Something the model does not understand (unknown names, decltype).
    /// Compared by normalized spelling.
    Opaque { text: String, dependent: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum ConstValue {
    Int(i128),
    /// Non-dependent expression the folder could not evaluate.
    Expr(String),
    /// Expression mentioning a template parameter.
    Dependent(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateArgument {
    Type(CanonType),
    Value(ConstValue),
    Template { name: String, dependent: bool },
    Pack(Vec<TemplateArgument>),
}

impl CanonType {
    pub fn param(key: ParamKey, name: impl Into<String>) -> Self {
        CanonType::Param { key, name: Cosmetic(name.into()) }
    }

    pub fn pointer(self) -> Self {
        CanonType::Pointer(Box::new(self))
    }

    /// `T&` with reference collapsing.
    pub fn lref(self) -> Self {
        match self {
            CanonType::LRef(inner) | CanonType::RRef(inner) => CanonType::LRef(inner),
            other => CanonType::LRef(Box::new(other)),
        }
    }

    /// `T&&` with reference collapsing.
    pub fn rref(self) -> Self {
        match self {
            r @ (CanonType::LRef(_) | CanonType::RRef(_)) => r,
            other => CanonType::RRef(Box::new(other)),
        }
    }

    pub fn array(self, size: Option<ConstValue>) -> Self {
        CanonType::Array(Box::new(self), size)
    }

    /// Adds cv qualifiers. Qualifiers merge rather than nest, are dropped on
    /// references and move onto array elements.
    pub fn qualified(self, cv: Cv) -> Self {
        if cv.is_empty() {
            return self;
        }
        match self {
            CanonType::Qualified(inner, existing) => CanonType::Qualified(inner, existing.union(cv)),
            r @ (CanonType::LRef(_) | CanonType::RRef(_)) => r,
            CanonType::Array(elem, size) => CanonType::Array(Box::new(elem.qualified(cv)), size),
            other => CanonType::Qualified(Box::new(other), cv),
        }
    }

    pub fn is_dependent(&self) -> bool {
        match self {
            CanonType::Builtin(_) | CanonType::Named(_) => false,
            CanonType::Param { .. } => true,
            CanonType::Specialization { args, .. } => args.iter().any(TemplateArgument::is_dependent),
            CanonType::Member(base, _) => base.is_dependent(),
            CanonType::Pointer(inner)
            | CanonType::LRef(inner)
            | CanonType::RRef(inner)
            | CanonType::Qualified(inner, _) => inner.is_dependent(),
            CanonType::Array(elem, size) => {
                elem.is_dependent() || matches!(size, Some(ConstValue::Dependent(_)))
            }
            CanonType::Opaque { dependent, .. } => *dependent,
        }
    }

    /// Class templates whose type parameters occur in this type, deduplicated.
    pub fn owning_templates(&self) -> Vec<TemplateId> {
        let mut out = Vec::new();
        self.collect_owners(&mut out);
        out
    }

    fn collect_owners(&self, out: &mut Vec<TemplateId>) {
        match self {
            CanonType::Param { key: ParamKey::ClassTemplate(id), .. } => {
                if !out.contains(&id.template) {
                    out.push(id.template);
                }
            }
            CanonType::Specialization { args, .. } => {
                for arg in args {
                    arg.collect_owners(out);
                }
            }
            CanonType::Member(inner, _)
            | CanonType::Pointer(inner)
            | CanonType::LRef(inner)
            | CanonType::RRef(inner)
            | CanonType::Array(inner, _)
            | CanonType::Qualified(inner, _) => inner.collect_owners(out),
            CanonType::Builtin(_) | CanonType::Named(_) | CanonType::Param { .. } | CanonType::Opaque { .. } => {}
        }
    }

    /// Every specialization mentioned anywhere inside this type, outermost first.
    pub fn specializations(&self) -> Vec<&CanonType> {
        let mut out = Vec::new();
        self.collect_specializations(&mut out);
        out
    }

    fn collect_specializations<'a>(&'a self, out: &mut Vec<&'a CanonType>) {
        match self {
            CanonType::Specialization { args, .. } => {
                out.push(self);
                for arg in args {
                    arg.collect_specializations(out);
                }
            }
            CanonType::Member(inner, _)
            | CanonType::Pointer(inner)
            | CanonType::LRef(inner)
            | CanonType::RRef(inner)
            | CanonType::Array(inner, _)
            | CanonType::Qualified(inner, _) => inner.collect_specializations(out),
            CanonType::Builtin(_) | CanonType::Named(_) | CanonType::Param { .. } | CanonType::Opaque { .. } => {}
        }
    }
}

impl TemplateArgument {
    pub fn is_dependent(&self) -> bool {
        match self {
            TemplateArgument::Type(ty) => ty.is_dependent(),
            TemplateArgument::Value(v) => matches!(v, ConstValue::Dependent(_)),
            TemplateArgument::Template { dependent, .. } => *dependent,
            TemplateArgument::Pack(items) => items.iter().any(TemplateArgument::is_dependent),
        }
    }

    pub fn as_type(&self) -> Option<&CanonType> {
        match self {
            TemplateArgument::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TemplateArgument::Type(_) => "type",
            TemplateArgument::Value(_) => "value",
            TemplateArgument::Template { .. } => "template",
            TemplateArgument::Pack(_) => "pack",
        }
    }

    fn collect_owners(&self, out: &mut Vec<TemplateId>) {
        match self {
            TemplateArgument::Type(ty) => ty.collect_owners(out),
            TemplateArgument::Pack(items) => {
                for item in items {
                    item.collect_owners(out);
                }
            }
            TemplateArgument::Value(_) | TemplateArgument::Template { .. } => {}
        }
    }

    fn collect_specializations<'a>(&'a self, out: &mut Vec<&'a CanonType>) {
        match self {
            TemplateArgument::Type(ty) => ty.collect_specializations(out),
            TemplateArgument::Pack(items) => {
                for item in items {
                    item.collect_specializations(out);
                }
            }
            TemplateArgument::Value(_) | TemplateArgument::Template { .. } => {}
        }
    }
}

fn cv_spelling(cv: Cv) -> &'static str {
    match (cv.is_const, cv.is_volatile) {
        (true, true) => "const volatile",
        (true, false) => "const",
        (false, true) => "volatile",
        (false, false) => "",
    }
}

impl CanonType {
    /// Prints in clang's style: the base type on the left, declarators built
    /// inside out (`int *const`, `const char *`, `int (*)[3]`).
    fn print_with(&self, inner: String, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonType::Pointer(pointee) => print_declarator(pointee, "*", inner, f),
            CanonType::LRef(pointee) => print_declarator(pointee, "&", inner, f),
            CanonType::RRef(pointee) => print_declarator(pointee, "&&", inner, f),
            CanonType::Qualified(base, cv) => match &**base {
                // `int *const`: qualifiers on a pointer print after its star.
                CanonType::Pointer(pointee) => {
                    let mut declarator = format!("*{}", cv_spelling(*cv));
                    if !inner.is_empty() {
                        declarator.push(' ');
                        declarator.push_str(&inner);
                    }
                    if matches!(**pointee, CanonType::Array(..)) {
                        declarator = format!("({declarator})");
                    }
                    pointee.print_with(declarator, f)
                }
                _ => {
                    write!(f, "{} ", cv_spelling(*cv))?;
                    base.print_with(inner, f)
                }
            },
            CanonType::Array(elem, size) => {
                let size = match size {
                    Some(value) => value.to_string(),
                    None => String::new(),
                };
                elem.print_with(format!("{inner}[{size}]"), f)
            }
            _ => {
                self.print_base(f)?;
                if !inner.is_empty() {
                    write!(f, " {inner}")?;
                }
                Ok(())
            }
        }
    }

    fn print_base(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonType::Builtin(b) => f.write_str(b.spelling()),
            CanonType::Named(name) => f.write_str(name),
            CanonType::Specialization { name, args, shown, .. } => {
                write!(f, "{name}<")?;
                let shown = shown.0.min(args.len());
                for (i, arg) in args.iter().take(shown).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
            CanonType::Param { name, .. } => f.write_str(&name.0),
            CanonType::Member(base, name) => write!(f, "{base}::{name}"),
            CanonType::Opaque { text, .. } => f.write_str(text),
            CanonType::Pointer(_)
            | CanonType::LRef(_)
            | CanonType::RRef(_)
            | CanonType::Array(..)
            | CanonType::Qualified(..) => self.print_with(String::new(), f),
        }
    }
}

fn print_declarator(pointee: &CanonType, op: &str, inner: String, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut declarator = format!("{op}{inner}");
    if matches!(pointee, CanonType::Array(..)) {
        declarator = format!("({declarator})");
    }
    pointee.print_with(declarator, f)
}

impl fmt::Display for CanonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print_with(String::new(), f)
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(n) => write!(f, "{n}"),
            ConstValue::Expr(text) | ConstValue::Dependent(text) => f.write_str(text),
        }
    }
}

impl fmt::Display for TemplateArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateArgument::Type(ty) => write!(f, "{ty}"),
            TemplateArgument::Value(v) => write!(f, "{v}"),
            TemplateArgument::Template { name, .. } => f.write_str(name),
            TemplateArgument::Pack(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}
