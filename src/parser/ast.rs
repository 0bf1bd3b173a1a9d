use crate::lexer::token::Token;
use crate::span::Spanned;

#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub decls: Vec<Spanned<Decl>>,
}

#[derive(Debug, Clone)]
pub enum Decl {
    Namespace(NamespaceDecl),
    /// `extern "C" { ... }` or `extern "C" decl`
    Linkage(Vec<Spanned<Decl>>),
    Record(RecordDecl),
    Enum(EnumDecl),
    Template(TemplateDecl),
    ExplicitInstantiation(ExplicitInstantiation),
    Alias(AliasDecl),
    /// Any declaration the front end does not model structurally: functions,
    /// variables, friend declarations, using-directives, statements.
    Other(Soup),
}

#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    pub name: Option<Spanned<String>>,
    pub decls: Vec<Spanned<Decl>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKey {
    Class,
    Struct,
    Union,
}

impl std::fmt::Display for ClassKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassKey::Class => write!(f, "class"),
            ClassKey::Struct => write!(f, "struct"),
            ClassKey::Union => write!(f, "union"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordDecl {
    pub key: ClassKey,
    /// `None` for anonymous records. May carry template arguments (explicit or
    /// partial specializations) or qualifiers (out-of-line nested classes).
    pub name: Option<Spanned<Path>>,
    pub bases: Vec<Spanned<TypeExpr>>,
    /// `None` for forward declarations.
    pub body: Option<Vec<Spanned<Decl>>>,
    /// Declarators following the closing brace: `struct S { } a, *b;`
    pub declarators: Soup,
}

impl RecordDecl {
    /// The declared name when it is a plain identifier (no qualifier, no arguments).
    pub fn simple_name(&self) -> Option<&Spanned<String>> {
        let path = &self.name.as_ref()?.node;
        match path.segments.as_slice() {
            [seg] if !path.global && seg.args.is_none() => Some(&seg.name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Option<Spanned<String>>,
    pub underlying: Option<Spanned<TypeExpr>>,
    pub body: Option<Soup>,
    pub declarators: Soup,
}

#[derive(Debug, Clone)]
pub struct TemplateDecl {
    /// Empty for explicit specializations (`template <>`).
    pub params: Vec<Spanned<TemplateParam>>,
    pub decl: Box<Spanned<Decl>>,
}

impl TemplateDecl {
    /// Follows nested headers (`template <> template <class U> ...`) to the
    /// declaration they introduce.
    pub fn innermost(&self) -> &Spanned<Decl> {
        match &self.decl.node {
            Decl::Template(inner) => inner.innermost(),
            _ => &self.decl,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateParam {
    pub kind: TemplateParamKind,
    pub name: Option<Spanned<String>>,
    pub is_pack: bool,
    pub default: Option<Spanned<TemplateArg>>,
}

#[derive(Debug, Clone)]
pub enum TemplateParamKind {
    /// `typename T` / `class T`
    Type,
    /// `int N`, `T V`
    NonType(Spanned<TypeExpr>),
    /// `template <class> class TT`
    Template(Vec<Spanned<TemplateParam>>),
}

#[derive(Debug, Clone)]
pub struct ExplicitInstantiation {
    pub is_extern: bool,
    pub decl: Box<Spanned<Decl>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    Typedef,
    Using,
}

#[derive(Debug, Clone)]
pub struct AliasDecl {
    pub kind: AliasKind,
    pub name: Spanned<String>,
    pub target: Spanned<TypeExpr>,
}

/// A possibly qualified name: `::ns::Box<int>::value_type`.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub global: bool,
    pub segments: Vec<PathSegment>,
}

impl Path {
    pub fn single(name: Spanned<String>) -> Self {
        Self { global: false, segments: vec![PathSegment { name, args: None, template_kw: false }] }
    }

    pub fn last(&self) -> &PathSegment {
        // Paths are never built without at least one segment.
        &self.segments[self.segments.len() - 1]
    }

    pub fn is_simple(&self) -> bool {
        !self.global && self.segments.len() == 1 && self.segments[0].args.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub name: Spanned<String>,
    pub args: Option<Spanned<Vec<Spanned<TemplateArg>>>>,
    /// `T::template Inner<int>`
    pub template_kw: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateArg {
    Type(TypeExpr),
    Expr(Soup),
    /// `Ts...`
    Expansion(Box<TemplateArg>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct Cv {
    pub is_const: bool,
    pub is_volatile: bool,
}

impl Cv {
    pub const NONE: Cv = Cv { is_const: false, is_volatile: false };

    pub fn is_empty(&self) -> bool {
        !self.is_const && !self.is_volatile
    }

    pub fn union(self, other: Cv) -> Cv {
        Cv {
            is_const: self.is_const || other.is_const,
            is_volatile: self.is_volatile || other.is_volatile,
        }
    }

    pub fn add(&mut self, tok: &Token) {
        match tok {
            Token::Const => self.is_const = true,
            Token::Volatile => self.is_volatile = true,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub cv: Cv,
    pub base: Spanned<TypeBase>,
    pub declarators: Vec<Spanned<Declarator>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeBase {
    Builtin(BuiltinType),
    Named {
        path: Path,
        /// `typename T::type`
        typename: bool,
        /// `struct S`, `enum E`
        elaborated: bool,
    },
    Decltype(Soup),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declarator {
    Pointer(Cv),
    LRef,
    RRef,
    Array(Soup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub enum BuiltinType {
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    WChar,
    Char8,
    Char16,
    Char32,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
    Auto,
}

impl BuiltinType {
    pub fn spelling(&self) -> &'static str {
        match self {
            BuiltinType::Void => "void",
            BuiltinType::Bool => "bool",
            BuiltinType::Char => "char",
            BuiltinType::SignedChar => "signed char",
            BuiltinType::UnsignedChar => "unsigned char",
            BuiltinType::WChar => "wchar_t",
            BuiltinType::Char8 => "char8_t",
            BuiltinType::Char16 => "char16_t",
            BuiltinType::Char32 => "char32_t",
            BuiltinType::Short => "short",
            BuiltinType::UnsignedShort => "unsigned short",
            BuiltinType::Int => "int",
            BuiltinType::UnsignedInt => "unsigned int",
            BuiltinType::Long => "long",
            BuiltinType::UnsignedLong => "unsigned long",
            BuiltinType::LongLong => "long long",
            BuiltinType::UnsignedLongLong => "unsigned long long",
            BuiltinType::Float => "float",
            BuiltinType::Double => "double",
            BuiltinType::LongDouble => "long double",
            BuiltinType::Auto => "auto",
        }
    }
}

/// Token sequence with names resolved structurally, used for everything
/// the front end does not parse into declarations.
pub type Soup = Vec<Spanned<Fragment>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// A name in reference position, possibly a template-id.
    Name(Path),
    /// Identifier after `.` or `->`; never a use of an outer declaration.
    Member(String),
    Token(Token),
}
