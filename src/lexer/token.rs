use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f\x0B]+")]
pub enum Token {
    // Declaration keywords
    #[token("template")]
    Template,
    #[token("typename")]
    Typename,
    #[token("class")]
    Class,
    #[token("struct")]
    Struct,
    #[token("union")]
    Union,
    #[token("enum")]
    Enum,
    #[token("namespace")]
    Namespace,
    #[token("using")]
    Using,
    #[token("typedef")]
    Typedef,
    #[token("extern")]
    Extern,
    #[token("friend")]
    Friend,
    #[token("operator")]
    Operator,
    #[token("decltype")]
    Decltype,
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("final")]
    Final,
    #[token("virtual")]
    Virtual,

    // Qualifiers
    #[token("const")]
    Const,
    #[token("volatile")]
    Volatile,

    // Builtin type specifiers
    #[token("void")]
    Void,
    #[token("bool")]
    Bool,
    #[token("char")]
    Char,
    #[token("wchar_t")]
    WChar,
    #[token("char8_t")]
    Char8,
    #[token("char16_t")]
    Char16,
    #[token("char32_t")]
    Char32,
    #[token("short")]
    Short,
    #[token("int")]
    Int,
    #[token("long")]
    Long,
    #[token("signed")]
    Signed,
    #[token("unsigned")]
    Unsigned,
    #[token("float")]
    Float,
    #[token("double")]
    Double,
    #[token("auto")]
    Auto,

    // Literals
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("nullptr")]
    Nullptr,

    #[regex(r"(0[xX][0-9a-fA-F']+|0[bB][01']+|[0-9][0-9']*)[uUlLzZ]*", |lex| parse_int_literal(lex.slice()))]
    IntLit(u128),

    #[regex(r"([0-9][0-9']*\.[0-9']*|\.[0-9][0-9']*)([eE][+-]?[0-9]+)?[fFlL]?")]
    #[regex(r"[0-9][0-9']*[eE][+-]?[0-9]+[fFlL]?")]
    FloatLit,

    #[regex(r"(u8|u|U|L)?'([^'\\\n]|\\.)*'")]
    CharLit,

    #[regex(r#"(u8|u|U|L)?"([^"\\\n]|\\.)*""#)]
    StringLit,

    // Identifiers
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Ident,

    // Operators. `>` is always a single token so `Box<Box<int>>` closes twice.
    #[token("::")]
    ColonColon,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token("...")]
    Ellipsis,
    #[token(".")]
    Dot,
    #[token("->")]
    Arrow,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token("<<")]
    Shl,
    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("!")]
    Bang,
    #[token("+")]
    Plus,
    #[token("++")]
    PlusPlus,
    #[token("-")]
    Minus,
    #[token("--")]
    MinusMinus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("&&")]
    AmpAmp,
    #[token("|")]
    Pipe,
    #[token("||")]
    PipePipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("?")]
    Question,
    #[regex(r"(\+|-|\*|/|%|&|\||\^|<<)=")]
    CompoundAssign,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Comments and preprocessor lines (skipped by `lex`)
    #[regex(r"//[^\n]*", allow_greedy = true)]
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    Comment,
    #[regex(r"#([^\n\\]|\\[^\n]|\\\n)*")]
    Directive,
}

/// Parse a C++ integer literal, ignoring digit separators and suffixes.
fn parse_int_literal(s: &str) -> Option<u128> {
    let digits: String = s
        .trim_end_matches(['u', 'U', 'l', 'L', 'z', 'Z'])
        .chars()
        .filter(|&c| c != '\'')
        .collect();
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u128::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        u128::from_str_radix(bin, 2).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        u128::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse::<u128>().ok()
    }
}

impl Token {
    /// Builtin type specifier keywords (`unsigned`, `int`, ...).
    pub fn is_builtin_specifier(&self) -> bool {
        matches!(
            self,
            Token::Void
                | Token::Bool
                | Token::Char
                | Token::WChar
                | Token::Char8
                | Token::Char16
                | Token::Char32
                | Token::Short
                | Token::Int
                | Token::Long
                | Token::Signed
                | Token::Unsigned
                | Token::Float
                | Token::Double
                | Token::Auto
        )
    }

    pub fn is_class_key(&self) -> bool {
        matches!(self, Token::Class | Token::Struct | Token::Union)
    }

    pub fn is_cv(&self) -> bool {
        matches!(self, Token::Const | Token::Volatile)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Token::Template => "template",
            Token::Typename => "typename",
            Token::Class => "class",
            Token::Struct => "struct",
            Token::Union => "union",
            Token::Enum => "enum",
            Token::Namespace => "namespace",
            Token::Using => "using",
            Token::Typedef => "typedef",
            Token::Extern => "extern",
            Token::Friend => "friend",
            Token::Operator => "operator",
            Token::Decltype => "decltype",
            Token::Public => "public",
            Token::Private => "private",
            Token::Protected => "protected",
            Token::Final => "final",
            Token::Virtual => "virtual",
            Token::Const => "const",
            Token::Volatile => "volatile",
            Token::Void => "void",
            Token::Bool => "bool",
            Token::Char => "char",
            Token::WChar => "wchar_t",
            Token::Char8 => "char8_t",
            Token::Char16 => "char16_t",
            Token::Char32 => "char32_t",
            Token::Short => "short",
            Token::Int => "int",
            Token::Long => "long",
            Token::Signed => "signed",
            Token::Unsigned => "unsigned",
            Token::Float => "float",
            Token::Double => "double",
            Token::Auto => "auto",
            Token::True => "true",
            Token::False => "false",
            Token::Nullptr => "nullptr",
            Token::IntLit(n) => return write!(f, "{n}"),
            Token::FloatLit => "floating literal",
            Token::CharLit => "character literal",
            Token::StringLit => "string literal",
            Token::Ident => "identifier",
            Token::ColonColon => "'::'",
            Token::Colon => "':'",
            Token::Semi => "';'",
            Token::Comma => "','",
            Token::Ellipsis => "'...'",
            Token::Dot => "'.'",
            Token::Arrow => "'->'",
            Token::Lt => "'<'",
            Token::Gt => "'>'",
            Token::LtEq => "'<='",
            Token::Shl => "'<<'",
            Token::Eq => "'='",
            Token::EqEq => "'=='",
            Token::BangEq => "'!='",
            Token::Bang => "'!'",
            Token::Plus => "'+'",
            Token::PlusPlus => "'++'",
            Token::Minus => "'-'",
            Token::MinusMinus => "'--'",
            Token::Star => "'*'",
            Token::Slash => "'/'",
            Token::Percent => "'%'",
            Token::Amp => "'&'",
            Token::AmpAmp => "'&&'",
            Token::Pipe => "'|'",
            Token::PipePipe => "'||'",
            Token::Caret => "'^'",
            Token::Tilde => "'~'",
            Token::Question => "'?'",
            Token::CompoundAssign => "compound assignment",
            Token::LParen => "'('",
            Token::RParen => "')'",
            Token::LBrace => "'{'",
            Token::RBrace => "'}'",
            Token::LBracket => "'['",
            Token::RBracket => "']'",
            Token::Comment => "comment",
            Token::Directive => "preprocessor directive",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_literal_radixes() {
        assert_eq!(parse_int_literal("42"), Some(42));
        assert_eq!(parse_int_literal("0x1F"), Some(31));
        assert_eq!(parse_int_literal("0b101"), Some(5));
        assert_eq!(parse_int_literal("017"), Some(15));
        assert_eq!(parse_int_literal("0"), Some(0));
    }

    #[test]
    fn int_literal_suffixes_and_separators() {
        assert_eq!(parse_int_literal("10u"), Some(10));
        assert_eq!(parse_int_literal("10ULL"), Some(10));
        assert_eq!(parse_int_literal("1'000"), Some(1000));
    }

    #[test]
    fn builtin_specifier_classification() {
        assert!(Token::Unsigned.is_builtin_specifier());
        assert!(!Token::Const.is_builtin_specifier());
        assert!(Token::Struct.is_class_key());
        assert!(!Token::Enum.is_class_key());
    }
}
