pub mod ast;

use std::collections::HashSet;

use crate::diagnostics::ReduceError;
use crate::lexer::token::Token;
use crate::span::{Span, Spanned};
use ast::*;

pub struct Parser<'a> {
    tokens: &'a [Spanned<Token>],
    source: &'a str,
    pos: usize,
    template_names: HashSet<String>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Spanned<Token>], source: &'a str) -> Self {
        Self { tokens, source, pos: 0, template_names: HashSet::new() }
    }

    fn peek(&self) -> Option<&Spanned<Token>> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.node)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|t| &t.node)
    }

    fn check(&self, expected: &Token) -> bool {
        matches!(self.peek_kind(), Some(tok) if std::mem::discriminant(tok) == std::mem::discriminant(expected))
    }

    fn advance(&mut self) -> Option<&Spanned<Token>> {
        if self.pos < self.tokens.len() {
            let tok = &self.tokens[self.pos];
            self.pos += 1;
            Some(tok)
        } else {
            None
        }
    }

    fn eat(&mut self, expected: &Token) -> Option<Span> {
        if self.check(expected) {
            self.advance().map(|t| t.span)
        } else {
            None
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<Span, ReduceError> {
        match self.tokens.get(self.pos) {
            Some(tok) if std::mem::discriminant(&tok.node) == std::mem::discriminant(expected) => {
                self.pos += 1;
                Ok(tok.span)
            }
            Some(tok) => Err(ReduceError::syntax(
                format!("expected {expected}, found {}", self.describe(tok)),
                tok.span,
            )),
            None => Err(ReduceError::syntax(
                format!("expected {expected}, found end of file"),
                self.eof_span(),
            )),
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, ReduceError> {
        match self.tokens.get(self.pos) {
            Some(tok) if matches!(tok.node, Token::Ident) => {
                let name = self.source[tok.span.start..tok.span.end].to_string();
                self.pos += 1;
                Ok(Spanned::new(name, tok.span))
            }
            Some(tok) => Err(ReduceError::syntax(
                format!("expected identifier, found {}", self.describe(tok)),
                tok.span,
            )),
            None => Err(ReduceError::syntax("expected identifier, found end of file", self.eof_span())),
        }
    }

    fn describe(&self, tok: &Spanned<Token>) -> String {
        match tok.node {
            Token::Ident => format!("identifier '{}'", tok.span.text(self.source)),
            _ => tok.node.to_string(),
        }
    }

    fn ident_is(&self, offset: usize, text: &str) -> bool {
        match self.tokens.get(self.pos + offset) {
            Some(tok) => matches!(tok.node, Token::Ident) && tok.span.text(self.source) == text,
            None => false,
        }
    }

    fn start_span(&self) -> Span {
        self.peek().map(|t| t.span).unwrap_or_else(|| self.eof_span())
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 { 0 } else { self.tokens[self.pos - 1].span.end }
    }

    fn span_from(&self, start: Span) -> Span {
        Span::new(start.start, self.prev_end().max(start.start))
    }

    fn eof_span(&self) -> Span {
        if let Some(last) = self.tokens.last() {
            Span::new(last.span.end, last.span.end)
        } else {
            Span::dummy()
        }
    }

    /// Index just past the `>` closing the angle bracket opened at `open`.
    fn matching_angle(&self, open: usize) -> Option<usize> {
        let mut angle = 0usize;
        let mut paren = 0usize;
        for (i, tok) in self.tokens.iter().enumerate().skip(open) {
            match tok.node {
                Token::LParen | Token::LBracket => paren += 1,
                Token::RParen | Token::RBracket => paren = paren.saturating_sub(1),
                Token::Lt if paren == 0 => angle += 1,
                Token::Gt if paren == 0 => {
                    angle -= 1;
                    if angle == 0 {
                        return Some(i + 1);
                    }
                }
                Token::Semi | Token::LBrace | Token::RBrace => return None,
                _ => {}
            }
        }
        None
    }

    /// `<` after a name starts a template argument list only when the name is a
    /// class or alias template. Collect those names before parsing.
    fn pre_scan_template_names(&mut self) {
        for i in 0..self.tokens.len() {
            if !matches!(self.tokens[i].node, Token::Template) {
                continue;
            }
            if !matches!(self.tokens.get(i + 1).map(|t| &t.node), Some(Token::Lt)) {
                continue;
            }
            let Some(mut j) = self.matching_angle(i + 1) else { continue };
            if matches!(self.tokens.get(j).map(|t| &t.node), Some(Token::Friend)) {
                j += 1;
            }
            let head = self.tokens.get(j).map(|t| &t.node);
            let named = matches!(head, Some(Token::Class | Token::Struct | Token::Union | Token::Using));
            if named {
                if let Some(name_tok) = self.tokens.get(j + 1) {
                    if matches!(name_tok.node, Token::Ident) {
                        self.template_names.insert(name_tok.span.text(self.source).to_string());
                    }
                }
            }
        }
    }

    fn check_builtin_scope(&self) -> Result<(), ReduceError> {
        for pair in self.tokens.windows(2) {
            if pair[0].node.is_builtin_specifier() && matches!(pair[1].node, Token::ColonColon) {
                return Err(ReduceError::syntax(
                    format!("'{}' cannot be used prior to '::' because it has no members", pair[0].node),
                    pair[0].span,
                ));
            }
        }
        Ok(())
    }

    pub fn parse_translation_unit(&mut self) -> Result<TranslationUnit, ReduceError> {
        self.check_builtin_scope()?;
        self.pre_scan_template_names();
        let mut decls = Vec::new();
        while let Some(tok) = self.peek() {
            if matches!(tok.node, Token::RBrace) {
                return Err(ReduceError::syntax("unexpected '}'", tok.span));
            }
            if let Some(decl) = self.parse_decl()? {
                decls.push(decl);
            }
        }
        Ok(TranslationUnit { decls })
    }

    /// Parses declarations up to and including the closing `}` of a body.
    fn parse_body(&mut self) -> Result<Vec<Spanned<Decl>>, ReduceError> {
        let mut decls = Vec::new();
        loop {
            match self.peek_kind() {
                Some(Token::RBrace) => {
                    self.advance();
                    return Ok(decls);
                }
                None => return Err(ReduceError::syntax("expected '}', found end of file", self.eof_span())),
                _ => {
                    if let Some(decl) = self.parse_decl()? {
                        decls.push(decl);
                    }
                }
            }
        }
    }

    /// Returns `None` for declarations that carry nothing: stray `;` and
    /// access specifiers.
    fn parse_decl(&mut self) -> Result<Option<Spanned<Decl>>, ReduceError> {
        let Some(kind) = self.peek_kind() else { return Ok(None) };
        let decl = match kind {
            Token::Semi => {
                self.advance();
                return Ok(None);
            }
            Token::Public | Token::Private | Token::Protected
                if matches!(self.peek_kind_at(1), Some(Token::Colon)) =>
            {
                self.pos += 2;
                return Ok(None);
            }
            Token::Namespace => self.parse_namespace()?,
            Token::Ident if self.ident_is(0, "inline") && matches!(self.peek_kind_at(1), Some(Token::Namespace)) => {
                self.advance();
                self.parse_namespace()?
            }
            Token::Extern => self.parse_extern()?,
            Token::Template => self.parse_template()?,
            Token::Class | Token::Struct | Token::Union => self.parse_record_or_soup()?,
            Token::Enum => self.parse_enum_or_soup()?,
            Token::Typedef => self.parse_typedef_or_soup()?,
            Token::Using => self.parse_using_or_soup()?,
            _ => self.parse_soup_decl()?,
        };
        Ok(Some(decl))
    }

    fn parse_namespace(&mut self) -> Result<Spanned<Decl>, ReduceError> {
        let start = self.start_span();
        let saved = self.pos;
        self.expect(&Token::Namespace)?;
        let mut names = Vec::new();
        while self.check(&Token::Ident) {
            names.push(self.expect_ident()?);
            if self.eat(&Token::ColonColon).is_none() {
                break;
            }
        }
        if !self.check(&Token::LBrace) {
            // namespace alias: `namespace fs = std::filesystem;`
            self.pos = saved;
            return self.parse_soup_decl();
        }
        self.advance();
        let mut decls = self.parse_body()?;
        let span = self.span_from(start);
        // `namespace a::b { }` nests innermost-first.
        let mut name = names.pop();
        loop {
            let ns = NamespaceDecl { name, decls };
            match names.pop() {
                Some(outer) => {
                    decls = vec![Spanned::new(Decl::Namespace(ns), span)];
                    name = Some(outer);
                }
                None => return Ok(Spanned::new(Decl::Namespace(ns), span)),
            }
        }
    }

    fn parse_extern(&mut self) -> Result<Spanned<Decl>, ReduceError> {
        let start = self.start_span();
        match self.peek_kind_at(1) {
            Some(Token::StringLit) => {
                self.pos += 2;
                let decls = if self.eat(&Token::LBrace).is_some() {
                    self.parse_body()?
                } else {
                    self.parse_decl()?.into_iter().collect()
                };
                Ok(Spanned::new(Decl::Linkage(decls), self.span_from(start)))
            }
            Some(Token::Template) if !matches!(self.peek_kind_at(2), Some(Token::Lt)) => {
                self.pos += 2;
                let decl = self.parse_required_decl("explicit instantiation")?;
                Ok(Spanned::new(
                    Decl::ExplicitInstantiation(ExplicitInstantiation { is_extern: true, decl: Box::new(decl) }),
                    self.span_from(start),
                ))
            }
            _ => self.parse_soup_decl(),
        }
    }

    fn parse_required_decl(&mut self, what: &str) -> Result<Spanned<Decl>, ReduceError> {
        let at = self.start_span();
        match self.parse_decl()? {
            Some(decl) => Ok(decl),
            None => Err(ReduceError::syntax(format!("expected declaration after {what}"), at)),
        }
    }

    fn parse_template(&mut self) -> Result<Spanned<Decl>, ReduceError> {
        let start = self.start_span();
        self.expect(&Token::Template)?;
        if self.eat(&Token::Lt).is_none() {
            let decl = self.parse_required_decl("explicit instantiation")?;
            return Ok(Spanned::new(
                Decl::ExplicitInstantiation(ExplicitInstantiation { is_extern: false, decl: Box::new(decl) }),
                self.span_from(start),
            ));
        }
        let params = self.parse_template_params()?;
        let decl = self.parse_required_decl("template parameter list")?;
        Ok(Spanned::new(
            Decl::Template(TemplateDecl { params, decl: Box::new(decl) }),
            self.span_from(start),
        ))
    }

    /// Parses a template parameter list after its opening `<`.
    fn parse_template_params(&mut self) -> Result<Vec<Spanned<TemplateParam>>, ReduceError> {
        let mut params = Vec::new();
        if self.eat(&Token::Gt).is_some() {
            return Ok(params);
        }
        loop {
            params.push(self.parse_template_param()?);
            if self.eat(&Token::Comma).is_some() {
                continue;
            }
            self.expect(&Token::Gt)?;
            return Ok(params);
        }
    }

    fn parse_template_param(&mut self) -> Result<Spanned<TemplateParam>, ReduceError> {
        let start = self.start_span();
        let is_type_param = match self.peek_kind() {
            Some(Token::Class) => true,
            // `typename T::type N` declares a non-type parameter.
            Some(Token::Typename) => !matches!(
                (self.peek_kind_at(1), self.peek_kind_at(2)),
                (Some(Token::Ident), Some(Token::ColonColon | Token::Lt))
            ),
            _ => false,
        };
        let kind = if is_type_param {
            self.advance();
            TemplateParamKind::Type
        } else if self.check(&Token::Template) {
            self.advance();
            self.expect(&Token::Lt)?;
            let inner = self.parse_template_params()?;
            if self.eat(&Token::Class).is_none() {
                self.expect(&Token::Typename)?;
            }
            TemplateParamKind::Template(inner)
        } else {
            TemplateParamKind::NonType(self.parse_type()?)
        };
        let is_pack = self.eat(&Token::Ellipsis).is_some();
        let name = if self.check(&Token::Ident) { Some(self.expect_ident()?) } else { None };
        let default = if self.eat(&Token::Eq).is_some() { Some(self.parse_template_arg()?) } else { None };
        Ok(Spanned::new(TemplateParam { kind, name, is_pack, default }, self.span_from(start)))
    }

    fn skip_attributes(&mut self) -> Result<(), ReduceError> {
        loop {
            if self.ident_is(0, "__attribute__") || self.ident_is(0, "alignas") || self.ident_is(0, "__declspec") {
                self.advance();
                self.skip_balanced(&Token::LParen, &Token::RParen)?;
            } else if self.check(&Token::LBracket) && matches!(self.peek_kind_at(1), Some(Token::LBracket)) {
                self.skip_balanced(&Token::LBracket, &Token::RBracket)?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_balanced(&mut self, open: &Token, close: &Token) -> Result<(), ReduceError> {
        self.expect(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            let Some(tok) = self.advance() else {
                return Err(ReduceError::syntax(format!("expected {close}, found end of file"), self.eof_span()));
            };
            if std::mem::discriminant(&tok.node) == std::mem::discriminant(open) {
                depth += 1;
            } else if std::mem::discriminant(&tok.node) == std::mem::discriminant(close) {
                depth -= 1;
            }
        }
        Ok(())
    }

    fn parse_record_or_soup(&mut self) -> Result<Spanned<Decl>, ReduceError> {
        let start = self.start_span();
        let saved = self.pos;
        let key = match self.advance().map(|t| &t.node) {
            Some(Token::Class) => ClassKey::Class,
            Some(Token::Struct) => ClassKey::Struct,
            _ => ClassKey::Union,
        };
        self.skip_attributes()?;
        let name = if matches!(self.peek_kind(), Some(Token::Ident | Token::ColonColon)) {
            Some(self.parse_path()?)
        } else {
            None
        };
        self.eat(&Token::Final);

        let mut bases = Vec::new();
        match self.peek_kind() {
            Some(Token::Semi) if name.is_some() => {
                self.advance();
                let record = RecordDecl { key, name, bases, body: None, declarators: Vec::new() };
                return Ok(Spanned::new(Decl::Record(record), self.span_from(start)));
            }
            Some(Token::Colon) => {
                self.advance();
                loop {
                    while matches!(
                        self.peek_kind(),
                        Some(Token::Public | Token::Private | Token::Protected | Token::Virtual)
                    ) {
                        self.advance();
                    }
                    bases.push(self.parse_type()?);
                    self.eat(&Token::Ellipsis);
                    if self.eat(&Token::Comma).is_none() {
                        break;
                    }
                }
                if !self.check(&Token::LBrace) {
                    self.pos = saved;
                    return self.parse_soup_decl();
                }
            }
            Some(Token::LBrace) => {}
            _ => {
                // Elaborated type in some other declaration: `struct S *p;`
                self.pos = saved;
                return self.parse_soup_decl();
            }
        }

        self.expect(&Token::LBrace)?;
        let body = self.parse_body()?;
        let declarators = self.parse_soup(false)?;
        let record = RecordDecl { key, name, bases, body: Some(body), declarators };
        Ok(Spanned::new(Decl::Record(record), self.span_from(start)))
    }

    fn parse_enum_or_soup(&mut self) -> Result<Spanned<Decl>, ReduceError> {
        let start = self.start_span();
        let saved = self.pos;
        self.expect(&Token::Enum)?;
        if self.eat(&Token::Class).is_none() {
            self.eat(&Token::Struct);
        }
        self.skip_attributes()?;
        let name = if self.check(&Token::Ident) { Some(self.expect_ident()?) } else { None };
        let underlying = if self.eat(&Token::Colon).is_some() { Some(self.parse_type()?) } else { None };
        let body = match self.peek_kind() {
            Some(Token::LBrace) => {
                self.advance();
                let mut soup = Vec::new();
                let mut depth = 0usize;
                loop {
                    match self.peek_kind() {
                        None => return Err(ReduceError::syntax("expected '}', found end of file", self.eof_span())),
                        Some(Token::RBrace) if depth == 0 => {
                            self.advance();
                            break;
                        }
                        Some(Token::LParen | Token::LBracket | Token::LBrace) => depth += 1,
                        Some(Token::RParen | Token::RBracket | Token::RBrace) => depth -= 1,
                        _ => {}
                    }
                    self.soup_step(&mut soup)?;
                }
                Some(soup)
            }
            Some(Token::Semi) if name.is_some() => None,
            _ => {
                self.pos = saved;
                return self.parse_soup_decl();
            }
        };
        let declarators = self.parse_soup(false)?;
        let decl = EnumDecl { name, underlying, body, declarators };
        Ok(Spanned::new(Decl::Enum(decl), self.span_from(start)))
    }

    fn parse_typedef_or_soup(&mut self) -> Result<Spanned<Decl>, ReduceError> {
        let start = self.start_span();
        let saved = self.pos;
        self.expect(&Token::Typedef)?;
        match self.try_parse_typedef_tail() {
            Some((name, target)) => {
                let alias = AliasDecl { kind: AliasKind::Typedef, name, target };
                Ok(Spanned::new(Decl::Alias(alias), self.span_from(start)))
            }
            None => {
                self.pos = saved;
                self.parse_soup_decl()
            }
        }
    }

    fn try_parse_typedef_tail(&mut self) -> Option<(Spanned<String>, Spanned<TypeExpr>)> {
        let mut target = self.parse_type().ok()?;
        let name = self.expect_ident().ok()?;
        while self.check(&Token::LBracket) {
            let open = self.start_span();
            let size = self.parse_bracketed_soup().ok()?;
            target.node.declarators.push(Spanned::new(Declarator::Array(size), self.span_from(open)));
        }
        self.eat(&Token::Semi)?;
        Some((name, target))
    }

    fn parse_using_or_soup(&mut self) -> Result<Spanned<Decl>, ReduceError> {
        let start = self.start_span();
        let saved = self.pos;
        self.expect(&Token::Using)?;
        if self.check(&Token::Ident) && matches!(self.peek_kind_at(1), Some(Token::Eq)) {
            let name = self.expect_ident()?;
            self.advance();
            if let Ok(target) = self.parse_type() {
                if self.eat(&Token::Semi).is_some() {
                    let alias = AliasDecl { kind: AliasKind::Using, name, target };
                    return Ok(Spanned::new(Decl::Alias(alias), self.span_from(start)));
                }
            }
        }
        self.pos = saved;
        self.parse_soup_decl()
    }

    /// A declaration the front end keeps as a token soup. Ends at a top-level
    /// `;`, or after a top-level brace group (function body) not followed by
    /// `;` or `,`.
    fn parse_soup_decl(&mut self) -> Result<Spanned<Decl>, ReduceError> {
        let start = self.start_span();
        let soup = self.parse_soup(true)?;
        Ok(Spanned::new(Decl::Other(soup), self.span_from(start)))
    }

    fn parse_soup(&mut self, body_ends_decl: bool) -> Result<Soup, ReduceError> {
        let mut soup = Vec::new();
        let mut depth = 0usize;
        loop {
            let Some(tok) = self.peek() else {
                if depth > 0 || !body_ends_decl {
                    return Err(ReduceError::syntax("expected ';', found end of file", self.eof_span()));
                }
                return Ok(soup);
            };
            let mut closed_body = false;
            match tok.node {
                Token::Semi if depth == 0 => {
                    self.advance();
                    return Ok(soup);
                }
                Token::RBrace if depth == 0 => {
                    if body_ends_decl && !soup.is_empty() {
                        return Ok(soup);
                    }
                    return Err(ReduceError::syntax("expected ';' before '}'", tok.span));
                }
                Token::RParen | Token::RBracket if depth == 0 => {
                    return Err(ReduceError::syntax(format!("unexpected {}", tok.node), tok.span));
                }
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket => depth -= 1,
                Token::RBrace => {
                    depth -= 1;
                    closed_body = depth == 0;
                }
                _ => {}
            }
            self.soup_step(&mut soup)?;
            if closed_body && body_ends_decl {
                match self.peek_kind() {
                    Some(Token::Semi) => {
                        self.advance();
                        return Ok(soup);
                    }
                    Some(Token::Comma) => {}
                    _ => return Ok(soup),
                }
            }
        }
    }

    /// Consumes one token, or one whole name (with any template arguments),
    /// and appends it to `soup`.
    fn soup_step(&mut self, soup: &mut Soup) -> Result<(), ReduceError> {
        let Some(tok) = self.peek() else { return Ok(()) };
        let after_member_access = matches!(
            soup.last().map(|f| &f.node),
            Some(Fragment::Token(Token::Dot | Token::Arrow))
        );
        match tok.node {
            Token::Ident if after_member_access => {
                let name = self.expect_ident()?;
                soup.push(Spanned::new(Fragment::Member(name.node), name.span));
            }
            Token::Ident => {
                let path = self.parse_path()?;
                soup.push(Spanned::new(Fragment::Name(path.node), path.span));
            }
            Token::ColonColon if matches!(self.peek_kind_at(1), Some(Token::Ident | Token::Template)) => {
                let path = self.parse_path()?;
                soup.push(Spanned::new(Fragment::Name(path.node), path.span));
            }
            _ => {
                let tok = tok.clone();
                self.advance();
                soup.push(Spanned::new(Fragment::Token(tok.node), tok.span));
            }
        }
        Ok(())
    }

    fn parse_bracketed_soup(&mut self) -> Result<Soup, ReduceError> {
        self.expect(&Token::LBracket)?;
        let mut soup = Vec::new();
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                None => return Err(ReduceError::syntax("expected ']', found end of file", self.eof_span())),
                Some(Token::RBracket) if depth == 0 => {
                    self.advance();
                    return Ok(soup);
                }
                Some(Token::LParen | Token::LBracket | Token::LBrace) => depth += 1,
                Some(Token::RParen | Token::RBracket | Token::RBrace) => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.soup_step(&mut soup)?;
        }
    }

    fn parse_parenthesized_soup(&mut self) -> Result<Soup, ReduceError> {
        self.expect(&Token::LParen)?;
        let mut soup = Vec::new();
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                None => return Err(ReduceError::syntax("expected ')', found end of file", self.eof_span())),
                Some(Token::RParen) if depth == 0 => {
                    self.advance();
                    return Ok(soup);
                }
                Some(Token::LParen | Token::LBracket | Token::LBrace) => depth += 1,
                Some(Token::RParen | Token::RBracket | Token::RBrace) => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.soup_step(&mut soup)?;
        }
    }

    /// Parses a possibly qualified name at an identifier or leading `::`.
    pub fn parse_path(&mut self) -> Result<Spanned<Path>, ReduceError> {
        let start = self.start_span();
        let global = self.eat(&Token::ColonColon).is_some();
        let mut segments = Vec::new();
        loop {
            let template_kw = self.eat(&Token::Template).is_some();
            let name = self.expect_ident()?;
            let args = if self.check(&Token::Lt) && (template_kw || self.template_names.contains(&name.node)) {
                Some(self.parse_template_args()?)
            } else {
                None
            };
            segments.push(PathSegment { name, args, template_kw });
            let continues = self.check(&Token::ColonColon)
                && matches!(self.peek_kind_at(1), Some(Token::Ident | Token::Template));
            if !continues {
                break;
            }
            self.advance();
        }
        Ok(Spanned::new(Path { global, segments }, self.span_from(start)))
    }

    fn parse_template_args(&mut self) -> Result<Spanned<Vec<Spanned<TemplateArg>>>, ReduceError> {
        let start = self.expect(&Token::Lt)?;
        let mut args = Vec::new();
        if self.eat(&Token::Gt).is_none() {
            loop {
                args.push(self.parse_template_arg()?);
                if self.eat(&Token::Comma).is_some() {
                    continue;
                }
                self.expect(&Token::Gt)?;
                break;
            }
        }
        Ok(Spanned::new(args, self.span_from(start)))
    }

    fn at_arg_end(&self) -> bool {
        match self.peek_kind() {
            Some(Token::Comma | Token::Gt) => true,
            Some(Token::Ellipsis) => matches!(self.peek_kind_at(1), Some(Token::Comma | Token::Gt)),
            _ => false,
        }
    }

    fn parse_template_arg(&mut self) -> Result<Spanned<TemplateArg>, ReduceError> {
        let start = self.start_span();
        let saved = self.pos;
        let arg = match self.parse_type() {
            Ok(ty) if self.at_arg_end() => TemplateArg::Type(ty.node),
            _ => {
                self.pos = saved;
                TemplateArg::Expr(self.parse_arg_soup()?)
            }
        };
        let arg = if self.eat(&Token::Ellipsis).is_some() { TemplateArg::Expansion(Box::new(arg)) } else { arg };
        Ok(Spanned::new(arg, self.span_from(start)))
    }

    fn parse_arg_soup(&mut self) -> Result<Soup, ReduceError> {
        let mut soup = Vec::new();
        let mut depth = 0usize;
        loop {
            if depth == 0 && self.at_arg_end() {
                if soup.is_empty() {
                    return Err(ReduceError::syntax("expected template argument", self.start_span()));
                }
                return Ok(soup);
            }
            match self.peek() {
                None => return Err(ReduceError::syntax("expected '>', found end of file", self.eof_span())),
                Some(tok) => match tok.node {
                    Token::Semi | Token::RBrace | Token::RParen | Token::RBracket if depth == 0 => {
                        return Err(ReduceError::syntax(
                            format!("expected '>', found {}", self.describe(tok)),
                            tok.span,
                        ));
                    }
                    Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                    Token::RParen | Token::RBracket | Token::RBrace => depth -= 1,
                    _ => {}
                },
            }
            self.soup_step(&mut soup)?;
        }
    }

    pub fn parse_type(&mut self) -> Result<Spanned<TypeExpr>, ReduceError> {
        let start = self.start_span();
        let mut cv = Cv::default();
        let mut builtins: Vec<Spanned<Token>> = Vec::new();
        let mut base: Option<Spanned<TypeBase>> = None;

        while let Some(tok) = self.peek() {
            let named_or_builtin = base.is_some() || !builtins.is_empty();
            match tok.node {
                Token::Const | Token::Volatile => {
                    cv.add(&tok.node);
                    self.advance();
                }
                ref t if t.is_builtin_specifier() => {
                    if base.is_some() {
                        break;
                    }
                    builtins.push(tok.clone());
                    self.advance();
                }
                Token::Typename | Token::Class | Token::Struct | Token::Union | Token::Enum => {
                    if named_or_builtin {
                        break;
                    }
                    let typename = matches!(tok.node, Token::Typename);
                    self.advance();
                    if !matches!(self.peek_kind(), Some(Token::Ident | Token::ColonColon)) {
                        return Err(ReduceError::syntax("expected type name", self.start_span()));
                    }
                    let path = self.parse_path()?;
                    base = Some(Spanned::new(
                        TypeBase::Named { path: path.node, typename, elaborated: !typename },
                        path.span,
                    ));
                }
                Token::Decltype => {
                    if named_or_builtin {
                        break;
                    }
                    let at = tok.span;
                    self.advance();
                    let soup = self.parse_parenthesized_soup()?;
                    base = Some(Spanned::new(TypeBase::Decltype(soup), self.span_from(at)));
                }
                Token::Ident | Token::ColonColon => {
                    if named_or_builtin {
                        break;
                    }
                    if matches!(tok.node, Token::ColonColon) && !matches!(self.peek_kind_at(1), Some(Token::Ident)) {
                        break;
                    }
                    let path = self.parse_path()?;
                    base = Some(Spanned::new(
                        TypeBase::Named { path: path.node, typename: false, elaborated: false },
                        path.span,
                    ));
                }
                _ => break,
            }
        }

        let base = match (base, builtins.first(), builtins.last()) {
            (Some(base), _, _) => base,
            (None, Some(first), Some(last)) => {
                let span = first.span.merge(last.span);
                let kinds: Vec<Token> = builtins.iter().map(|t| t.node.clone()).collect();
                let builtin = combine_builtins(&kinds).map_err(|msg| ReduceError::syntax(msg, span))?;
                Spanned::new(TypeBase::Builtin(builtin), span)
            }
            _ => return Err(ReduceError::syntax("expected type", start)),
        };

        let mut declarators = Vec::new();
        loop {
            let at = self.start_span();
            let declarator = match self.peek_kind() {
                Some(Token::Star) => {
                    self.advance();
                    let mut ptr_cv = Cv::default();
                    while let Some(tok) = self.peek_kind().filter(|t| t.is_cv()).cloned() {
                        ptr_cv.add(&tok);
                        self.advance();
                    }
                    Declarator::Pointer(ptr_cv)
                }
                Some(Token::Amp) => {
                    self.advance();
                    Declarator::LRef
                }
                Some(Token::AmpAmp) => {
                    self.advance();
                    Declarator::RRef
                }
                Some(Token::LBracket) if !matches!(self.peek_kind_at(1), Some(Token::LBracket)) => {
                    Declarator::Array(self.parse_bracketed_soup()?)
                }
                _ => break,
            };
            declarators.push(Spanned::new(declarator, self.span_from(at)));
        }

        Ok(Spanned::new(TypeExpr { cv, base, declarators }, self.span_from(start)))
    }
}

/// Folds a builtin specifier sequence (`unsigned long long int`) into one type.
pub fn combine_builtins(toks: &[Token]) -> Result<BuiltinType, String> {
    let mut signed = 0;
    let mut unsigned = 0;
    let mut short = 0;
    let mut long = 0;
    let mut base: Option<&Token> = None;
    for tok in toks {
        match tok {
            Token::Signed => signed += 1,
            Token::Unsigned => unsigned += 1,
            Token::Short => short += 1,
            Token::Long => long += 1,
            other => {
                if let Some(prev) = base {
                    return Err(format!("cannot combine {prev} with previous '{other}' declaration specifier"));
                }
                base = Some(other);
            }
        }
    }
    let sign_mods = signed + unsigned;
    let size_mods = short + long;
    if signed > 0 && unsigned > 0 {
        return Err("'signed' and 'unsigned' cannot be combined".to_string());
    }
    if short > 0 && long > 0 || short > 1 || long > 2 {
        return Err("invalid combination of 'short' and 'long'".to_string());
    }
    let plain = |ty: BuiltinType, tok: &Token| {
        if sign_mods + size_mods > 0 {
            Err(format!("'{tok}' cannot be combined with sign or size specifiers"))
        } else {
            Ok(ty)
        }
    };
    match base {
        Some(tok @ Token::Void) => plain(BuiltinType::Void, tok),
        Some(tok @ Token::Bool) => plain(BuiltinType::Bool, tok),
        Some(tok @ Token::WChar) => plain(BuiltinType::WChar, tok),
        Some(tok @ Token::Char8) => plain(BuiltinType::Char8, tok),
        Some(tok @ Token::Char16) => plain(BuiltinType::Char16, tok),
        Some(tok @ Token::Char32) => plain(BuiltinType::Char32, tok),
        Some(tok @ Token::Float) => plain(BuiltinType::Float, tok),
        Some(tok @ Token::Auto) => plain(BuiltinType::Auto, tok),
        Some(Token::Double) => match (sign_mods, short, long) {
            (0, 0, 0) => Ok(BuiltinType::Double),
            (0, 0, 1) => Ok(BuiltinType::LongDouble),
            _ => Err("invalid specifiers for 'double'".to_string()),
        },
        Some(Token::Char) => match (size_mods, signed, unsigned) {
            (0, 0, 0) => Ok(BuiltinType::Char),
            (0, 1, 0) => Ok(BuiltinType::SignedChar),
            (0, 0, 1) => Ok(BuiltinType::UnsignedChar),
            _ => Err("invalid specifiers for 'char'".to_string()),
        },
        Some(Token::Int) | None => Ok(match (unsigned > 0, short, long) {
            (false, 1, _) => BuiltinType::Short,
            (true, 1, _) => BuiltinType::UnsignedShort,
            (false, _, 1) => BuiltinType::Long,
            (true, _, 1) => BuiltinType::UnsignedLong,
            (false, _, 2) => BuiltinType::LongLong,
            (true, _, 2) => BuiltinType::UnsignedLongLong,
            (false, _, _) => BuiltinType::Int,
            (true, _, _) => BuiltinType::UnsignedInt,
        }),
        Some(other) => Err(format!("'{other}' is not a type specifier")),
    }
}

/// Lex and parse a translation unit.
pub fn parse(source: &str) -> Result<TranslationUnit, ReduceError> {
    let tokens = crate::lexer::lex(source)?;
    let mut parser = Parser::new(&tokens, source);
    parser.parse_translation_unit()
}
