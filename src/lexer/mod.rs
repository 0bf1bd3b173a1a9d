pub mod token;

use crate::diagnostics::ReduceError;
use crate::span::{Span, Spanned};
use logos::Logos;
use token::Token;

pub fn lex(source: &str) -> Result<Vec<Spanned<Token>>, ReduceError> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(Token::Comment | Token::Directive) => continue,
            Ok(tok) => tokens.push(Spanned::new(tok, Span::new(span.start, span.end))),
            Err(()) => {
                return Err(ReduceError::syntax(
                    format!("unexpected character '{}'", &source[span.start..span.end]),
                    Span::new(span.start, span.end),
                ));
            }
        }
    }

    Ok(tokens)
}
