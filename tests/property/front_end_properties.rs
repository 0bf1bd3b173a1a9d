// The lexer, parser and model builder must reject bad input with an error,
// never a panic.

use cxxreduce::lexer::lex;
use cxxreduce::model::CxxProgram;
use cxxreduce::parser::parse;
use proptest::prelude::*;

/// Token-ish fragments that stress the template parts of the grammar.
fn fragment() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "template", "<", ">", ">>", "class", "typename", "struct", "T", "U", "Box", "int", "const", "*", "&",
        "::", "{", "}", ";", ",", "(", ")", "=", "...", "namespace", "n", "typedef", "using", "0", "1 + 2",
    ])
}

proptest! {
    #[test]
    fn lexer_never_panics(source in "\\PC{0,300}") {
        let _ = lex(&source);
    }

    #[test]
    fn lexing_is_deterministic(source in "\\PC{0,200}") {
        prop_assert_eq!(lex(&source).is_ok(), lex(&source).is_ok());
    }

    #[test]
    fn token_spans_are_ordered_and_in_bounds(source in "[a-zA-Z0-9_ <>:;,*&{}()=+]{0,200}") {
        if let Ok(tokens) = lex(&source) {
            let mut last_end = 0;
            for tok in &tokens {
                prop_assert!(tok.span.start >= last_end);
                prop_assert!(tok.span.start < tok.span.end);
                prop_assert!(tok.span.end <= source.len());
                last_end = tok.span.end;
            }
        }
    }

    #[test]
    fn parser_never_panics(parts in prop::collection::vec(fragment(), 0..60)) {
        let source = parts.join(" ");
        let _ = parse(&source);
    }

    #[test]
    fn analysis_never_panics(parts in prop::collection::vec(fragment(), 0..60)) {
        let source = parts.join(" ");
        let _ = CxxProgram::analyze(&source);
    }
}
