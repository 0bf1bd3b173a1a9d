// Whole-pass properties over generated class templates.

use cxxreduce::buffer::SourceBuffer;
use cxxreduce::config::PassConfig;
use cxxreduce::diagnostics::ReduceError;
use cxxreduce::transform::{PassOutcome, TransformError};
use proptest::prelude::*;

/// Spelled the way the pass prints them. The function pointer comes last:
/// substituting it for `T` in `T m0;` does not give a declaration, so the
/// rewriting properties leave it out.
const TYPES: [&str; 5] = ["int", "char", "double", "const char *", "void(*)(int)"];
const DECLARABLE: usize = 4;

/// `template <class T> struct Box { T m0; T m1; ... };` followed by one
/// variable per specialization.
fn program(uses: usize, specs: &[usize]) -> String {
    let mut src = String::from("template <class T> struct Box {");
    for i in 0..uses {
        src.push_str(&format!(" T m{i};"));
    }
    src.push_str(" };\n");
    for (i, &k) in specs.iter().enumerate() {
        src.push_str(&format!("Box<{}> v{i};\n", TYPES[k]));
    }
    src
}

fn run(source: &str, counter: usize, query: bool) -> (Result<PassOutcome, ReduceError>, String) {
    let mut buffer = SourceBuffer::new(source);
    let config = PassConfig { counter, query_instances: query, ..PassConfig::default() };
    let result = cxxreduce::run_pass(&mut buffer, &config);
    (result, buffer.into_string())
}

fn count(source: &str) -> usize {
    match run(source, 1, true).0 {
        Ok(PassOutcome::Count { instances }) => instances,
        other => panic!("count failed: {other:?}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn count_is_uses_when_specializations_agree(uses in 0usize..5, specs in prop::collection::vec(0..TYPES.len(), 0..4)) {
        let src = program(uses, &specs);
        let agreed = !specs.is_empty() && specs.iter().all(|&k| k == specs[0]);
        prop_assert_eq!(count(&src), if agreed { uses } else { 0 });
    }

    #[test]
    fn every_instance_rewrites_one_site(uses in 1usize..5, k in 0..DECLARABLE, n in 1usize..3) {
        let src = program(uses, &vec![k; n]);
        for ordinal in 1..=uses {
            let (result, text) = run(&src, ordinal, false);
            let is_rewrite = matches!(result, Ok(PassOutcome::Rewritten { .. }));
            prop_assert!(is_rewrite);
            let expected = src.replacen(&format!(" T m{}", ordinal - 1), &format!(" {} m{}", TYPES[k], ordinal - 1), 1);
            prop_assert_eq!(&text, &expected);
            prop_assert_eq!(count(&text), uses - 1);
        }
    }

    #[test]
    fn out_of_range_leaves_buffer_untouched(uses in 0usize..4, k in 0..TYPES.len(), extra in 1usize..4) {
        let src = program(uses, &[k]);
        let (result, text) = run(&src, uses + extra, false);
        let is_out_of_range = matches!(
            result,
            Err(ReduceError::Transform(TransformError::OutOfRange { available, .. })) if available == uses
        );
        prop_assert!(is_out_of_range);
        prop_assert_eq!(text, src);
    }
}
