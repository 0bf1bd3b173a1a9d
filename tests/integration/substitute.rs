mod common;
use common::*;

use cxxreduce::diagnostics::ReduceError;
use cxxreduce::transform::{PassOutcome, TransformError};

#[test]
fn single_use_in_body_is_rewritten() {
    let src = r#"
template <class T> struct Box {
    typedef int value_type;
    Box<T>::value_type x;
};
Box<int> a;
Box<int> b;
"#;
    assert_eq!(count(src), 1);
    let out = rewrite(src, 1);
    assert!(out.contains("    Box<int>::value_type x;"), "got:\n{out}");
}

#[test]
fn disagreeing_parameter_is_not_selectable() {
    let src = r#"
template <class A, class B> struct Pair {
    A first;
    B second;
    A get_first() { return first; }
    B get_second() { return second; }
};
Pair<int, double> x;
Pair<int, char> y;
"#;
    assert_eq!(count(src), 2);
    let first = rewrite(src, 1);
    assert!(first.contains("int first;"));
    assert!(first.contains("B second;"));
    let second = rewrite(src, 2);
    assert!(second.contains("int get_first()"));
}

#[test]
fn counting_is_stable() {
    let src = "template <class T> struct Box { T v; T w; }; Box<long> b;";
    assert_eq!(count(src), count(src));
}

#[test]
fn rewriting_is_deterministic() {
    let src = "template <class T> struct Box { T v; T *w; const T &r(); }; Box<unsigned> b;";
    for k in 1..=3 {
        assert_eq!(rewrite(src, k), rewrite(src, k));
    }
}

#[test]
fn rewritten_sites_are_not_counted_again() {
    let src = "template <class T> struct Box { T v; T w; T z; }; Box<char> b;";
    let once = rewrite(src, 2);
    assert_eq!(count(&once), 2);
    let twice = rewrite(&once, 2);
    assert_eq!(twice, "template <class T> struct Box { T v; char w; char z; }; Box<char> b;");
}

#[test]
fn out_of_range_leaves_source_untouched() {
    let src = "template <class T> struct Box { T v; }; Box<int> b;";
    let (result, text) = run_pass(src, 5, false);
    match result {
        Err(ReduceError::Transform(TransformError::OutOfRange { requested, available })) => {
            assert_eq!((requested, available), (5, 1));
        }
        other => panic!("expected out of range, got {other:?}"),
    }
    assert_eq!(text, src);
}

#[test]
fn template_without_specializations_has_no_instances() {
    let src = "template <class T> struct Box { T v; };";
    assert_eq!(count(src), 0);
    let (result, _) = run_pass(src, 1, false);
    assert!(matches!(result, Err(ReduceError::Transform(TransformError::OutOfRange { available: 0, .. }))));
}

#[test]
fn typedef_spelled_arguments_unify() {
    let src = "typedef int I;\ntemplate <class T> struct Box { T v; };\nBox<I> a;\nBox<int> b;\n";
    assert_eq!(count(src), 1);
    assert!(rewrite(src, 1).contains("struct Box { int v; }"));
}

#[test]
fn defaults_are_applied_before_unification() {
    let src = "template <class T, class U = T> struct P { U u; }; P<int> a; P<int, int> b;";
    // `T` in the default and `U` in the body.
    assert_eq!(count(src), 2);
    assert_eq!(rewrite(src, 2), "template <class T, class U = T> struct P { int u; }; P<int> a; P<int, int> b;");
}

#[test]
fn out_of_line_members_use_the_class_parameter() {
    let src = r#"template <class T> struct Box { T get(); T v; };
template <class U> U Box<U>::get() { return v; }
Box<double> b;
"#;
    assert_eq!(count(src), 4);
    let out = rewrite(src, 3);
    assert!(out.contains("template <class U> double Box<U>::get()"), "got:\n{out}");
}

#[test]
fn forward_declaration_does_not_double_count() {
    let src = "template <class T> struct Box;\ntemplate <class T> struct Box { T v; };\nBox<int> b;\n";
    assert_eq!(count(src), 1);
}

#[test]
fn canonical_spelling_is_used() {
    let src = "template <class T> struct Box { T v; }; Box<char const *> b;";
    assert!(rewrite(src, 1).contains("{ const char * v; }"));

    let nested = "namespace n { struct S { }; } template <class T> struct Box { T v; }; Box<n::S> b;";
    assert!(rewrite(nested, 1).contains("{ n::S v; }"));
}

#[test]
fn function_template_parameters_are_ignored() {
    let src = "template <class T> void f(T t) { } template <class T> struct Box { }; Box<int> b;";
    assert_eq!(count(src), 0);
}

#[test]
fn dependent_member_rewrite_is_reported() {
    let src = "template <class T> struct Box { typename T::type v; }; struct S { typedef int type; }; Box<S> *ok; Box<int> *bad;";
    // Two specializations disagree: nothing to do.
    assert_eq!(count(src), 0);

    let src = "template <class T> struct Box { typename T::type v; }; Box<int> *p;";
    let (result, text) = run_pass(src, 1, false);
    match result {
        Err(ReduceError::Transform(TransformError::PostEditInternal { diagnostics })) => {
            assert_eq!(diagnostics.len(), 1);
        }
        other => panic!("expected post-edit failure, got {other:?}"),
    }
    assert!(text.contains("typename int::type"));
}

#[test]
fn rewrite_outcome_names_the_site() {
    let src = "template <class T> struct Box { T v; }; Box<short> b;";
    let (result, _) = run_pass(src, 1, false);
    match result.unwrap() {
        PassOutcome::Rewritten { instance, span, original, replacement } => {
            assert_eq!(instance, 1);
            assert_eq!(&src[span.start..span.end], "T");
            assert_eq!(original, "T");
            assert_eq!(replacement, "short");
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn rewritten_text_snapshot() {
    let src = "namespace n { struct S { }; }\ntemplate <class T, class U = T *> struct P { U u; T t; };\nP<n::S const> p;\n";
    insta::assert_snapshot!(rewrite(src, 1), @r"
    namespace n { struct S { }; }
    template <class T, class U = const n::S *> struct P { U u; T t; };
    P<n::S const> p;
    ");
}

#[test]
fn function_pointer_arguments_take_part_in_unification() {
    let src = "template <class T> struct Box { T v; }; Box<int> a; Box<void (*)(int)> b;";
    assert_eq!(count(src), 0);

    let src = "template <class T> struct Box { T v; }; Box<void (*)(int)> a; Box<void(*)(int)> b;";
    assert_eq!(count(src), 1);
}

#[test]
fn member_pointer_and_function_arguments_disagree_with_others() {
    let src = "struct S { int m; }; template <class T> struct Box { T v; }; Box<int> a; Box<int S::*> b;";
    assert_eq!(count(src), 0);

    let src = "template <class T> struct Box { T *v; }; Box<int> a; Box<void(int)> *p;";
    assert_eq!(count(src), 0);
}

#[test]
fn member_template_ids_count_as_specializations() {
    let src = "template <class T> struct B { T x; }; template <class T> struct A { B<T> b; }; A<int> a; B<char> c;";
    // `B<int>` comes from `A<int>` and disagrees with `B<char>`.
    assert_eq!(count(src), 1);
    assert!(rewrite(src, 1).contains("B<int> b;"));

    let src = "template <class T> struct B { T x; }; template <class T> struct A { B<T> b; }; A<int> a; B<int> c;";
    assert_eq!(count(src), 2);
}

#[test]
fn base_classes_instantiate_with_the_derived_class() {
    let src = "template <class T> struct B { T x; }; template <class T> struct D : B<T> { }; D<int> d; B<long> b;";
    assert_eq!(count(src), 1);
}

#[test]
fn array_arguments_fail_the_post_edit_check() {
    let src = "template <class T> struct Box { T v; }; Box<int[3]> b;";
    let (result, text) = run_pass(src, 1, false);
    match result {
        Err(ReduceError::Transform(TransformError::PostEditInternal { diagnostics })) => {
            assert_eq!(diagnostics.len(), 1);
        }
        other => panic!("expected post-edit failure, got {other:?}"),
    }
    assert!(text.contains("int [3] v;"), "got:\n{text}");
}
