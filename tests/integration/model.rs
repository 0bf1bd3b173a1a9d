//! Program model queries over whole translation units.

use cxxreduce::diagnostics::ReduceError;
use cxxreduce::model::{CxxProgram, ParamKey, ParamKind, ProgramModel, TemplateArgument};

fn analyze(src: &str) -> CxxProgram {
    CxxProgram::analyze(src).unwrap_or_else(|e| panic!("analysis failed: {e}"))
}

fn rendered_specs(program: &CxxProgram, name: &str) -> Vec<String> {
    let id = program.find_template(name).unwrap_or_else(|| panic!("no template {name}"));
    program
        .template(id)
        .specializations
        .iter()
        .map(|s| s.args.iter().map(|a| program.render(a)).collect::<Vec<_>>().join(", "))
        .collect()
}

#[test]
fn parameters_are_described() {
    let p = analyze("template <typename T, int N = 3, template <class> class W, class... Rest> struct X;");
    let params = &p.templates()[0].params;
    assert_eq!(params.len(), 4);
    assert_eq!(params[0].name.as_deref(), Some("T"));
    assert_eq!(params[1].kind, ParamKind::NonType);
    assert_eq!(params[2].kind, ParamKind::Template);
    assert!(params[3].is_pack);
}

#[test]
fn nested_member_templates_are_qualified() {
    let src = r#"
namespace outer {
  template <class T> struct Box {
    template <class U> struct Inner { U u; };
  };
}
outer::Box<int>::Inner<char> x;
"#;
    let p = analyze(src);
    let names: Vec<&str> = p.templates().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["outer::Box", "outer::Box::Inner"]);
    assert_eq!(rendered_specs(&p, "outer::Box"), vec!["int"]);
    assert_eq!(rendered_specs(&p, "outer::Box::Inner"), vec!["char"]);
}

#[test]
fn specializations_in_order_of_first_appearance() {
    let src = "template <class T> struct Box { }; Box<char> a; Box<int> b; Box<char> c; template struct Box<long>;";
    assert_eq!(rendered_specs(&analyze(src), "Box"), vec!["char", "int", "long"]);
}

#[test]
fn nested_template_ids_register_inner_specializations() {
    let p = analyze("template <class T> struct Box { }; Box<Box<int> *> b;");
    assert_eq!(rendered_specs(&p, "Box"), vec!["Box<int> *", "int"]);
}

#[test]
fn partial_specialization_parameters_are_not_class_parameters() {
    let src = "template <class T> struct Box { T v; }; template <class T> struct Box<T *> { T p; }; Box<int> b;";
    let p = analyze(src);
    let keys: Vec<ParamKey> = p.use_sites().iter().map(|u| u.param).collect();
    assert_eq!(keys.len(), 3);
    assert!(keys[0].class_param().is_some());
    assert!(keys[1..].iter().all(|k| k.class_param().is_none()));
    assert_eq!(rendered_specs(&p, "Box"), vec!["int"]);
}

#[test]
fn use_sites_include_qualified_leading_segments() {
    let src = "template <class T> struct Box { typename T::type a; typename T::value_type *b; void f(T t); };";
    let p = analyze(src);
    let texts: Vec<&str> = p.use_sites().iter().map(|u| &src[u.span.start..u.span.end]).collect();
    assert_eq!(texts, vec!["T", "T", "T"]);
}

#[test]
fn non_type_arguments_compare_by_value() {
    let src = "enum { K = 2 }; template <int N, class T> struct Arr { }; Arr<2, int> a; Arr<1 + 1, int> b; Arr<K, int> c;";
    let p = analyze(src);
    let specs = &p.templates()[0].specializations;
    assert_eq!(specs.len(), 2);
    assert!(matches!(&specs[1].args[0], TemplateArgument::Value(_)));
}

#[test]
fn alias_declarations_resolve() {
    let src = "template <class T> struct Box { }; using IntPtr = int *; typedef IntPtr P; Box<P> a; Box<int *> b;";
    assert_eq!(rendered_specs(&analyze(src), "Box"), vec!["int *"]);
}

#[test]
fn syntax_errors_are_errors() {
    match CxxProgram::analyze("template <class T struct Box;") {
        Err(ReduceError::Syntax { .. }) => {}
        other => panic!("expected a syntax error, got {other:?}"),
    }
}

#[test]
fn check_edit_compares_against_the_original() {
    let p = analyze("template <class T> struct Box { }; Box<int> b;");
    assert!(p.check_edit("template <class T> struct Box { }; Box<long> b;").is_empty());
    let diags = p.check_edit("template <class T> struct Box { }; Box<> b;");
    assert_eq!(diags.len(), 1);
    assert!(diags[0].msg.starts_with("too few template arguments"));
}

#[test]
fn specializations_named_by_other_specializations() {
    let src = "template <class T> struct B { }; template <class T> struct A { B<T> b; }; \
               template <class T> struct C { A<T *> a; }; B<char> x; C<int> c;";
    let p = analyze(src);
    assert_eq!(rendered_specs(&p, "C"), vec!["int"]);
    assert_eq!(rendered_specs(&p, "A"), vec!["int *"]);
    assert_eq!(rendered_specs(&p, "B"), vec!["char", "int *"]);
}

#[test]
fn base_class_specializations_follow_the_derived_class() {
    let p = analyze("template <class T> struct B { }; template <class T> struct D : B<T> { }; D<int> d;");
    assert_eq!(rendered_specs(&p, "B"), vec!["int"]);
}
