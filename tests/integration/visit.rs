//! Visitors written against the public AST, outside the crate.

use cxxreduce::parser::ast::*;
use cxxreduce::parser::parse;
use cxxreduce::span::Span;
use cxxreduce::visit::{Visitor, walk_namespace, walk_template, walk_template_param};

#[derive(Default)]
struct TemplateHeaders {
    params: Vec<String>,
    depth: usize,
    max_depth: usize,
}

impl Visitor for TemplateHeaders {
    fn visit_template(&mut self, template: &TemplateDecl, span: Span) {
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
        walk_template(self, template, span);
        self.depth -= 1;
    }

    fn visit_template_param(&mut self, param: &cxxreduce::span::Spanned<TemplateParam>) {
        if let Some(name) = &param.node.name {
            self.params.push(name.node.clone());
        }
        walk_template_param(self, param);
    }
}

#[test]
fn collects_parameters_of_nested_headers() {
    let tu = parse(
        "template <class T> struct Box { template <class U, int N> struct Inner { }; };\n\
         template <template <class X> class W> struct Holder { };",
    )
    .unwrap();
    let mut headers = TemplateHeaders::default();
    headers.visit_translation_unit(&tu);
    assert_eq!(headers.params, vec!["T", "U", "N", "W", "X"]);
    assert_eq!(headers.max_depth, 2);
}

#[test]
fn namespaces_can_be_skipped() {
    struct TopLevelRecords {
        names: Vec<String>,
    }

    impl Visitor for TopLevelRecords {
        fn visit_namespace(&mut self, ns: &NamespaceDecl, span: Span) {
            if ns.name.is_none() {
                walk_namespace(self, ns, span);
            }
        }

        fn visit_record(&mut self, record: &RecordDecl, _span: Span) {
            if let Some(name) = record.simple_name() {
                self.names.push(name.node.clone());
            }
        }
    }

    let tu = parse("struct A { }; namespace n { struct B { }; } namespace { struct C { }; }").unwrap();
    let mut records = TopLevelRecords { names: Vec::new() };
    records.visit_translation_unit(&tu);
    assert_eq!(records.names, vec!["A", "C"]);
}

#[test]
fn explicit_instantiations_reach_their_declaration() {
    struct Counter {
        records: usize,
    }

    impl Visitor for Counter {
        fn visit_record(&mut self, _record: &RecordDecl, _span: Span) {
            self.records += 1;
        }
    }

    let tu = parse("template <class T> struct Box { }; template struct Box<int>; extern template struct Box<char>;")
        .unwrap();
    let mut counter = Counter { records: 0 };
    counter.visit_translation_unit(&tu);
    assert_eq!(counter.records, 3);
}
