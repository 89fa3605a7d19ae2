//! End-to-end properties of the disposal rules, run through the engine.

use std::path::Path;

use dispose_lint::{Diagnostic, LintConfig, LintEngine, RuleCode};

// ============================================================================
// HELPERS
// ============================================================================

const PRELUDE: &str = "using System; using System.IO; using System.Collections.Generic;\n\
    class DisposeMe : IDisposable { public void Dispose() { } }\n";

/// First line of fixture code after the prelude.
const FIRST_LINE: usize = 3;

fn run(select: Option<&str>, src: &str) -> Vec<Diagnostic> {
    let engine = LintEngine::new(LintConfig::new(select.map(str::to_string), None));
    engine.check_content(Path::new("Fixture.cs"), &format!("{}{}", PRELUDE, src))
}

fn run_all(src: &str) -> Vec<Diagnostic> {
    run(None, src)
}

fn run_rule(rule: RuleCode, src: &str) -> Vec<Diagnostic> {
    run(Some(rule.as_str()), src)
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[test]
fn idempotent_across_runs() {
    let src = "class Owner { DisposeMe a = new DisposeMe();\n\
               void M() { var x = new DisposeMe(); new DisposeMe(); x = new DisposeMe(); } }";
    let first = run_all(src);
    let second = run_all(src);
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn class_rule_reports_once_per_class() {
    let diags = run_rule(
        RuleCode::DSP001,
        "class Owner { DisposeMe a = new DisposeMe(); DisposeMe b; List<DisposeMe> c; }",
    );
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].range.start_line, FIRST_LINE);
    // Anchored at the class identifier.
    assert_eq!(diags[0].range.start_col, 7);
}

#[test]
fn constructor_parameter_members_are_exempt() {
    let diags = run_rule(
        RuleCode::DSP003,
        "class Holder { DisposeMe d; DisposeMe e;\n\
         Holder(DisposeMe d, DisposeMe other) { this.d = d; e = other; } }",
    );
    assert!(diags.is_empty(), "{:?}", diags);
}

#[test]
fn this_qualified_constructor_capture_is_exempt() {
    let diags = run_all(
        "class Reader { DisposeMe input;\n\
         public Reader(DisposeMe input) { this.input = input; } }",
    );
    assert!(diags.is_empty(), "{:?}", diags);
}

#[test]
fn this_qualified_overwrite_is_reported() {
    let diags = run_rule(
        RuleCode::DSP003,
        "class Cache : IDisposable { DisposeMe d;\n\
         void Open() { this.d = new DisposeMe(); }\n\
         void Reopen() { this.d = new DisposeMe(); }\n\
         public void Dispose() { this.d?.Dispose(); } }",
    );
    assert_eq!(diags.len(), 1, "{:?}", diags);
    assert_eq!(diags[0].range.start_line, FIRST_LINE + 1);
}

#[test]
fn using_blocks_are_safe() {
    let src = "class A { void M() {\n\
               using (var a = new DisposeMe()) { }\n\
               var b = new DisposeMe();\n\
               using (b) { }\n\
               using var c = new DisposeMe();\n\
               } }";
    assert!(run_all(src).is_empty());
}

#[test]
fn double_assignment_reported_at_first_assignment() {
    let diags = run_rule(
        RuleCode::DSP004,
        "class A { void M() {\nDisposeMe item = new DisposeMe();\nitem = new DisposeMe();\n} }",
    );
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].range.start_line, FIRST_LINE + 1);
    assert!(diags[0].message.contains("'item'"));
}

#[test]
fn collection_disposed_by_helper() {
    let disposed = run_rule(
        RuleCode::DSP003,
        "class A : IDisposable { List<DisposeMe> items = new List<DisposeMe>();\n\
         public void Dispose() { items.DisposeItems(); } }",
    );
    assert!(disposed.is_empty());

    let leaked = run_rule(
        RuleCode::DSP003,
        "class A : IDisposable { List<DisposeMe> items = new List<DisposeMe>();\n\
         public void Dispose() { } }",
    );
    assert_eq!(leaked.len(), 1);
    assert_eq!(leaked[0].range.start_line, FIRST_LINE);
    assert!(leaked[0].message.contains("'items'"));
}

#[test]
fn returned_creation_escapes() {
    assert!(run_all("class A { private DisposeMe Method() { return new DisposeMe(); } }").is_empty());
}

#[test]
fn orphaned_creation_reported_once() {
    let diags = run_all("class A { void M() {\nnew DisposeMe();\n} }");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].rule, RuleCode::DSP006);
    assert_eq!(diags[0].range.start_line, FIRST_LINE + 1);
    assert!(diags[0].message.contains("DisposeMe"));
}

#[test]
fn chained_dispose_is_exempt() {
    let src = "class A { DisposeMe CreateDisposeMe() { return new DisposeMe(); }\n\
               void M() { CreateDisposeMe().Dispose(); } }";
    assert!(run_all(src).is_empty());
}

#[test]
fn factory_registration_mismatch() {
    let src = "class FactoryRegistrationAttribute : Attribute { public FactoryRegistrationAttribute(Type t) { } }\n\
               interface INonDisposable { }\n\
               [FactoryRegistration(typeof(INonDisposable))]\n\
               class Concrete : INonDisposable, IDisposable { public void Dispose() { } }";
    let diags = run_all(src);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].rule, RuleCode::DSP007);
    assert!(diags[0].message.contains("INonDisposable"));
    assert!(diags[0].message.contains("Concrete"));
}
