use quarry_engine::matcher::{Match, MatchContext, Searcher};
use quarry_engine::error::MatchAbort;
use quarry_engine::pattern::Pattern;
use quarry_frontend::{DemoOracle, parse_source};
use std::sync::atomic::AtomicBool;
use std::time::Instant;

fn find(pattern: &str, src: &str) -> Vec<Match> {
    let unit = parse_source("test.brace", src).expect("fixture parses");
    let oracle = DemoOracle::for_unit(&unit);
    let pattern = Pattern::parse(pattern).expect("pattern parses");
    Searcher::new(&pattern, &unit, Some(&oracle))
        .find_all(&MatchContext::default())
        .expect("search completes")
}

fn binding(src: &str, m: &Match, name: &str) -> String {
    let unit = parse_source("test.brace", src).unwrap();
    m.bindings.get(name).expect("bound").surface(&unit)
}

#[test]
fn test_call_argument_capture() {
    let src = r#"Console.WriteLine("Hi"); Console.WriteLine(x);"#;
    let matches = find("Console.WriteLine($arg$)", src);
    assert_eq!(matches.len(), 2);
    assert_eq!(binding(src, &matches[0], "arg"), r#""Hi""#);
    assert_eq!(binding(src, &matches[1], "arg"), "x");
}

#[test]
fn test_binary_matches_fixity() {
    let src = "return a + b + c;";
    let matches = find("$x$ + $y$", src);
    assert_eq!(matches.len(), 2);
    // outer: left-associative grouping
    assert_eq!(binding(src, &matches[0], "x"), "a + b");
    assert_eq!(binding(src, &matches[0], "y"), "c");
    // inner
    assert_eq!(binding(src, &matches[1], "x"), "a");
    assert_eq!(binding(src, &matches[1], "y"), "b");
}

#[test]
fn test_argument_list_capture() {
    let src = r#"string.Format("v {0} {1}", x, y);"#;
    let matches = find("string.Format($args$)", src);
    assert_eq!(matches.len(), 1);
    assert_eq!(binding(src, &matches[0], "args"), r#""v {0} {1}", x, y"#);
}

#[test]
fn test_regex_constraint_filters() {
    let src = "var tempX = 1; var other = 2;";
    let matches = find("$v:regex=temp.*$ = $val$", src);
    assert_eq!(matches.len(), 1);
    assert_eq!(binding(src, &matches[0], "v"), "tempX");
    assert_eq!(binding(src, &matches[0], "val"), "1");
}

#[test]
fn test_binding_consistency() {
    assert_eq!(find("$x$ + $x$", "f(a + a);").len(), 1);
    assert_eq!(find("$x$ + $x$", "f(a + b);").len(), 0);
}

#[test]
fn test_binding_consistency_modulo_whitespace() {
    let matches = find("g($x$, $x$)", "g(a +  b, a + b);");
    assert_eq!(matches.len(), 1);
}

#[test]
fn test_args_count_bounds() {
    assert_eq!(find("f($a:args=count=2$)", "f(1, 2);").len(), 1);
    assert_eq!(find("f($a:args=count=2$)", "f(1);").len(), 0);
    assert_eq!(find("f($a:args=count=1-$)", "f();").len(), 0);
}

#[test]
fn test_empty_args_capture() {
    let src = "f();";
    let matches = find("f($a:args$)", src);
    assert_eq!(matches.len(), 1);
    assert_eq!(binding(src, &matches[0], "a"), "");
}

#[test]
fn test_trailing_comma_dropped_from_args() {
    let src = "f(1, 2,);";
    let matches = find("f($a:args$)", src);
    assert_eq!(matches.len(), 1);
    assert_eq!(binding(src, &matches[0], "a"), "1, 2");
}

#[test]
fn test_type_constraint_consults_oracle() {
    let src = r#"var x = 1; var s = "a"; f(x); f(s);"#;
    let matches = find("f($v=type=int$)", src);
    assert_eq!(matches.len(), 1);
    assert_eq!(binding(src, &matches[0], "v"), "x");
}

#[test]
fn test_type_constraint_without_oracle_rejects() {
    let src = "f(x);";
    let unit = parse_source("test.brace", src).unwrap();
    let pattern = Pattern::parse("f($v=type=int$)").unwrap();
    let matches = Searcher::new(&pattern, &unit, None)
        .find_all(&MatchContext::default())
        .unwrap();
    assert!(matches.is_empty());
}

#[test]
fn test_single_hole_kind_gates() {
    let src = "var x = a.b;";
    // every expression node matches a bare expr hole
    let exprs = find("$e$", src);
    assert!(!exprs.is_empty());
    // identifier holes only land on identifiers
    let src2 = "f(abc);";
    let ids = find("$i:id$", src2);
    let unit = parse_source("test.brace", src2).unwrap();
    assert!(
        ids.iter()
            .all(|m| unit.tree.label(m.node) == "ident")
    );
}

#[test]
fn test_statement_hole_spans_statements() {
    let src = "if (x) { a(); b(); }";
    let matches = find("if ($c$) { $body:stmt$ }", src);
    assert_eq!(matches.len(), 1);
    assert_eq!(binding(src, &matches[0], "body"), "a(); b();");
}

#[test]
fn test_expr_hole_stops_at_statement_boundary() {
    let src = "if (x) { a(); b(); }";
    // an expr hole cannot swallow two statements
    assert_eq!(find("if ($c$) { $body$ }", src).len(), 0);
}

#[test]
fn test_capture_never_crosses_node_boundary() {
    // x would have to capture `return a + b`, which cuts into the
    // expression subtree, so the statement node yields nothing
    let src = "return a + b;";
    let matches = find("$x$ + $y$", src);
    assert_eq!(matches.len(), 1);
    assert_eq!(binding(src, &matches[0], "x"), "a");
}

#[test]
fn test_anonymous_hole_unbound_and_inconsistent() {
    let src = "f(a + b);";
    let matches = find("$_$ + $_$", src);
    assert_eq!(matches.len(), 1);
    assert!(matches[0].bindings.is_empty());
}

#[test]
fn test_member_kind() {
    let src = "Console.WriteLine(x);";
    let matches = find("$m:member$", src);
    let unit = parse_source("test.brace", src).unwrap();
    assert!(!matches.is_empty());
    assert!(
        matches
            .iter()
            .all(|m| unit.tree.label(m.node) == "member")
    );
}

#[test]
fn test_exact_constraint_case_insensitive() {
    let src = "Foo(1); foo(2); bar(3);";
    let matches = find(r#"$f=exact="foo"i$($a$)"#, src);
    assert_eq!(matches.len(), 2);
}

#[test]
fn test_string_literals_compare_bytewise() {
    // the two strings differ only in interior whitespace
    assert_eq!(find(r#"f("a  b")"#, r#"f("a  b");"#).len(), 1);
    assert_eq!(find(r#"f("a b")"#, r#"f("a  b");"#).len(), 0);
}

#[test]
fn test_whitespace_canonicalized_outside_strings() {
    assert_eq!(find("f( $a$ )", "f(1);").len(), 1);
    assert_eq!(find("f($a$)", "f( 1 );").len(), 1);
}

#[test]
fn test_cancellation_token_stops_search() {
    let src = "f(1);";
    let unit = parse_source("test.brace", src).unwrap();
    let pattern = Pattern::parse("f($a$)").unwrap();
    let cancel = AtomicBool::new(true);
    let ctx = MatchContext {
        cancel: Some(&cancel),
        deadline: None,
    };
    let err = Searcher::new(&pattern, &unit, None).find_all(&ctx);
    assert_eq!(err.unwrap_err(), MatchAbort::Cancelled);
}

#[test]
fn test_expired_deadline_times_out() {
    let src = "f(1);";
    let unit = parse_source("test.brace", src).unwrap();
    let pattern = Pattern::parse("f($a$)").unwrap();
    let ctx = MatchContext {
        cancel: None,
        deadline: Some(Instant::now() - std::time::Duration::from_secs(1)),
    };
    let err = Searcher::new(&pattern, &unit, None).find_all(&ctx);
    assert_eq!(err.unwrap_err(), MatchAbort::Timeout);
}

#[test]
fn test_determinism() {
    let src = "f(a + b); g(c + d);";
    let a = find("$x$ + $y$", src);
    let b = find("$x$ + $y$", src);
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.node, y.node);
        assert_eq!(x.span, y.span);
    }
}
