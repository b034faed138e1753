//! End-to-end scenarios over the full pipeline: programmatically built
//! translation units go through call-map construction, the fixed-point
//! inference, and the diagnostics channel, exactly as `ward` wires them
//! at runtime (minus the external preprocessor).

use lang_c::ast::{
    Attribute, BlockItem, CallExpression, Declaration, DeclarationSpecifier, Declarator,
    DeclaratorKind, DerivedDeclarator, Ellipsis, Expression, Extension, ExternalDeclaration,
    FunctionDeclarator, FunctionDefinition, Identifier, IfStatement, InitDeclarator, Statement,
    StorageClassSpecifier, TranslationUnit, TypeSpecifier,
};
use lang_c::span::{Node, Span};

use ward_analysis::{channel, run_analysis};
use ward_callmap::{build_call_map, CallMap, ParsedUnit};
use ward_core::{Config, Entry};

fn node<T>(inner: T) -> Node<T> {
    Node::new(inner, Span::none())
}

fn ident_expr(name: &str) -> Node<Expression> {
    node(Expression::Identifier(Box::new(node(Identifier {
        name: name.to_string(),
    }))))
}

fn call_expr(name: &str) -> Node<Expression> {
    node(Expression::Call(Box::new(node(CallExpression {
        callee: Box::new(ident_expr(name)),
        arguments: vec![],
    }))))
}

fn call_stmt(name: &str) -> Node<BlockItem> {
    node(BlockItem::Statement(node(Statement::Expression(Some(
        Box::new(call_expr(name)),
    )))))
}

/// `if (<cond>) <name>();` with no else branch.
fn if_call_stmt(cond: &str, name: &str) -> Node<BlockItem> {
    node(BlockItem::Statement(node(Statement::If(node(
        IfStatement {
            condition: Box::new(ident_expr(cond)),
            then_statement: Box::new(node(Statement::Expression(Some(Box::new(call_expr(
                name,
            )))))),
            else_statement: None,
        },
    )))))
}

fn ward_attr(actions: &[(&str, &str)]) -> Node<DeclarationSpecifier> {
    let arguments = actions
        .iter()
        .map(|(keyword, permission)| {
            node(Expression::Call(Box::new(node(CallExpression {
                callee: Box::new(ident_expr(keyword)),
                arguments: vec![ident_expr(permission)],
            }))))
        })
        .collect();
    node(DeclarationSpecifier::Extension(vec![node(
        Extension::Attribute(Attribute {
            name: node("ward".to_string()),
            arguments,
        }),
    )]))
}

fn specifiers(is_static: bool, actions: &[(&str, &str)]) -> Vec<Node<DeclarationSpecifier>> {
    let mut out = Vec::new();
    if is_static {
        out.push(node(DeclarationSpecifier::StorageClass(node(
            StorageClassSpecifier::Static,
        ))));
    }
    out.push(node(DeclarationSpecifier::TypeSpecifier(node(
        TypeSpecifier::Void,
    ))));
    if !actions.is_empty() {
        out.push(ward_attr(actions));
    }
    out
}

fn fn_declarator(name: &str) -> Node<Declarator> {
    node(Declarator {
        kind: node(DeclaratorKind::Identifier(node(Identifier {
            name: name.to_string(),
        }))),
        derived: vec![node(DerivedDeclarator::Function(node(FunctionDeclarator {
            parameters: vec![],
            ellipsis: Ellipsis::None,
        })))],
        extensions: vec![],
    })
}

fn prototype(name: &str, actions: &[(&str, &str)]) -> Node<ExternalDeclaration> {
    node(ExternalDeclaration::Declaration(node(Declaration {
        specifiers: specifiers(false, actions),
        declarators: vec![node(InitDeclarator {
            declarator: fn_declarator(name),
            initializer: None,
        })],
    })))
}

fn definition(
    name: &str,
    is_static: bool,
    actions: &[(&str, &str)],
    body: Vec<Node<BlockItem>>,
) -> Node<ExternalDeclaration> {
    node(ExternalDeclaration::FunctionDefinition(node(
        FunctionDefinition {
            specifiers: specifiers(is_static, actions),
            declarator: fn_declarator(name),
            declarations: vec![],
            statement: node(Statement::Compound(body)),
        },
    )))
}

fn unit(path: &str, declarations: Vec<Node<ExternalDeclaration>>) -> ParsedUnit {
    ParsedUnit::new(path, TranslationUnit(declarations), "")
}

fn parse_policy(text: &str) -> Config {
    ward_config::parse_config(text).expect("policy fixture must parse")
}

/// Build the call map and run the analysis end to end, collecting every
/// entry the drain thread would see.
fn analyze(units: &[ParsedUnit], config: &Config) -> (CallMap, Vec<Entry>) {
    let (map, warnings) = build_call_map(units).expect("call map must build");
    let (reporter, rx) = channel();
    reporter.send_all(warnings);
    run_analysis(&map, config, &reporter);
    reporter.finish();
    let entries = rx.iter().map_while(|message| message).collect();
    (map, entries)
}

fn errors(entries: &[Entry]) -> Vec<&Entry> {
    entries.iter().filter(|e| e.is_error()).collect()
}

#[test]
fn test_basic_need_satisfied() {
    let config = parse_policy("lock \"permission to take the lock\";");
    let units = vec![unit(
        "main.c",
        vec![
            prototype("take_lock", &[("grant", "lock")]),
            prototype("do_work", &[("need", "lock")]),
            definition(
                "main",
                false,
                &[],
                vec![call_stmt("take_lock"), call_stmt("do_work")],
            ),
        ],
    )];
    let (_, entries) = analyze(&units, &config);
    assert!(errors(&entries).is_empty(), "entries: {entries:?}");
}

#[test]
fn test_need_unsatisfied_fails_at_the_call_site() {
    let config = parse_policy("lock;");
    let units = vec![unit(
        "main.c",
        vec![
            prototype("take_lock", &[("grant", "lock")]),
            prototype("do_work", &[("need", "lock")]),
            definition("main", false, &[], vec![call_stmt("do_work")]),
        ],
    )];
    let (_, entries) = analyze(&units, &config);
    let errors = errors(&entries);
    assert_eq!(errors.len(), 1, "entries: {entries:?}");
    assert!(errors[0].text().contains("need permission 'lock'"));
    assert!(errors[0].text().contains("do_work"));
}

#[test]
fn test_branch_conflict_is_reported_once() {
    // if (c) take_lock(); do_work();
    let config = parse_policy("lock;");
    let units = vec![unit(
        "main.c",
        vec![
            prototype("take_lock", &[("grant", "lock")]),
            prototype("do_work", &[("need", "lock")]),
            definition(
                "main",
                false,
                &[],
                vec![if_call_stmt("c", "take_lock"), call_stmt("do_work")],
            ),
        ],
    )];
    let (_, entries) = analyze(&units, &config);
    let errors = errors(&entries);
    assert_eq!(errors.len(), 1, "entries: {entries:?}");
    assert!(errors[0].text().contains("conflicting state"));
    assert!(errors[0].text().contains("'lock'"));
}

#[test]
fn test_recursive_lock_restriction() {
    let config = parse_policy(
        "lock \"permission to take the lock\"\n  \
           -> !locked \"cannot take the lock recursively\";\n\
         locked;",
    );
    let units = vec![unit(
        "lock.c",
        vec![
            prototype("take_lock", &[("grant", "locked")]),
            definition(
                "recursive_take",
                false,
                &[("use", "lock")],
                vec![call_stmt("take_lock")],
            ),
        ],
    )];
    let (_, entries) = analyze(&units, &config);
    let errors = errors(&entries);
    assert_eq!(errors.len(), 1, "entries: {entries:?}");
    assert!(errors[0].text().contains("cannot take the lock recursively"));
}

#[test]
fn test_implicit_permission_with_waiver() {
    let config = parse_policy("implicit gc_safe;");
    let units = vec![unit(
        "main.c",
        vec![
            definition("g", false, &[("waive", "gc_safe")], vec![]),
            definition("f", false, &[], vec![call_stmt("g")]),
        ],
    )];
    let (_, entries) = analyze(&units, &config);
    assert!(errors(&entries).is_empty(), "entries: {entries:?}");
}

#[test]
fn test_static_collision_stays_separate() {
    let units = vec![
        unit(
            "a.c",
            vec![
                definition("init", true, &[], vec![call_stmt("helper")]),
                definition("main", false, &[], vec![call_stmt("init")]),
            ],
        ),
        unit("b.c", vec![definition("init", true, &[], vec![])]),
    ];
    let (map, entries) = analyze(&units, &Config::new());
    assert!(errors(&entries).is_empty(), "entries: {entries:?}");

    assert!(map.keys().any(|id| id.name == "a.c`init"));
    assert!(map.keys().any(|id| id.name == "b.c`init"));

    // The call from a.c's main resolves to a.c's init, not b.c's.
    let main_body = map
        .iter()
        .find(|(id, _)| id.name == "main")
        .and_then(|(_, entry)| entry.body.as_ref())
        .expect("main must have a body");
    let callees: Vec<&str> = main_body
        .calls()
        .iter()
        .map(|id| id.name.as_str())
        .collect();
    assert_eq!(callees, vec!["a.c`init"]);
}

#[test]
fn test_enforcement_reports_unannotated_public_function() {
    let config = parse_policy("lock;\nenforce \"api.h\";");
    let units = vec![unit(
        "api.h",
        vec![
            prototype("take_lock", &[("grant", "lock")]),
            prototype("helper", &[]),
            definition("helper", false, &[], vec![call_stmt("take_lock")]),
        ],
    )];
    let (_, entries) = analyze(&units, &config);
    let errors = errors(&entries);
    assert_eq!(errors.len(), 1, "entries: {entries:?}");
    assert!(errors[0].text().contains("enforced function 'helper'"));
    assert!(errors[0].text().contains("missing grant(lock)"));
}

#[test]
fn test_graph_round_trip_preserves_the_map() {
    // `noop` is defined but makes no calls: it must reload as defined,
    // so a dumped-and-reloaded map analyzes the same functions.
    let units = vec![unit(
        "main.c",
        vec![
            prototype("take_lock", &[("grant", "lock")]),
            definition("noop", false, &[("grant", "lock")], vec![]),
            definition(
                "main",
                false,
                &[],
                vec![call_stmt("take_lock"), if_call_stmt("c", "take_lock")],
            ),
        ],
    )];
    let (map, _) = build_call_map(&units).expect("call map must build");

    let text = ward_callmap::graph::dump(&map).expect("dump must serialize");
    let reloaded = ward_callmap::graph::parse_unit("dump.json", &text).expect("dump must reload");

    assert_eq!(map.len(), reloaded.len());
    for (id, entry) in &map {
        let (_, other) = reloaded
            .iter()
            .find(|(other_id, _)| other_id.name == id.name)
            .expect("every function survives the round trip");
        assert_eq!(
            entry.body.is_some(),
            other.body.is_some(),
            "definedness of '{}' must survive the round trip",
            id.name
        );
        assert_eq!(entry.actions, other.actions);
    }
}

#[test]
fn test_reloaded_dump_reports_the_same_enforcement_findings() {
    // An enforced call-free definition declaring an action it never
    // performs is flagged both from C and from a reloaded graph dump.
    let config = parse_policy("lock;\nenforce noop;");
    let units = vec![unit(
        "main.c",
        vec![definition("noop", false, &[("grant", "lock")], vec![])],
    )];
    let (map, _) = build_call_map(&units).expect("call map must build");

    let from_c = {
        let (reporter, rx) = channel();
        run_analysis(&map, &config, &reporter);
        reporter.finish();
        rx.iter().map_while(|m| m).collect::<Vec<Entry>>()
    };

    let text = ward_callmap::graph::dump(&map).expect("dump must serialize");
    let reloaded = ward_callmap::graph::parse_unit("dump.json", &text).expect("dump must reload");
    let from_graph = {
        let (reporter, rx) = channel();
        run_analysis(&reloaded, &config, &reporter);
        reporter.finish();
        rx.iter().map_while(|m| m).collect::<Vec<Entry>>()
    };

    let c_errors = errors(&from_c);
    assert_eq!(c_errors.len(), 1, "entries: {from_c:?}");
    assert!(c_errors[0].text().contains("extra grant(lock)"));

    let graph_errors = errors(&from_graph);
    assert_eq!(graph_errors.len(), 1, "entries: {from_graph:?}");
    assert_eq!(c_errors[0].text(), graph_errors[0].text());
}

#[test]
fn test_warnings_do_not_affect_error_count() {
    // An indirect call produces a warning but no error.
    let deref_call = node(Expression::Call(Box::new(node(CallExpression {
        callee: Box::new(node(Expression::UnaryOperator(Box::new(node(
            lang_c::ast::UnaryOperatorExpression {
                operator: node(lang_c::ast::UnaryOperator::Indirection),
                operand: Box::new(ident_expr("fp")),
            },
        ))))),
        arguments: vec![],
    }))));
    let body = vec![node(BlockItem::Statement(node(Statement::Expression(
        Some(Box::new(deref_call)),
    ))))];
    let units = vec![unit("main.c", vec![definition("main", false, &[], body)])];

    let (_, entries) = analyze(&units, &Config::new());
    assert!(errors(&entries).is_empty());
    assert_eq!(
        entries.iter().filter(|e| e.is_warning()).count(),
        1,
        "entries: {entries:?}"
    );
}
