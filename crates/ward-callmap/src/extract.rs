//! Extraction of `ward(action(permission))` attributes.
//!
//! Actions ride on GNU attribute syntax:
//!
//! ```c
//! void take_lock(void) __attribute__((ward(grant(lock))));
//! ```
//!
//! Only the `ward(...)` attribute is recognized; other attributes belong
//! to the compiler and are ignored. Inside `ward(...)` the grammar is
//! matched explicitly: each argument must be `action(identifier)` with a
//! known action keyword. Anything else produces a structural warning and
//! is skipped.

use lang_c::ast::{
    Attribute, Declaration, DeclarationSpecifier, Declarator, DeclaratorKind, Expression,
    Extension, FunctionDefinition,
};
use lang_c::span::Node;

use ward_core::{Action, ActionSet, Entry, PermName};

use crate::source_map::SourceMap;

/// The attribute name ward recognizes.
pub const ATTRIBUTE_NAME: &str = "ward";

/// Actions on a declaration: specifier attributes apply to every
/// declarator, declarator attributes add to them.
pub fn actions_of_declaration(
    decl: &Declaration,
    map: &SourceMap,
    warnings: &mut Vec<Entry>,
) -> ActionSet {
    let mut actions = ActionSet::new();
    collect_specifiers(&decl.specifiers, map, warnings, &mut actions);
    for init in &decl.declarators {
        collect_declarator(&init.node.declarator.node, map, warnings, &mut actions);
    }
    actions
}

/// Actions on a function definition (specifiers plus its declarator).
pub fn actions_of_definition(
    def: &FunctionDefinition,
    map: &SourceMap,
    warnings: &mut Vec<Entry>,
) -> ActionSet {
    let mut actions = ActionSet::new();
    collect_specifiers(&def.specifiers, map, warnings, &mut actions);
    collect_declarator(&def.declarator.node, map, warnings, &mut actions);
    actions
}

fn collect_specifiers(
    specifiers: &[Node<DeclarationSpecifier>],
    map: &SourceMap,
    warnings: &mut Vec<Entry>,
    actions: &mut ActionSet,
) {
    for specifier in specifiers {
        if let DeclarationSpecifier::Extension(extensions) = &specifier.node {
            collect_extensions(extensions, map, warnings, actions);
        }
    }
}

fn collect_declarator(
    declarator: &Declarator,
    map: &SourceMap,
    warnings: &mut Vec<Entry>,
    actions: &mut ActionSet,
) {
    collect_extensions(&declarator.extensions, map, warnings, actions);
    if let DeclaratorKind::Declarator(inner) = &declarator.kind.node {
        collect_declarator(&inner.node, map, warnings, actions);
    }
}

fn collect_extensions(
    extensions: &[Node<Extension>],
    map: &SourceMap,
    warnings: &mut Vec<Entry>,
    actions: &mut ActionSet,
) {
    for extension in extensions {
        if let Extension::Attribute(attribute) = &extension.node {
            if attribute.name.node == ATTRIBUTE_NAME {
                collect_ward_attribute(attribute, map, warnings, actions);
            }
        }
    }
}

fn collect_ward_attribute(
    attribute: &Attribute,
    map: &SourceMap,
    warnings: &mut Vec<Entry>,
    actions: &mut ActionSet,
) {
    if attribute.arguments.is_empty() {
        let pos = map.resolve(attribute.name.span.start);
        warnings.push(Entry::Warning(
            pos,
            "empty ward attribute; expected ward(action(permission))".into(),
        ));
        return;
    }
    for argument in &attribute.arguments {
        match parse_action(argument) {
            Ok(action) => {
                actions.insert(action);
            }
            Err(detail) => {
                let pos = map.resolve(argument.span.start);
                warnings.push(Entry::Warning(pos, detail));
            }
        }
    }
}

/// Match one `action(identifier)` argument.
fn parse_action(argument: &Node<Expression>) -> Result<Action, String> {
    let Expression::Call(call) = &argument.node else {
        return Err("malformed permission specifier; expected action(permission)".into());
    };
    let call = &call.node;

    let Expression::Identifier(keyword) = &call.callee.node else {
        return Err("malformed permission specifier; expected action(permission)".into());
    };
    let keyword = &keyword.node.name;

    let permission = match call.arguments.as_slice() {
        [argument] => match &argument.node {
            Expression::Identifier(id) => PermName::new(&id.node.name),
            _ => {
                return Err(format!(
                    "malformed permission specifier; expected an identifier in {keyword}(...)"
                ))
            }
        },
        _ => {
            return Err(format!(
                "malformed permission specifier; expected exactly one permission in {keyword}(...)"
            ))
        }
    };

    Action::from_keyword(keyword, permission)
        .ok_or_else(|| format!("unknown permission action '{keyword}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lang_c::ast::{CallExpression, Identifier};
    use lang_c::span::Span;

    fn node<T>(inner: T) -> Node<T> {
        Node::new(inner, Span::none())
    }

    fn ident_expr(name: &str) -> Node<Expression> {
        node(Expression::Identifier(Box::new(node(Identifier {
            name: name.to_string(),
        }))))
    }

    fn action_expr(keyword: &str, permission: &str) -> Node<Expression> {
        node(Expression::Call(Box::new(node(CallExpression {
            callee: Box::new(ident_expr(keyword)),
            arguments: vec![ident_expr(permission)],
        }))))
    }

    #[test]
    fn test_parse_known_actions() {
        for keyword in ["need", "use", "grant", "revoke", "deny", "waive"] {
            let action = parse_action(&action_expr(keyword, "lock")).unwrap();
            assert_eq!(action.keyword(), keyword);
            assert_eq!(action.name(), &PermName::new("lock"));
        }
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let err = parse_action(&action_expr("needs", "lock")).unwrap_err();
        assert!(err.contains("unknown permission action 'needs'"));
    }

    #[test]
    fn test_malformed_shapes_are_rejected() {
        // Bare identifier instead of action(permission).
        assert!(parse_action(&ident_expr("lock")).is_err());
        // Non-identifier permission argument.
        let call = node(Expression::Call(Box::new(node(CallExpression {
            callee: Box::new(ident_expr("need")),
            arguments: vec![action_expr("need", "lock")],
        }))));
        assert!(parse_action(&call).is_err());
    }

    #[test]
    fn test_attribute_collection_warns_and_continues() {
        let attribute = Attribute {
            name: node(ATTRIBUTE_NAME.to_string()),
            arguments: vec![action_expr("grant", "lock"), ident_expr("junk")],
        };
        let map = SourceMap::new("a.c", "");
        let mut warnings = Vec::new();
        let mut actions = ActionSet::new();
        collect_ward_attribute(&attribute, &map, &mut warnings, &mut actions);

        assert_eq!(actions.len(), 1);
        assert!(actions.contains(&Action::Grant(PermName::new("lock"))));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].text().contains("malformed permission specifier"));
    }
}
