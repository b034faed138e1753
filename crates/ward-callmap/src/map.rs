//! Name-map and call-map construction.
//!
//! The name map collects every function identifier across all translation
//! units with its position, bodies, and extracted actions; the call map
//! replaces bodies with lowered call sequences. Static-name
//! disambiguation happens here: each unit carries the set of names it
//! defines as file-local, and every identifier that becomes a [`FunId`] —
//! defining occurrence or call site — goes through the rename.

use std::collections::HashSet;

use indexmap::IndexMap;
use lang_c::ast::{
    DeclarationSpecifier, Declarator, DeclaratorKind, DerivedDeclarator, ExternalDeclaration,
    FunctionDefinition, StorageClassSpecifier, TranslationUnit,
};
use lang_c::span::Node;
use thiserror::Error;

use ward_core::{ActionSet, Entry, Pos};

use crate::extract;
use crate::ident::FunId;
use crate::lower::Lowerer;
use crate::source_map::SourceMap;
use crate::tree::CallSeq;

/// Two differing bodies for the same function identifier.
#[derive(Debug, Clone, Error)]
#[error("multiple definitions of function '{name}'")]
pub struct MultipleDefinitionsError {
    pub name: String,
}

/// One parsed translation unit, ready for map construction.
pub struct ParsedUnit {
    pub path: String,
    pub unit: TranslationUnit,
    pub source_map: SourceMap,
    /// Function names this unit defines or declares `static`.
    pub statics: HashSet<String>,
}

impl ParsedUnit {
    /// `source` is the preprocessed text the unit was parsed from; it
    /// feeds the span-to-position source map.
    pub fn new(path: impl Into<String>, unit: TranslationUnit, source: &str) -> Self {
        let path = path.into();
        let source_map = SourceMap::new(&path, source);
        let statics = collect_statics(&unit);
        Self {
            path,
            unit,
            source_map,
            statics,
        }
    }
}

/// One function in the name map.
struct NameEntry<'a> {
    pos: Pos,
    /// Every declaration and definition site seen for this function.
    positions: Vec<Pos>,
    /// All definition bodies seen, with the unit that owns each.
    bodies: Vec<(&'a Node<FunctionDefinition>, usize)>,
    actions: ActionSet,
}

/// One function in the call map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMapEntry {
    /// Canonical position: the definition's when there is one.
    pub pos: Pos,
    /// Every declaration and definition site. Enforcement path rules
    /// match against all of them, so `enforce "public.h"` catches a
    /// function whose prototype lives in the header and whose body does
    /// not.
    pub positions: Vec<Pos>,
    /// Lowered body; `None` for declarations without a definition.
    pub body: Option<CallSeq>,
    pub actions: ActionSet,
}

/// The whole-program call map.
pub type CallMap = IndexMap<FunId, CallMapEntry>;

/// Build the merged call map for a set of translation units.
///
/// Returns the map and the structural warnings gathered along the way
/// (malformed attributes, indirect calls).
pub fn build_call_map(
    units: &[ParsedUnit],
) -> Result<(CallMap, Vec<Entry>), MultipleDefinitionsError> {
    let mut warnings = Vec::new();
    let name_map = build_name_map(units, &mut warnings);

    let mut call_map = CallMap::new();
    for (id, entry) in name_map {
        let mut body: Option<CallSeq> = None;
        for (definition, unit_idx) in entry.bodies {
            let unit = &units[unit_idx];
            let mut lowerer = Lowerer::new(
                &unit.path,
                &unit.source_map,
                &unit.statics,
                &mut warnings,
            );
            let lowered = lowerer.lower_body(&definition.node.statement);
            match &body {
                None => body = Some(lowered),
                Some(previous) if *previous == lowered => {}
                Some(_) => {
                    return Err(MultipleDefinitionsError {
                        name: id.name.clone(),
                    })
                }
            }
        }
        call_map.insert(
            id,
            CallMapEntry {
                pos: entry.pos,
                positions: entry.positions,
                body,
                actions: entry.actions,
            },
        );
    }
    Ok((call_map, warnings))
}

/// Merge another call map (e.g. a graph-file unit) into `map`.
pub fn merge_call_map(map: &mut CallMap, other: CallMap) -> Result<(), MultipleDefinitionsError> {
    for (id, incoming) in other {
        match map.entry(id) {
            indexmap::map::Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
            indexmap::map::Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.actions.extend(&incoming.actions);
                existing.positions.extend(incoming.positions);
                match (&existing.body, incoming.body) {
                    (_, None) => {}
                    (None, Some(body)) => {
                        existing.body = Some(body);
                        existing.pos = incoming.pos;
                    }
                    (Some(previous), Some(body)) if *previous == body => {}
                    (Some(_), Some(_)) => {
                        return Err(MultipleDefinitionsError {
                            name: slot.key().name.clone(),
                        })
                    }
                }
            }
        }
    }
    Ok(())
}

fn build_name_map<'a>(
    units: &'a [ParsedUnit],
    warnings: &mut Vec<Entry>,
) -> IndexMap<FunId, NameEntry<'a>> {
    let mut map: IndexMap<FunId, NameEntry<'a>> = IndexMap::new();

    for (unit_idx, unit) in units.iter().enumerate() {
        for external in &unit.unit.0 {
            match &external.node {
                ExternalDeclaration::Declaration(decl) => {
                    let actions =
                        extract::actions_of_declaration(&decl.node, &unit.source_map, warnings);
                    for init in &decl.node.declarators {
                        let declarator = &init.node.declarator;
                        if !is_function_declarator(&declarator.node) {
                            continue;
                        }
                        let Some(name) = declarator_name(&declarator.node) else {
                            continue;
                        };
                        let id = unit_fun_id(unit, name, &unit.source_map, declarator.span.start);
                        upsert(&mut map, id, None, &actions);
                    }
                }
                ExternalDeclaration::FunctionDefinition(definition) => {
                    let actions = extract::actions_of_definition(
                        &definition.node,
                        &unit.source_map,
                        warnings,
                    );
                    let declarator = &definition.node.declarator;
                    let Some(name) = declarator_name(&declarator.node) else {
                        continue;
                    };
                    let id = unit_fun_id(unit, name, &unit.source_map, declarator.span.start);
                    upsert(&mut map, id, Some((definition, unit_idx)), &actions);
                }
                _ => {}
            }
        }
    }
    map
}

fn unit_fun_id(unit: &ParsedUnit, name: &str, map: &SourceMap, offset: usize) -> FunId {
    let pos = map.resolve(offset);
    if unit.statics.contains(name) {
        FunId::file_local(&unit.path, name, pos)
    } else {
        FunId::new(name, pos)
    }
}

fn upsert<'a>(
    map: &mut IndexMap<FunId, NameEntry<'a>>,
    id: FunId,
    body: Option<(&'a Node<FunctionDefinition>, usize)>,
    actions: &ActionSet,
) {
    let pos = id.pos.clone();
    match map.entry(id) {
        indexmap::map::Entry::Vacant(slot) => {
            let mut entry = NameEntry {
                pos: pos.clone(),
                positions: vec![pos],
                bodies: Vec::new(),
                actions: actions.clone(),
            };
            if let Some(body) = body {
                entry.bodies.push(body);
            }
            slot.insert(entry);
        }
        indexmap::map::Entry::Occupied(mut slot) => {
            let entry = slot.get_mut();
            entry.actions.extend(actions);
            entry.positions.push(pos.clone());
            if let Some(body) = body {
                // The definition's position wins over a prototype's.
                if entry.bodies.is_empty() {
                    entry.pos = pos;
                }
                entry.bodies.push(body);
            }
        }
    }
}

/// Names this unit declares or defines with `static` storage class.
fn collect_statics(unit: &TranslationUnit) -> HashSet<String> {
    let mut statics = HashSet::new();
    for external in &unit.0 {
        match &external.node {
            ExternalDeclaration::FunctionDefinition(definition) => {
                if is_static(&definition.node.specifiers) {
                    if let Some(name) = declarator_name(&definition.node.declarator.node) {
                        statics.insert(name.to_string());
                    }
                }
            }
            ExternalDeclaration::Declaration(decl) => {
                if is_static(&decl.node.specifiers) {
                    for init in &decl.node.declarators {
                        let declarator = &init.node.declarator.node;
                        if is_function_declarator(declarator) {
                            if let Some(name) = declarator_name(declarator) {
                                statics.insert(name.to_string());
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
    statics
}

fn is_static(specifiers: &[Node<DeclarationSpecifier>]) -> bool {
    specifiers.iter().any(|specifier| {
        matches!(
            &specifier.node,
            DeclarationSpecifier::StorageClass(storage)
                if storage.node == StorageClassSpecifier::Static
        )
    })
}

/// The identifier a declarator binds, if any.
pub fn declarator_name(declarator: &Declarator) -> Option<&str> {
    match &declarator.kind.node {
        DeclaratorKind::Identifier(id) => Some(&id.node.name),
        DeclaratorKind::Declarator(inner) => declarator_name(&inner.node),
        DeclaratorKind::Abstract => None,
    }
}

/// Whether a declarator declares a function (not a function pointer: a
/// parenthesized inner declarator owns the identifier there).
fn is_function_declarator(declarator: &Declarator) -> bool {
    match &declarator.kind.node {
        DeclaratorKind::Identifier(_) => declarator.derived.iter().any(|derived| {
            matches!(
                derived.node,
                DerivedDeclarator::Function(_) | DerivedDeclarator::KRFunction(_)
            )
        }),
        DeclaratorKind::Declarator(inner) => is_function_declarator(&inner.node),
        DeclaratorKind::Abstract => false,
    }
}
