//! The JSON call-graph format.
//!
//! `--action graph` dumps the call map as a JSON object mapping function
//! name to `{position, calls, permissions}`, where `calls` is the
//! recursive sum type `call | choice | sequence`:
//!
//! ```json
//! { "main": { "position": {"file": "a.c", "line": 3},
//!             "calls": {"sequence": [{"call": "take_lock"},
//!                        {"choice": [[{"call": "free_lock"}], []]}]},
//!             "permissions": ["need(lock)"] } }
//! ```
//!
//! The same format is accepted back as an analysis input unit. `calls`
//! is `null` for a declaration without a definition; a defined function
//! with no calls keeps an empty sequence, so reloading a dump analyzes
//! exactly the functions the original sources did.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ward_core::{Action, ActionSet, Pos};

use crate::ident::FunId;
use crate::map::{CallMap, CallMapEntry};
use crate::tree::{CallSeq, CallTree};

/// Failure to load a callmap graph unit.
#[derive(Debug, Error)]
#[error("invalid callmap unit '{path}': {detail}")]
pub struct CallMapUnitParseError {
    pub path: String,
    pub detail: String,
}

/// `calls` in the graph format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphCalls {
    Call(String),
    Choice(Vec<GraphCalls>, Vec<GraphCalls>),
    Sequence(Vec<GraphCalls>),
}

/// One function in the graph format. `calls` is `None` for a bare
/// declaration; a definition always carries a sequence, even an empty
/// one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEntry {
    pub position: Pos,
    pub calls: Option<GraphCalls>,
    pub permissions: Vec<String>,
}

/// Serialize a call map as the JSON graph document.
pub fn dump(map: &CallMap) -> serde_json::Result<String> {
    let graph: IndexMap<&str, GraphEntry> = map
        .iter()
        .map(|(id, entry)| (id.name.as_str(), entry_to_graph(entry)))
        .collect();
    let mut text = serde_json::to_string_pretty(&graph)?;
    text.push('\n');
    Ok(text)
}

/// Parse a graph document back into a call map.
pub fn parse_unit(path: &str, text: &str) -> Result<CallMap, CallMapUnitParseError> {
    let graph: IndexMap<String, GraphEntry> =
        serde_json::from_str(text).map_err(|err| CallMapUnitParseError {
            path: path.to_string(),
            detail: err.to_string(),
        })?;

    let mut map = CallMap::new();
    for (name, entry) in graph {
        let mut actions = ActionSet::new();
        for permission in &entry.permissions {
            let action: Action = permission.parse().map_err(|_| CallMapUnitParseError {
                path: path.to_string(),
                detail: format!("invalid permission action '{permission}' on '{name}'"),
            })?;
            actions.insert(action);
        }

        let body = entry
            .calls
            .as_ref()
            .map(|calls| graph_to_seq(calls, &entry.position));
        let id = FunId::new(name, entry.position.clone());
        map.insert(
            id,
            CallMapEntry {
                pos: entry.position.clone(),
                positions: vec![entry.position],
                body,
                actions,
            },
        );
    }
    Ok(map)
}

fn entry_to_graph(entry: &CallMapEntry) -> GraphEntry {
    let calls = entry
        .body
        .as_ref()
        .map(|body| GraphCalls::Sequence(seq_to_graph(body)));
    let mut permissions: Vec<String> = entry.actions.iter().map(|a| a.to_string()).collect();
    permissions.sort();
    GraphEntry {
        position: entry.pos.clone(),
        calls,
        permissions,
    }
}

fn seq_to_graph(seq: &CallSeq) -> Vec<GraphCalls> {
    seq.iter()
        .map(|tree| match tree {
            CallTree::Call(id) => GraphCalls::Call(id.name.clone()),
            CallTree::Choice(a, b) => GraphCalls::Choice(seq_to_graph(a), seq_to_graph(b)),
        })
        .collect()
}

/// Rebuild a call sequence; graph files carry no per-call positions, so
/// call sites borrow the owning function's position.
fn graph_to_seq(calls: &GraphCalls, owner: &Pos) -> CallSeq {
    let mut seq = CallSeq::new();
    push_graph(calls, owner, &mut seq);
    seq
}

fn push_graph(calls: &GraphCalls, owner: &Pos, out: &mut CallSeq) {
    match calls {
        GraphCalls::Call(name) => out.push(CallTree::Call(FunId::new(name.clone(), owner.clone()))),
        GraphCalls::Choice(a, b) => {
            let mut left = CallSeq::new();
            for item in a {
                push_graph(item, owner, &mut left);
            }
            let mut right = CallSeq::new();
            for item in b {
                push_graph(item, owner, &mut right);
            }
            out.push(CallTree::Choice(left, right));
        }
        GraphCalls::Sequence(items) => {
            for item in items {
                push_graph(item, owner, out);
            }
        }
    }
}
