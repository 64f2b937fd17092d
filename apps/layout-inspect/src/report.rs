//! Text and JSON renderings of an expanded form.

use std::fmt::{self, Write};

use formtree_layout::{LayoutPages, NodeRef};
use formtree_store::{HiddenReason, NodeData, NodeStore, Observable};
use serde_json::json;

fn reason_label(reason: &HiddenReason) -> String {
    match reason {
        HiddenReason::Page { key } => format!("page {key}"),
        HiddenReason::Explicit => "explicit".to_owned(),
        HiddenReason::Rule => "rule".to_owned(),
        HiddenReason::Container { parent } => format!("container {parent}"),
        HiddenReason::Inherited { from } => format!("via {from}"),
    }
}

pub fn render_tree(pages: &LayoutPages, store: &NodeStore) -> Result<String, fmt::Error> {
    let current = pages.current_page().map(|page| page.key());
    let mut out = String::new();
    for page in pages.pages() {
        if Some(page.key()) == current {
            writeln!(out, "page {} (current)", page.key())?;
        } else {
            writeln!(out, "page {}", page.key())?;
        }
        for node in page.top_level() {
            write_node(&mut out, node, store, 1)?;
        }
    }
    Ok(out)
}

fn write_node(out: &mut String, node: NodeRef<'_>, store: &NodeStore, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    write!(out, "{indent}{} [{}]", node.id(), node.component_type())?;
    for (name, reference) in node.bindings() {
        write!(out, " {name}={}", reference.field)?;
    }
    if let Ok(Some(reason)) = store.hidden_reason(node.id()) {
        write!(out, " (hidden: {})", reason_label(&reason))?;
    }
    for error in node.errors() {
        write!(out, " !{}", error.key())?;
    }
    writeln!(out)?;

    let Ok(group) = node.as_group() else {
        return Ok(());
    };
    if group.is_repeating() {
        for row in group.rows() {
            writeln!(out, "{indent}  row {} ({})", row.index, row.uuid)?;
            for child in group.all_children(Some(row.index)) {
                write_node(out, child, store, depth + 2)?;
            }
        }
    } else {
        for child in group.all_children(None) {
            write_node(out, child, store, depth + 1)?;
        }
    }
    Ok(())
}

pub fn render_json(store: &NodeStore) -> Result<String, serde_json::Error> {
    let (nodes, hidden) = store.with_state(|state| {
        let mut nodes: Vec<NodeData> = state.nodes().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let hidden: serde_json::Map<String, serde_json::Value> = nodes
            .iter()
            .filter_map(|node| {
                let reason = state.hidden_reason(&node.id).ok().flatten()?;
                Some((node.id.to_string(), json!(reason)))
            })
            .collect();
        (nodes, hidden)
    });
    serde_json::to_string_pretty(&json!({
        "nodes": nodes,
        "hidden": hidden,
        "diagnostics": store.diagnostics(),
    }))
}
