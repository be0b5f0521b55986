//! Property tests over generated workspaces
//!
//! Each generated workspace has one class per file. Classes reference each
//! other through fields, container fields and method parameters, so edits
//! can add, remove and retype relationships in any shape, cycles included.

use std::collections::{BTreeMap, BTreeSet};

use classmap::graph::{diff, ChangeEvent};
use classmap::prelude::*;
use proptest::prelude::*;

const CLASSES: usize = 6;

/// How class `i` refers to class `j`
#[derive(Debug, Clone, Copy)]
enum Link {
    Field,
    Many,
    Param,
    Extends,
}

type Links = BTreeMap<usize, Link>;

fn link_strategy() -> impl Strategy<Value = Link> {
    prop_oneof![
        Just(Link::Field),
        Just(Link::Many),
        Just(Link::Param),
        Just(Link::Extends),
    ]
}

fn links_strategy() -> impl Strategy<Value = Links> {
    proptest::collection::btree_map(0..CLASSES, link_strategy(), 0..4)
}

fn workspace_strategy() -> impl Strategy<Value = Vec<(Links, usize)>> {
    proptest::collection::vec((links_strategy(), 0..3usize), CLASSES)
}

fn path(i: usize) -> String {
    format!("src/c{}.ts", i)
}

/// Source of class `i`; `extra` adds primitive fields that change its shape
fn source(i: usize, links: &Links, extra: usize) -> String {
    let mut out = String::new();
    for j in links.keys().filter(|j| **j != i) {
        out.push_str(&format!("import {{ C{} }} from './c{}';\n", j, j));
    }

    let parent = links
        .iter()
        .find(|(_, link)| matches!(link, Link::Extends))
        .map(|(j, _)| *j);
    match parent {
        Some(j) => out.push_str(&format!("export class C{} extends C{} {{\n", i, j)),
        None => out.push_str(&format!("export class C{} {{\n", i)),
    }

    for (j, link) in links {
        match link {
            Link::Field => out.push_str(&format!("  f{}: C{};\n", j, j)),
            Link::Many => out.push_str(&format!("  f{}: C{}[];\n", j, j)),
            Link::Param => out.push_str(&format!("  m{}(value: C{}): void {{}}\n", j, j)),
            Link::Extends => {}
        }
    }
    for k in 0..extra {
        out.push_str(&format!("  extra{}: number;\n", k));
    }
    out.push_str("}\n");
    out
}

fn tables(files: &[(Links, usize)]) -> Vec<FileTable> {
    files
        .iter()
        .enumerate()
        .map(|(i, (links, extra))| classmap::extract(&path(i), &source(i, links, *extra)))
        .collect()
}

fn committed(files: &[(Links, usize)]) -> Workspace {
    let mut ws = Workspace::default();
    for (i, (links, extra)) in files.iter().enumerate() {
        ws.file_created(&path(i), source(i, links, *extra));
    }
    ws.recompute().unwrap();
    ws
}

/// Node ids an event set is allowed to move
fn touched(changes: &ChangeSet) -> BTreeSet<String> {
    let mut ids = BTreeSet::new();
    for event in changes.iter() {
        match event {
            ChangeEvent::SymbolAdded { symbol } | ChangeEvent::SymbolModified { symbol } => {
                ids.insert(symbol.qualified_name.clone());
            }
            ChangeEvent::SymbolRemoved { qualified_name } => {
                ids.insert(qualified_name.clone());
            }
            ChangeEvent::RelationshipAdded { relationship }
            | ChangeEvent::RelationshipRemoved { relationship } => {
                ids.insert(relationship.source.clone());
                ids.insert(relationship.target.clone());
            }
        }
    }
    ids
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_rebuild_is_idempotent(files in workspace_strategy()) {
        let builder = GraphBuilder::default();
        let tables = tables(&files);
        let first = builder.build(&tables, 1);
        let second = builder.build(tables.iter().rev(), 1);

        prop_assert_eq!(&first, &second);
        prop_assert!(diff(&first, &second).is_empty());
    }

    #[test]
    fn test_diff_is_deterministic(before in workspace_strategy(), after in workspace_strategy()) {
        let builder = GraphBuilder::default();
        let previous = builder.build(&tables(&before), 1);
        let next = builder.build(tables(&after).iter().rev(), 2);

        let first = diff(&previous, &next);
        let second = diff(&previous, &next);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            serde_json::to_string(&first.events).unwrap(),
            serde_json::to_string(&second.events).unwrap()
        );
    }

    #[test]
    fn test_single_file_edit_is_local(
        files in workspace_strategy(),
        edited in 0..CLASSES,
        links in links_strategy(),
        extra in 0..3usize,
    ) {
        let mut ws = committed(&files);
        let before = ws.current_diagram().positions();

        ws.file_changed(&path(edited), source(edited, &links, extra));
        let report = ws.recompute().unwrap();
        let allowed = touched(&report.changes);
        let after = ws.current_diagram().positions();

        for (id, position) in &before {
            if allowed.contains(id) {
                continue;
            }
            prop_assert_eq!(after.get(id), Some(position), "{} moved", id);
        }
        // surviving nodes never move, touched or not
        for (id, position) in &after {
            if let Some(previous) = before.get(id) {
                prop_assert_eq!(position, previous);
            }
        }
    }

    #[test]
    fn test_shape_only_edit_moves_nothing(
        files in workspace_strategy(),
        edited in 0..CLASSES,
    ) {
        let mut ws = committed(&files);
        let before = ws.current_diagram().positions();

        let (links, extra) = &files[edited];
        ws.file_changed(&path(edited), source(edited, links, extra + 1));
        let report = ws.recompute().unwrap();

        prop_assert_eq!(report.changes.len(), 1);
        let is_modified = matches!(
            report.changes.iter().next(),
            Some(ChangeEvent::SymbolModified { .. })
        );
        prop_assert!(is_modified);
        prop_assert_eq!(ws.current_diagram().positions(), before);
    }

    #[test]
    fn test_diagram_mirrors_graph(files in workspace_strategy(), later in workspace_strategy()) {
        let mut ws = committed(&files);
        for (i, (links, extra)) in later.iter().enumerate() {
            ws.file_changed(&path(i), source(i, links, *extra));
        }
        ws.recompute().unwrap();

        let graph = ws.graph();
        let diagram = ws.current_diagram();
        let graph_nodes: Vec<&str> = graph.symbols().map(|s| s.qualified_name.as_str()).collect();
        let diagram_nodes: Vec<&str> = diagram.nodes().map(|n| n.id.as_str()).collect();
        prop_assert_eq!(graph_nodes, diagram_nodes);

        let graph_edges: Vec<_> = graph.relationships().map(|r| r.key()).collect();
        let diagram_edges: Vec<_> = diagram.edges().map(|e| e.key()).collect();
        prop_assert_eq!(graph_edges, diagram_edges);

        let placed: BTreeSet<(u64, u64)> = diagram
            .nodes()
            .map(|n| (n.x.to_bits(), n.y.to_bits()))
            .collect();
        prop_assert_eq!(placed.len(), diagram.node_count());
    }
}
