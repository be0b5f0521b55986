//! End-to-end scenarios through the public workspace API

use classmap::diagram::{ArrowHead, LineStyle};
use classmap::graph::ChangeEvent;
use classmap::prelude::*;

fn workspace(files: &[(&str, &str)]) -> Workspace {
    let mut ws = Workspace::default();
    for (path, text) in files {
        ws.file_created(path, *text);
    }
    ws.recompute().unwrap();
    ws
}

fn global_workspace(files: &[(&str, &str)]) -> Workspace {
    let mut ws = Workspace::new(SyncConfig {
        naming: NamingScheme::Global,
        ..Default::default()
    })
    .unwrap();
    for (path, text) in files {
        ws.file_created(path, *text);
    }
    ws.recompute().unwrap();
    ws
}

const ANIMAL: &str = "export class Animal {\n  name: string;\n}\n";
const DOG: &str = "import { Animal } from './animal';\n\nexport class Dog extends Animal {\n  bark(): void {}\n}\n";

#[test]
fn test_inheritance() {
    let ws = workspace(&[("animal.ts", ANIMAL), ("dog.ts", DOG)]);
    let graph = ws.graph();

    assert_eq!(graph.symbol_count(), 2);
    assert_eq!(graph.relationship_count(), 1);
    let rel = graph.relationship("dog.ts::Dog", "animal.ts::Animal").unwrap();
    assert_eq!(rel.kind, RelationshipKind::Inheritance);
    assert_eq!(rel.multiplicity, None);

    let edge = ws
        .current_diagram()
        .edge("dog.ts::Dog", "animal.ts::Animal")
        .cloned()
        .unwrap();
    assert_eq!(edge.style.line, LineStyle::Solid);
    assert_eq!(edge.style.head, ArrowHead::HollowTriangle);
}

#[test]
fn test_inheritance_without_imports_under_global_naming() {
    let ws = global_workspace(&[
        ("a.ts", "class Animal {}"),
        ("b.ts", "class Dog extends Animal {}"),
    ]);
    let graph = ws.graph();
    assert_eq!(graph.symbol_count(), 2);
    assert_eq!(
        graph.relationship("Dog", "Animal").map(|r| r.kind),
        Some(RelationshipKind::Inheritance)
    );
}

#[test]
fn test_implementation() {
    let ws = workspace(&[
        ("shape.ts", "export interface Shape { area(): number }"),
        (
            "circle.ts",
            "import { Shape } from './shape';\nexport class Circle implements Shape {\n  area(): number { return 0; }\n}",
        ),
    ]);
    let graph = ws.graph();
    let implementations: Vec<_> = graph
        .relationships()
        .filter(|r| r.kind == RelationshipKind::Implementation)
        .collect();
    assert_eq!(implementations.len(), 1);
    assert_eq!(implementations[0].source, "circle.ts::Circle");
    assert_eq!(implementations[0].target, "shape.ts::Shape");

    let diagram = ws.current_diagram();
    let edge = diagram.edge("circle.ts::Circle", "shape.ts::Shape").unwrap();
    assert_eq!(edge.style.line, LineStyle::Dashed);
    assert_eq!(edge.style.head, ArrowHead::HollowTriangle);
    let shape = diagram.node("shape.ts::Shape").unwrap();
    assert_eq!(shape.stereotype.as_deref(), Some("«interface»"));
}

#[test]
fn test_association_single() {
    let ws = workspace(&[(
        "car.ts",
        "class Engine {}\nclass Car {\n  engine: Engine;\n}",
    )]);
    let graph = ws.graph();
    assert_eq!(graph.relationship_count(), 1);
    let rel = graph.relationship("car.ts::Car", "car.ts::Engine").unwrap();
    assert_eq!(rel.kind, RelationshipKind::Association);
    assert_eq!(rel.multiplicity.as_deref(), Some("1"));

    let diagram = ws.current_diagram();
    let edge = diagram.edge("car.ts::Car", "car.ts::Engine").unwrap();
    assert_eq!(edge.style.line, LineStyle::Solid);
    assert_eq!(edge.style.head, ArrowHead::OpenArrow);
}

/// Containers are read as "many". Arrays, sets, promises and map values all
/// count; this is an assumption about intent rather than a language rule.
#[test]
fn test_association_through_containers_is_many() {
    let ws = workspace(&[(
        "garage.ts",
        "class Car {}\nclass Wheel {}\nclass Owner {}\nclass Garage {\n  cars: Car[];\n  wheels: Set<Wheel>;\n  owner: Promise<Owner>;\n}",
    )]);
    let graph = ws.graph();
    for target in ["Car", "Wheel", "Owner"] {
        let rel = graph
            .relationship("garage.ts::Garage", &format!("garage.ts::{}", target))
            .unwrap();
        assert_eq!(rel.kind, RelationshipKind::Association, "{}", target);
        assert_eq!(rel.multiplicity.as_deref(), Some("*"), "{}", target);
    }
}

#[test]
fn test_dependency_from_method_signature() {
    let ws = workspace(&[(
        "trip.ts",
        "class Route {}\nclass Trip {}\nclass Driver {\n  drive(route: Route): Trip { return new Trip(); }\n}",
    )]);
    let graph = ws.graph();
    assert_eq!(graph.relationship_count(), 2);
    assert!(graph
        .relationships_of("trip.ts::Driver")
        .all(|r| r.kind == RelationshipKind::Dependency));

    let diagram = ws.current_diagram();
    let edge = diagram.edge("trip.ts::Driver", "trip.ts::Route").unwrap();
    assert_eq!(edge.style.line, LineStyle::Dotted);
    assert_eq!(edge.style.head, ArrowHead::OpenArrow);
}

#[test]
fn test_precedence_keeps_only_inheritance() {
    let ws = workspace(&[(
        "a.ts",
        "class Animal {}\nclass Dog extends Animal implements Animal {\n  parent: Animal;\n}",
    )]);
    let graph = ws.graph();
    assert_eq!(graph.relationship_count(), 1);
    assert_eq!(
        graph.relationship("a.ts::Dog", "a.ts::Animal").map(|r| r.kind),
        Some(RelationshipKind::Inheritance)
    );
}

#[test]
fn test_removal_keeps_dog_in_place() {
    let mut ws = workspace(&[("animal.ts", ANIMAL), ("dog.ts", DOG)]);
    let before = ws.current_diagram();
    let dog_position = before.node("dog.ts::Dog").unwrap().position();

    ws.file_deleted("animal.ts").unwrap();
    let report = ws.recompute().unwrap();

    let after = ws.current_diagram();
    assert!(after.node("animal.ts::Animal").is_none());
    assert!(after.edge("dog.ts::Dog", "animal.ts::Animal").is_none());
    assert_eq!(after.node("dog.ts::Dog").unwrap().position(), dog_position);
    assert_eq!(after.node_count(), 1);
    assert_eq!(after.edge_count(), 0);

    let lines: Vec<String> = report.changes.iter().map(|e| e.to_string()).collect();
    assert_eq!(
        lines,
        vec![
            "- animal.ts::Animal",
            "- dog.ts::Dog -[inheritance]-> animal.ts::Animal",
        ]
    );
}

#[test]
fn test_syntax_error_leaves_diagram_unchanged() {
    let mut ws = workspace(&[("animal.ts", ANIMAL), ("dog.ts", DOG)]);
    let before = ws.current_diagram();

    ws.file_changed("dog.ts", "import { Animal } from './animal';\nexport class Dog extends Animal {\n  bark(): void {\n");
    let report = ws.recompute().unwrap();
    assert!(report.changes.is_empty());
    assert!(report.diagnostics.iter().any(Diagnostic::is_parse_error));

    let during = ws.current_diagram();
    assert_eq!(during.nodes().collect::<Vec<_>>(), before.nodes().collect::<Vec<_>>());
    assert_eq!(during.edges().collect::<Vec<_>>(), before.edges().collect::<Vec<_>>());

    ws.file_changed("dog.ts", "import { Animal } from './animal';\nexport class Dog extends Animal {\n  bark(): void {}\n  sit(): void {}\n}\n");
    let report = ws.recompute().unwrap();
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.changes.len(), 1);
    assert!(matches!(
        report.changes.iter().next(),
        Some(ChangeEvent::SymbolModified { .. })
    ));
    let dog = ws.current_diagram().node("dog.ts::Dog").cloned().unwrap();
    assert_eq!(dog.members.len(), 2);
    assert_eq!(dog.position(), before.node("dog.ts::Dog").unwrap().position());
}

#[test]
fn test_regex_literals_are_not_syntax_errors() {
    let mut ws = workspace(&[(
        "car.ts",
        "export class Engine {}\nexport class Car { engine: Engine }\n",
    )]);

    ws.file_changed(
        "car.ts",
        "const QUOTE = /'/;\nexport class Engine {}\nexport class Car { engine: Engine; wheels: Wheel[] }\nexport class Wheel {}\n",
    );
    let report = ws.recompute().unwrap();
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert!(ws.current_diagram().node("car.ts::Wheel").is_some());
    assert_eq!(
        ws.graph()
            .relationship("car.ts::Car", "car.ts::Wheel")
            .and_then(|r| r.multiplicity.clone())
            .as_deref(),
        Some("*")
    );

    let table = classmap::extract(
        "b.ts",
        "class A {}\nclass B {\n  re = /}/;\n  slash = /[/]/g;\n  a: A;\n}\n",
    );
    assert!(table.diagnostics.is_empty(), "{:?}", table.diagnostics);
    let b = table.symbols.iter().find(|s| s.name == "B").unwrap();
    let names: Vec<_> = b.members.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["re", "slash", "a"]);
}

#[test]
fn test_modification_keeps_every_position() {
    let mut ws = workspace(&[
        ("animal.ts", ANIMAL),
        ("dog.ts", DOG),
        ("cat.ts", "import { Animal } from './animal';\nexport class Cat extends Animal {}"),
    ]);
    let before = ws.current_diagram().positions();

    ws.file_changed("animal.ts", "export class Animal {\n  name: string;\n  legs: number;\n}\n");
    let report = ws.recompute().unwrap();
    assert_eq!(report.changes.len(), 1);
    assert_eq!(ws.current_diagram().positions(), before);
}

#[test]
fn test_user_positions_survive_later_runs() {
    let mut ws = workspace(&[("animal.ts", ANIMAL), ("dog.ts", DOG)]);
    let mut updates = ws.store().subscribe();
    ws.set_node_position("dog.ts::Dog", 500.0, 40.0).unwrap();
    assert!(matches!(
        updates.try_recv(),
        Ok(DiagramUpdate::NodeMoved { ref id, .. }) if id == "dog.ts::Dog"
    ));

    ws.file_created("cat.ts", "export class Cat {}");
    ws.recompute().unwrap();
    let diagram = ws.current_diagram();
    assert_eq!(diagram.node("dog.ts::Dog").unwrap().position(), (500.0, 40.0));

    let cat = diagram.node("cat.ts::Cat").unwrap();
    for other in diagram.nodes().filter(|n| n.id != cat.id) {
        assert_ne!(other.position(), cat.position());
    }

    assert!(matches!(
        ws.set_node_position("missing.ts::Nope", 0.0, 0.0),
        Err(SyncError::UnknownNode { .. })
    ));
}

#[test]
fn test_conflicting_declarations_suppress_relationships() {
    let ws = global_workspace(&[
        ("a/engine.ts", "class Engine {}"),
        ("b/engine.ts", "class Engine { power: number }"),
        ("car.ts", "class Car { engine: Engine }"),
    ]);
    let graph = ws.graph();
    assert!(graph.is_conflicting("Engine"));
    assert!(graph.symbol("Engine").unwrap().conflicting);
    assert_eq!(graph.relationship_count(), 0);

    let conflict = graph
        .diagnostics()
        .iter()
        .find_map(|d| match d {
            Diagnostic::Conflict { paths, .. } => Some(paths.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(conflict, vec!["a/engine.ts", "b/engine.ts"]);
    assert!(ws.current_diagram().node("Engine").unwrap().conflicting);
}

#[test]
fn test_conflict_resolution_restores_relationship() {
    let mut ws = global_workspace(&[
        ("a/engine.ts", "class Engine {}"),
        ("b/engine.ts", "class Engine {}"),
        ("car.ts", "class Car { engine: Engine }"),
    ]);
    assert_eq!(ws.graph().relationship_count(), 0);

    ws.file_deleted("b/engine.ts").unwrap();
    let report = ws.recompute().unwrap();
    assert!(!ws.graph().is_conflicting("Engine"));
    assert_eq!(ws.graph().relationship_count(), 1);
    assert!(report
        .changes
        .iter()
        .any(|e| matches!(e, ChangeEvent::RelationshipAdded { .. })));
    assert!(ws.current_diagram().edge("Car", "Engine").is_some());
}

#[test]
fn test_conflicting_flag_follows_graph_without_shape_change() {
    let mut ws = workspace(&[("a.ts", "class Twin {}\nclass User { twin: Twin }\n")]);
    let before = ws.current_diagram().node("a.ts::Twin").cloned().unwrap();
    assert!(!before.conflicting);

    ws.file_changed("a.ts", "class Twin {}\nclass User { twin: Twin }\ninterface Twin {}\n");
    let report = ws.recompute().unwrap();
    assert!(!report
        .changes
        .iter()
        .any(|e| matches!(e, ChangeEvent::SymbolModified { .. })));
    assert!(ws.graph().symbol("a.ts::Twin").unwrap().conflicting);
    let twin = ws.current_diagram().node("a.ts::Twin").cloned().unwrap();
    assert!(twin.conflicting);
    assert_eq!(twin.position(), before.position());
    assert!(ws.current_diagram().edge("a.ts::User", "a.ts::Twin").is_none());

    ws.file_changed("a.ts", "class Twin {}\nclass User { twin: Twin }\n");
    ws.recompute().unwrap();
    let twin = ws.current_diagram().node("a.ts::Twin").cloned().unwrap();
    assert!(!twin.conflicting);
    assert_eq!(twin.position(), before.position());
    assert!(ws.current_diagram().edge("a.ts::User", "a.ts::Twin").is_some());
}

#[test]
fn test_move_is_remove_and_add_under_file_scoped_naming() {
    let mut ws = workspace(&[("animal.ts", ANIMAL), ("dog.ts", DOG)]);
    ws.file_moved("dog.ts", "pets/dog.ts").unwrap();
    let report = ws.recompute().unwrap();

    let lines: Vec<String> = report.changes.iter().map(|e| e.to_string()).collect();
    assert_eq!(
        lines,
        vec![
            "- dog.ts::Dog",
            "- dog.ts::Dog -[inheritance]-> animal.ts::Animal",
            "+ class pets/dog.ts::Dog",
        ]
    );
    // the moved file's relative import no longer resolves
    assert_eq!(ws.graph().relationship_count(), 0);
}

#[test]
fn test_move_is_silent_under_global_naming() {
    let mut ws = global_workspace(&[("a.ts", "class Animal {}"), ("b.ts", "class Dog extends Animal {}")]);
    ws.file_moved("b.ts", "pets/b.ts").unwrap();
    let report = ws.recompute().unwrap();
    assert!(report.changes.is_empty());
    assert_eq!(ws.graph().symbol("Dog").unwrap().path, "pets/b.ts");
}

#[test]
fn test_re_exports_and_aliases_resolve() {
    let ws = workspace(&[
        ("models/engine.ts", "export class Engine {}"),
        ("models/index.ts", "export * from './engine';"),
        ("car.ts", "import { Engine as Motor } from './models';\nclass Car { motor: Motor }"),
        ("boat.ts", "import * as models from './models/index';\nclass Boat { motors: models.Engine[] }"),
    ]);
    let graph = ws.graph();
    assert_eq!(
        graph
            .relationship("car.ts::Car", "models/engine.ts::Engine")
            .and_then(|r| r.multiplicity.clone()),
        Some("1".to_string())
    );
    assert_eq!(
        graph
            .relationship("boat.ts::Boat", "models/engine.ts::Engine")
            .and_then(|r| r.multiplicity.clone()),
        Some("*".to_string())
    );
}

#[test]
fn test_non_source_files_are_tracked_but_not_extracted() {
    let ws = workspace(&[("README.md", "class NotCode {}"), ("a.ts", "class A {}")]);
    assert_eq!(ws.files().count(), 2);
    assert_eq!(ws.graph().symbol_count(), 1);
}
