//! Change sets between entity graph versions
//!
//! Events are sorted canonically by key and then by event kind, so the diff of
//! two graphs never depends on how either graph was built.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, span, Level};

use super::entity::EntityGraph;
use crate::core::{QualifiedName, Relationship, Symbol};

/// One difference between two graph versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ChangeEvent {
    SymbolRemoved { qualified_name: QualifiedName },
    SymbolAdded { symbol: Symbol },
    /// Kind or member signatures changed under the same key
    SymbolModified { symbol: Symbol },
    RelationshipRemoved { relationship: Relationship },
    RelationshipAdded { relationship: Relationship },
}

impl ChangeEvent {
    /// Qualified name the event sorts by: the symbol, or a relationship's source
    pub fn key(&self) -> &str {
        match self {
            Self::SymbolRemoved { qualified_name } => qualified_name,
            Self::SymbolAdded { symbol } | Self::SymbolModified { symbol } => &symbol.qualified_name,
            Self::RelationshipRemoved { relationship } | Self::RelationshipAdded { relationship } => {
                &relationship.source
            }
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::SymbolRemoved { .. } => 0,
            Self::SymbolAdded { .. } => 1,
            Self::SymbolModified { .. } => 2,
            Self::RelationshipRemoved { .. } => 3,
            Self::RelationshipAdded { .. } => 4,
        }
    }

    fn secondary(&self) -> &str {
        match self {
            Self::RelationshipRemoved { relationship } | Self::RelationshipAdded { relationship } => {
                &relationship.target
            }
            _ => "",
        }
    }

    fn canonical_cmp(&self, other: &Self) -> Ordering {
        (self.key(), self.rank(), self.secondary()).cmp(&(other.key(), other.rank(), other.secondary()))
    }

    pub fn is_symbol_event(&self) -> bool {
        self.rank() <= 2
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SymbolRemoved { qualified_name } => write!(f, "- {}", qualified_name),
            Self::SymbolAdded { symbol } => write!(f, "+ {} {}", symbol.kind, symbol.qualified_name),
            Self::SymbolModified { symbol } => {
                write!(f, "~ {} {}", symbol.kind, symbol.qualified_name)
            }
            Self::RelationshipRemoved { relationship } => write!(f, "- {}", relationship),
            Self::RelationshipAdded { relationship } => write!(f, "+ {}", relationship),
        }
    }
}

/// Ordered events turning one graph version into the next
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub from_version: u64,
    pub to_version: u64,
    pub events: Vec<ChangeEvent>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeEvent> {
        self.events.iter()
    }
}

/// Compare two graph versions
///
/// An empty `previous` graph turns every symbol and relationship of `next`
/// into an added event.
pub fn diff(previous: &EntityGraph, next: &EntityGraph) -> ChangeSet {
    let diff_span = span!(
        Level::DEBUG,
        "diff_graphs",
        from = previous.version(),
        to = next.version()
    );
    let _enter = diff_span.enter();

    let mut events = Vec::new();

    for old in previous.symbols() {
        match next.symbol(&old.qualified_name) {
            None => events.push(ChangeEvent::SymbolRemoved {
                qualified_name: old.qualified_name.clone(),
            }),
            Some(new) if !old.same_shape(new) => events.push(ChangeEvent::SymbolModified {
                symbol: new.clone(),
            }),
            Some(_) => {}
        }
    }
    for new in next.symbols() {
        if !previous.contains(&new.qualified_name) {
            events.push(ChangeEvent::SymbolAdded {
                symbol: new.clone(),
            });
        }
    }

    for old in previous.relationships() {
        if next.relationship(&old.source, &old.target) != Some(old) {
            events.push(ChangeEvent::RelationshipRemoved {
                relationship: old.clone(),
            });
        }
    }
    for new in next.relationships() {
        if previous.relationship(&new.source, &new.target) != Some(new) {
            events.push(ChangeEvent::RelationshipAdded {
                relationship: new.clone(),
            });
        }
    }

    events.sort_by(ChangeEvent::canonical_cmp);
    debug!(events = events.len(), "Diffed graphs");

    ChangeSet {
        from_version: previous.version(),
        to_version: next.version(),
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Database, Member, RelationshipKind, SymbolKind};

    fn class(name: &str) -> Symbol {
        Symbol::new(name, name, SymbolKind::Class, format!("{}.ts", name.to_lowercase()))
    }

    fn graph(version: u64, symbols: &[Symbol], rels: &[Relationship]) -> EntityGraph {
        let mut graph = EntityGraph::new(version);
        for symbol in symbols {
            graph.add_node(symbol.clone()).unwrap();
        }
        for rel in rels {
            graph.add_edge(rel.clone()).unwrap();
        }
        graph
    }

    fn lines(changes: &ChangeSet) -> Vec<String> {
        changes.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_first_run_adds_everything() {
        let next = graph(
            1,
            &[class("Dog"), class("Animal")],
            &[Relationship::new("Dog", "Animal", RelationshipKind::Inheritance)],
        );
        let changes = diff(&EntityGraph::default(), &next);
        assert_eq!((changes.from_version, changes.to_version), (0, 1));
        assert_eq!(
            lines(&changes),
            vec![
                "+ class Animal",
                "+ class Dog",
                "+ Dog -[inheritance]-> Animal",
            ]
        );
    }

    #[test]
    fn test_identical_graphs_have_no_events() {
        let a = graph(1, &[class("Dog")], &[]);
        let b = graph(2, &[class("Dog")], &[]);
        assert!(diff(&a, &b).is_empty());
    }

    #[test]
    fn test_path_and_position_changes_are_silent() {
        let a = graph(1, &[class("Dog")], &[]);
        let mut moved = class("Dog");
        moved.path = "pets/dog.ts".into();
        moved.line = 40;
        moved.modifiers.exported = true;
        let b = graph(2, &[moved], &[]);
        assert!(diff(&a, &b).is_empty());
    }

    #[test]
    fn test_member_change_is_modification() {
        let a = graph(1, &[class("Dog")], &[]);
        let b = graph(2, &[class("Dog").with_member(Member::method("bark"))], &[]);
        let changes = diff(&a, &b);
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes.events[0],
            ChangeEvent::SymbolModified { symbol } if symbol.members.len() == 1
        ));
    }

    #[test]
    fn test_relationship_kind_change_is_remove_then_add() {
        let symbols = [class("Car"), class("Wheel")];
        let a = graph(
            1,
            &symbols,
            &[Relationship::new("Car", "Wheel", RelationshipKind::Association).with_multiplicity("1")],
        );
        let b = graph(
            2,
            &symbols,
            &[Relationship::new("Car", "Wheel", RelationshipKind::Association).with_multiplicity("*")],
        );
        assert_eq!(
            lines(&diff(&a, &b)),
            vec![
                "- Car -[association]-> Wheel (1)",
                "+ Car -[association]-> Wheel (*)",
            ]
        );
    }

    #[test]
    fn test_canonical_order() {
        let a = graph(
            1,
            &[class("Animal"), class("Dog"), class("Cat")],
            &[
                Relationship::new("Dog", "Animal", RelationshipKind::Inheritance),
                Relationship::new("Cat", "Animal", RelationshipKind::Inheritance),
            ],
        );
        let b = graph(
            2,
            &[class("Dog"), class("Cat"), class("Bird")],
            &[Relationship::new("Bird", "Cat", RelationshipKind::Dependency)],
        );
        let changes = diff(&a, &b);
        assert_eq!(
            lines(&changes),
            vec![
                "- Animal",
                "+ class Bird",
                "+ Bird -[dependency]-> Cat",
                "- Cat -[inheritance]-> Animal",
                "- Dog -[inheritance]-> Animal",
            ]
        );
        assert_eq!(changes, diff(&a, &b));
    }

    #[test]
    fn test_serializes_with_event_tag() {
        let event = ChangeEvent::SymbolRemoved {
            qualified_name: "Dog".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"symbol-removed","qualified_name":"Dog"}"#);
    }
}
