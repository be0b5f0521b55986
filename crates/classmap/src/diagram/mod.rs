//! Positioned diagram model and its maintenance
//!
//! [`LayoutAdapter`] turns graph change sets into diagram mutations that
//! never move an existing node, and [`DiagramStore`] publishes the result to
//! the rendering layer.

mod adapter;
mod model;
mod placement;
mod store;

pub use adapter::LayoutAdapter;
pub use model::{ArrowHead, DiagramEdge, DiagramModel, DiagramNode, EdgeStyle, LineStyle};
pub use placement::{GridPlacement, Placement};
pub use store::{DiagramStore, DiagramUpdate};
