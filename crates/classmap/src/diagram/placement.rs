//! Initial placement of new nodes

use tracing::trace;

use super::model::{DiagramModel, DiagramNode};
use crate::core::{Database, LayoutConfig};

/// Chooses where a newly added node goes
///
/// Called once per node, when its symbol first appears. Implementations must
/// never return a rectangle that overlaps an existing node.
pub trait Placement: Send + Sync {
    fn place(&self, model: &DiagramModel, width: f64, height: f64) -> (f64, f64);
}

/// Row-major grid of fixed-size slots
///
/// A node takes the first slot whose rectangle, sized for the node, does not
/// overlap any existing node. When every slot in range is blocked the node
/// goes below the lowest node.
#[derive(Debug, Clone, Default)]
pub struct GridPlacement {
    layout: LayoutConfig,
}

impl GridPlacement {
    pub fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }

    fn slot(&self, index: usize) -> (f64, f64) {
        let columns = self.layout.columns.max(1);
        let column = (index % columns) as f64;
        let row = (index / columns) as f64;
        (
            self.layout.origin_x + column * self.layout.slot_width,
            self.layout.origin_y + row * self.layout.slot_height,
        )
    }

    /// Mark the slots whose `width` x `height` rectangle would overlap `node`
    fn mark_blocked(&self, node: &DiagramNode, width: f64, height: f64, blocked: &mut [bool]) {
        let columns = self.layout.columns.max(1);
        let rows = blocked.len().div_ceil(columns);
        let Some((first_col, last_col)) = slot_range(
            node.x - width - self.layout.origin_x,
            node.x + node.width - self.layout.origin_x,
            self.layout.slot_width,
            columns,
        ) else {
            return;
        };
        let Some((first_row, last_row)) = slot_range(
            node.y - height - self.layout.origin_y,
            node.y + node.height - self.layout.origin_y,
            self.layout.slot_height,
            rows,
        ) else {
            return;
        };

        for row in first_row..=last_row {
            for column in first_col..=last_col {
                let index = row * columns + column;
                if index >= blocked.len() || blocked[index] {
                    continue;
                }
                let (x, y) = self.slot(index);
                if node.intersects(x, y, width, height) {
                    blocked[index] = true;
                }
            }
        }
    }
}

/// Slot numbers along one axis that may fall in the open interval `(low, high)`
fn slot_range(low: f64, high: f64, step: f64, count: usize) -> Option<(usize, usize)> {
    if count == 0 || !(step.is_finite() && step > 0.0) || !low.is_finite() || !high.is_finite() {
        return None;
    }
    let first = (low / step).floor().max(0.0);
    let last = (high / step).ceil();
    if last < 0.0 || first >= count as f64 {
        return None;
    }
    Some((first as usize, (last as usize).min(count - 1)))
}

impl Placement for GridPlacement {
    fn place(&self, model: &DiagramModel, width: f64, height: f64) -> (f64, f64) {
        let columns = self.layout.columns.max(1);
        let limit = (model.node_count() + 1) * columns * 2;

        let mut blocked = vec![false; limit];
        for node in model.nodes() {
            self.mark_blocked(node, width, height, &mut blocked);
        }
        if let Some(index) = blocked.iter().position(|b| !b) {
            let (x, y) = self.slot(index);
            trace!(index, x, y, "Placed in grid slot");
            return (x, y);
        }

        let y = model
            .bottom()
            .map_or(self.layout.origin_y, |bottom| bottom + self.layout.padding);
        trace!(y, "Placed below lowest node");
        (self.layout.origin_x, y)
    }
}
