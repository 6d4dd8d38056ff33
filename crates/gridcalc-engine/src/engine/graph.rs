//! Traversal over the cell dependency graph.
//!
//! Cycle detection walks `depends_on` edges away from a cell; cache
//! invalidation walks `depended_by` edges. Both share [`walk`], which visits
//! every reachable position at most once, so diamond-shaped graphs stay linear.

use std::collections::{HashSet, VecDeque};
use std::ops::ControlFlow;

use super::position::Position;

/// Breadth-first walk from `starts`.
///
/// `visit` runs once per reached position and may stop the walk with
/// `ControlFlow::Break`. `neighbors` is asked for the next positions only
/// after `visit` continues.
pub(crate) fn walk<B, I>(
    starts: impl IntoIterator<Item = Position>,
    mut neighbors: impl FnMut(Position) -> I,
    mut visit: impl FnMut(Position) -> ControlFlow<B>,
) -> ControlFlow<B>
where
    I: IntoIterator<Item = Position>,
{
    let mut visited = HashSet::new();
    let mut queue: VecDeque<Position> = starts.into_iter().collect();

    while let Some(pos) = queue.pop_front() {
        if !visited.insert(pos) {
            continue;
        }
        visit(pos)?;
        queue.extend(neighbors(pos).into_iter().filter(|next| !visited.contains(next)));
    }

    ControlFlow::Continue(())
}
