use rustc_hash::FxHashSet as HashSet;
use tracing::trace;

use crate::direction::Direction;
use crate::error::{CollapseError, Result};
use crate::grid::Grid;
use crate::patch::PatchIndex;

/// Shrinks `grid`'s cell at `(x, y)` against its neighbours' caches and
/// propagates the consequences until a fixed point, using a FIFO worklist
/// instead of recursion so stack depth stays O(1) regardless of grid size.
///
/// Both formulations reach the same fixed point because propagation is
/// monotone: candidates only shrink, never grow.
pub fn reduce_and_propagate(
    grid: &mut Grid,
    index: &PatchIndex,
    x: usize,
    y: usize,
) -> Result<()> {
    let mut worklist = vec![(x, y)];
    let mut queued: HashSet<(usize, usize)> = HashSet::default();
    queued.insert((x, y));

    while let Some((cx, cy)) = worklist.pop() {
        queued.remove(&(cx, cy));

        let old = grid.cell(cx, cy).candidates;

        let mut incoming = old;
        for direction in Direction::all() {
            if let Some((nx, ny)) = grid.neighbor(cx, cy, direction) {
                incoming.and_into(grid.cell(nx, ny).cache(direction.opposite()));
            }
        }

        if incoming.equals(&old) {
            continue;
        }

        let cell = grid.cell_mut(cx, cy);
        cell.candidates = incoming;
        cell.refresh(index);

        if cell.candidates.is_empty() {
            trace!(target: "propagator", x = cx, y = cy, "contradiction");
            return Err(CollapseError::Contradiction { x: cx, y: cy });
        }

        for direction in Direction::all() {
            if let Some((nx, ny)) = grid.neighbor(cx, cy, direction) {
                if queued.insert((nx, ny)) {
                    worklist.push((nx, ny));
                }
            }
        }
    }

    Ok(())
}

/// Runs [`reduce_and_propagate`] over every cell once, used to bring a
/// freshly initialised grid to quiescence before the solver's main loop.
pub fn propagate_all(grid: &mut Grid, index: &PatchIndex) -> Result<()> {
    for y in 0..grid.height {
        for x in 0..grid.width {
            reduce_and_propagate(grid, index, x, y)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::BoundaryPolicy;
    use crate::patch::PatchFlags;
    use crate::test_utils::checkerboard;
    use pretty_assertions::assert_eq;

    #[test]
    fn propagation_only_shrinks_candidates() {
        let img = checkerboard(4, 4);
        let index = PatchIndex::build(&img, 2, PatchFlags::default()).unwrap();
        let mut grid = Grid::new(&index, 4, 4, BoundaryPolicy::Seamless);

        let before: Vec<usize> = (0..grid.len())
            .map(|i| {
                let (x, y) = grid.idx_to_pos(i);
                grid.cell(x, y).candidates.count_const()
            })
            .collect();

        propagate_all(&mut grid, &index).unwrap();

        for i in 0..grid.len() {
            let (x, y) = grid.idx_to_pos(i);
            assert!(grid.cell(x, y).candidates.count_const() <= before[i]);
        }
    }

    #[test]
    fn cache_matches_union_of_candidates_allowed_sets_at_quiescence() {
        let img = checkerboard(4, 4);
        let index = PatchIndex::build(&img, 2, PatchFlags::default()).unwrap();
        let mut grid = Grid::new(&index, 3, 3, BoundaryPolicy::Bounded);
        propagate_all(&mut grid, &index).unwrap();

        for y in 0..3 {
            for x in 0..3 {
                let cell = grid.cell(x, y);
                for direction in Direction::all() {
                    let mut expected = crate::bitset::BitSet::new();
                    for id in cell.candidates.iter() {
                        expected.or_into(index.get(id).allowed(direction));
                    }
                    assert_eq!(expected, *cell.cache(direction));
                }
            }
        }
    }

    #[test]
    fn collapsing_a_cell_constrains_its_neighbor() {
        let img = checkerboard(4, 4);
        let index = PatchIndex::build(&img, 2, PatchFlags::default()).unwrap();
        let mut grid = Grid::new(&index, 4, 4, BoundaryPolicy::Seamless);
        propagate_all(&mut grid, &index).unwrap();

        let chosen = grid.cell(0, 0).candidates.iter().next().unwrap();
        {
            let cell = grid.cell_mut(0, 0);
            cell.candidates.set_to(chosen);
            cell.refresh(&index);
        }
        reduce_and_propagate(&mut grid, &index, 0, 0).unwrap();

        let neighbor_candidates = grid.cell(1, 0).candidates.count_const();
        assert!(neighbor_candidates <= index.len());
    }
}
