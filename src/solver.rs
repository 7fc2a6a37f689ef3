use rand::Rng;
use tracing::{debug, info, warn};

use crate::direction::Direction;
use crate::error::{CollapseError, Result};
use crate::grid::{BoundaryPolicy, Grid};
use crate::patch::PatchIndex;
use crate::propagator::{propagate_all, reduce_and_propagate};

/// Flags controlling how a solve runs, orthogonal to how patches were extracted.
#[derive(Debug, Clone, Copy)]
pub struct SolveFlags {
    pub boundary: BoundaryPolicy,
    pub max_restarts: u32,
}

impl Default for SolveFlags {
    fn default() -> Self {
        SolveFlags {
            boundary: BoundaryPolicy::Bounded,
            max_restarts: 0,
        }
    }
}

/// Owns everything one solve needs: the immutable patch index, the mutable
/// grid, and the RNG driving both tie-breaking-free selection and sampling.
pub struct SolverContext<'p, R: Rng> {
    index: &'p PatchIndex,
    grid: Grid,
    rng: R,
    width: usize,
    height: usize,
    flags: SolveFlags,
}

impl<'p, R: Rng> SolverContext<'p, R> {
    pub fn new(index: &'p PatchIndex, width: usize, height: usize, flags: SolveFlags, rng: R) -> Self {
        let grid = Grid::new(index, width, height, flags.boundary);
        SolverContext {
            index,
            grid,
            rng,
            width,
            height,
            flags,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    fn reinit_grid(&mut self) {
        self.grid = Grid::new(self.index, self.width, self.height, self.flags.boundary);
    }

    /// Finds the undetermined cell with minimum entropy, ties broken by
    /// row-major scan order. `None` once every cell is collapsed.
    fn select_lowest_entropy(&mut self) -> Option<(usize, usize)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for idx in 0..self.grid.len() {
            let (x, y) = self.grid.idx_to_pos(idx);
            let cell = self.grid.cell_mut(x, y);
            if cell.is_collapsed() {
                continue;
            }
            let entropy = cell.entropy;
            if best.map_or(true, |(_, _, b)| entropy < b) {
                best = Some((x, y, entropy));
            }
        }
        best.map(|(x, y, _)| (x, y))
    }

    /// Picks one candidate from `(x, y)` weighted by patch frequency, via
    /// interval layout over `[0, total)`.
    fn weighted_sample(&mut self, x: usize, y: usize) -> usize {
        let candidates: Vec<usize> = self.grid.cell(x, y).candidates.iter().collect();
        let total: f64 = candidates.iter().map(|&id| self.index.weight(id)).sum();
        let u: f64 = self.rng.gen::<f64>() * total;

        let mut acc = 0.0;
        for &id in &candidates {
            acc += self.index.weight(id);
            if u < acc {
                return id;
            }
        }
        *candidates.last().expect("candidates non-empty before sampling")
    }

    fn collapse(&mut self, x: usize, y: usize) -> Result<()> {
        let chosen = self.weighted_sample(x, y);
        debug!(target: "solver", x, y, chosen_patch = chosen, "collapse");

        {
            let cell = self.grid.cell_mut(x, y);
            cell.candidates.set_to(chosen);
            cell.refresh(self.index);
        }

        for direction in Direction::all() {
            if let Some((nx, ny)) = self.grid.neighbor(x, y, direction) {
                reduce_and_propagate(&mut self.grid, self.index, nx, ny)?;
            }
        }
        Ok(())
    }

    fn run_once(&mut self) -> Result<()> {
        propagate_all(&mut self.grid, self.index)?;
        while let Some((x, y)) = self.select_lowest_entropy() {
            self.collapse(x, y)?;
        }
        Ok(())
    }

    /// Drives the solve to completion, restarting from a fresh grid up to
    /// `flags.max_restarts` times on contradiction before surfacing it.
    pub fn run(&mut self) -> Result<()> {
        let mut attempt = 0;
        loop {
            match self.run_once() {
                Ok(()) => {
                    info!(target: "solver", attempt, "solve_complete");
                    return Ok(());
                }
                Err(err @ CollapseError::Contradiction { .. }) => {
                    if attempt >= self.flags.max_restarts {
                        warn!(target: "solver", attempt, "restart_budget_exhausted");
                        return Err(err);
                    }
                    attempt += 1;
                    info!(target: "solver", attempt, "restarting_after_contradiction");
                    self.reinit_grid();
                }
                Err(other) => return Err(other),
            }
        }
    }
}
