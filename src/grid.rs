use tracing::trace;

use crate::bitset::BitSet;
use crate::direction::{Direction, DIRECTION_COUNT};
use crate::patch::PatchIndex;

/// One output position: the set of patches still admissible here, plus
/// cached derived state refreshed whenever `candidates` shrinks.
#[derive(Clone)]
pub struct Cell {
    pub candidates: BitSet,
    pub entropy: f64,
    cache: [BitSet; DIRECTION_COUNT],
}

impl Cell {
    fn full(index: &PatchIndex) -> Self {
        let candidates = BitSet::full(index.len());
        let mut cell = Cell {
            candidates,
            entropy: 0.0,
            cache: [BitSet::new(); DIRECTION_COUNT],
        };
        cell.refresh_cache(index);
        cell.refresh_entropy(index);
        cell
    }

    pub fn cache(&self, direction: Direction) -> &BitSet {
        &self.cache[usize::from(direction)]
    }

    pub fn is_collapsed(&mut self) -> bool {
        self.candidates.count() == 1
    }

    pub fn is_contradicted(&mut self) -> bool {
        self.candidates.count() == 0
    }

    fn refresh_cache(&mut self, index: &PatchIndex) {
        for direction in Direction::all() {
            let mut union = BitSet::new();
            for patch_id in self.candidates.iter() {
                union.or_into(index.get(patch_id).allowed(direction));
            }
            self.cache[usize::from(direction)] = union;
        }
    }

    fn refresh_entropy(&mut self, index: &PatchIndex) {
        self.entropy = shannon_entropy(&self.candidates, index);
    }

    /// Refreshes cache and entropy after `candidates` has been mutated directly.
    pub fn refresh(&mut self, index: &PatchIndex) {
        self.refresh_cache(index);
        self.refresh_entropy(index);
    }
}

/// `H = ln(sum w) - (sum w*ln(w)) / sum w`, zero for a collapsed or empty cell.
pub fn shannon_entropy(candidates: &BitSet, index: &PatchIndex) -> f64 {
    if candidates.count_const() <= 1 {
        return 0.0;
    }

    let mut sum_w = 0.0;
    let mut sum_w_ln_w = 0.0;
    for id in candidates.iter() {
        let w = index.weight(id);
        sum_w += w;
        sum_w_ln_w += w * w.ln();
    }

    if sum_w <= 0.0 {
        return 0.0;
    }

    sum_w.ln() - sum_w_ln_w / sum_w
}

/// Boundary policy shared by patch extraction, cache construction, and
/// propagation: a grid is either bounded (edges have no neighbour) or
/// seamless (coordinates wrap modulo width/height).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryPolicy {
    Bounded,
    Seamless,
}

pub struct Grid {
    cells: Vec<Cell>,
    pub width: usize,
    pub height: usize,
    pub boundary: BoundaryPolicy,
}

impl Grid {
    pub fn new(index: &PatchIndex, width: usize, height: usize, boundary: BoundaryPolicy) -> Self {
        let cells = vec![Cell::full(index); width * height];
        trace!(target: "grid", width, height, patches = index.len(), "grid_initialised");
        Grid {
            cells,
            width,
            height,
            boundary,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn pos_to_idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn idx_to_pos(&self, idx: usize) -> (usize, usize) {
        (idx % self.width, idx / self.width)
    }

    pub fn cell(&self, x: usize, y: usize) -> &Cell {
        &self.cells[self.pos_to_idx(x, y)]
    }

    pub fn cell_mut(&mut self, x: usize, y: usize) -> &mut Cell {
        let idx = self.pos_to_idx(x, y);
        &mut self.cells[idx]
    }

    /// The neighbour of (x,y) in `direction`, respecting the boundary policy.
    /// `None` for a bounded grid's edge.
    pub fn neighbor(&self, x: usize, y: usize, direction: Direction) -> Option<(usize, usize)> {
        let (dx, dy) = direction.offset();
        let nx = x as i64 + dx as i64;
        let ny = y as i64 + dy as i64;

        match self.boundary {
            BoundaryPolicy::Bounded => {
                if nx < 0 || ny < 0 || nx >= self.width as i64 || ny >= self.height as i64 {
                    None
                } else {
                    Some((nx as usize, ny as usize))
                }
            }
            BoundaryPolicy::Seamless => {
                let w = self.width as i64;
                let h = self.height as i64;
                Some((nx.rem_euclid(w) as usize, ny.rem_euclid(h) as usize))
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }
}
