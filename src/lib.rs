mod bitset;
mod direction;
mod error;
mod grid;
mod patch;
mod preview;
mod propagator;
mod solver;
#[cfg(test)]
mod test_utils;

pub use crate::error::{CollapseError, Result};
pub use crate::grid::{BoundaryPolicy, Cell, Grid};
pub use crate::patch::{Patch, PatchFlags, PatchIndex};
pub use crate::preview::preview_color;
pub use crate::solver::{SolveFlags, SolverContext};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

pub type Image = image::ImageBuffer<image::Rgba<u8>, Vec<u8>>;

/// Everything a single generation run needs beyond the input image itself.
pub struct Config {
    pub pattern_size: usize,
    pub width: usize,
    pub height: usize,
    pub patch_flags: PatchFlags,
    pub solve_flags: SolveFlags,
    pub seed: Option<u64>,
}

/// Runs patch extraction and the solver end to end, rendering the result as
/// a preview image via [`preview_color`].
pub fn generate(image: &Image, cfg: Config) -> Result<Image> {
    let index = PatchIndex::build(image, cfg.pattern_size, cfg.patch_flags)?;
    info!(target: "collapse", patterns = index.len(), "patch_index_built");

    let rng = match cfg.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut ctx = SolverContext::new(&index, cfg.width, cfg.height, cfg.solve_flags, rng);
    ctx.run()?;

    let mut out = Image::new(cfg.width as u32, cfg.height as u32);
    for idx in 0..ctx.grid().len() {
        let (x, y) = ctx.grid().idx_to_pos(idx);
        let cell = ctx.grid().cell(x, y);
        out.put_pixel(x as u32, y as u32, preview::preview_color(cell, &index));
    }
    Ok(out)
}
