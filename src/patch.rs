use std::collections::HashMap;
use std::fmt::Debug;

use image::Rgba;
use itertools::iproduct;
use tracing::debug;

use crate::bitset::{BitSet, MAX_PATCHES};
use crate::direction::{Direction, DIRECTION_COUNT};
use crate::error::{CollapseError, Result};
use crate::Image;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Debug for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, self.a])
    }
}

impl From<Rgba<u8>> for Color {
    fn from(value: Rgba<u8>) -> Self {
        Color::new(value[0], value[1], value[2], value[3])
    }
}

/// A unique N×N window of input pixels, treated as an atomic placement unit.
#[derive(Clone)]
pub struct Patch {
    pub size: usize,
    pub pixels: Vec<Color>,
    pub weight: u32,
    #[allow(clippy::type_complexity)]
    allowed: [BitSet; DIRECTION_COUNT],
}

impl Patch {
    fn new(size: usize, pixels: Vec<Color>) -> Self {
        Patch {
            size,
            pixels,
            weight: 1,
            allowed: [BitSet::new(); DIRECTION_COUNT],
        }
    }

    fn get(&self, x: usize, y: usize) -> Color {
        self.pixels[y * self.size + x]
    }

    pub fn allowed(&self, direction: Direction) -> &BitSet {
        &self.allowed[usize::from(direction)]
    }

    fn allowed_mut(&mut self, direction: Direction) -> &mut BitSet {
        &mut self.allowed[usize::from(direction)]
    }

    /// The colour used for preview blending: the patch's top-left pixel.
    pub fn representative_color(&self) -> Color {
        self.pixels[0]
    }

    fn rotate90(&self) -> Self {
        let n = self.size;
        let mut rotated = vec![self.pixels[0]; n * n];
        for y in 0..n {
            for x in 0..n {
                rotated[x * n + (n - 1 - y)] = self.get(x, y);
            }
        }
        Patch::new(n, rotated)
    }

    fn mirror_h(&self) -> Self {
        let n = self.size;
        let mut mirrored = vec![self.pixels[0]; n * n];
        for y in 0..n {
            for x in 0..n {
                mirrored[y * n + (n - 1 - x)] = self.get(x, y);
            }
        }
        Patch::new(n, mirrored)
    }

    fn mirror_v(&self) -> Self {
        let n = self.size;
        let mut mirrored = vec![self.pixels[0]; n * n];
        for y in 0..n {
            for x in 0..n {
                mirrored[(n - 1 - y) * n + x] = self.get(x, y);
            }
        }
        Patch::new(n, mirrored)
    }
}

/// Flags controlling patch extraction from the input image.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchFlags {
    pub wrap_x: bool,
    pub wrap_y: bool,
    pub rotate: bool,
    pub mirror_v: bool,
    pub mirror_h: bool,
}

/// The result of analysing the input: unique N×N patches, their frequency
/// weights, and the per-direction adjacency relation between them.
///
/// Immutable after construction.
pub struct PatchIndex {
    patches: Vec<Patch>,
    pub patch_size: usize,
}

impl PatchIndex {
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn get(&self, id: usize) -> &Patch {
        &self.patches[id]
    }

    pub fn weight(&self, id: usize) -> f64 {
        self.patches[id].weight as f64
    }

    /// Builds the index from a decoded RGBA image.
    pub fn build(image: &Image, patch_size: usize, flags: PatchFlags) -> Result<PatchIndex> {
        let (iw, ih) = image.dimensions();
        let (iw, ih) = (iw as usize, ih as usize);

        if patch_size == 0 || (!flags.wrap_x && iw < patch_size) || (!flags.wrap_y && ih < patch_size)
        {
            return Err(CollapseError::InputTooSmall {
                pattern_size: patch_size,
                width: iw as u32,
                height: ih as u32,
            });
        }

        let x_max = if flags.wrap_x { iw } else { iw - patch_size + 1 };
        let y_max = if flags.wrap_y { ih } else { ih - patch_size + 1 };
        if x_max == 0 || y_max == 0 {
            return Err(CollapseError::InputTooSmall {
                pattern_size: patch_size,
                width: iw as u32,
                height: ih as u32,
            });
        }

        let mut patches: Vec<Patch> = Vec::new();
        let mut by_pixels: HashMap<Vec<Color>, usize> = HashMap::new();

        for y in 0..y_max {
            for x in 0..x_max {
                let window = extract_window(image, iw, ih, x, y, patch_size);
                for variant in symmetry_variants(&window, flags) {
                    submit_variant(&mut patches, &mut by_pixels, variant)?;
                }
            }
        }

        debug!(
            target: "patch_index",
            patterns_found = patches.len(),
            capacity = MAX_PATCHES,
            "patch_extraction_complete"
        );

        derive_adjacency(&mut patches, patch_size);

        Ok(PatchIndex {
            patches,
            patch_size,
        })
    }
}

fn extract_window(
    image: &Image,
    iw: usize,
    ih: usize,
    x0: usize,
    y0: usize,
    n: usize,
) -> Patch {
    let mut pixels = Vec::with_capacity(n * n);
    for dy in 0..n {
        for dx in 0..n {
            let x = (x0 + dx) % iw;
            let y = (y0 + dy) % ih;
            pixels.push(Color::from(*image.get_pixel(x as u32, y as u32)));
        }
    }
    Patch::new(n, pixels)
}

fn symmetry_variants(base: &Patch, flags: PatchFlags) -> Vec<Patch> {
    let mut variants = vec![base.clone()];

    if flags.rotate {
        let mut current = base.rotate90();
        for _ in 0..3 {
            variants.push(current.clone());
            current = current.rotate90();
        }
    }

    if flags.rotate && flags.mirror_v && flags.mirror_h {
        let mirrored = base.mirror_v();
        let mut current = mirrored.clone();
        for _ in 0..4 {
            variants.push(current.clone());
            current = current.rotate90();
        }
    } else {
        if flags.mirror_v {
            variants.push(base.mirror_v());
        }
        if flags.mirror_h {
            variants.push(base.mirror_h());
        }
    }

    variants
}

fn submit_variant(
    patches: &mut Vec<Patch>,
    by_pixels: &mut HashMap<Vec<Color>, usize>,
    variant: Patch,
) -> Result<()> {
    if let Some(&id) = by_pixels.get(&variant.pixels) {
        patches[id].weight += 1;
        return Ok(());
    }

    if patches.len() >= MAX_PATCHES {
        return Err(CollapseError::PatchCapacityExceeded {
            capacity: MAX_PATCHES,
        });
    }

    let id = patches.len();
    by_pixels.insert(variant.pixels.clone(), id);
    patches.push(variant);
    Ok(())
}

fn derive_adjacency(patches: &mut [Patch], n: usize) {
    let count = patches.len();
    for (a, b) in iproduct!(0..count, 0..count) {
        for direction in Direction::all() {
            if overlap_attach(&patches[a], &patches[b], direction, n) {
                patches[a].allowed_mut(direction).set(b);
            }
        }
    }
}

/// Whether `b` may be placed at the `direction`-neighbour of a cell holding `a`,
/// per the canonical overlap-WFC N−1 overlap rule.
fn overlap_attach(a: &Patch, b: &Patch, direction: Direction, n: usize) -> bool {
    match direction {
        Direction::Top => (0..n - 1).all(|i| row(a, i, n) == row(b, i + 1, n)),
        Direction::Bottom => (0..n - 1).all(|i| row(a, i + 1, n) == row(b, i, n)),
        Direction::Left => (0..n - 1).all(|j| col(a, j, n) == col(b, j + 1, n)),
        Direction::Right => (0..n - 1).all(|j| col(a, j + 1, n) == col(b, j, n)),
    }
}

fn row(patch: &Patch, i: usize, n: usize) -> &[Color] {
    &patch.pixels[i * n..(i + 1) * n]
}

fn col(patch: &Patch, j: usize, n: usize) -> Vec<Color> {
    (0..n).map(|y| patch.pixels[y * n + j]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{checkerboard, solid, stripes_4x2};
    use pretty_assertions::assert_eq;

    #[test]
    fn solid_image_has_one_patch() {
        let img = solid(3, 3, [7, 7, 7, 255]);
        let idx = PatchIndex::build(&img, 2, PatchFlags::default()).unwrap();
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.weight(0), 4.0);
    }

    #[test]
    fn checkerboard_has_two_patches() {
        let img = checkerboard(4, 4);
        let idx = PatchIndex::build(&img, 2, PatchFlags::default()).unwrap();
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn checkerboard_patches_only_allow_alternation() {
        let img = checkerboard(4, 4);
        let idx = PatchIndex::build(&img, 2, PatchFlags::default()).unwrap();
        for id in 0..idx.len() {
            let patch = idx.get(id);
            for direction in Direction::all() {
                let allowed = patch.allowed(direction);
                assert!(!allowed.get(id), "patch should not tile with itself");
            }
        }
    }

    #[test]
    fn adjacency_is_symmetric() {
        for img in [checkerboard(4, 4), stripes_4x2(), solid(3, 3, [1, 2, 3, 255])] {
            let idx = PatchIndex::build(&img, 2, PatchFlags::default()).unwrap();
            for a in 0..idx.len() {
                for b in 0..idx.len() {
                    for d in Direction::all() {
                        let fwd = idx.get(a).allowed(d).get(b);
                        let back = idx.get(b).allowed(d.opposite()).get(a);
                        assert_eq!(fwd, back, "asymmetric adjacency for ({a},{b},{d:?})");
                    }
                }
            }
        }
    }

    #[test]
    fn input_too_small_without_wrap() {
        let img = solid(2, 2, [0, 0, 0, 255]);
        let err = PatchIndex::build(&img, 3, PatchFlags::default()).unwrap_err();
        assert!(matches!(err, CollapseError::InputTooSmall { .. }));
    }

    #[test]
    fn rotate_flag_produces_four_variants_for_l_shape() {
        let pixels = vec![
            Color::new(255, 0, 0, 255),
            Color::new(0, 0, 0, 255),
            Color::new(0, 0, 0, 255),
            Color::new(0, 0, 0, 255),
        ];
        let mut img = image::RgbaImage::new(2, 2);
        for (i, px) in pixels.iter().enumerate() {
            img.put_pixel((i % 2) as u32, (i / 2) as u32, px.to_rgba());
        }
        let flags = PatchFlags {
            wrap_x: true,
            wrap_y: true,
            rotate: true,
            ..Default::default()
        };
        let idx = PatchIndex::build(&img, 2, flags).unwrap();
        assert_eq!(idx.len(), 4);
    }

    /// 2x2 patch with four distinct corner colours: no accidental coincidence
    /// between rotations and mirrors, so every requested variant is distinct.
    fn distinct_colors_2x2() -> image::RgbaImage {
        let colors = [
            Color::new(255, 0, 0, 255),
            Color::new(0, 255, 0, 255),
            Color::new(0, 0, 255, 255),
            Color::new(255, 255, 0, 255),
        ];
        let mut img = image::RgbaImage::new(2, 2);
        for (i, px) in colors.iter().enumerate() {
            img.put_pixel((i % 2) as u32, (i / 2) as u32, px.to_rgba());
        }
        img
    }

    #[test]
    fn mirror_v_alone_submits_exactly_one_extra_variant() {
        let img = distinct_colors_2x2();
        let flags = PatchFlags {
            wrap_x: true,
            wrap_y: true,
            mirror_v: true,
            ..Default::default()
        };
        let idx = PatchIndex::build(&img, 2, flags).unwrap();
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn mirror_h_alone_submits_exactly_one_extra_variant() {
        let img = distinct_colors_2x2();
        let flags = PatchFlags {
            wrap_x: true,
            wrap_y: true,
            mirror_h: true,
            ..Default::default()
        };
        let idx = PatchIndex::build(&img, 2, flags).unwrap();
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn both_mirrors_without_rotate_submit_one_variant_each() {
        let img = distinct_colors_2x2();
        let flags = PatchFlags {
            wrap_x: true,
            wrap_y: true,
            mirror_v: true,
            mirror_h: true,
            ..Default::default()
        };
        let idx = PatchIndex::build(&img, 2, flags).unwrap();
        // base + mirror_v + mirror_h, un-rotated: the D4 branch requires `rotate` too.
        assert_eq!(idx.len(), 3);
    }

    #[test]
    fn rotate_with_one_mirror_does_not_trigger_full_d4() {
        let img = distinct_colors_2x2();
        let flags = PatchFlags {
            wrap_x: true,
            wrap_y: true,
            rotate: true,
            mirror_v: true,
            ..Default::default()
        };
        let idx = PatchIndex::build(&img, 2, flags).unwrap();
        // 4 rotations of base + 1 un-rotated mirror_v variant.
        assert_eq!(idx.len(), 5);
    }

    #[test]
    fn rotate_and_both_mirrors_expand_to_full_d4_group() {
        let img = distinct_colors_2x2();
        let flags = PatchFlags {
            wrap_x: true,
            wrap_y: true,
            rotate: true,
            mirror_v: true,
            mirror_h: true,
        };
        let idx = PatchIndex::build(&img, 2, flags).unwrap();
        // 4 rotations of base + 4 rotations of the vertical mirror: the full
        // dihedral group orbit of an asymmetric patch.
        assert_eq!(idx.len(), 8);
    }
}
