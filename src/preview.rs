use image::Rgba;

use crate::grid::Cell;
use crate::patch::PatchIndex;

/// Weight-normalised average of the top-left pixel across a cell's still
/// admissible patches. Display-only; never consulted by the solver itself,
/// so an interactive or batch renderer can call it mid-solve to paint
/// partial progress.
pub fn preview_color(cell: &Cell, index: &PatchIndex) -> Rgba<u8> {
    let mut total_weight = 0.0;
    let mut r = 0.0;
    let mut g = 0.0;
    let mut b = 0.0;
    let mut a = 0.0;

    for id in cell.candidates.iter() {
        let w = index.weight(id);
        let color = index.get(id).representative_color().to_rgba();
        total_weight += w;
        r += w * color[0] as f64;
        g += w * color[1] as f64;
        b += w * color[2] as f64;
        a += w * color[3] as f64;
    }

    if total_weight <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    Rgba([
        (r / total_weight).round() as u8,
        (g / total_weight).round() as u8,
        (b / total_weight).round() as u8,
        (a / total_weight).round() as u8,
    ])
}
