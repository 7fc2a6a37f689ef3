use image::{Rgba, RgbaImage};

use crate::Image;

/// A uniformly coloured `w`×`h` fixture.
pub fn solid(w: u32, h: u32, color: [u8; 4]) -> Image {
    let mut texture = RgbaImage::new(w, h);
    for pixel in texture.pixels_mut() {
        *pixel = Rgba(color);
    }
    texture
}

/// Alternating black/white squares, used for the checkerboard seed scenario.
pub fn checkerboard(w: u32, h: u32) -> Image {
    let mut texture = RgbaImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let color = if (x + y) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            };
            texture.put_pixel(x, y, color);
        }
    }
    texture
}

/// A 4×2 `ABAB` over `ABAB` fixture, used for the horizontal-stripes scenario.
pub fn stripes_4x2() -> Image {
    let mut texture = RgbaImage::new(4, 2);
    let a = Rgba([200, 50, 50, 255]);
    let b = Rgba([50, 50, 200, 255]);
    for y in 0..2 {
        for x in 0..4 {
            let color = if x % 2 == 0 { a } else { b };
            texture.put_pixel(x, y, color);
        }
    }
    texture
}
