//! Tiny 5x7 bitmap font for fallback canvas labels.
//!
//! Covers only the characters used by fallback labels; anything else is
//! drawn as a hollow box.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
/// Horizontal gap between glyphs, in cells
const SPACING: u32 = 1;

const BOX: [u8; 7] = [
    0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111,
];

/// Rows of a glyph, top to bottom; bit 4 is the leftmost column.
fn rows(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        '?' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100],
        ' ' => [0; 7],
        _ => BOX,
    }
}

/// Pixel size of `text` drawn at `scale`.
pub fn label_size(text: &str, scale: u32) -> (u32, u32) {
    let n = text.chars().count() as u32;
    if n == 0 {
        return (0, 0);
    }
    let width = (n * (GLYPH_WIDTH + SPACING) - SPACING) * scale;
    (width, GLYPH_HEIGHT * scale)
}

/// Largest scale not above `preferred` at which `text` fits in `max_width`,
/// or `None` if it does not fit even at scale 1.
pub fn fit_scale(text: &str, preferred: u32, max_width: u32) -> Option<u32> {
    (1..=preferred.max(1))
        .rev()
        .find(|&scale| label_size(text, scale).0 <= max_width)
}

/// Draw `text` with its top-left corner at (`x`, `y`). Cells outside the
/// canvas are clipped.
pub fn draw_label(canvas: &mut RgbaImage, text: &str, x: i32, y: i32, scale: u32, color: Rgba<u8>) {
    let scale = scale.max(1);
    let step = ((GLYPH_WIDTH + SPACING) * scale) as i32;

    for (i, c) in text.chars().enumerate() {
        let origin_x = x + i as i32 * step;
        for (row, bits) in rows(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let cell = Rect::at(
                    origin_x + (col * scale) as i32,
                    y + (row as u32 * scale) as i32,
                )
                .of_size(scale, scale);
                draw_filled_rect_mut(canvas, cell, color);
            }
        }
    }
}

/// Draw `text` horizontally centered on the canvas with its top at `y`.
/// Returns false (drawing nothing) if the label cannot fit.
pub fn draw_centered_label(
    canvas: &mut RgbaImage,
    text: &str,
    y: i32,
    preferred_scale: u32,
    color: Rgba<u8>,
) -> bool {
    let Some(scale) = fit_scale(text, preferred_scale, canvas.width()) else {
        return false;
    };
    let (w, _) = label_size(text, scale);
    let x = (canvas.width() as i32 - w as i32) / 2;
    draw_label(canvas, text, x, y, scale, color);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn sizes() {
        assert_eq!(label_size("?", 1), (5, 7));
        assert_eq!(label_size("RAW", 2), (34, 14));
        assert_eq!(label_size("", 3), (0, 0));
    }

    #[test]
    fn fit_scale_shrinks_until_it_fits() {
        assert_eq!(fit_scale("RAW", 4, 100), Some(4));
        assert_eq!(fit_scale("RAW", 4, 40), Some(2));
        assert_eq!(fit_scale("RAW", 4, 16), None);
        assert_eq!(fit_scale("?", 0, 5), Some(1));
    }

    #[test]
    fn question_mark_pixels() {
        let mut img = RgbaImage::new(5, 7);
        draw_label(&mut img, "?", 0, 0, 1, WHITE);
        // top row: .XXX.
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
        assert_eq!(img.get_pixel(1, 0).0, WHITE.0);
        // blank row above the dot
        assert!((0..5).all(|x| img.get_pixel(x, 5).0[3] == 0));
        assert_eq!(img.get_pixel(2, 6).0, WHITE.0);
    }

    #[test]
    fn clipped_drawing_does_not_panic() {
        let mut img = RgbaImage::new(4, 4);
        draw_label(&mut img, "CLOUD", -10, -3, 3, WHITE);
        draw_label(&mut img, "CLOUD", 2, 2, 3, WHITE);
    }

    #[test]
    fn centered_label_refuses_to_overflow() {
        let mut img = RgbaImage::new(10, 10);
        assert!(!draw_centered_label(&mut img, "CLOUD", 0, 1, WHITE));
        assert!(img.pixels().all(|p| p.0[3] == 0));
        assert!(draw_centered_label(&mut img, "?", 1, 1, WHITE));
    }
}
