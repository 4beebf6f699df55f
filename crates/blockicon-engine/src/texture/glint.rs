use std::f32::consts::TAU;

use image::{Rgba, RgbaImage};

const GLINT_SIZE: u32 = 64;

/// Built-in enchantment glint texture.
///
/// Soft purple diagonal streaks on black; black adds nothing under the
/// glint's additive blend. Power-of-two sized so it can repeat while the
/// texture matrix scrolls it.
pub fn default_glint_image() -> RgbaImage {
    RgbaImage::from_fn(GLINT_SIZE, GLINT_SIZE, |x, y| {
        let t = ((x + y) % GLINT_SIZE) as f32 / GLINT_SIZE as f32;
        let streak = (0.5 + 0.5 * (t * TAU * 2.0).sin()).powi(3);
        let channel = |weight: f32| (streak * weight * 255.0).round() as u8;
        Rgba([channel(0.5), channel(0.25), channel(0.8), 255])
    })
}
