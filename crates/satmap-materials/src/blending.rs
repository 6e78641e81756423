//! Color math for material layers: combining two linear colors and encoding
//! the result for display.

use glam::Vec4;

/// Channel values at or below this use the linear segment of the sRGB curve.
const SRGB_LINEAR_CUTOFF: f32 = 0.003_130_8;

/// Encode one linear channel value with the sRGB transfer curve.
pub fn linear_to_srgb(c: f32) -> f32 {
    if c <= SRGB_LINEAR_CUTOFF {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// Multiply two straight RGBA colors and encode the product for display.
///
/// RGB channels go through [`linear_to_srgb`]; alpha is the plain product.
/// Apply once per layer: the result is already display-encoded.
pub fn combine(a: Vec4, b: Vec4) -> Vec4 {
    let product = a * b;
    Vec4::new(
        linear_to_srgb(product.x),
        linear_to_srgb(product.y),
        linear_to_srgb(product.z),
        product.w,
    )
}
