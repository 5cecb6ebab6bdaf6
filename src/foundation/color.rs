//! Transfer functions between linear light and display (sRGB-encoded) values.

/// Clamp `v` into `[0, 1]`. NaN maps to 0.
pub fn clamp01(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Encode a linear-light value with the sRGB transfer curve.
///
/// Inputs outside `[0, 1]` are extended linearly below zero and by the power segment above one;
/// callers clamp afterwards.
pub fn linear_to_srgb(v: f32) -> f32 {
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Decode an sRGB-encoded value back to linear light.
pub fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.040_45 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Quantize a display value in `[0, 1]` to 8 bits.
pub(crate) fn to_u8(v: f32) -> u8 {
    (clamp01(v) * 255.0).round() as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/color.rs"]
mod tests;
