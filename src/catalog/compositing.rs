//! Sprite compositing primitives (spec.md §4.3). All operate on an RGBA
//! sprite and its same-sized UV mask; a pixel is only touched where the UV
//! mask's alpha is nonzero, except for the two single-color `tint`/
//! `tint_high_contrast` overloads that gate on the sprite's own alpha
//! (matching the no-UV-argument primitives the renderer uses for flat
//! biome tints).

use image::Rgba as PixelRgba;

use crate::color::Rgba;
use crate::config::{FACE_LEFT_BLUE, FACE_RIGHT_BLUE, FACE_UP_BLUE};

pub type Sprite = image::RgbaImage;

fn to_color(p: PixelRgba<u8>) -> Rgba {
    Rgba::new(p.0[0], p.0[1], p.0[2], p.0[3])
}

fn from_color(c: Rgba) -> PixelRgba<u8> {
    PixelRgba([c.r, c.g, c.b, c.a])
}

/// Four corner light values for one face, in `(top_left, top_right,
/// bottom_left, bottom_right)` order, normalized `0.0..=1.0`.
pub type CornerValues = [f32; 4];

fn corners_to_255(c: CornerValues) -> [u32; 4] {
    c.map(|v| (v * 255.0).clamp(0.0, 255.0) as u32)
}

fn mix(x: u32, y: u32, a: u32) -> u32 {
    ((x * (255 - a)) + (y * a)) >> 8
}

/// Per-face smooth-light application (spec.md §4.3 `multiply`, corner
/// form): bilinearly interpolates the 4 corner values for the pixel's face
/// using (u, v) from the UV mask's red/green channels, then multiplies RGB
/// by the resulting 0..255 scalar.
pub fn multiply_corners(
    sprite: &mut Sprite,
    uv: &Sprite,
    left: CornerValues,
    right: CornerValues,
    up: CornerValues,
) {
    let fl = corners_to_255(left);
    let fr = corners_to_255(right);
    let fu = corners_to_255(up);
    for (pixel, uv_pixel) in sprite.pixels_mut().zip(uv.pixels()) {
        if uv_pixel.0[3] == 0 {
            continue;
        }
        let face = uv_pixel.0[2];
        let f = if face == FACE_LEFT_BLUE {
            &fl
        } else if face == FACE_RIGHT_BLUE {
            &fr
        } else if face == FACE_UP_BLUE {
            &fu
        } else {
            continue;
        };
        let u = uv_pixel.0[0] as u32;
        let v = uv_pixel.0[1] as u32;
        let ab = mix(f[0], f[1], u);
        let cd = mix(f[2], f[3], u);
        let factor = mix(ab, cd, v);
        *pixel = from_color(to_color(*pixel).multiply_scalar(factor as f32 / 255.0));
    }
}

/// Uniform darkening of every UV-covered pixel (spec.md §4.3 `multiply`,
/// scalar form).
pub fn multiply_scalar(sprite: &mut Sprite, uv: &Sprite, factor: f32) {
    for (pixel, uv_pixel) in sprite.pixels_mut().zip(uv.pixels()) {
        if uv_pixel.0[3] == 0 {
            continue;
        }
        *pixel = from_color(to_color(*pixel).multiply_scalar(factor));
    }
}

/// Multiplies every pixel's RGB by `color`, gated on the sprite's own
/// alpha rather than a UV mask (spec.md §4.3 `tint`).
pub fn tint(sprite: &mut Sprite, color: Rgba) {
    for pixel in sprite.pixels_mut() {
        if pixel.0[3] == 0 {
            continue;
        }
        *pixel = from_color(to_color(*pixel).multiply_color(color));
    }
}

/// Blends `color` tinted by `mask`'s own color onto `sprite` wherever
/// `mask`'s alpha is nonzero (spec.md §4.3 `tint_masked`).
pub fn tint_masked(sprite: &mut Sprite, mask: &Sprite, color: Rgba) {
    for (pixel, mask_pixel) in sprite.pixels_mut().zip(mask.pixels()) {
        if mask_pixel.0[3] == 0 {
            continue;
        }
        let colored = color.multiply_all(to_color(*mask_pixel));
        *pixel = from_color(colored.over(to_color(*pixel)));
    }
}

/// Luminance-neutral additive tint for better contrast than alpha blending
/// (spec.md §4.3 `tint_high_contrast`). When `face` is given, only pixels
/// whose UV blue channel matches it (read from `uv`) are touched.
pub fn tint_high_contrast(sprite: &mut Sprite, uv: Option<(&Sprite, u8)>, color: Rgba) {
    const ALPHA_FACTOR: f32 = 3.0;
    let luminance = (10 * color.r as i32 + 3 * color.g as i32 + color.b as i32) / 14;
    let nr = (color.r as i32 - luminance) as f32 / ALPHA_FACTOR;
    let ng = (color.g as i32 - luminance) as f32 / ALPHA_FACTOR;
    let nb = (color.b as i32 - luminance) as f32 / ALPHA_FACTOR;
    match uv {
        None => {
            for pixel in sprite.pixels_mut() {
                if pixel.0[3] == 0 {
                    continue;
                }
                *pixel = from_color(to_color(*pixel).add_clamp(nr as i32, ng as i32, nb as i32));
            }
        }
        Some((uv, face)) => {
            for (pixel, uv_pixel) in sprite.pixels_mut().zip(uv.pixels()) {
                if uv_pixel.0[2] != face {
                    continue;
                }
                *pixel = from_color(to_color(*pixel).add_clamp(nr as i32, ng as i32, nb as i32));
            }
        }
    }
}

/// Z-buffered composite of `overlay` onto `base` using each sprite's UV
/// alpha as a depth proxy (spec.md §4.3 `blend_z_buffered`): the sprite
/// with the larger UV alpha at a pixel is composited in front. Writes the
/// result into `base`.
pub fn blend_z_buffered(base: &mut Sprite, base_uv: &Sprite, overlay: &Sprite, overlay_uv: &Sprite) {
    for (((pixel, base_uv_px), overlay_px), overlay_uv_px) in base
        .pixels_mut()
        .zip(base_uv.pixels())
        .zip(overlay.pixels())
        .zip(overlay_uv.pixels())
    {
        if base_uv_px.0[3] == 0 && overlay_uv_px.0[3] == 0 {
            continue;
        }
        let base_color = to_color(*pixel);
        let overlay_color = to_color(*overlay_px);
        let composited = if (base_uv_px.0[3] as u32) < (overlay_uv_px.0[3] as u32) {
            overlay_color.over(base_color)
        } else {
            base_color.over(overlay_color)
        };
        *pixel = from_color(composited);
    }
}

/// Per-edge strength: `0` disables that edge, `1..=3` is increasing
/// darkness/width (spec.md §4.3 `shadow_edges`).
#[allow(clippy::too_many_arguments)]
pub fn shadow_edges(
    sprite: &mut Sprite,
    uv: &Sprite,
    north: u8,
    south: u8,
    east: u8,
    west: u8,
    bottomleft: u8,
    bottomright: u8,
) {
    let genalpha = |alpha: &mut u8, face: u8, mask_face: u8, edge: u8, coord: f32| {
        if edge == 0 || face != mask_face {
            return;
        }
        let threshold = (1 + edge.min(2)) as f32 / 16.0;
        if coord >= threshold {
            return;
        }
        let (strong, weak) = if edge > 2 { (128.0, 64.0) } else { (64.0, 32.0) };
        let value = if coord < threshold / 2.0 {
            strong
        } else {
            let a = (coord - threshold / 2.0) / (threshold / 2.0);
            (1.0 - a) * weak + a * 16.0
        };
        *alpha = (*alpha).max(value as u8);
    };

    for (pixel, uv_pixel) in sprite.pixels_mut().zip(uv.pixels()) {
        let u = uv_pixel.0[0] as f32 / 255.0;
        let v = uv_pixel.0[1] as f32 / 255.0;
        let face = uv_pixel.0[2];

        let mut alpha = 0u8;
        genalpha(&mut alpha, face, FACE_UP_BLUE, north, v);
        genalpha(&mut alpha, face, FACE_UP_BLUE, south, 1.0 - v);
        genalpha(&mut alpha, face, FACE_UP_BLUE, east, 1.0 - u);
        genalpha(&mut alpha, face, FACE_UP_BLUE, west, u);
        genalpha(&mut alpha, face, FACE_LEFT_BLUE, bottomleft, 1.0 - v);
        genalpha(&mut alpha, face, FACE_RIGHT_BLUE, bottomright, 1.0 - v);

        if alpha > 0 {
            *pixel = from_color(to_color(*pixel).multiply_scalar((255 - alpha) as f32 / 255.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, color: Rgba) -> Sprite {
        Sprite::from_fn(w, h, |_, _| from_color(color))
    }

    #[test]
    fn multiply_scalar_skips_pixels_outside_uv_mask() {
        let mut sprite = solid(2, 1, Rgba::new(200, 200, 200, 255));
        let mut uv = solid(2, 1, Rgba::new(0, 0, FACE_UP_BLUE, 255));
        uv.put_pixel(1, 0, from_color(Rgba::TRANSPARENT));
        multiply_scalar(&mut sprite, &uv, 0.5);
        assert!(to_color(*sprite.get_pixel(0, 0)).r < 200);
        assert_eq!(to_color(*sprite.get_pixel(1, 0)).r, 200);
    }

    #[test]
    fn blend_z_buffered_prefers_larger_uv_alpha_in_front() {
        let mut base = solid(1, 1, Rgba::new(255, 0, 0, 255));
        let base_uv = solid(1, 1, Rgba::new(0, 0, 0, 50));
        let overlay = solid(1, 1, Rgba::new(0, 255, 0, 255));
        let overlay_uv = solid(1, 1, Rgba::new(0, 0, 0, 200));
        blend_z_buffered(&mut base, &base_uv, &overlay, &overlay_uv);
        // overlay_uv.alpha (200) > base_uv.alpha (50) so overlay composites in front.
        assert_eq!(to_color(*base.get_pixel(0, 0)), Rgba::new(0, 255, 0, 255));
    }

    #[test]
    fn shadow_edges_darkens_only_near_matching_face_edge() {
        let mut sprite = solid(1, 1, Rgba::new(200, 200, 200, 255));
        let mut uv = Sprite::new(1, 1);
        uv.put_pixel(0, 0, image::Rgba([0, 0, FACE_UP_BLUE, 255]));
        shadow_edges(&mut sprite, &uv, 3, 0, 0, 0, 0, 0);
        assert!(to_color(*sprite.get_pixel(0, 0)).r < 200);
    }
}
