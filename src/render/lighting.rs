//! Per-block lighting application (spec.md §4.5 step "apply lighting").
//!
//! `original_source` delegates this to a polymorphic `RenderMode` collaborator
//! whose implementation isn't part of the retrieved source set; per spec.md
//! §9's redesign note this crate replaces that virtual dispatch with a plain
//! function keyed on [`LightingType`], matching the "sealed variant, dispatch
//! once per block" shape the rest of the catalog already uses.

use crate::catalog::compositing::{multiply_corners, multiply_scalar, CornerValues, Sprite};
use crate::catalog::{BlockImage, LightingType};
use crate::geometry::{BlockPos, DIR_TOP};

/// Converts a combined block/sky light level (`0..=15`) to a brightness
/// factor. Matches vanilla's gamma-shaped light curve closely enough for
/// rendering purposes: `15` is full brightness, `0` keeps a small ambient
/// floor rather than going fully black.
fn brightness_from_level(level: u8) -> f32 {
    0.2 + 0.8 * (level as f32 / 15.0)
}

/// Looks up the brightness just above `pos` (the light value an exposed
/// block's top face receives), via whatever neighbour-fetch the caller
/// supplies.
pub fn brightness_above(pos: BlockPos, fetch_light: &impl Fn(BlockPos) -> (u8, u8)) -> f32 {
    let (block, sky) = fetch_light(pos + DIR_TOP);
    brightness_from_level(block.max(sky))
}

fn corners_from(
    fetch_light: &impl Fn(BlockPos) -> (u8, u8),
    base: BlockPos,
    dx: BlockPos,
    dz: BlockPos,
) -> CornerValues {
    let sample = |p: BlockPos| {
        let (block, sky) = fetch_light(p);
        brightness_from_level(block.max(sky))
    };
    [
        sample(base),
        sample(base + dx),
        sample(base + dz),
        sample(base + dx + dz),
    ]
}

/// Applies `image.lighting_type` to `sprite`, sampling light levels around
/// `pos` via `fetch_light` (which already accounts for the active rotation's
/// south/west directions, since that's what the two visible side faces are).
pub fn apply(
    sprite: &mut Sprite,
    uv: &Sprite,
    image: &BlockImage,
    pos: BlockPos,
    south: BlockPos,
    west: BlockPos,
    fetch_light: impl Fn(BlockPos) -> (u8, u8),
) {
    let lighting_type = image.lighting_type.unwrap_or(LightingType::Simple);
    match lighting_type {
        LightingType::None => {}
        LightingType::Simple => {
            let factor = brightness_above(pos, &fetch_light);
            multiply_scalar(sprite, uv, factor);
        }
        LightingType::Smooth | LightingType::SmoothTopRemainingSimple => {
            let top = pos + DIR_TOP;
            let dx = south - pos;
            let dz = west - pos;
            let up = corners_from(&fetch_light, top, dx, dz);
            let left = corners_from(&fetch_light, west, BlockPos::new(0, 1, 0), dx);
            let right = corners_from(&fetch_light, south, BlockPos::new(0, 1, 0), dz);
            multiply_corners(sprite, uv, left, right, up);
        }
        LightingType::SmoothBottom => {
            let bottom = BlockPos::new(pos.x, pos.y, pos.z);
            let dx = south - pos;
            let dz = west - pos;
            let up = corners_from(&fetch_light, bottom, dx, dz);
            let left = corners_from(&fetch_light, west, BlockPos::new(0, 1, 0), dx);
            let right = corners_from(&fetch_light, south, BlockPos::new(0, 1, 0), dz);
            multiply_corners(sprite, uv, left, right, up);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::blockimage::Variant;
    use image::Rgba as PixelRgba;

    #[test]
    fn simple_lighting_darkens_at_low_light_level() {
        let mut image = BlockImage::default();
        image.variants.push(Variant {
            color_idx: 0,
            uv_idx: 0,
            weight: 1,
        });
        image.lighting_type = Some(LightingType::Simple);

        let mut sprite = Sprite::from_fn(1, 1, |_, _| PixelRgba([200, 200, 200, 255]));
        let mut uv = Sprite::new(1, 1);
        uv.put_pixel(0, 0, PixelRgba([0, 0, crate::config::FACE_UP_BLUE, 255]));

        apply(
            &mut sprite,
            &uv,
            &image,
            BlockPos::new(0, 64, 0),
            BlockPos::new(0, 64, 1),
            BlockPos::new(-1, 64, 0),
            |_| (0, 0),
        );
        assert!(sprite.get_pixel(0, 0).0[0] < 200);
    }
}
