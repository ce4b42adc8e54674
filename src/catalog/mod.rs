//! The block image catalog: atlas + index loading, face shading, and
//! post-load derivation of `is_empty`/`is_transparent`/`side_mask`/
//! `lighting_type` (spec.md §4.2).

pub mod atlas;
pub mod blockimage;
pub mod compositing;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::info;

use crate::blockstate::{BlockState, BlockStateRegistry};
use crate::config::{DARKEN_LEFT, DARKEN_RIGHT, FACE_LEFT_BLUE, FACE_RIGHT_BLUE, FACE_UP_BLUE};
use crate::error::CatalogError;

pub use atlas::Atlas;
pub use blockimage::{BlockImage, LightingType, SideMask, Variant};
pub use compositing::Sprite;

/// The immutable, process-wide block image catalog (spec.md §3
/// "Lifecycles": "`BlockImages` is built once at startup ... then is
/// immutable during rendering").
pub struct BlockImages {
    atlas: Atlas,
    by_state: HashMap<u16, BlockImage>,
    unknown_id: u16,
    air_id: u16,
}

impl BlockImages {
    /// Loads `<stub>.txt` + `<stub>.png`, parses every index line into a
    /// `BlockImage` keyed by its state's registry id, applies face shading,
    /// and derives the post-load flags (spec.md §4.2 end to end).
    pub fn load(stub: &Path, registry: &BlockStateRegistry) -> Result<BlockImages, CatalogError> {
        let (mut atlas, body) = Atlas::load(stub)?;

        let mut by_state: HashMap<u16, BlockImage> = HashMap::new();
        let mut names_by_id: HashMap<u16, String> = HashMap::new();
        let mut shaded: HashSet<usize> = HashSet::new();

        for (line_no, line) in body.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let with_line = |e: CatalogError| match e {
                CatalogError::MalformedIndex { message, .. } => CatalogError::MalformedIndex {
                    line: line_no + 2,
                    message,
                },
                other => other,
            };

            let mut fields = line.splitn(3, ' ');
            let block_name = fields.next().ok_or_else(|| {
                with_line(CatalogError::MalformedIndex {
                    line: 0,
                    message: "missing block name".to_string(),
                })
            })?;
            let variant = fields.next().unwrap_or("");
            let properties = fields.next().unwrap_or("");

            let state = BlockState::parse_variant(block_name, variant);
            for (key, _) in &state.properties {
                registry.register_known_property(block_name, key);
            }

            let mut image = BlockImage::parse(properties).map_err(with_line)?;
            let is_mask_sprite = block_name.ends_with("_biome_mask");
            if !image.inherently_waterlogged && !is_mask_sprite {
                shade_block(&mut atlas, &image, &mut shaded);
            }

            let is_waterloggable = image.is_waterloggable;
            let id = registry.get_or_insert(state.clone());
            names_by_id.insert(id, block_name.to_string());
            by_state.insert(id, image.clone());

            if is_waterloggable {
                registry.register_known_property(block_name, "waterlogged");
                let waterlogged_state = state.with_property("waterlogged", "true");
                image.is_waterlogged = true;
                let wl_id = registry.get_or_insert(waterlogged_state);
                names_by_id.insert(wl_id, block_name.to_string());
                by_state.insert(wl_id, image);
            }
        }

        complete_block_images(&mut by_state, &atlas);
        resolve_biome_masks(&mut by_state, &names_by_id);

        let unknown_id = registry.get_or_insert(BlockState::new("isotile:unknown"));
        by_state.entry(unknown_id).or_insert_with(unknown_block_image);

        info!(blocks = by_state.len(), sprites = atlas.len(), "loaded block image catalog");

        Ok(BlockImages {
            atlas,
            by_state,
            unknown_id,
            air_id: registry.air_id(),
        })
    }

    pub fn atlas(&self) -> &Atlas {
        &self.atlas
    }

    pub fn get(&self, id: u16) -> Option<&BlockImage> {
        self.by_state.get(&id)
    }

    /// Falls back per spec.md §7 *UnknownBlockState*: caller retries with
    /// `waterlogged=false` first; this only returns the final fallback
    /// sprite entry.
    pub fn unknown(&self) -> &BlockImage {
        self.by_state
            .get(&self.unknown_id)
            .expect("unknown-block fallback entry always present after load")
    }

    pub fn air_id(&self) -> u16 {
        self.air_id
    }
}

fn unknown_block_image() -> BlockImage {
    let mut image = BlockImage::default();
    image.variants.push(Variant {
        color_idx: 0,
        uv_idx: 0,
        weight: 1,
    });
    image.side_mask = SideMask::UP | SideMask::LEFT | SideMask::RIGHT;
    image.lighting_type = Some(LightingType::Simple);
    image
}

/// Face shading (spec.md §4.2): multiplies each non-waterlog variant's
/// color sprite by `DARKEN_LEFT`/`DARKEN_RIGHT` on its left/right faces,
/// 1.0 (no-op) on top. Idempotent via `shaded`, tracked by atlas sprite
/// index so a sprite shared between block-states is only shaded once.
fn shade_block(atlas: &mut Atlas, image: &BlockImage, shaded: &mut HashSet<usize>) {
    for variant in &image.variants {
        if !shaded.insert(variant.color_idx) {
            continue;
        }
        let uv = atlas.sprite(variant.uv_idx).clone();
        let sprite = atlas.sprite_mut(variant.color_idx);
        for (pixel, uv_pixel) in sprite.pixels_mut().zip(uv.pixels()) {
            if uv_pixel.0[3] == 0 {
                continue;
            }
            let factor = match uv_pixel.0[2] {
                FACE_LEFT_BLUE => DARKEN_LEFT,
                FACE_RIGHT_BLUE => DARKEN_RIGHT,
                FACE_UP_BLUE => 1.0,
                _ => continue,
            };
            pixel.0[0] = (pixel.0[0] as f32 * factor).round() as u8;
            pixel.0[1] = (pixel.0[1] as f32 * factor).round() as u8;
            pixel.0[2] = (pixel.0[2] as f32 * factor).round() as u8;
        }
    }
}

/// Derives `is_empty`, `is_transparent`, `side_mask`, default
/// `lighting_type`, and default `shadow_edges` for every loaded block image
/// (spec.md §4.2 "Post-load completion").
fn complete_block_images(by_state: &mut HashMap<u16, BlockImage>, atlas: &Atlas) {
    for image in by_state.values_mut() {
        let mut side_mask = SideMask::empty();
        let mut is_transparent = false;
        let mut is_empty = !image.variants.is_empty();

        for variant in &image.variants {
            let color = atlas.sprite(variant.color_idx);
            let uv = atlas.sprite(variant.uv_idx);
            if !color.pixels().all(|p| p.0[3] == 0) {
                is_empty = false;
            }
            for (pixel, uv_pixel) in color.pixels().zip(uv.pixels()) {
                if uv_pixel.0[3] == 0 {
                    continue;
                }
                match uv_pixel.0[2] {
                    FACE_LEFT_BLUE => side_mask |= SideMask::LEFT,
                    FACE_RIGHT_BLUE => side_mask |= SideMask::RIGHT,
                    FACE_UP_BLUE => side_mask |= SideMask::UP,
                    _ => {}
                }
                if pixel.0[3] != 255 {
                    is_transparent = true;
                }
            }
        }

        image.side_mask = side_mask;
        image.is_transparent = is_transparent;
        image.is_empty = is_empty;

        if image.lighting_type.is_none() {
            image.lighting_type = Some(if image.is_waterlogged {
                LightingType::SmoothTopRemainingSimple
            } else if image.is_transparent {
                LightingType::Simple
            } else {
                LightingType::Smooth
            });
        }
        if image.shadow_edges.is_none() {
            image.shadow_edges = Some(if image.is_transparent { 0 } else { 1 });
        }
    }
}

/// Resolves each `is_masked_biome` block's companion `<name>_biome_mask`
/// sprite reference (spec.md §4.2).
fn resolve_biome_masks(by_state: &mut HashMap<u16, BlockImage>, names_by_id: &HashMap<u16, String>) {
    let mask_sprite_by_name: HashMap<&str, usize> = names_by_id
        .iter()
        .filter_map(|(id, name)| {
            let image = by_state.get(id)?;
            let first = image.variants.first()?;
            Some((name.as_str(), first.color_idx))
        })
        .collect();

    let masked_ids: Vec<u16> = by_state
        .iter()
        .filter(|(_, image)| image.is_masked_biome)
        .map(|(id, _)| *id)
        .collect();

    for id in masked_ids {
        let Some(name) = names_by_id.get(&id) else { continue };
        let mask_name = format!("{name}_biome_mask");
        let sprite = mask_sprite_by_name.get(mask_name.as_str()).copied();
        if let Some(image) = by_state.get_mut(&id) {
            image.biome_mask_sprite = sprite;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::blockimage::Variant;

    #[test]
    fn unknown_block_image_has_one_variant_and_all_faces() {
        let image = unknown_block_image();
        assert_eq!(image.variants.len(), 1);
        assert!(image.side_mask.contains(SideMask::UP));
    }

    #[test]
    fn complete_block_images_derives_smooth_for_opaque_default() {
        let mut map = HashMap::new();
        let mut image = BlockImage::default();
        image.variants.push(Variant {
            color_idx: 0,
            uv_idx: 0,
            weight: 1,
        });
        map.insert(1u16, image);
        let atlas = test_atlas();
        complete_block_images(&mut map, &atlas);
        assert_eq!(map[&1].lighting_type, Some(LightingType::Smooth));
        assert_eq!(map[&1].shadow_edges, Some(1));
    }

    fn test_atlas() -> Atlas {
        // A single fully-opaque, fully-covered 1x1 sprite pair: color sprite
        // index 0 and a UV mask marking it as an UP face.
        let mut color = Sprite::new(1, 1);
        color.put_pixel(0, 0, image::Rgba([100, 100, 100, 255]));
        let mut uv = Sprite::new(1, 1);
        uv.put_pixel(0, 0, image::Rgba([0, 0, FACE_UP_BLUE, 255]));
        Atlas::from_sprites(1, 1, vec![color, uv])
    }
}
