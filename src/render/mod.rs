//! The isometric tile renderer: top-block iteration, the per-column block
//! walk, and tile assembly (spec.md §4.4, §4.5, §4.8).

mod iterator;
mod lighting;

use std::sync::Arc;

use image::Rgba as PixelRgba;
use tracing::warn;

pub use iterator::TopBlockIter;

use crate::biome::{average_biome_color, default_colormap, BiomeColorType};
use crate::blockstate::{BlockState, BlockStateRegistry};
use crate::catalog::compositing::{blend_z_buffered, shadow_edges, tint, tint_masked, Sprite};
use crate::catalog::{BlockImage, BlockImages, Variant};
use crate::color::Rgba;
use crate::config::{CHUNK_LOWEST, FACE_LEFT_BLUE, FACE_RIGHT_BLUE, FACE_UP_BLUE, RenderSettings};
use crate::geometry::{BlockPos, ChunkPos, Rotation, TilePos, DIR_BOTTOM, DIR_EAST, DIR_NORTH, DIR_TOP};
use crate::rand::VariantRng;
use crate::world::{Chunk, ChunkSource, WorldCache};

/// One rendered voxel, positioned relative to the tile canvas's top-left
/// corner (spec.md §4.8). `x`/`y` may be negative or exceed the canvas; the
/// final alpha-blit clips.
pub struct TileImage {
    pub x: i32,
    pub y: i32,
    pub pos: BlockPos,
    pub sprite: Sprite,
}

/// Renders one tile at a time against a shared, immutable catalog and world
/// cache (spec.md §3 "Lifecycles": one renderer per worker, many workers per
/// `WorldCache`).
pub struct TileRenderer<'a, S: ChunkSource> {
    registry: &'a BlockStateRegistry,
    images: &'a BlockImages,
    world: &'a WorldCache<S>,
    settings: RenderSettings,
    waterlog_full: Variant,
    waterlog_shore: Variant,
    current_chunk: Option<Arc<Chunk>>,
}

impl<'a, S: ChunkSource> TileRenderer<'a, S> {
    pub fn new(
        registry: &'a BlockStateRegistry,
        images: &'a BlockImages,
        world: &'a WorldCache<S>,
        settings: RenderSettings,
    ) -> Self {
        let waterlog_full = resolve_static_variant(registry, images, "minecraft:water_mask", "level=0");
        let waterlog_shore = resolve_static_variant(registry, images, "minecraft:water_mask", "level=2");
        TileRenderer {
            registry,
            images,
            world,
            settings,
            waterlog_full,
            waterlog_shore,
            current_chunk: None,
        }
    }

    /// Renders tile `tile_pos` under `rotation` into a fresh, fully-opaque
    /// (well, fully-transparent until drawn on) tile canvas (spec.md §4.8).
    pub fn render_tile(&mut self, tile_pos: TilePos, rotation: Rotation) -> Sprite {
        let side = self.settings.tile_side_pixels();
        let mut canvas = Sprite::new(side, side);

        let mut tile_images = self.render_top_blocks(tile_pos, rotation);
        tile_images.sort_by(|a, b| compare(rotation, a, b));
        for tile_image in &tile_images {
            alpha_blit(&mut canvas, &tile_image.sprite, tile_image.x, tile_image.y);
        }
        canvas
    }

    fn render_top_blocks(&mut self, tile_pos: TilePos, rotation: Rotation) -> Vec<TileImage> {
        let iter = TopBlockIter::new(tile_pos, self.settings.block_size, self.settings.tile_width, rotation);
        let column_dir = rotation.rotate(DIR_NORTH + DIR_EAST + DIR_BOTTOM);
        let mut out = Vec::new();
        for (x, y, top) in iter {
            self.render_column(x, y, top, column_dir, rotation, &mut out);
        }
        out
    }

    /// Walks one column from `top` downward along `dir` until the world's
    /// vertical floor, emitting one [`TileImage`] per visible voxel and
    /// stopping at the first opaque one (spec.md §4.5).
    fn render_column(&mut self, x: i32, y: i32, top: BlockPos, dir: BlockPos, rotation: Rotation, out: &mut Vec<TileImage>) {
        let registry = self.registry;
        let images = self.images;
        let world = self.world;
        let settings = self.settings;
        let waterlog_full = self.waterlog_full;
        let waterlog_shore = self.waterlog_shore;
        let air_id = images.air_id();

        let mut pos = top;
        loop {
            if pos.y < CHUNK_LOWEST * 16 {
                break;
            }

            let chunk_pos: ChunkPos = pos.into();
            let Some(chunk) = advance_chunk(world, &mut self.current_chunk, chunk_pos) else {
                pos += dir;
                continue;
            };

            let id = chunk.block_id_at(pos.local(), false, None);
            if id == air_id {
                pos += dir;
                continue;
            }

            let (id, image) = resolve_image(registry, images, id);
            if image.is_empty && !image.is_waterlogged {
                pos += dir;
                continue;
            }

            let south_pos = pos + rotation.south();
            let west_pos = pos + rotation.west();
            let id_top = chunk.block_id_at((pos + DIR_TOP).local(), true, None);
            let id_south = neighbour_block_id(world, &chunk, air_id, south_pos);
            let id_west = neighbour_block_id(world, &chunk, air_id, west_pos);

            let mut solid_top = false;
            let mut water_top = false;
            let mut water_south = false;
            let mut water_west = false;
            if image.is_waterlogged {
                let (_, image_top) = resolve_image(registry, images, id_top);
                let (_, image_south) = resolve_image(registry, images, id_south);
                let (_, image_west) = resolve_image(registry, images, id_west);
                water_top = image_top.is_waterlogged;
                water_south = image_south.is_waterlogged;
                water_west = image_west.is_waterlogged;
                let is_full_water = image.is_empty && image.is_waterlogged;
                if is_full_water && water_top && water_south && water_west {
                    pos += dir;
                    continue;
                }
                solid_top = !image_top.is_transparent;
            }

            let variant = if image.variants.len() > 1 {
                let mut rng = VariantRng::from_block_pos(pos.x, pos.y, pos.z);
                let weights: Vec<u32> = image.variants.iter().map(|v| v.weight).collect();
                image.variants[rng.weighted_index(&weights)]
            } else {
                image.variants[0]
            };

            let (sprite_w, sprite_h) = images.atlas().sprite(variant.color_idx).dimensions();
            let mut block_sprite = Sprite::new(sprite_w, sprite_h);
            let block_uv = images.atlas().sprite(variant.uv_idx).clone();

            if !image.is_empty {
                let color = images.atlas().sprite(variant.color_idx);
                let (strip_up, strip_left, strip_right) = if image.can_partial {
                    (id == id_top, id == id_west, id == id_south)
                } else {
                    (false, false, false)
                };
                for ((dst, src), uv_px) in block_sprite.pixels_mut().zip(color.pixels()).zip(block_uv.pixels()) {
                    let mut p = *src;
                    let face = uv_px.0[2];
                    let erased = (face == FACE_UP_BLUE && strip_up)
                        || (face == FACE_LEFT_BLUE && strip_left)
                        || (face == FACE_RIGHT_BLUE && strip_right);
                    if erased {
                        p = PixelRgba([0, 0, 0, 0]);
                    }
                    *dst = p;
                }

                if image.is_biome && settings.render_biomes {
                    let color_type = image.biome_color.unwrap_or(BiomeColorType::Grass);
                    let colormap = image.biome_colormap.unwrap_or_else(default_colormap);
                    let tint_color =
                        average_biome_color(pos, color_type, &colormap, |dx, dz| sample_biome(world, &chunk, pos, dx, dz));
                    if image.is_masked_biome {
                        if let Some(mask_idx) = image.biome_mask_sprite {
                            let mask = images.atlas().sprite(mask_idx).clone();
                            tint_masked(&mut block_sprite, &mask, tint_color);
                        }
                    } else {
                        tint(&mut block_sprite, tint_color);
                    }
                }

                let strength = settings.shadow_edges.unwrap_or_else(|| image.effective_shadow_edges());
                if strength > 0 {
                    let darken_if_exposed = |npos: BlockPos| -> u8 {
                        let nid = neighbour_block_id(world, &chunk, air_id, npos);
                        let (_, nimage) = resolve_image(registry, images, nid);
                        if nimage.effective_shadow_edges() == 0 {
                            strength
                        } else {
                            0
                        }
                    };
                    let north = darken_if_exposed(pos + rotation.north());
                    let south = darken_if_exposed(south_pos);
                    let east = darken_if_exposed(pos + rotation.east());
                    let west = darken_if_exposed(west_pos);
                    if north > 0 || south > 0 || east > 0 || west > 0 {
                        shadow_edges(&mut block_sprite, &block_uv, north, south, east, west, 0, 0);
                    }
                }

                lighting::apply(&mut block_sprite, &block_uv, image, pos, south_pos, west_pos, |p| {
                    match fetch_chunk(world, &chunk, p.into()) {
                        Some(c) => (c.block_light_at(p.local()), c.sky_light_at(p.local())),
                        None => (0, 15),
                    }
                });
            }

            if image.is_waterlogged {
                let use_full = water_top || solid_top;
                let water_variant = if use_full { waterlog_full } else { waterlog_shore };
                let water_color = images.atlas().sprite(water_variant.color_idx).clone();
                let water_uv = images.atlas().sprite(water_variant.uv_idx).clone();

                let water_tint = average_biome_color(pos, BiomeColorType::Water, &default_colormap(), |dx, dz| {
                    sample_biome(world, &chunk, pos, dx, dz)
                })
                .with_alpha((settings.water_opacity.clamp(0.0, 1.0) * 255.0) as u8);

                let mut tinted = Sprite::new(water_color.width(), water_color.height());
                for ((dst, src), uv_px) in tinted.pixels_mut().zip(water_color.pixels()).zip(water_uv.pixels()) {
                    let mut p = *src;
                    if p.0[3] != 0 {
                        let face = uv_px.0[2];
                        let erased = (face == FACE_UP_BLUE && water_top)
                            || (face == FACE_LEFT_BLUE && water_west)
                            || (face == FACE_RIGHT_BLUE && water_south);
                        if erased {
                            p = PixelRgba([0, 0, 0, 0]);
                        } else {
                            let blended = Rgba::new(p.0[0], p.0[1], p.0[2], p.0[3]).multiply_color(water_tint);
                            p = PixelRgba([blended.r, blended.g, blended.b, p.0[3]]);
                        }
                    }
                    *dst = p;
                }
                blend_z_buffered(&mut block_sprite, &block_uv, &tinted, &water_uv);
            }

            out.push(TileImage {
                x,
                y,
                pos,
                sprite: block_sprite,
            });

            if !image.is_transparent {
                break;
            }
            pos += dir;
        }
    }
}

/// The 4-rotation sort comparator used before alpha-blitting a tile's voxels
/// (spec.md §4.8): always `y` ascending first (painter's order, back to
/// front), then a rotation-specific tiebreak over the other two axes.
fn compare(rotation: Rotation, a: &TileImage, b: &TileImage) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    let y_order = a.pos.y.cmp(&b.pos.y);
    if y_order != Ordering::Equal {
        return y_order;
    }
    match rotation {
        Rotation::TopLeft => a.pos.z.cmp(&b.pos.z).then_with(|| b.pos.x.cmp(&a.pos.x)),
        Rotation::TopRight => a.pos.x.cmp(&b.pos.x).then_with(|| a.pos.z.cmp(&b.pos.z)),
        Rotation::BottomRight => b.pos.z.cmp(&a.pos.z).then_with(|| a.pos.x.cmp(&b.pos.x)),
        Rotation::BottomLeft | Rotation::All => b.pos.x.cmp(&a.pos.x).then_with(|| b.pos.z.cmp(&a.pos.z)),
    }
}

/// Alpha-composites `src` onto `canvas` at `(x, y)`, clipping to the
/// canvas bounds (the iterator's first/last columns routinely draw
/// partially or fully off-canvas, spec.md §4.4).
fn alpha_blit(canvas: &mut Sprite, src: &Sprite, x: i32, y: i32) {
    let (canvas_w, canvas_h) = canvas.dimensions();
    let (src_w, src_h) = src.dimensions();
    for sy in 0..src_h {
        let cy = y + sy as i32;
        if cy < 0 || cy >= canvas_h as i32 {
            continue;
        }
        for sx in 0..src_w {
            let cx = x + sx as i32;
            if cx < 0 || cx >= canvas_w as i32 {
                continue;
            }
            let src_px = src.get_pixel(sx, sy);
            if src_px.0[3] == 0 {
                continue;
            }
            let dst_px = canvas.get_pixel(cx as u32, cy as u32);
            let composited = Rgba::new(src_px.0[0], src_px.0[1], src_px.0[2], src_px.0[3])
                .over(Rgba::new(dst_px.0[0], dst_px.0[1], dst_px.0[2], dst_px.0[3]));
            canvas.put_pixel(
                cx as u32,
                cy as u32,
                PixelRgba([composited.r, composited.g, composited.b, composited.a]),
            );
        }
    }
}

/// Returns `chunk` itself if `pos` falls inside it, otherwise a read-only
/// world-cache fetch that doesn't disturb the column walk's own chunk
/// cursor.
fn fetch_chunk<S: ChunkSource>(world: &WorldCache<S>, chunk: &Arc<Chunk>, pos: ChunkPos) -> Option<Arc<Chunk>> {
    if chunk.pos == pos {
        Some(chunk.clone())
    } else {
        world.get(pos)
    }
}

/// Advances the column walk's cached chunk, re-fetching only when `pos`
/// names a different chunk than the one already cached.
fn advance_chunk<S: ChunkSource>(
    world: &WorldCache<S>,
    current: &mut Option<Arc<Chunk>>,
    pos: ChunkPos,
) -> Option<Arc<Chunk>> {
    if let Some(chunk) = current.as_ref() {
        if chunk.pos == pos {
            return Some(chunk.clone());
        }
    }
    let chunk = world.get(pos);
    *current = chunk.clone();
    chunk
}

fn neighbour_block_id<S: ChunkSource>(world: &WorldCache<S>, chunk: &Arc<Chunk>, air_id: u16, pos: BlockPos) -> u16 {
    match fetch_chunk(world, chunk, pos.into()) {
        Some(c) => c.block_id_at(pos.local(), false, None),
        None => air_id,
    }
}

fn sample_biome<S: ChunkSource>(world: &WorldCache<S>, chunk: &Arc<Chunk>, pos: BlockPos, dx: i32, dz: i32) -> Option<u16> {
    let other = BlockPos::new(pos.x + dx, pos.y, pos.z + dz);
    let other_chunk = fetch_chunk(world, chunk, other.into())?;
    Some(other_chunk.biome_at(other.local()))
}

/// Falls back to the same two-step chain as [`resolve_image`] for the given
/// id, used to degrade gracefully instead of panicking when a block's
/// top/south/west neighbour or the static water-mask states are unknown.
fn resolve_image<'a>(registry: &BlockStateRegistry, images: &'a BlockImages, id: u16) -> (u16, &'a BlockImage) {
    if let Some(image) = images.get(id) {
        return (id, image);
    }
    if let Some(state) = registry.state_for(id) {
        if state.property("waterlogged") == Some("true") {
            let fallback = state.with_property("waterlogged", "false");
            if let Some(fallback_id) = registry.id_for(&fallback) {
                if let Some(image) = images.get(fallback_id) {
                    return (fallback_id, image);
                }
            }
        }
    }
    if registry.mark_unknown_logged(id) {
        warn!(block_id = id, "unknown block state, using fallback sprite");
    }
    (id, images.unknown())
}

/// Resolves a hardcoded block-state's first variant, used for the waterlog
/// overlay sprites (`minecraft:water_mask level=0`/`level=2`, ground in
/// `original_source`'s `TileRenderer` constructor). Degrades to the unknown
/// sprite if the catalog never loaded that state.
fn resolve_static_variant(registry: &BlockStateRegistry, images: &BlockImages, name: &str, properties: &str) -> Variant {
    let state = BlockState::parse(name, properties);
    let id = registry.id_for(&state).or_else(|| registry.id_for(&BlockState::new(name)));
    let image = id.and_then(|id| images.get(id)).unwrap_or_else(|| images.unknown());
    image.variants.first().copied().unwrap_or(Variant {
        color_idx: 0,
        uv_idx: 0,
        weight: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::RENDER_ROTATIONS;

    fn pixel(w: u32, h: u32, rgba: [u8; 4]) -> Sprite {
        Sprite::from_fn(w, h, |_, _| PixelRgba(rgba))
    }

    fn tile_image(y: i32, x: i32, z: i32) -> TileImage {
        TileImage {
            x: 0,
            y: 0,
            pos: BlockPos::new(x, y, z),
            sprite: Sprite::new(1, 1),
        }
    }

    #[test]
    fn compare_orders_by_y_first_regardless_of_rotation() {
        let low = tile_image(0, 0, 0);
        let high = tile_image(10, 0, 0);
        for rotation in RENDER_ROTATIONS {
            assert_eq!(compare(rotation, &low, &high), std::cmp::Ordering::Less);
        }
    }

    #[test]
    fn compare_top_left_breaks_ties_by_z_then_reverse_x() {
        let a = tile_image(0, 5, 0);
        let b = tile_image(0, 0, 1);
        assert_eq!(compare(Rotation::TopLeft, &a, &b), std::cmp::Ordering::Less);
    }

    #[test]
    fn alpha_blit_clips_offscreen_pixels_without_panicking() {
        let mut canvas = pixel(4, 4, [0, 0, 0, 0]);
        let src = pixel(4, 4, [255, 0, 0, 255]);
        alpha_blit(&mut canvas, &src, -2, -2);
        assert_eq!(canvas.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(canvas.get_pixel(3, 3).0, [0, 0, 0, 0]);
    }

    #[test]
    fn alpha_blit_composites_transparent_source_as_no_op() {
        let mut canvas = pixel(2, 2, [10, 20, 30, 255]);
        let src = pixel(2, 2, [0, 0, 0, 0]);
        alpha_blit(&mut canvas, &src, 0, 0);
        assert_eq!(canvas.get_pixel(0, 0).0, [10, 20, 30, 255]);
    }
}
