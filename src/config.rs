//! Tunable constants and the small value-types that parameterize a render.
//! Config/CLI loading is out of scope for the core (spec.md §1); this module
//! only holds the constants and structs the rendering pipeline closes over.

/// Lowest section index, inclusive (`Y` tag value).
pub const CHUNK_LOWEST: i32 = -4;
/// Highest section index, exclusive. `CHUNK_HIGHEST * 16 - 1` is the topmost
/// block y a column can contain.
pub const CHUNK_HIGHEST: i32 = 20;
/// Number of sections stored per chunk (`CHUNK_HIGHEST - CHUNK_LOWEST`).
pub const SECTIONS_PER_CHUNK: usize = (CHUNK_HIGHEST - CHUNK_LOWEST) as usize;

/// Minimum `DataVersion` accepted by the decoder (post Caves & Cliffs).
pub const MIN_DATA_VERSION: i32 = 2860;

/// Chunk `Status` values treated as renderable; anything else decodes to an
/// empty-sections chunk rather than failing.
pub const RENDERABLE_STATUSES: &[&str] =
    &["fullchunk", "full", "postprocessed", "mobs_spawned"];

/// `biome.rs`'s unknown-biome sentinel id.
pub const DEFAULT_BIOME_ID: u16 = 0;

/// UV-mask blue-channel values identifying which cube face a pixel belongs
/// to (spec.md §4.2, §9 "Per-pixel face dispatch"): `255/6 * {1, 2, 4}`.
pub const FACE_LEFT_BLUE: u8 = 42;
pub const FACE_UP_BLUE: u8 = 85;
pub const FACE_RIGHT_BLUE: u8 = 170;

/// Per-face side-darkening factors applied once during catalog load (spec.md
/// §4.2 "Face shading"), matching vanilla Minecraft's directional block
/// light: top faces full brightness, the two visible side faces darker.
pub const DARKEN_LEFT: f32 = 0.6;
pub const DARKEN_RIGHT: f32 = 0.8;

/// Parameters closed over by a [`crate::render::TileRenderer`] for one run.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RenderSettings {
    /// Width/height in pixels of one block sprite.
    pub block_size: u32,
    /// Tile side length, as a multiple of `16 * block_size` blocks. Must be
    /// a power of two.
    pub tile_width: u32,
    /// Alpha multiplier (`0.0..=1.0`) applied to waterlog overlay sprites.
    pub water_opacity: f32,
    /// Whether biome tinting is applied at all.
    pub render_biomes: bool,
    /// Global shadow-edge strength override, `0..=3`; `None` defers to each
    /// block image's own `shadow_edges` flag.
    pub shadow_edges: Option<u8>,
}

impl RenderSettings {
    pub fn tile_side_pixels(&self) -> u32 {
        self.block_size * 16 * self.tile_width
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            block_size: 16,
            tile_width: 1,
            water_opacity: 1.0,
            render_biomes: true,
            shadow_edges: None,
        }
    }
}
