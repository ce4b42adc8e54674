//! `BlockImage`: the per-block-state rendering recipe parsed from an index
//! line (spec.md §3 "Block image", §4.2's key table).

use bitflags::bitflags;

use crate::biome::{BiomeColorType, ColorMap};
use crate::color::Rgba;
use crate::error::CatalogError;

bitflags! {
    /// Which of the three visible cube faces a block image's UV mask
    /// actually covers (spec.md §3 `side_mask`).
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub struct SideMask: u8 {
        const LEFT = 0b001;
        const RIGHT = 0b010;
        const UP = 0b100;
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LightingType {
    None,
    Simple,
    Smooth,
    SmoothBottom,
    SmoothTopRemainingSimple,
}

/// One `(color_idx, uv_idx, weight)` texture variant for a block image
/// (spec.md §3).
#[derive(Debug, Copy, Clone)]
pub struct Variant {
    pub color_idx: usize,
    pub uv_idx: usize,
    pub weight: u32,
}

/// The parsed, catalog-resident rendering recipe for one block-state
/// (spec.md §3 "Block image"). Cheap to clone: sprite references are
/// interned atlas indices, not pixel data (spec.md §9 "Sprite ownership").
#[derive(Debug, Clone)]
pub struct BlockImage {
    pub variants: Vec<Variant>,
    pub is_empty: bool,
    pub is_transparent: bool,
    pub is_biome: bool,
    pub is_masked_biome: bool,
    pub biome_color: Option<BiomeColorType>,
    pub biome_colormap: Option<ColorMap>,
    pub lighting_type: Option<LightingType>,
    pub shadow_edges: Option<u8>,
    pub can_partial: bool,
    pub is_waterlogged: bool,
    pub is_waterloggable: bool,
    pub inherently_waterlogged: bool,
    pub faulty_lighting: bool,
    pub side_mask: SideMask,
    /// Sprite index of the companion `<name>_biome_mask` block's first
    /// color sprite, resolved after all lines are loaded (spec.md §4.2
    /// "Post-load completion").
    pub biome_mask_sprite: Option<usize>,
}

impl Default for BlockImage {
    fn default() -> Self {
        BlockImage {
            variants: Vec::new(),
            is_empty: false,
            is_transparent: false,
            is_biome: false,
            is_masked_biome: false,
            biome_color: None,
            biome_colormap: None,
            lighting_type: None,
            shadow_edges: None,
            can_partial: false,
            is_waterlogged: false,
            is_waterloggable: false,
            inherently_waterlogged: false,
            faulty_lighting: false,
            side_mask: SideMask::empty(),
            biome_mask_sprite: None,
        }
    }
}

impl BlockImage {
    /// Parses the index line's semicolon-separated `key=value;…` block-info
    /// column (spec.md §4.2's key table).
    pub fn parse(properties: &str) -> Result<BlockImage, CatalogError> {
        let mut image = BlockImage::default();
        let mut colors: Vec<usize> = Vec::new();
        let mut uvs: Vec<usize> = Vec::new();
        let mut weights: Vec<u32> = Vec::new();

        for part in properties.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part.split_once('=').unwrap_or((part, ""));
            let key = key.trim();
            let value = value.trim();
            let malformed = |message: String| CatalogError::MalformedIndex { line: 0, message };

            match key {
                "color" => {
                    colors = parse_index_list(value).map_err(|e| malformed(e))?;
                }
                "uv" => {
                    uvs = parse_index_list(value).map_err(|e| malformed(e))?;
                }
                "weight" => {
                    weights = value
                        .split(':')
                        .map(|s| s.parse::<u32>())
                        .collect::<Result<_, _>>()
                        .map_err(|_| malformed(format!("bad weight list `{value}`")))?;
                }
                "biome_type" => {
                    image.is_biome = true;
                    if value == "masked" {
                        image.is_masked_biome = true;
                    }
                }
                "biome_colors" => {
                    image.biome_color = Some(
                        BiomeColorType::parse(value)
                            .ok_or_else(|| malformed(format!("unknown biome_colors `{value}`")))?,
                    );
                }
                "biome_colormap" => {
                    image.biome_colormap = Some(
                        ColorMap::parse(value)
                            .ok_or_else(|| malformed(format!("bad biome_colormap `{value}`")))?,
                    );
                }
                "lighting_type" => {
                    image.lighting_type = Some(match value {
                        "none" => LightingType::None,
                        "simple" => LightingType::Simple,
                        "smooth" => LightingType::Smooth,
                        "smooth_bottom" => LightingType::SmoothBottom,
                        _ => return Err(malformed(format!("unknown lighting_type `{value}`"))),
                    });
                }
                "faulty_lighting" => image.faulty_lighting = true,
                "partial" => image.can_partial = value != "false",
                "shadow_edges" => {
                    image.shadow_edges = Some(
                        value
                            .parse()
                            .map_err(|_| malformed(format!("bad shadow_edges `{value}`")))?,
                    );
                }
                "inherently_waterlogged" => image.inherently_waterlogged = true,
                "is_waterloggable" => image.is_waterloggable = true,
                other => return Err(malformed(format!("unrecognized block-info key `{other}`"))),
            }
        }

        if colors.is_empty() {
            return Err(CatalogError::MalformedIndex {
                line: 0,
                message: "missing required `color` key".to_string(),
            });
        }
        if uvs.len() != colors.len() {
            return Err(CatalogError::MalformedIndex {
                line: 0,
                message: "`uv` list length must match `color` list length".to_string(),
            });
        }
        if weights.is_empty() {
            weights = vec![1; colors.len()];
        }
        if weights.len() != colors.len() {
            return Err(CatalogError::MalformedIndex {
                line: 0,
                message: "`weight` list length must match `color` list length".to_string(),
            });
        }

        image.variants = colors
            .into_iter()
            .zip(uvs)
            .zip(weights)
            .map(|((color_idx, uv_idx), weight)| Variant {
                color_idx,
                uv_idx,
                weight,
            })
            .collect();

        Ok(image)
    }

    pub fn total_weight(&self) -> u32 {
        self.variants.iter().map(|v| v.weight).sum()
    }

    /// Resolves the darkening color for a luminance-neutral biome tint,
    /// used by `tint_high_contrast` callers (spec.md §4.3).
    pub fn effective_shadow_edges(&self) -> u8 {
        self.shadow_edges.unwrap_or(if self.is_transparent { 0 } else { 1 })
    }
}

fn parse_index_list(value: &str) -> Result<Vec<usize>, String> {
    value
        .split(':')
        .map(|s| s.parse::<usize>().map_err(|_| format!("bad sprite index `{s}`")))
        .collect()
}

/// Unused-by-itself helper kept for callers that need a plain opaque
/// placeholder color when a companion sprite is missing.
pub const FALLBACK_TINT: Rgba = Rgba::new(255, 0, 255, 255);
