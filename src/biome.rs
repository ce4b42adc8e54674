//! The static biome table (spec.md §6 "Biome list") and the colormap/tint
//! math used to color biome-dependent blocks (spec.md §4.7).

use crate::color::Rgba;
use crate::config::DEFAULT_BIOME_ID;
use crate::geometry::BlockPos;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::warn;

pub const DEFAULT_GRASS: Rgba = Rgba::new(0x7F, 0xB2, 0x38, 0xFF);
pub const DEFAULT_FOLIAGE: Rgba = Rgba::new(0x00, 0x7C, 0x00, 0xFF);
pub const DEFAULT_WATER: Rgba = Rgba::new(0x3F, 0x76, 0xE4, 0xFF);

/// Which colormap a biome-tinted block image samples.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BiomeColorType {
    Grass,
    Foliage,
    FoliageFlipped,
    Water,
}

impl BiomeColorType {
    pub fn parse(s: &str) -> Option<BiomeColorType> {
        match s {
            "grass" => Some(BiomeColorType::Grass),
            "foliage" => Some(BiomeColorType::Foliage),
            "foliage_flipped" => Some(BiomeColorType::FoliageFlipped),
            "water" => Some(BiomeColorType::Water),
            _ => None,
        }
    }
}

/// A 3-point barycentric colormap triangle, optionally overriding a block
/// image's default grass/foliage colormap (`biome_colormap` index key).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorMap {
    pub colors: [Rgba; 3],
}

impl ColorMap {
    /// Parses `"#RRGGBBAA|#RRGGBBAA|#RRGGBBAA"`.
    pub fn parse(s: &str) -> Option<ColorMap> {
        let mut colors = [Rgba::TRANSPARENT; 3];
        let parts: Vec<&str> = s.split('|').collect();
        if parts.len() != 3 {
            return None;
        }
        for (slot, part) in colors.iter_mut().zip(parts) {
            *slot = Rgba::from_hex(part)?;
        }
        Some(ColorMap { colors })
    }

    /// Samples the triangle at barycentric coordinates derived from
    /// `(x_axis, y_axis)`: `(x-y, 1-x, y)`.
    pub fn sample(&self, x_axis: f32, y_axis: f32) -> Rgba {
        let factors = [x_axis - y_axis, 1.0 - x_axis, y_axis];
        let mut acc = [0f32; 4];
        for (color, factor) in self.colors.iter().zip(factors) {
            acc[0] += color.r as f32 * factor;
            acc[1] += color.g as f32 * factor;
            acc[2] += color.b as f32 * factor;
            acc[3] += color.a as f32 * factor;
        }
        Rgba::new(
            acc[0].clamp(0.0, 255.0) as u8,
            acc[1].clamp(0.0, 255.0) as u8,
            acc[2].clamp(0.0, 255.0) as u8,
            acc[3].clamp(0.0, 255.0) as u8,
        )
    }
}

/// A Minecraft biome with the tint parameters needed to color its
/// biome-dependent blocks.
#[derive(Debug, Clone)]
pub struct Biome {
    pub name: &'static str,
    pub temperature: f32,
    pub rainfall: f32,
    pub grass_tint: Rgba,
    pub foliage_tint: Rgba,
    pub water_tint: Rgba,
}

impl Biome {
    const fn new(name: &'static str, temperature: f32, rainfall: f32) -> Self {
        Biome {
            name,
            temperature,
            rainfall,
            grass_tint: DEFAULT_GRASS,
            foliage_tint: DEFAULT_FOLIAGE,
            water_tint: DEFAULT_WATER,
        }
    }

    const fn with_tints(
        name: &'static str,
        temperature: f32,
        rainfall: f32,
        grass_tint: Rgba,
        foliage_tint: Rgba,
        water_tint: Rgba,
    ) -> Self {
        Biome {
            name,
            temperature,
            rainfall,
            grass_tint,
            foliage_tint,
            water_tint,
        }
    }

    /// Computes this biome's tint at `pos` for `color_type`, sampling
    /// `colormap` (or this biome's own grass/foliage tint if no colormap
    /// applies, matching the block-image-has-no-colormap-override case).
    pub fn color_at(&self, pos: BlockPos, color_type: BiomeColorType, colormap: &ColorMap) -> Rgba {
        if color_type == BiomeColorType::Water {
            return self.water_tint;
        }
        let tint = if color_type == BiomeColorType::Grass {
            self.grass_tint
        } else {
            self.foliage_tint
        };
        let elevation = (pos.y - 64).max(0) as f32;
        let x_axis = (self.temperature - elevation * 0.00166667).clamp(0.0, 1.0);
        let y_axis = self.rainfall.clamp(0.0, 1.0) * x_axis;
        let sampled = colormap.sample(x_axis, y_axis);
        Rgba::blend_average(sampled, tint)
    }
}

// First few biomes carried from the original renderer's table (itself
// sourced from Minecraft's temperature/rainfall constants); unlisted biomes
// fall back to the 0.5/0.5 default via `biome_id_by_name`.
static BIOMES: &[Biome] = &[
    Biome::new("mapcrafter:unknown", 0.5, 0.5),
    Biome::new("minecraft:the_void", 0.5, 0.5),
    Biome::new("minecraft:plains", 0.8, 0.4),
    Biome::new("minecraft:sunflower_plains", 0.8, 0.4),
    Biome::new("minecraft:snowy_plains", 0.0, 0.5),
    Biome::new("minecraft:ice_spikes", 0.0, 0.5),
    Biome::new("minecraft:desert", 2.0, 0.0),
    Biome::with_tints(
        "minecraft:swamp",
        0.8,
        0.9,
        Rgba::new(0x6A, 0x70, 0x39, 0xFF),
        Rgba::new(0x6A, 0x70, 0x39, 0xFF),
        Rgba::new(0x61, 0x7B, 0x64, 0xFF),
    ),
    Biome::new("minecraft:forest", 0.6, 0.6),
    Biome::new("minecraft:flower_forest", 0.6, 0.6),
    Biome::new("minecraft:birch_forest", 0.6, 0.6),
    Biome::with_tints(
        "minecraft:dark_forest",
        0.7,
        0.8,
        DEFAULT_GRASS,
        DEFAULT_FOLIAGE,
        DEFAULT_WATER,
    ),
    Biome::new("minecraft:old_growth_birch_forest", 0.6, 0.6),
    Biome::new("minecraft:old_growth_pine_taiga", 0.3, 0.8),
    Biome::new("minecraft:old_growth_spruce_taiga", 0.25, 0.8),
    Biome::new("minecraft:taiga", 0.25, 0.8),
    Biome::with_tints(
        "minecraft:snowy_taiga",
        -0.5,
        0.4,
        DEFAULT_GRASS,
        DEFAULT_FOLIAGE,
        Rgba::new(0x3D, 0x57, 0xD6, 0xFF),
    ),
    Biome::new("minecraft:savanna", 2.0, 0.0),
    Biome::new("minecraft:savanna_plateau", 2.0, 0.0),
    Biome::new("minecraft:windswept_hills", 0.2, 0.3),
    Biome::new("minecraft:windswept_gravelly_hills", 0.2, 0.3),
    Biome::new("minecraft:windswept_forest", 0.2, 0.3),
    Biome::new("minecraft:windswept_savanna", 2.0, 0.0),
    Biome::new("minecraft:jungle", 0.95, 0.9),
    Biome::new("minecraft:sparse_jungle", 0.95, 0.8),
    Biome::new("minecraft:bamboo_jungle", 0.95, 0.9),
    Biome::with_tints(
        "minecraft:badlands",
        2.0,
        0.0,
        Rgba::new(0x90, 0x81, 0x4D, 0xFF),
        Rgba::new(0x9E, 0x81, 0x4D, 0xFF),
        DEFAULT_WATER,
    ),
    Biome::with_tints(
        "minecraft:eroded_badlands",
        2.0,
        0.0,
        Rgba::new(0x90, 0x81, 0x4D, 0xFF),
        Rgba::new(0x9E, 0x81, 0x4D, 0xFF),
        DEFAULT_WATER,
    ),
    Biome::with_tints(
        "minecraft:wooded_badlands",
        2.0,
        0.0,
        Rgba::new(0x90, 0x81, 0x4D, 0xFF),
        Rgba::new(0x9E, 0x81, 0x4D, 0xFF),
        DEFAULT_WATER,
    ),
    Biome::with_tints(
        "minecraft:meadow",
        0.5,
        0.8,
        DEFAULT_GRASS,
        DEFAULT_FOLIAGE,
        Rgba::new(0x0E, 0x4E, 0xCF, 0xFF),
    ),
    Biome::new("minecraft:grove", -0.2, 0.8),
    Biome::new("minecraft:snowy_slopes", -0.3, 0.9),
    Biome::new("minecraft:frozen_peaks", -0.7, 0.9),
    Biome::new("minecraft:jagged_peaks", -0.7, 0.9),
    Biome::new("minecraft:stony_peaks", 1.0, 0.3),
    Biome::new("minecraft:river", 0.5, 0.5),
    Biome::with_tints(
        "minecraft:frozen_river",
        0.0,
        0.5,
        DEFAULT_GRASS,
        DEFAULT_FOLIAGE,
        Rgba::new(0x39, 0x38, 0xC9, 0xFF),
    ),
    Biome::new("minecraft:beach", 0.8, 0.4),
    Biome::new("minecraft:ocean", 0.5, 0.5),
    Biome::new("minecraft:deep_ocean", 0.5, 0.5),
    Biome::new("minecraft:mushroom_fields", 0.9, 1.0),
    Biome::new("minecraft:nether_wastes", 2.0, 0.0),
    Biome::new("minecraft:the_end", 0.5, 0.5),
];

fn name_index() -> &'static HashMap<&'static str, u16> {
    static INDEX: OnceLock<HashMap<&'static str, u16>> = OnceLock::new();
    INDEX.get_or_init(|| {
        BIOMES
            .iter()
            .enumerate()
            .map(|(i, biome)| (biome.name, i as u16))
            .collect()
    })
}

/// Resolves a biome name to its id, returning the default (unknown) biome id
/// for unrecognized names and logging the miss once (spec.md §7
/// *UnknownBiome*).
pub fn biome_id_by_name(name: &str) -> u16 {
    match name_index().get(name) {
        Some(id) => *id,
        None => {
            static WARNED: OnceLock<parking_lot::Mutex<std::collections::HashSet<String>>> =
                OnceLock::new();
            let warned = WARNED.get_or_init(Default::default);
            if warned.lock().insert(name.to_string()) {
                warn!(biome = name, "unknown biome name, falling back to default");
            }
            DEFAULT_BIOME_ID
        }
    }
}

pub fn biome_by_id(id: u16) -> &'static Biome {
    BIOMES.get(id as usize).unwrap_or(&BIOMES[DEFAULT_BIOME_ID as usize])
}

/// Default (unbranded) colormap for plain grass/foliage-tinted blocks with
/// no `biome_colormap` override: a neutral triangle whose barycentric
/// sample degenerates to `(x - y, 1 - x, y)` of solid white, letting the
/// biome's own tint dominate via [`Biome::color_at`]'s averaging step.
pub fn default_colormap() -> ColorMap {
    ColorMap {
        colors: [
            Rgba::new(255, 255, 255, 255),
            Rgba::new(255, 255, 255, 255),
            Rgba::new(255, 255, 255, 255),
        ],
    }
}

/// Samples a 5x5 horizontal window (`dx, dz` in `-2..=2`) of biome ids
/// around `center` and averages their tint (spec.md §4.7). Missing chunks
/// reduce the divisor, not the numerator: `sample_biome_id` returning `None`
/// for a given offset simply excludes that sample.
pub fn average_biome_color(
    center: BlockPos,
    color_type: BiomeColorType,
    colormap: &ColorMap,
    sample_biome_id: impl Fn(i32, i32) -> Option<u16>,
) -> Rgba {
    let mut colors = Vec::with_capacity(25);
    for dz in -2..=2 {
        for dx in -2..=2 {
            if let Some(biome_id) = sample_biome_id(dx, dz) {
                let biome = biome_by_id(biome_id);
                colors.push(biome.color_at(center, color_type, colormap));
            }
        }
    }
    Rgba::average(&colors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_biome_name_falls_back_to_default() {
        assert_eq!(biome_id_by_name("minecraft:totally_made_up"), DEFAULT_BIOME_ID);
    }

    #[test]
    fn known_biome_resolves_to_stable_id() {
        let id = biome_id_by_name("minecraft:plains");
        assert_eq!(biome_by_id(id).name, "minecraft:plains");
    }

    #[test]
    fn water_colormap_ignores_colormap_and_returns_water_tint() {
        let biome = biome_by_id(biome_id_by_name("minecraft:swamp"));
        let colormap = default_colormap();
        let color = biome.color_at(BlockPos::new(0, 64, 0), BiomeColorType::Water, &colormap);
        assert_eq!(color, biome.water_tint);
    }

    #[test]
    fn missing_samples_reduce_divisor_not_numerator() {
        let colormap = default_colormap();
        let plains_id = biome_id_by_name("minecraft:plains");
        let all_present = average_biome_color(
            BlockPos::new(0, 64, 0),
            BiomeColorType::Grass,
            &colormap,
            |_, _| Some(plains_id),
        );
        let half_missing = average_biome_color(
            BlockPos::new(0, 64, 0),
            BiomeColorType::Grass,
            &colormap,
            |dx, _| if dx < 0 { None } else { Some(plains_id) },
        );
        // Every present sample is identical, so the average is unaffected by
        // how many were dropped.
        assert_eq!(all_present, half_missing);
    }
}
