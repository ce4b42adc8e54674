//! Chunk decoding and the world cache (spec.md §4.1, §3 "Chunk").

mod packed;

use std::io::{Cursor, Read};
use std::num::NonZeroUsize;
use std::sync::Arc;

use anvil_region::position::{RegionChunkPosition, RegionPosition};
use anvil_region::provider::{FolderRegionProvider, RegionProvider};
use lru::LruCache;
use nbt::CompoundTag;
use parking_lot::Mutex;
use tracing::warn;

use crate::biome::biome_id_by_name;
use crate::blockstate::{BlockState, BlockStateRegistry};
use crate::config::{CHUNK_LOWEST, MIN_DATA_VERSION, RENDERABLE_STATUSES, SECTIONS_PER_CHUNK};
use crate::error::ChunkDecodeError;
use crate::geometry::{ChunkPos, LocalPos};

pub use packed::{bits_per_value, pack, shorts_per_long, unpack, unpack_bits};

/// Region-file compression scheme, per the Anvil format's 1-byte tag.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Compression {
    Gzip,
    Zlib,
    Raw,
}

/// One 16x16x16 slice of a chunk (spec.md §3 "Section").
#[derive(Clone)]
pub struct ChunkSection {
    pub y: i8,
    pub block_ids: Box<[u16; 4096]>,
    pub biomes: Box<[u16; 64]>,
    pub block_light: Box<[u8; 2048]>,
    pub sky_light: Box<[u8; 2048]>,
}

impl ChunkSection {
    fn empty(y: i8, air_id: u16) -> Self {
        ChunkSection {
            y,
            block_ids: Box::new([air_id; 4096]),
            biomes: Box::new([0u16; 64]),
            block_light: Box::new([0u8; 2048]),
            sky_light: Box::new([0xFFu8; 2048]),
        }
    }

    /// `local.y` is the block's absolute world y (see [`LocalPos`]); this
    /// masks it down to the section-local `0..16` offset the flat arrays
    /// are indexed by.
    fn block_index(local: LocalPos) -> usize {
        ((local.y & 15) as usize) * 256 + (local.z as usize) * 16 + local.x as usize
    }

    fn nibble(array: &[u8; 2048], offset: usize) -> u8 {
        let byte = array[offset / 2];
        if offset % 2 == 0 {
            byte & 0x0F
        } else {
            byte >> 4
        }
    }
}

/// Something that can decide a block is hidden regardless of its id, used by
/// `force == false` lookups (spec.md §4.1 "Lookups").
pub enum BlockMask<'a> {
    CompletelyHidden,
    CompletelyShown,
    PerBlock(&'a dyn Fn(u16) -> bool),
}

/// A decoded chunk column: up to [`SECTIONS_PER_CHUNK`] sections, dense
/// storage of the present ones plus a signed offset table (spec.md §3).
pub struct Chunk {
    pub pos: ChunkPos,
    section_offsets: [i8; SECTIONS_PER_CHUNK],
    sections: Vec<ChunkSection>,
    air_id: u16,
}

impl Chunk {
    fn empty(pos: ChunkPos, air_id: u16) -> Self {
        Chunk {
            pos,
            section_offsets: [-1; SECTIONS_PER_CHUNK],
            sections: Vec::new(),
            air_id,
        }
    }

    fn slot_for_y(y: i32) -> Option<usize> {
        let slot = y.div_euclid(16) - CHUNK_LOWEST;
        if (0..SECTIONS_PER_CHUNK as i32).contains(&slot) {
            Some(slot as usize)
        } else {
            None
        }
    }

    fn section_at_y(&self, y: i32) -> Option<&ChunkSection> {
        let slot = Self::slot_for_y(y)?;
        let offset = self.section_offsets[slot];
        if offset < 0 {
            None
        } else {
            self.sections.get(offset as usize)
        }
    }

    fn insert_section(&mut self, section: ChunkSection) {
        let slot = Self::slot_for_y(section.y as i32 * 16)
            .expect("section Y was already range-checked during decode");
        let index = self.sections.len();
        self.sections.push(section);
        self.section_offsets[slot] = index as i8;
    }

    /// Resolves `local`'s global block-state id. `force` skips mask
    /// consultation, used when fetching a neighbour purely to test equality
    /// rather than to decide visibility.
    pub fn block_id_at(&self, local: LocalPos, force: bool, mask: Option<&BlockMask>) -> u16 {
        let Some(section) = self.section_at_y(local.y) else {
            return self.air_id;
        };
        let id = section.block_ids[ChunkSection::block_index(local)];
        if force {
            return id;
        }
        match mask {
            None => id,
            Some(BlockMask::CompletelyHidden) => self.air_id,
            Some(BlockMask::CompletelyShown) => id,
            Some(BlockMask::PerBlock(hidden)) => {
                if hidden(id) {
                    self.air_id
                } else {
                    id
                }
            }
        }
    }

    pub fn block_light_at(&self, local: LocalPos) -> u8 {
        match self.section_at_y(local.y) {
            Some(section) => ChunkSection::nibble(&section.block_light, ChunkSection::block_index(local)),
            None => 0,
        }
    }

    pub fn sky_light_at(&self, local: LocalPos) -> u8 {
        match self.section_at_y(local.y) {
            Some(section) => ChunkSection::nibble(&section.sky_light, ChunkSection::block_index(local)),
            None => 15,
        }
    }

    pub fn biome_at(&self, local: LocalPos) -> u16 {
        let Some(section) = self.section_at_y(local.y) else {
            return crate::config::DEFAULT_BIOME_ID;
        };
        let (qx, qz, qy) = (local.x >> 2, local.z >> 2, (local.y & 15) >> 2);
        let index = ((qy << 4) | (qz << 2) | qx) as usize;
        section.biomes[index]
    }
}

/// Decodes a single region-file slot's raw payload into a [`Chunk`]
/// (spec.md §4.1 contract). Never fails for per-section problems; those are
/// logged and that section alone is dropped.
pub fn decode(
    raw: &[u8],
    compression: Compression,
    registry: &BlockStateRegistry,
) -> Result<Chunk, ChunkDecodeError> {
    let nbt = parse_nbt(raw, compression)?;
    decode_nbt(&nbt, registry)
}

fn parse_nbt(raw: &[u8], compression: Compression) -> Result<CompoundTag, ChunkDecodeError> {
    match compression {
        Compression::Raw => nbt::decode::read_compound_tag(&mut Cursor::new(raw))
            .map_err(|_| ChunkDecodeError::WrongTagType("root")),
        Compression::Gzip => nbt::decode::read_gzip_compound_tag(&mut Cursor::new(raw))
            .map_err(|_| ChunkDecodeError::WrongTagType("root")),
        Compression::Zlib => {
            let mut decoder = flate2::read::ZlibDecoder::new(raw);
            let mut buf = Vec::new();
            decoder.read_to_end(&mut buf)?;
            nbt::decode::read_compound_tag(&mut Cursor::new(&buf))
                .map_err(|_| ChunkDecodeError::WrongTagType("root"))
        }
    }
}

fn decode_nbt(nbt: &CompoundTag, registry: &BlockStateRegistry) -> Result<Chunk, ChunkDecodeError> {
    let version = nbt
        .get_i32("DataVersion")
        .map_err(|_| ChunkDecodeError::MissingTag("DataVersion"))?;
    if version < MIN_DATA_VERSION {
        return Err(ChunkDecodeError::UnsupportedVersion {
            found: version,
            minimum: MIN_DATA_VERSION,
        });
    }
    let x = nbt.get_i32("xPos").map_err(|_| ChunkDecodeError::MissingTag("xPos"))?;
    let z = nbt.get_i32("zPos").map_err(|_| ChunkDecodeError::MissingTag("zPos"))?;
    nbt.get_i32("yPos").map_err(|_| ChunkDecodeError::MissingTag("yPos"))?;

    let mut chunk = Chunk::empty(ChunkPos::new(x, z), registry.air_id());

    // A missing Status (legacy worlds) is treated as renderable (SPEC_FULL §1.1).
    let renderable = match nbt.get_str("Status") {
        Ok(status) => RENDERABLE_STATUSES.contains(&status),
        Err(_) => true,
    };
    if !renderable {
        return Ok(chunk);
    }

    let Ok(sections_nbt) = nbt.get_compound_tag_vec("sections") else {
        return Ok(chunk);
    };

    for section_nbt in sections_nbt {
        match decode_section(section_nbt, registry) {
            Ok(section) => chunk.insert_section(section),
            Err(error) => warn!(chunk = %chunk.pos, %error, "dropping corrupt chunk section"),
        }
    }

    Ok(chunk)
}

fn decode_section(
    section_nbt: &CompoundTag,
    registry: &BlockStateRegistry,
) -> Result<ChunkSection, ChunkDecodeError> {
    let y = section_nbt.get_i8("Y").map_err(|_| ChunkDecodeError::MissingTag("Y"))?;
    if Chunk::slot_for_y(y as i32 * 16).is_none() {
        return Err(ChunkDecodeError::WrongTagType("Y"));
    }

    let mut section = ChunkSection::empty(y, registry.air_id());

    let block_states = section_nbt
        .get_compound_tag("block_states")
        .map_err(|_| ChunkDecodeError::MissingTag("block_states"))?;
    let palette_nbt = block_states
        .get_compound_tag_vec("palette")
        .map_err(|_| ChunkDecodeError::MissingTag("palette"))?;
    let palette: Vec<u16> = palette_nbt
        .iter()
        .map(|entry| resolve_palette_entry(entry, registry))
        .collect::<Result<_, _>>()?;

    if palette.len() == 1 {
        section.block_ids = Box::new([palette[0]; 4096]);
    } else {
        let data = block_states
            .get_i64_vec("data")
            .map_err(|_| ChunkDecodeError::MissingTag("data"))?;
        let bits = bits_per_value(4096, data.len());
        let indices = unpack(data, 4096);
        for (i, idx) in indices.into_iter().enumerate() {
            let idx = idx as usize;
            let Some(id) = palette.get(idx) else {
                return Err(ChunkDecodeError::PaletteIndexOutOfRange {
                    index: idx,
                    palette_len: palette.len(),
                    bits_per_entry: bits,
                });
            };
            section.block_ids[i] = *id;
        }
    }

    let biomes_nbt = section_nbt
        .get_compound_tag("biomes")
        .map_err(|_| ChunkDecodeError::MissingTag("biomes"))?;
    let biome_palette = biomes_nbt
        .get_str_vec("palette")
        .map_err(|_| ChunkDecodeError::MissingTag("biomes.palette"))?;
    let biome_ids: Vec<u16> = biome_palette.iter().map(|name| biome_id_by_name(name)).collect();

    if biome_ids.len() == 1 {
        section.biomes = Box::new([biome_ids[0]; 64]);
    } else {
        let data = biomes_nbt
            .get_i64_vec("data")
            .map_err(|_| ChunkDecodeError::MissingTag("biomes.data"))?;
        let indices = unpack(data, 64);
        for (i, idx) in indices.into_iter().enumerate() {
            section.biomes[i] = biome_ids
                .get(idx as usize)
                .copied()
                .unwrap_or(crate::config::DEFAULT_BIOME_ID);
        }
    }

    if let Ok(block_light) = section_nbt.get_i8_vec("BlockLight") {
        for (i, b) in block_light.iter().take(2048).enumerate() {
            section.block_light[i] = *b as u8;
        }
    }
    if let Ok(sky_light) = section_nbt.get_i8_vec("SkyLight") {
        for (i, b) in sky_light.iter().take(2048).enumerate() {
            section.sky_light[i] = *b as u8;
        }
    }

    Ok(section)
}

fn resolve_palette_entry(
    entry: &CompoundTag,
    registry: &BlockStateRegistry,
) -> Result<u16, ChunkDecodeError> {
    let name = entry
        .get_str("Name")
        .map_err(|_| ChunkDecodeError::MissingTag("Name"))?
        .to_string();
    let mut state = BlockState::new(name.clone());
    if let Ok(properties) = entry.get_compound_tag("Properties") {
        for (key, tag) in properties.iter() {
            if !registry.is_known_property(&name, key) {
                continue;
            }
            if let nbt::Tag::String(value) = tag {
                state.set_property(key.clone(), value.clone());
            }
        }
    }
    Ok(registry.get_or_insert(state))
}

/// External collaborator interface for fetching a chunk's raw NBT (spec.md
/// §1: "world file discovery and region-file I/O" is out of scope for the
/// core; this is the minimal seam it needs).
pub trait ChunkSource: Send + Sync {
    fn load(&self, pos: ChunkPos) -> Option<Chunk>;
}

/// Default [`ChunkSource`] reading directly from an on-disk Anvil region
/// folder, mirroring the teacher's own `load_chunk` (world/mod.rs).
pub struct AnvilChunkSource {
    provider: FolderRegionProvider,
    registry: Arc<BlockStateRegistry>,
}

impl AnvilChunkSource {
    pub fn new(region_dir: impl Into<String>, registry: Arc<BlockStateRegistry>) -> Self {
        AnvilChunkSource {
            provider: FolderRegionProvider::new(&region_dir.into()),
            registry,
        }
    }
}

impl ChunkSource for AnvilChunkSource {
    fn load(&self, pos: ChunkPos) -> Option<Chunk> {
        let region = self
            .provider
            .get_region(RegionPosition::from_chunk_position(pos.x, pos.z))
            .ok()?;
        let nbt = region
            .read_chunk(RegionChunkPosition::from_chunk_position(pos.x, pos.z))
            .ok()?;
        match decode_nbt(&nbt, &self.registry) {
            Ok(chunk) => Some(chunk),
            Err(error) => {
                warn!(chunk.x = pos.x, chunk.z = pos.z, %error, "failed to decode chunk");
                None
            }
        }
    }
}

/// LRU-ish shared cache of decoded chunks (spec.md §3, §5). A chunk returned
/// by [`WorldCache::get`] stays valid for as long as the caller holds its
/// `Arc`; the renderer never retains one across tiles.
pub struct WorldCache<S> {
    source: S,
    cache: Mutex<LruCache<ChunkPos, Arc<Chunk>>>,
}

impl<S: ChunkSource> WorldCache<S> {
    pub fn new(source: S, capacity: NonZeroUsize) -> Self {
        WorldCache {
            source,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        if let Some(chunk) = self.cache.lock().get(&pos) {
            return Some(chunk.clone());
        }
        let chunk = Arc::new(self.source.load(pos)?);
        self.cache.lock().put(pos, chunk.clone());
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstate::BlockState;

    fn registry_with_known_property(block: &str, key: &str) -> BlockStateRegistry {
        let registry = BlockStateRegistry::new();
        registry.register_known_property(block, key);
        registry
    }

    #[test]
    fn absent_sections_read_as_air_and_bright_sky() {
        let registry = BlockStateRegistry::new();
        let chunk = Chunk::empty(ChunkPos::new(0, 0), registry.air_id());
        let local = LocalPos::new(0, 0, 0);
        assert_eq!(chunk.block_id_at(local, true, None), registry.air_id());
        assert_eq!(chunk.sky_light_at(local), 15);
        assert_eq!(chunk.block_light_at(local), 0);
    }

    #[test]
    fn single_entry_palette_fills_whole_section() {
        let registry = registry_with_known_property("minecraft:stone", "dummy");
        let stone_id = registry.get_or_insert(BlockState::new("minecraft:stone"));
        let mut section = ChunkSection::empty(4, registry.air_id());
        section.block_ids = Box::new([stone_id; 4096]);
        let mut chunk = Chunk::empty(ChunkPos::new(0, 0), registry.air_id());
        chunk.insert_section(section);
        // section Y=4 covers absolute y in [64, 80); local.y stays absolute.
        let local = LocalPos::new(8, 64, 8);
        assert_eq!(chunk.block_id_at(local, true, None), stone_id);
    }

    #[test]
    fn block_mask_completely_hidden_yields_air() {
        let registry = BlockStateRegistry::new();
        let stone_id = registry.get_or_insert(BlockState::new("minecraft:stone"));
        let mut section = ChunkSection::empty(0, registry.air_id());
        section.block_ids = Box::new([stone_id; 4096]);
        let mut chunk = Chunk::empty(ChunkPos::new(0, 0), registry.air_id());
        chunk.insert_section(section);
        let local = LocalPos::new(0, 0, 0);
        let mask = BlockMask::CompletelyHidden;
        assert_eq!(chunk.block_id_at(local, false, Some(&mask)), registry.air_id());
        // force=true bypasses the mask entirely.
        assert_eq!(chunk.block_id_at(local, true, Some(&mask)), stone_id);
    }
}
