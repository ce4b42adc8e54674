//! Error kinds (spec.md §7). Initialization failures (catalog load, registry
//! bootstrap) are returned to the caller; per-tile rendering failures never
//! propagate out of the renderer, they degrade and log instead.

use thiserror::Error;

/// Failures encountered while decoding a single chunk's NBT payload.
///
/// Per-section instances of this are logged and cause that section to be
/// skipped rather than the whole chunk to fail; only the top-level
/// "missing mandatory tag" and [`ChunkDecodeError::UnsupportedVersion`]
/// cases fail the whole chunk.
#[derive(Debug, Error)]
pub enum ChunkDecodeError {
    #[error("corrupt chunk: missing required tag `{0}`")]
    MissingTag(&'static str),

    #[error("corrupt chunk: tag `{0}` had an unexpected type")]
    WrongTagType(&'static str),

    #[error("corrupt chunk: palette index {index} out of range for palette of length {palette_len} (bits_per_entry={bits_per_entry})")]
    PaletteIndexOutOfRange {
        index: usize,
        palette_len: usize,
        bits_per_entry: u32,
    },

    #[error("unsupported chunk version {found} (minimum supported is {minimum})")]
    UnsupportedVersion { found: i32, minimum: i32 },

    #[error("failed to decompress chunk payload: {0}")]
    Decompress(#[from] std::io::Error),
}

/// Failures encountered while loading the block image catalog (atlas PNG +
/// text index). Always fatal to catalog construction.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("missing asset: {0}")]
    MissingAsset(std::path::PathBuf),

    #[error("malformed index file at line {line}: {message}")]
    MalformedIndex { line: usize, message: String },

    #[error("atlas image grid is {columns} sprites wide, wider than the declared {declared} columns")]
    AtlasTooWide { columns: u32, declared: u32 },

    #[error("failed to decode atlas image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to read asset file: {0}")]
    Io(#[from] std::io::Error),
}
