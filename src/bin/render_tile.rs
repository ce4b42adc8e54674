//! Minimal driver: renders one tile from a region folder + catalog stub and
//! writes it as a PNG. Argument parsing, multi-tile dispatch, and world file
//! discovery belong to an external host (spec.md §1); this binary only
//! wires the library's pieces together for manual/ad-hoc use.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use isotile_core::geometry::{Rotation, TilePos};
use isotile_core::world::AnvilChunkSource;
use isotile_core::{BlockImages, BlockStateRegistry, RenderSettings, TileRenderer, WorldCache};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let region_dir = args.next().expect("usage: render_tile <region_dir> <catalog_stub> <tile_x> <tile_y> <out.png>");
    let catalog_stub = PathBuf::from(args.next().expect("missing catalog_stub"));
    let tile_x: i32 = args.next().expect("missing tile_x").parse()?;
    let tile_y: i32 = args.next().expect("missing tile_y").parse()?;
    let out_path = PathBuf::from(args.next().expect("missing out.png"));

    let registry = Arc::new(BlockStateRegistry::new());
    let images = BlockImages::load(&catalog_stub, &registry)?;
    let source = AnvilChunkSource::new(region_dir, registry.clone());
    let world = WorldCache::new(source, NonZeroUsize::new(256).unwrap());

    let mut renderer = TileRenderer::new(&registry, &images, &world, RenderSettings::default());
    let tile = renderer.render_tile(TilePos::new(tile_x, tile_y), Rotation::TopLeft);
    tile.save(&out_path)?;

    tracing::info!(path = %out_path.display(), "wrote tile");
    Ok(())
}
