//! Atlas loading: a single RGBA image cut into a row-major grid of
//! fixed-size sprites, described by a companion text index (spec.md §4.2
//! "Atlas loader").

use std::path::Path;

use crate::catalog::compositing::Sprite;
use crate::error::CatalogError;

/// A loaded sprite atlas. Sprite indices are row-major, `row * declared
/// columns + col`, matching the index-file's sprite numbering (spec.md
/// §4.2: "Fails if image grid width exceeds declared columns").
pub struct Atlas {
    pub sprite_width: u32,
    pub sprite_height: u32,
    pub columns: u32,
    sprites: Vec<Sprite>,
}

impl Atlas {
    /// Reads `<stub>.txt`'s first line (`"W H C"`) and `<stub>.png`, slicing
    /// the image into sprites. Returns the atlas plus the remaining lines
    /// of the index file for the caller (the block-image index loader) to
    /// parse.
    pub fn load(stub: &Path) -> Result<(Atlas, String), CatalogError> {
        let txt_path = stub.with_extension("txt");
        let png_path = stub.with_extension("png");

        let text = std::fs::read_to_string(&txt_path)
            .map_err(|_| CatalogError::MissingAsset(txt_path.clone()))?;
        let mut lines = text.lines();
        let header = lines.next().ok_or_else(|| CatalogError::MalformedIndex {
            line: 1,
            message: "empty index file, expected a header line".to_string(),
        })?;
        let mut parts = header.split_whitespace();
        let parse_dim = |part: Option<&str>| -> Result<u32, CatalogError> {
            part.and_then(|s| s.parse().ok())
                .ok_or_else(|| CatalogError::MalformedIndex {
                    line: 1,
                    message: format!("expected `width height columns`, got `{header}`"),
                })
        };
        let sprite_width = parse_dim(parts.next())?;
        let sprite_height = parse_dim(parts.next())?;
        let declared_columns = parse_dim(parts.next())?;

        let image = image::open(&png_path)
            .map_err(|_| CatalogError::MissingAsset(png_path.clone()))?
            .to_rgba8();
        let (img_w, img_h) = image.dimensions();
        let actual_columns = img_w / sprite_width.max(1);
        let actual_rows = img_h / sprite_height.max(1);
        if actual_columns > declared_columns {
            return Err(CatalogError::AtlasTooWide {
                columns: actual_columns,
                declared: declared_columns,
            });
        }

        let capacity = (actual_rows * declared_columns.max(1)) as usize;
        let mut sprites = vec![Sprite::new(sprite_width, sprite_height); capacity];
        for row in 0..actual_rows {
            for col in 0..actual_columns {
                let sub = image::imageops::crop_imm(
                    &image,
                    col * sprite_width,
                    row * sprite_height,
                    sprite_width,
                    sprite_height,
                )
                .to_image();
                let index = (row * declared_columns + col) as usize;
                sprites[index] = sub;
            }
        }

        let atlas = Atlas {
            sprite_width,
            sprite_height,
            columns: declared_columns,
            sprites,
        };
        let remainder: String = lines.collect::<Vec<_>>().join("\n");
        Ok((atlas, remainder))
    }

    pub fn sprite(&self, index: usize) -> &Sprite {
        &self.sprites[index]
    }

    pub fn sprite_mut(&mut self, index: usize) -> &mut Sprite {
        &mut self.sprites[index]
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_sprites(sprite_width: u32, sprite_height: u32, sprites: Vec<Sprite>) -> Atlas {
        Atlas {
            sprite_width,
            sprite_height,
            columns: sprites.len() as u32,
            sprites,
        }
    }
}
