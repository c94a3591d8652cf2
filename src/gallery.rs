use crate::cache::ThumbnailCache;
use crate::paging::Pager;
use crate::table::{RowId, Table};
use crate::{GalleryError, Result};
use eframe::egui;
use image::imageops::FilterType;
use std::path::Path;
use std::time::Duration;

/// Fixed `rows x cols` grid filled row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
}

impl GridLayout {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows: rows.max(1),
            cols: cols.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.rows * self.cols
    }

    pub fn position(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }
}

/// Decodes and downsizes an image on a cache miss.
pub trait ThumbnailLoader<T> {
    fn load(&mut self, path: &Path) -> Result<T>;
}

/// Produces egui textures; the texture handle is the cached bitmap.
pub struct TextureLoader<'a> {
    ctx: &'a egui::Context,
    size: u32,
}

impl<'a> TextureLoader<'a> {
    pub fn new(ctx: &'a egui::Context, size: u32) -> Self {
        Self { ctx, size }
    }
}

impl ThumbnailLoader<egui::TextureHandle> for TextureLoader<'_> {
    fn load(&mut self, path: &Path) -> Result<egui::TextureHandle> {
        let color_image = decode_thumbnail(path, self.size)?;
        Ok(self.ctx.load_texture(
            format!("thumbnail_{}", path.display()),
            color_image,
            egui::TextureOptions::default(),
        ))
    }
}

pub fn decode_image(path: &Path) -> Result<image::DynamicImage> {
    // Sniff the format from the bytes, extensions in the table can lie
    let reader = image::io::Reader::open(path)?.with_guessed_format()?;
    reader.decode().map_err(|source| GalleryError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })
}

pub fn decode_thumbnail(path: &Path, size: u32) -> Result<egui::ColorImage> {
    let img = decode_image(path)?;
    let (width, height) = (img.width(), img.height());

    // Already small enough, no resize pass needed
    if width <= size && height <= size {
        return Ok(create_thumbnail(img, size));
    }

    let scale_factor = (width.max(height) as f32 / size as f32).max(1.0);
    if scale_factor > 8.0 {
        // Very large source: cheap nearest pass to 4x, smooth pass to 2x, then final fit
        let first_step = size * 4;
        let second_step = size * 2;
        let step1 = img.resize(first_step, first_step, FilterType::Nearest);
        let step2 = step1.resize(second_step, second_step, FilterType::Triangle);
        Ok(create_thumbnail(step2, size))
    } else if scale_factor > 4.0 {
        // Large source: one nearest pass to 2x before the final fit
        let intermediate = img.resize(size * 2, size * 2, FilterType::Nearest);
        Ok(create_thumbnail(intermediate, size))
    } else {
        // Close to the target already, a single triangle resize is fine
        Ok(create_thumbnail(img, size))
    }
}

/// Fits `img` inside a `size` square, keeping its aspect ratio. Smaller
/// images are never enlarged.
pub fn create_thumbnail(img: image::DynamicImage, size: u32) -> egui::ColorImage {
    let thumbnail = if img.width() > size || img.height() > size {
        img.resize(size, size, FilterType::Triangle)
    } else {
        img
    };
    to_color_image(&thumbnail)
}

pub fn to_color_image(img: &image::DynamicImage) -> egui::ColorImage {
    // egui wants unmultiplied RGBA8 rows
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw())
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridCell<T> {
    pub row: usize,
    pub col: usize,
    pub id: RowId,
    /// `None` when the image could not be decoded.
    pub thumbnail: Option<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryPage<T> {
    pub layout: GridLayout,
    pub page: usize,
    pub page_count: usize,
    pub cells: Vec<GridCell<T>>,
}

impl<T> GalleryPage<T> {
    pub fn cell(&self, row: usize, col: usize) -> Option<&GridCell<T>> {
        self.cells.iter().find(|cell| cell.row == row && cell.col == col)
    }

    pub fn rows_used(&self) -> usize {
        self.cells.last().map(|cell| cell.row + 1).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalleryRenderer {
    pub layout: GridLayout,
    pub max_age: Duration,
}

impl GalleryRenderer {
    pub fn new(layout: GridLayout, max_age: Duration) -> Self {
        Self { layout, max_age }
    }

    /// Builds the page from scratch, purging idle thumbnails first.
    pub fn render<T, L>(
        &self,
        table: &Table,
        view: &[RowId],
        pager: &Pager,
        cache: &mut ThumbnailCache<T>,
        loader: &mut L,
    ) -> GalleryPage<T>
    where
        T: Clone,
        L: ThumbnailLoader<T>,
    {
        // Purge once per page build, not per cell
        cache.purge_unused(self.max_age);

        let range = pager.range(view.len());
        let mut cells = Vec::with_capacity(range.len());

        for (offset, id) in view[range].iter().enumerate() {
            let (row, col) = self.layout.position(offset);
            let Some(path) = table.path(*id) else {
                continue;
            };
            let key = path.to_string_lossy();

            // Cache hit refreshes recency; a miss decodes and inserts, which may evict the LRU entry
            let thumbnail = match cache.get(&key).cloned() {
                Some(thumbnail) => Some(thumbnail),
                None => match loader.load(&path) {
                    Ok(thumbnail) => {
                        cache.put(&key, thumbnail.clone());
                        Some(thumbnail)
                    }
                    Err(e) => {
                        // Keep the cell so the grid position stays stable, just leave it empty
                        log::debug!("Skipping thumbnail for {:?}: {}", path, e);
                        None
                    }
                },
            };

            cells.push(GridCell {
                row,
                col,
                id: *id,
                thumbnail,
            });
        }

        GalleryPage {
            layout: self.layout,
            page: pager.page(),
            page_count: pager.page_count(view.len()),
            cells,
        }
    }
}
