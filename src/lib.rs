use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub mod app;
pub mod cache;
pub mod export;
pub mod filter;
pub mod gallery;
pub mod paging;
pub mod state;
pub mod table;

pub use app::GalleryApp;
pub use cache::ThumbnailCache;
pub use filter::{BoundsMode, CategoryFilter, FilterSet, FilteredView, NumericFilter};
pub use gallery::{GalleryPage, GalleryRenderer, GridCell, GridLayout, ThumbnailLoader};
pub use paging::Pager;
pub use state::{Action, Details, GalleryState, Outcome, View};
pub use table::{AttributeKind, ColumnSlot, Row, RowId, Schema, Table, Value};

#[derive(Debug, thiserror::Error)]
pub enum GalleryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read or write table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Table must contain 'dir' and 'file' columns (missing: {})", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("Failed to decode image {path}: {source}")]
    ImageDecode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No marked files to export")]
    NothingMarked,

    #[error("No table selected. Pass a CSV file with --table or pick one in the dialog")]
    NoTableSelected,
}

pub type Result<T> = std::result::Result<T, GalleryError>;

pub const MARK_COLUMN: &str = "__marked__";
pub const DIR_COLUMN: &str = "dir";
pub const FILE_COLUMN: &str = "file";
pub const INDEX_COLUMN: &str = "Unnamed: 0";

#[derive(Parser, Clone, Debug)]
#[command(name = "table-gallery")]
#[command(about = "Browse, filter and mark images listed in a CSV table")]
pub struct Args {
    #[arg(short, long, help = "CSV table to open (a file dialog is shown when omitted)")]
    pub table: Option<PathBuf>,

    #[arg(long, default_value = "120")]
    pub thumbnail_size: u32,

    #[arg(long, default_value = "4")]
    pub rows: usize,

    #[arg(long, default_value = "5")]
    pub cols: usize,

    #[arg(long, default_value = "300", help = "Maximum number of cached thumbnails")]
    pub cache_capacity: usize,

    #[arg(long, default_value = "900", help = "Seconds a thumbnail may stay unused before it is purged")]
    pub cache_max_age: u64,

    #[arg(long, help = "Use fixed 0..1 numeric sliders that always filter")]
    pub unit_sliders: bool,

    #[arg(long, help = "Enable debug output")]
    pub debug: bool,
}

/// Validated runtime settings derived from [`Args`].
#[derive(Debug, Clone, PartialEq)]
pub struct GalleryConfig {
    pub thumbnail_size: u32,
    pub layout: GridLayout,
    pub cache_capacity: usize,
    pub cache_max_age: Duration,
    pub bounds: BoundsMode,
}

impl GalleryConfig {
    pub fn from_args(args: &Args) -> Result<Self> {
        if args.rows == 0 || args.cols == 0 {
            return Err(GalleryError::InvalidConfig(format!(
                "grid must have at least one row and column (got {}x{})",
                args.rows, args.cols
            )));
        }
        if args.thumbnail_size == 0 {
            return Err(GalleryError::InvalidConfig("thumbnail size must be positive".to_owned()));
        }

        Ok(Self {
            thumbnail_size: args.thumbnail_size,
            layout: GridLayout::new(args.rows, args.cols),
            cache_capacity: args.cache_capacity,
            cache_max_age: Duration::from_secs(args.cache_max_age),
            bounds: if args.unit_sliders { BoundsMode::Unit } else { BoundsMode::Data },
        })
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            thumbnail_size: 120,
            layout: GridLayout::new(4, 5),
            cache_capacity: 300,
            cache_max_age: Duration::from_secs(900),
            bounds: BoundsMode::Data,
        }
    }
}

/// Installs `env_logger`; `RUST_LOG` still wins over the default level.
pub fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();
}
