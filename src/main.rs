use clap::Parser;
use std::path::PathBuf;
use table_gallery::{app, init_logging, Args, GalleryApp, GalleryConfig, GalleryError, Table};

const DEFAULT_WINDOW_WIDTH: f32 = 1400.0;
const DEFAULT_WINDOW_HEIGHT: f32 = 850.0;

fn pick_table() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Select dataframe")
        .add_filter("CSV", &["csv"])
        .add_filter("All files", &["*"])
        .pick_file()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let config = GalleryConfig::from_args(&args)?;

    let Some(table_path) = args.table.clone().or_else(pick_table) else {
        app::show_error(&GalleryError::NoTableSelected.to_string());
        return Err(GalleryError::NoTableSelected.into());
    };

    let table = match Table::load(&table_path) {
        Ok(table) => table,
        Err(e) => {
            app::show_error(&e.to_string());
            return Err(e.into());
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT])
            .with_title("Table Gallery"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Table Gallery",
        options,
        Box::new(|cc| Ok(Box::new(GalleryApp::new(cc, config, table)) as Box<dyn eframe::App>)),
    );

    match result {
        Ok(_) => Ok(()),
        Err(e) => Err(anyhow::anyhow!("Failed to run application: {:?}", e)),
    }
}
