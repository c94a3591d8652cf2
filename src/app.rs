use crate::cache::ThumbnailCache;
use crate::export;
use crate::gallery::{self, GalleryPage, GalleryRenderer, TextureLoader};
use crate::state::{Action, GalleryState, View};
use crate::table::{RowId, Table};
use crate::{GalleryConfig, GalleryError};
use eframe::egui;

const FILTER_PANEL_WIDTH: f32 = 350.0;
const SLIDER_WIDTH: f32 = 120.0;
const CELL_SPACING: f32 = 10.0;

/// Work requested by the widgets during a frame, run after drawing.
#[derive(Debug, Clone, PartialEq)]
enum UiCommand {
    Dispatch(Action),
    SaveMarks,
    SaveAs,
    ExportMarked,
    OpenFullImage,
}

struct FullImage {
    title: String,
    texture: egui::TextureHandle,
}

pub struct GalleryApp {
    pub config: GalleryConfig,
    pub state: GalleryState,
    pub cache: ThumbnailCache<egui::TextureHandle>,
    renderer: GalleryRenderer,
    tab: View,
    main_page: Option<GalleryPage<egui::TextureHandle>>,
    marked_page: Option<GalleryPage<egui::TextureHandle>>,
    dirty_main: bool,
    dirty_marked: bool,
    full_image: Option<FullImage>,
}

impl GalleryApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: GalleryConfig, table: Table) -> Self {
        Self::with_table(config, table)
    }

    pub fn with_table(config: GalleryConfig, table: Table) -> Self {
        let state = GalleryState::new(table, config.layout.page_size(), config.bounds);
        Self {
            cache: ThumbnailCache::new(config.cache_capacity),
            renderer: GalleryRenderer::new(config.layout, config.cache_max_age),
            state,
            config,
            tab: View::Main,
            main_page: None,
            marked_page: None,
            dirty_main: true,
            dirty_marked: true,
            full_image: None,
        }
    }

    fn render_dirty_pages(&mut self, ctx: &egui::Context) {
        let mut loader = TextureLoader::new(ctx, self.config.thumbnail_size);

        if self.dirty_main {
            self.main_page = Some(self.renderer.render(
                self.state.table(),
                self.state.view(View::Main),
                self.state.pager(View::Main),
                &mut self.cache,
                &mut loader,
            ));
            self.dirty_main = false;
        }
        if self.dirty_marked {
            self.marked_page = Some(self.renderer.render(
                self.state.table(),
                self.state.view(View::Marked),
                self.state.pager(View::Marked),
                &mut self.cache,
                &mut loader,
            ));
            self.dirty_marked = false;
        }
    }

    fn run(&mut self, ctx: &egui::Context, command: UiCommand) {
        match command {
            UiCommand::Dispatch(action) => {
                let outcome = self.state.dispatch(action);
                self.dirty_main |= outcome.main;
                self.dirty_marked |= outcome.marked;
            }
            UiCommand::SaveMarks => self.save_marks(),
            UiCommand::SaveAs => self.save_as(),
            UiCommand::ExportMarked => self.export_marked(),
            UiCommand::OpenFullImage => self.open_full_image(ctx),
        }
    }

    fn save_marks(&self) {
        let table = self.state.table();
        let confirmed = rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Warning)
            .set_title("Save marks")
            .set_description(export::confirm_save_message(table))
            .set_buttons(rfd::MessageButtons::YesNo)
            .show();
        if confirmed != rfd::MessageDialogResult::Yes {
            return;
        }

        match export::save_marks(table) {
            Ok(()) => show_info(
                "Success",
                &format!("Marks saved successfully.\n\nMarked files: {}", table.marked_count()),
            ),
            Err(e) => show_error(&format!("Failed to save CSV:\n\n{}", e)),
        }
    }

    fn save_as(&self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV files", &["csv"])
            .set_file_name(self.state.table().name())
            .save_file()
        else {
            return;
        };

        match export::save_as(self.state.table(), &path) {
            Ok(()) => show_info("Saved", &format!("Dataset saved successfully:\n{}", path.display())),
            Err(e) => show_error(&e.to_string()),
        }
    }

    fn export_marked(&self) {
        let table = self.state.table();
        if table.marked_count() == 0 {
            show_info("Export", &GalleryError::NothingMarked.to_string());
            return;
        }

        let Some(path) = rfd::FileDialog::new()
            .add_filter("Text file", &["txt"])
            .set_file_name("marked.txt")
            .save_file()
        else {
            return;
        };

        match export::export_marked(table, &path) {
            Ok(count) => show_info("Export complete", &format!("Exported {} file paths.", count)),
            Err(GalleryError::NothingMarked) => {
                show_info("Export", &GalleryError::NothingMarked.to_string())
            }
            Err(e) => show_error(&e.to_string()),
        }
    }

    fn open_full_image(&mut self, ctx: &egui::Context) {
        let Some(path) = self.state.selection().and_then(|id| self.state.table().path(id)) else {
            return;
        };

        match gallery::decode_image(&path) {
            Ok(img) => {
                let title = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.to_string_lossy().into_owned());
                let texture = ctx.load_texture(
                    format!("full_{}", path.display()),
                    gallery::to_color_image(&img),
                    egui::TextureOptions::default(),
                );
                self.full_image = Some(FullImage { title, texture });
            }
            Err(e) => log::debug!("Cannot open full image {:?}: {}", path, e),
        }
    }

    fn filter_panel(&mut self, ui: &mut egui::Ui, commands: &mut Vec<UiCommand>) {
        ui.strong(self.state.table().name());
        ui.separator();

        egui::ScrollArea::vertical()
            .max_height(ui.available_height() - 200.0)
            .show(ui, |ui| {
                let filters = self.state.filters_mut();
                egui::Grid::new("filters").num_columns(3).striped(true).show(ui, |ui| {
                    ui.label("Dir contains");
                    ui.text_edit_singleline(&mut filters.dir_query);
                    ui.end_row();

                    ui.label("File contains");
                    ui.text_edit_singleline(&mut filters.file_query);
                    ui.end_row();

                    for filter in &mut filters.numeric {
                        let (lo, hi) = filter.extent;
                        ui.label(&filter.name);
                        ui.add_sized(
                            [SLIDER_WIDTH, 18.0],
                            egui::Slider::new(&mut filter.min, lo..=hi).show_value(true),
                        );
                        ui.add_sized(
                            [SLIDER_WIDTH, 18.0],
                            egui::Slider::new(&mut filter.max, lo..=hi).show_value(true),
                        );
                        ui.end_row();
                    }

                    for filter in &mut filters.categorical {
                        ui.label(&filter.name);
                        let selected_text = filter.selected.clone().unwrap_or_else(|| "All".to_owned());
                        egui::ComboBox::from_id_source(("category", filter.column))
                            .selected_text(selected_text)
                            .show_ui(ui, |ui| {
                                ui.selectable_value(&mut filter.selected, None, "All");
                                for option in &filter.options {
                                    ui.selectable_value(
                                        &mut filter.selected,
                                        Some(option.clone()),
                                        option,
                                    );
                                }
                            });
                        ui.end_row();
                    }
                });

                ui.checkbox(&mut filters.hide_marked, "Hide marked files");
            });

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("Apply filters").clicked() {
                commands.push(UiCommand::Dispatch(Action::ApplyFilters));
            }
            if ui.button("Reset").clicked() {
                commands.push(UiCommand::Dispatch(Action::ResetFilters));
            }
        });
        if ui.button("⭐ Mark all filtered").clicked() {
            commands.push(UiCommand::Dispatch(Action::MarkAllFiltered));
        }
        if ui.button("💾 Save marks to CSV").clicked() {
            commands.push(UiCommand::SaveMarks);
        }
        if ui.button("💾 Save as... (CSV)").clicked() {
            commands.push(UiCommand::SaveAs);
        }
        ui.label(self.state.counts_label());
    }

    fn details_panel(&self, ui: &mut egui::Ui, commands: &mut Vec<UiCommand>) {
        ui.heading("Details");
        let details = self.state.details();

        ui.horizontal(|ui| {
            ui.vertical(|ui| match &details {
                Some(details) => {
                    ui.label(format!("Dir: {}", details.dir));
                    ui.label(format!("File: {}", details.file));
                    egui::ScrollArea::horizontal().show(ui, |ui| {
                        egui::Grid::new("details").striped(true).show(ui, |ui| {
                            for (name, _) in &details.attributes {
                                ui.strong(name);
                            }
                            ui.end_row();
                            for (_, value) in &details.attributes {
                                ui.label(value);
                            }
                            ui.end_row();
                        });
                    });
                }
                None => {
                    ui.label("Click a thumbnail to see its metadata.");
                }
            });

            ui.with_layout(egui::Layout::right_to_left(egui::Align::TOP), |ui| {
                ui.vertical(|ui| {
                    let has_selection = details.is_some();
                    if ui
                        .add_enabled(has_selection, egui::Button::new("Open full size"))
                        .clicked()
                    {
                        commands.push(UiCommand::OpenFullImage);
                    }

                    let mark_text = match &details {
                        Some(details) if details.marked => "Unmark",
                        Some(_) => "Mark",
                        None => "Mark / Unmark",
                    };
                    if ui.add_enabled(has_selection, egui::Button::new(mark_text)).clicked() {
                        commands.push(UiCommand::Dispatch(Action::ToggleMark));
                    }

                    let mut same_file = self.state.same_file_mode();
                    if ui.checkbox(&mut same_file, "Show same filename").changed() {
                        commands.push(UiCommand::Dispatch(Action::SetSameFileMode(same_file)));
                    }
                });
            });
        });
    }

    fn gallery_tab(&self, ui: &mut egui::Ui, view: View, commands: &mut Vec<UiCommand>) {
        let page = match view {
            View::Main => self.main_page.as_ref(),
            View::Marked => self.marked_page.as_ref(),
        };

        egui::ScrollArea::both().max_height(ui.available_height() - 40.0).show(ui, |ui| {
            if let Some(page) = page {
                thumbnail_grid(
                    ui,
                    page,
                    self.state.selection(),
                    self.config.thumbnail_size as f32,
                    self.state.table(),
                    commands,
                );
            }
        });

        ui.horizontal(|ui| {
            if ui.button("<< Prev").clicked() {
                commands.push(UiCommand::Dispatch(Action::PrevPage(view)));
            }
            ui.label(self.state.page_label(view));
            if ui.button("Next >>").clicked() {
                commands.push(UiCommand::Dispatch(Action::NextPage(view)));
            }
            if view == View::Marked {
                ui.add_space(20.0);
                if ui.button("Clear marked").clicked() {
                    commands.push(UiCommand::Dispatch(Action::ClearMarked));
                }
                if ui.button("Export marked (.txt)").clicked() {
                    commands.push(UiCommand::ExportMarked);
                }
            }
        });
    }

    fn show_full_image(&mut self, ctx: &egui::Context) {
        let Some(full) = &self.full_image else {
            return;
        };

        let mut close = false;
        let size = full.texture.size_vec2();
        ctx.show_viewport_immediate(
            egui::ViewportId::from_hash_of("full_image"),
            egui::ViewportBuilder::default()
                .with_title(&full.title)
                .with_inner_size([size.x.min(1600.0), size.y.min(1000.0)]),
            |ctx, _class| {
                egui::CentralPanel::default().show(ctx, |ui| {
                    egui::ScrollArea::both().show(ui, |ui| {
                        ui.image(&full.texture);
                    });
                });
                if ctx.input(|i| i.viewport().close_requested()) {
                    close = true;
                }
            },
        );

        if close {
            self.full_image = None;
        }
    }
}

fn thumbnail_grid(
    ui: &mut egui::Ui,
    page: &GalleryPage<egui::TextureHandle>,
    selection: Option<RowId>,
    thumbnail_size: f32,
    table: &Table,
    commands: &mut Vec<UiCommand>,
) {
    egui::Grid::new(("thumbnails", page.page))
        .num_columns(page.layout.cols)
        .spacing([CELL_SPACING, CELL_SPACING])
        .show(ui, |ui| {
            for row in 0..page.rows_used() {
                for col in 0..page.layout.cols {
                    let cell = page.cell(row, col);
                    match cell.and_then(|cell| cell.thumbnail.as_ref().map(|t| (cell.id, t))) {
                        Some((id, texture)) => {
                            let button = egui::ImageButton::new(texture)
                                .frame(true)
                                .selected(selection == Some(id));
                            let response = ui.add(button);
                            if response.clicked() {
                                commands.push(UiCommand::Dispatch(Action::Select(id)));
                            }
                            if let Some(path) = table.path(id) {
                                response.on_hover_text(path.to_string_lossy().into_owned());
                            }
                        }
                        None => {
                            ui.allocate_exact_size(
                                egui::Vec2::splat(thumbnail_size),
                                egui::Sense::hover(),
                            );
                        }
                    }
                }
                ui.end_row();
            }
        });
}

fn show_info(title: &str, message: &str) {
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Info)
        .set_title(title)
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

pub fn show_error(message: &str) {
    log::error!("{}", message);
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("Error")
        .set_description(message)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

impl eframe::App for GalleryApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.render_dirty_pages(ctx);

        let mut commands = Vec::new();

        egui::SidePanel::left("filter_panel")
            .resizable(true)
            .default_width(FILTER_PANEL_WIDTH)
            .show(ctx, |ui| self.filter_panel(ui, &mut commands));

        egui::TopBottomPanel::bottom("details_panel")
            .resizable(true)
            .min_height(120.0)
            .show(ctx, |ui| self.details_panel(ui, &mut commands));

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.tab, View::Main, "Gallery");
                ui.selectable_value(&mut self.tab, View::Marked, "Marked");
            });
            ui.separator();
            let tab = self.tab;
            self.gallery_tab(ui, tab, &mut commands);
        });

        self.show_full_image(ctx);

        for command in commands {
            self.run(ctx, command);
        }
        if self.dirty_main || self.dirty_marked {
            ctx.request_repaint();
        }
    }
}
