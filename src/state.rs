use crate::filter::{same_file_view, BoundsMode, FilterSet, FilteredView};
use crate::paging::Pager;
use crate::table::{RowId, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Main,
    Marked,
}

/// User commands that change the table, the views or the selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ApplyFilters,
    ResetFilters,
    Select(RowId),
    ToggleMark,
    MarkAllFiltered,
    ClearMarked,
    NextPage(View),
    PrevPage(View),
    SetSameFileMode(bool),
}

/// Which grids have to be rebuilt after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    pub main: bool,
    pub marked: bool,
}

impl Outcome {
    pub const NONE: Outcome = Outcome { main: false, marked: false };
    pub const ALL: Outcome = Outcome { main: true, marked: true };

    fn only(view: View) -> Self {
        match view {
            View::Main => Outcome { main: true, marked: false },
            View::Marked => Outcome { main: false, marked: true },
        }
    }

    pub fn any(&self) -> bool {
        self.main || self.marked
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Details {
    pub id: RowId,
    pub dir: String,
    pub file: String,
    pub marked: bool,
    pub attributes: Vec<(String, String)>,
}

/// Owns the table and everything derived from it. Every mutation goes
/// through [`GalleryState::dispatch`], which recomputes the views and clamps
/// both pagers before returning.
#[derive(Debug, Clone)]
pub struct GalleryState {
    table: Table,
    filters: FilterSet,
    filtered: FilteredView,
    marked: FilteredView,
    main_pager: Pager,
    marked_pager: Pager,
    selection: Option<RowId>,
    same_file: Option<String>,
}

impl GalleryState {
    pub fn new(table: Table, page_size: usize, bounds: BoundsMode) -> Self {
        let filters = FilterSet::for_table(&table, bounds);
        let mut state = Self {
            table,
            filters,
            filtered: Vec::new(),
            marked: Vec::new(),
            main_pager: Pager::new(page_size),
            marked_pager: Pager::new(page_size),
            selection: None,
            same_file: None,
        };
        state.refresh(true);
        state
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Edits take effect on the next [`Action::ApplyFilters`].
    pub fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.filters
    }

    pub fn filtered(&self) -> &[RowId] {
        &self.filtered
    }

    pub fn marked_view(&self) -> &[RowId] {
        &self.marked
    }

    pub fn view(&self, view: View) -> &[RowId] {
        match view {
            View::Main => &self.filtered,
            View::Marked => &self.marked,
        }
    }

    pub fn pager(&self, view: View) -> &Pager {
        match view {
            View::Main => &self.main_pager,
            View::Marked => &self.marked_pager,
        }
    }

    pub fn selection(&self) -> Option<RowId> {
        self.selection
    }

    pub fn same_file_mode(&self) -> bool {
        self.same_file.is_some()
    }

    pub fn dispatch(&mut self, action: Action) -> Outcome {
        log::debug!("Dispatching {:?}", action);
        match action {
            Action::ApplyFilters => {
                self.same_file = None;
                self.selection = None;
                self.refresh(true);
                Outcome::ALL
            }
            Action::ResetFilters => {
                self.filters.reset();
                self.dispatch(Action::ApplyFilters)
            }
            Action::Select(id) => {
                if self.table.row(id).is_some() {
                    self.selection = Some(id);
                }
                Outcome::NONE
            }
            Action::ToggleMark => {
                let Some(id) = self.selection else {
                    return Outcome::NONE;
                };
                self.table.toggle_marked(id);
                self.refresh(false);
                Outcome::ALL
            }
            Action::MarkAllFiltered => {
                self.table.mark_all(&self.filtered);
                self.selection = None;
                self.refresh(false);
                Outcome::ALL
            }
            Action::ClearMarked => {
                self.table.clear_marks();
                self.selection = None;
                self.refresh(false);
                Outcome::ALL
            }
            Action::NextPage(view) => {
                let len = self.view(view).len();
                let changed = match view {
                    View::Main => self.main_pager.next(len),
                    View::Marked => self.marked_pager.next(len),
                };
                if changed {
                    Outcome::only(view)
                } else {
                    Outcome::NONE
                }
            }
            Action::PrevPage(view) => {
                let changed = match view {
                    View::Main => self.main_pager.prev(),
                    View::Marked => self.marked_pager.prev(),
                };
                if changed {
                    Outcome::only(view)
                } else {
                    Outcome::NONE
                }
            }
            Action::SetSameFileMode(enabled) => {
                let file = self
                    .selection
                    .and_then(|id| self.table.row(id))
                    .map(|row| row.file.clone());
                match file {
                    Some(file) if enabled => {
                        self.same_file = Some(file);
                        self.refresh(true);
                        Outcome::ALL
                    }
                    _ => self.dispatch(Action::ApplyFilters),
                }
            }
        }
    }

    fn refresh(&mut self, reset_page: bool) {
        self.filtered = match &self.same_file {
            Some(file) => same_file_view(&self.table, file),
            None => self.filters.apply(&self.table),
        };
        self.marked = self.table.marked_ids();

        if reset_page {
            self.main_pager.reset();
        } else {
            self.main_pager.clamp(self.filtered.len());
        }
        self.marked_pager.clamp(self.marked.len());
    }

    pub fn counts_label(&self) -> String {
        format!("Filtered: {} / {}", self.filtered.len(), self.table.len())
    }

    pub fn page_label(&self, view: View) -> String {
        self.pager(view).label(self.view(view).len())
    }

    pub fn details(&self) -> Option<Details> {
        let row = self.table.row(self.selection?)?;
        let schema = self.table.schema();

        let attributes = schema
            .numeric_columns()
            .chain(schema.categorical_columns())
            .map(|(column, name)| {
                let value = row.attributes.get(column).map(|v| v.display()).unwrap_or("");
                (name.to_owned(), value.to_owned())
            })
            .collect();

        Some(Details {
            id: row.id,
            dir: row.dir.clone(),
            file: row.file.clone(),
            marked: row.marked,
            attributes,
        })
    }
}
