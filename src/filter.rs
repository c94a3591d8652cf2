use crate::table::{Row, RowId, Table, Value};

/// Row ids that passed the active predicates, in table order.
pub type FilteredView = Vec<RowId>;

static MISSING: Value = Value::Missing;

/// How numeric slider bounds are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsMode {
    /// Sliders span each column's data range and start out inactive.
    #[default]
    Data,
    /// Fixed `0..=1` sliders that always filter, even at full extent.
    /// Values outside `[0, 1]` are hidden until the sliders move.
    Unit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumericFilter {
    pub column: usize,
    pub name: String,
    pub extent: (f64, f64),
    pub min: f64,
    pub max: f64,
    pub always_enforced: bool,
}

impl NumericFilter {
    pub fn is_active(&self) -> bool {
        // At full extent a data-range slider is a no-op, so missing values stay visible
        self.always_enforced || self.min > self.extent.0 || self.max < self.extent.1
    }

    pub fn accepts(&self, value: &Value) -> bool {
        if !self.is_active() {
            return true;
        }
        // Inclusive bounds; a missing value never passes an active filter
        match value.as_number() {
            Some(number) => self.min <= number && number <= self.max,
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.min = self.extent.0;
        self.max = self.extent.1;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryFilter {
    pub column: usize,
    pub name: String,
    pub options: Vec<String>,
    /// `None` is the "All" choice.
    pub selected: Option<String>,
}

impl CategoryFilter {
    pub fn accepts(&self, value: &Value) -> bool {
        match &self.selected {
            None => true,
            Some(selected) => value.as_text() == Some(selected.as_str()),
        }
    }
}

// Editing fields has no effect until apply runs again
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSet {
    pub dir_query: String,
    pub file_query: String,
    pub numeric: Vec<NumericFilter>,
    pub categorical: Vec<CategoryFilter>,
    pub hide_marked: bool,
}

impl FilterSet {
    pub fn for_table(table: &Table, mode: BoundsMode) -> Self {
        let schema = table.schema();

        let numeric = schema
            .numeric_columns()
            .map(|(column, name)| {
                let extent = match mode {
                    BoundsMode::Unit => (0.0, 1.0),
                    // All-missing column has no range, collapse the slider to zero
                    BoundsMode::Data => table.numeric_range(column).unwrap_or((0.0, 0.0)),
                };
                NumericFilter {
                    column,
                    name: name.to_owned(),
                    extent,
                    min: extent.0,
                    max: extent.1,
                    always_enforced: mode == BoundsMode::Unit,
                }
            })
            .collect();

        let categorical = schema
            .categorical_columns()
            .map(|(column, name)| CategoryFilter {
                column,
                name: name.to_owned(),
                options: table.categories(column),
                selected: None,
            })
            .collect();

        Self {
            dir_query: String::new(),
            file_query: String::new(),
            numeric,
            categorical,
            hide_marked: false,
        }
    }

    pub fn reset(&mut self) {
        self.dir_query.clear();
        self.file_query.clear();
        self.numeric.iter_mut().for_each(NumericFilter::reset);
        for filter in &mut self.categorical {
            filter.selected = None;
        }
        self.hide_marked = false;
    }

    pub fn matches(&self, row: &Row) -> bool {
        // Cheapest checks first: mark flag, then the two substring queries
        if self.hide_marked && row.marked {
            return false;
        }
        if !contains_ignore_case(&row.dir, &self.dir_query)
            || !contains_ignore_case(&row.file, &self.file_query)
        {
            return false;
        }

        // Every numeric and categorical filter must accept (logical AND)
        let value_of = |column: usize| row.attributes.get(column).unwrap_or(&MISSING);
        self.numeric.iter().all(|filter| filter.accepts(value_of(filter.column)))
            && self.categorical.iter().all(|filter| filter.accepts(value_of(filter.column)))
    }

    pub fn apply(&self, table: &Table) -> FilteredView {
        let view: FilteredView = table
            .rows()
            .iter()
            .filter(|row| self.matches(row))
            .map(|row| row.id)
            .collect();
        log::debug!("Filter matched {} of {} rows", view.len(), table.len());
        view
    }
}

/// Rows sharing exactly the given file name, in table order.
pub fn same_file_view(table: &Table, file: &str) -> FilteredView {
    table
        .rows()
        .iter()
        .filter(|row| row.file == file)
        .map(|row| row.id)
        .collect()
}

fn contains_ignore_case(haystack: &str, query: &str) -> bool {
    // Blank query matches everything
    let query = query.trim();
    query.is_empty() || haystack.to_lowercase().contains(&query.to_lowercase())
}
