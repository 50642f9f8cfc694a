use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::sync::mpsc::Sender;
use std::time::Instant;
use tracing::{error, info, trace, warn};

use crate::dataset::{Dataset, display_width};
use crate::domain::{
    HELP_TEXT, Message, NO_FILTER_LABEL, SheetResponse, ViewerConfig, ViewerError,
};
use crate::filter::{FilterState, matching_rows};
use crate::inputter::{InputResult, Inputter};
use crate::loader::{LoadToken, Manifest, SheetLoader};
use crate::ui::{
    COLUMN_SPACING, COLUMN_WIDTH_MARGIN, FILTER_BAR_HEIGHT, STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT,
};

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Status {
    EMPTY,
    LOADING,
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    SEARCH,
}

#[derive(Clone, Debug)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

// Mapping of the filtered rows onto the screen.
struct TableView {
    rows: Vec<usize>, // Data index of every row passing the filter, in sheet order
    visible_columns: Vec<usize>,
    curser_row: usize,
    curser_column: usize,
    offset_row: usize,
    offset_column: usize,
    data: Vec<ColumnView>,
    height: usize,
    width: usize,
}

impl TableView {
    fn empty() -> Self {
        TableView {
            rows: Vec::new(),
            visible_columns: Vec::new(),
            curser_row: 0,
            curser_column: 0,
            offset_row: 0,
            offset_column: 0,
            data: Vec::new(),
            height: 0,
            width: 0,
        }
    }

    fn abs_row(&self) -> usize {
        self.offset_row + self.curser_row
    }

    fn abs_column(&self) -> usize {
        self.offset_column + self.curser_column
    }

    // Move the curser to a row of the filtered table, scrolling as needed.
    fn select_row(&mut self, row: usize) {
        if self.rows.is_empty() {
            self.curser_row = 0;
            self.offset_row = 0;
            return;
        }
        let row = row.min(self.rows.len() - 1);
        let height = self.height.max(1);
        if row < self.offset_row {
            self.offset_row = row;
        } else if row >= self.offset_row + height {
            self.offset_row = row + 1 - height;
        }
        self.curser_row = row - self.offset_row;
    }
}

#[derive(Default, Clone, Debug)]
pub struct UILayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
}

impl UILayout {
    pub fn from_values(ui_width: usize, ui_height: usize) -> Self {
        let table_height = ui_height
            .saturating_sub(FILTER_BAR_HEIGHT)
            .saturating_sub(TABLE_HEADER_HEIGHT)
            .saturating_sub(STATUSLINE_HEIGHT);

        let layout = UILayout {
            width: ui_width,
            height: ui_height,
            table_width: ui_width,
            table_height,
        };
        trace!("Build UILayout: {:?}", layout);
        layout
    }
}

// Everything the ui needs to draw one frame.
pub struct UIData {
    pub name: String,
    pub sheet_position: Option<(usize, usize)>,
    pub table: Vec<ColumnView>,
    pub nrows: usize,
    pub total_rows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub search: InputResult,
    pub active_search: bool,
    pub event_options: Vec<String>,
    pub selected_event: usize,
    pub only_positive: bool,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UILayout,
    pub status_message: String,
    pub last_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            sheet_position: None,
            table: Vec::new(),
            nrows: 0,
            total_rows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            search: InputResult::default(),
            active_search: false,
            event_options: vec![NO_FILTER_LABEL.to_string()],
            selected_event: 0,
            only_positive: false,
            show_popup: false,
            popup_message: String::new(),
            layout: UILayout::default(),
            status_message: String::new(),
            last_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: ViewerConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    sheets: Vec<String>,
    current_sheet: Option<usize>,
    dataset: Dataset,
    filter: FilterState,
    table: TableView,
    loader: SheetLoader,
    latest_token: Option<LoadToken>,
    uilayout: UILayout,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    last_input: InputResult,
    status_message: String,
}

impl Model {
    /// Create the model and start loading the manifest of `config.data_dir`.
    pub fn init(
        config: &ViewerConfig,
        tx: Sender<Message>,
        ui_width: usize,
        ui_height: usize,
    ) -> Result<Self, ViewerError> {
        let mut model = Self {
            config: config.clone(),
            status: Status::LOADING,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            sheets: Vec::new(),
            current_sheet: None,
            dataset: Dataset::empty(),
            filter: FilterState::default(),
            table: TableView::empty(),
            loader: SheetLoader::new(config.data_dir.clone(), tx),
            latest_token: None,
            uilayout: UILayout::from_values(ui_width, ui_height),
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            last_input: InputResult::default(),
            status_message: String::new(),
        };
        model.update_table_data();
        model.set_status_message("Loading sheet list...");
        info!("Reading sheets from {}", model.loader.data_dir().display());
        model.loader.request_manifest()?;
        Ok(model)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn sheets(&self) -> &[String] {
        &self.sheets
    }

    /// Data indices of the rows currently shown.
    pub fn visible_rows(&self) -> &[usize] {
        &self.table.rows
    }

    /// Options of the event selector. `None` is the "no filter" entry.
    pub fn event_options(&self) -> Vec<Option<String>> {
        std::iter::once(None)
            .chain(self.dataset.event_columns().into_iter().map(Some))
            .collect()
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::SEARCH
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), ViewerError> {
        let Some(msg) = message else {
            return Ok(());
        };

        // Messages that do not depend on what the user is looking at.
        let msg = match msg {
            Message::ManifestLoaded(result) => return self.manifest_loaded(result),
            Message::SheetLoaded(response) => {
                self.sheet_loaded(response);
                return Ok(());
            }
            Message::Resize(width, height) => {
                self.ui_resize(width, height);
                return Ok(());
            }
            msg => msg,
        };

        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::Help => self.show_help(),
                Message::Exit => self.clear_search(),
                Message::Search => self.enter_search_mode(),
                Message::MoveDown => self.move_table_selection_down(1),
                Message::MoveUp => self.move_table_selection_up(1),
                Message::MoveLeft => self.move_table_selection_left(),
                Message::MoveRight => self.move_table_selection_right(),
                Message::MovePageDown => self.move_table_selection_down(self.table.height.max(1)),
                Message::MovePageUp => self.move_table_selection_up(self.table.height.max(1)),
                Message::MoveBeginning => self.move_table_selection_beginning(),
                Message::MoveEnd => self.move_table_selection_end(),
                Message::NextSheet => self.step_sheet(1)?,
                Message::PreviousSheet => self.step_sheet(-1)?,
                Message::Reload => self.reload()?,
                Message::NextEventFilter => self.step_event_filter(1),
                Message::PreviousEventFilter => self.step_event_filter(-1),
                Message::ToggleOnlyPositive => self.toggle_only_positive(),
                Message::CopyCell => self.copy_table_cell(),
                Message::CopyRow => self.copy_table_row(),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help | Message::Enter => self.close_popup(),
                _ => (),
            },
            Modus::SEARCH => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
        }
        Ok(())
    }

    // -------------------- Loading ---------------------- //

    fn manifest_loaded(&mut self, result: Result<Manifest, ViewerError>) -> Result<(), ViewerError> {
        let manifest = match result {
            Ok(manifest) => manifest,
            Err(e) => {
                error!("Loading manifest failed: {e}");
                self.status = Status::EMPTY;
                self.set_status_message(format!("Error: {e}"));
                return Ok(());
            }
        };

        self.sheets = manifest.sheets;
        if self.sheets.is_empty() {
            self.status = Status::EMPTY;
            self.set_status_message(format!("Error: {}", ViewerError::NoSheets));
            return Ok(());
        }

        let initial = match &self.config.initial_sheet {
            Some(name) => self.sheets.iter().position(|s| s == name).unwrap_or_else(|| {
                warn!("Sheet {name} is not in the manifest, showing the first sheet");
                0
            }),
            None => 0,
        };
        self.load_sheet(initial)
    }

    fn load_sheet(&mut self, idx: usize) -> Result<(), ViewerError> {
        let Some(name) = self.sheets.get(idx).cloned() else {
            return Ok(());
        };
        let token = self.loader.request_sheet(&name)?;
        self.latest_token = Some(token);
        self.current_sheet = Some(idx);

        // Nothing of the previous sheet stays on screen while loading.
        self.dataset = Dataset::empty();
        self.table.rows.clear();
        self.reset_curser();
        self.status = Status::LOADING;
        self.update_table_data();
        self.set_status_message(format!("Loading {name}..."));
        Ok(())
    }

    fn sheet_loaded(&mut self, response: SheetResponse) {
        if self.latest_token != Some(response.token) {
            trace!(
                "Dropping response for {} with {:?}, waiting for {:?}",
                response.sheet, response.token, self.latest_token
            );
            return;
        }

        match response.result {
            Ok(dataset) => {
                let nrows = dataset.len();
                self.filter.retain_event_column(&dataset.columns);
                self.dataset = dataset;
                self.status = Status::READY;
                self.reset_curser();
                self.apply_filters();
                self.set_status_message(format!(
                    "Loaded: {} ({} rows)",
                    response.sheet,
                    group_thousands(nrows)
                ));
            }
            Err(e) => {
                warn!("Loading {} failed: {e}", response.sheet);
                self.status = Status::EMPTY;
                self.set_status_message(format!("Error: {e}"));
            }
        }
    }

    fn step_sheet(&mut self, step: isize) -> Result<(), ViewerError> {
        if self.sheets.is_empty() {
            return Ok(());
        }
        let len = self.sheets.len() as isize;
        let current = self.current_sheet.unwrap_or(0) as isize;
        self.load_sheet((current + step).rem_euclid(len) as usize)
    }

    fn reload(&mut self) -> Result<(), ViewerError> {
        match self.current_sheet {
            Some(idx) => self.load_sheet(idx),
            None => {
                self.set_status_message("Loading sheet list...");
                self.loader.request_manifest()
            }
        }
    }

    // -------------------- Filtering ---------------------- //

    // Recompute the visible rows from the full dataset.
    fn apply_filters(&mut self) {
        let start_time = Instant::now();
        self.table.rows = matching_rows(&self.dataset.records, &self.dataset.columns, &self.filter);
        trace!(
            "Filter {:?} kept {}/{} rows in {}ms",
            self.filter,
            self.table.rows.len(),
            self.dataset.len(),
            start_time.elapsed().as_millis()
        );
        let abs_row = self.table.abs_row();
        self.table.select_row(abs_row);
        self.update_table_data();
    }

    fn filters_changed(&mut self) {
        self.apply_filters();
        if self.status == Status::READY {
            self.set_status_message(format!(
                "Showing {} of {} rows",
                group_thousands(self.table.rows.len()),
                group_thousands(self.dataset.len())
            ));
        }
    }

    fn step_event_filter(&mut self, step: isize) {
        // The options of the next sheet are unknown until it is loaded.
        if self.status != Status::READY {
            return;
        }
        let options = self.event_options();
        let len = options.len() as isize;
        let current = options
            .iter()
            .position(|o| o.as_deref() == self.filter.event_column())
            .unwrap_or(0) as isize;
        self.filter.event_column = options[(current + step).rem_euclid(len) as usize].clone();
        self.filters_changed();
    }

    fn toggle_only_positive(&mut self) {
        self.filter.only_positive = !self.filter.only_positive;
        self.filters_changed();
    }

    fn clear_search(&mut self) {
        if !self.filter.search.is_empty() {
            self.filter.search.clear();
            self.filters_changed();
        }
    }

    fn enter_search_mode(&mut self) {
        trace!("Entering search mode ...");
        self.previous_modus = self.modus;
        self.modus = Modus::SEARCH;
        self.input.set(&self.filter.search);
        self.last_input = self.input.get();
        self.update_uidata();
    }

    // Every keystroke refilters the table.
    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.input != self.filter.search {
            self.filter.search = self.last_input.input.clone();
            self.filters_changed();
        }
        if self.last_input.finished {
            trace!("Search finished with {:?}", self.last_input.input);
            self.modus = self.previous_modus;
            self.previous_modus = Modus::SEARCH;
        }
        self.update_uidata();
    }

    // -------------------- Popup ---------------------- //

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.update_uidata();
    }

    fn close_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.update_uidata();
    }

    // -------------------- View ---------------------- //

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout = UILayout::from_values(width, height);
        let abs_row = self.table.abs_row();
        self.table.height = self.uilayout.table_height;
        self.table.select_row(abs_row);
        self.update_table_data();
    }

    fn reset_curser(&mut self) {
        self.table.curser_row = 0;
        self.table.curser_column = 0;
        self.table.offset_row = 0;
        self.table.offset_column = 0;
    }

    fn render_width(&self, column: usize) -> usize {
        let c = &self.dataset.cells[column];
        let width = display_width(&c.name).max(c.max_width) + COLUMN_WIDTH_MARGIN;
        width.min(self.config.max_column_width)
    }

    fn update_table_data(&mut self) {
        self.table.width = self.uilayout.table_width;
        self.table.height = self.uilayout.table_height;

        let ncolumns = self.dataset.cells.len();
        self.table.offset_column = self.table.offset_column.min(ncolumns.saturating_sub(1));

        // Columns that fit on screen, the last one may be cut.
        let mut visible_columns = Vec::new();
        let mut widths = Vec::new();
        let mut visible_width = 0;
        for cidx in self.table.offset_column..ncolumns {
            if visible_width >= self.table.width {
                break;
            }
            let width = self
                .render_width(cidx)
                .min(self.table.width - visible_width);
            visible_columns.push(cidx);
            widths.push(width);
            visible_width += width + COLUMN_SPACING;
        }
        self.table.curser_column = self
            .table
            .curser_column
            .min(visible_columns.len().saturating_sub(1));

        let rbegin = self.table.offset_row.min(self.table.rows.len());
        let rend = (rbegin + self.table.height).min(self.table.rows.len());

        self.table.data = visible_columns
            .iter()
            .zip(widths)
            .map(|(&cidx, width)| ColumnView {
                name: self.dataset.columns[cidx].clone(),
                width,
                data: self.table.rows[rbegin..rend]
                    .iter()
                    .map(|&ridx| self.dataset.cell(ridx, cidx).to_string())
                    .collect(),
            })
            .collect();
        self.table.visible_columns = visible_columns;

        self.update_uidata();
    }

    fn update_uidata(&mut self) {
        let event_options: Vec<String> = self
            .event_options()
            .into_iter()
            .map(|o| o.unwrap_or_else(|| NO_FILTER_LABEL.to_string()))
            .collect();
        let selected_event = self
            .filter
            .event_column()
            .and_then(|e| event_options.iter().position(|o| o == e))
            .unwrap_or(0);

        self.uidata = UIData {
            name: self
                .current_sheet
                .and_then(|idx| self.sheets.get(idx).cloned())
                .unwrap_or_default(),
            sheet_position: self.current_sheet.map(|idx| (idx + 1, self.sheets.len())),
            table: self.table.data.clone(),
            nrows: self.table.rows.len(),
            total_rows: self.dataset.len(),
            selected_row: self.table.curser_row,
            selected_column: self.table.curser_column,
            abs_selected_row: self.table.abs_row(),
            search: if self.modus == Modus::SEARCH {
                self.last_input.clone()
            } else {
                InputResult {
                    input: self.filter.search.clone(),
                    ..Default::default()
                }
            },
            active_search: self.modus == Modus::SEARCH,
            event_options,
            selected_event,
            only_positive: self.filter.only_positive,
            show_popup: self.modus == Modus::POPUP,
            popup_message: HELP_TEXT.to_string(),
            layout: self.uilayout.clone(),
            status_message: self.status_message.clone(),
            last_update: Instant::now(),
        };
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        info!("Status: {}", self.status_message);
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_update = Instant::now();
    }

    // -------------------- Clipboard ---------------------- //

    fn current_data_row(&self) -> Option<usize> {
        self.table.rows.get(self.table.abs_row()).copied()
    }

    fn set_clipboard(&mut self, content: String) -> Result<(), ViewerError> {
        if self.clipboard.is_none() {
            let clipboard = Clipboard::new().map_err(|e| ViewerError::Clipboard(e.to_string()))?;
            self.clipboard = Some(clipboard);
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            clipboard
                .set_text(content)
                .map_err(|e| ViewerError::Clipboard(e.to_string()))?;
        }
        Ok(())
    }

    fn copy(&mut self, what: &str, content: String) {
        trace!("Copy {what}: {content}");
        match self.set_clipboard(content) {
            Ok(_) => self.set_status_message(format!("Copied {what} to clipboard.")),
            Err(e) => {
                warn!("Error copying to clipboard: {e}");
                self.set_status_message(format!("Error: {e}"));
            }
        }
    }

    fn copy_table_cell(&mut self) {
        if let Some(row) = self.current_data_row() {
            let cell = self.dataset.cell(row, self.table.abs_column()).to_string();
            self.copy("cell", cell);
        }
    }

    fn copy_table_row(&mut self) {
        if let Some(row) = self.current_data_row() {
            let content = self
                .dataset
                .formatted_row(row)
                .iter()
                .map(|c| wrap_cell_content(c))
                .collect::<Vec<String>>()
                .join(",");
            self.copy("row", content);
        }
    }

    // -------------------- Movement ---------------------- //

    fn move_table_selection_beginning(&mut self) {
        self.table.select_row(0);
        self.update_table_data();
    }

    fn move_table_selection_end(&mut self) {
        self.table.select_row(self.table.rows.len().saturating_sub(1));
        self.update_table_data();
    }

    fn move_table_selection_up(&mut self, size: usize) {
        let row = self.table.abs_row().saturating_sub(size);
        self.table.select_row(row);
        self.update_table_data();
    }

    fn move_table_selection_down(&mut self, size: usize) {
        let row = self.table.abs_row() + size;
        self.table.select_row(row);
        self.update_table_data();
    }

    fn move_table_selection_left(&mut self) {
        let table = &mut self.table;
        if table.curser_column > 0 {
            table.curser_column -= 1;
        } else if table.offset_column > 0 {
            table.offset_column -= 1;
        }
        self.update_table_data();
    }

    fn move_table_selection_right(&mut self) {
        let ncolumns = self.dataset.cells.len();
        let table = &mut self.table;
        if table.abs_column() + 1 < ncolumns {
            if table.curser_column + 1 < table.visible_columns.len() {
                table.curser_column += 1;
            } else {
                // At the end of the screen
                table.offset_column += 1;
            }
            self.update_table_data();
        }
    }
}

// Quote a cell for a CSV line.
fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping || needs_escaping {
        out = format!("\"{out}\"");
    }
    out
}

/// `1234567` → `1,234,567`
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
