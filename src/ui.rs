use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table},
};

use crate::dataset::display_width;
use crate::domain::ViewerConfig;
use crate::model::{Model, UIData};

pub const FILTER_BAR_HEIGHT: usize = 3;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const STATUSLINE_HEIGHT: usize = 1;
pub const COLUMN_SPACING: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 2;

const SEPARATOR: &str = " │ ";

#[derive(Debug)]
pub struct TableUI {
    max_column_width: usize,
}

impl TableUI {
    pub fn new(cfg: &ViewerConfig) -> Self {
        Self {
            max_column_width: cfg.max_column_width,
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [bar, table, status] = Layout::vertical([
            Constraint::Length(FILTER_BAR_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        self.render_filter_bar(uidata, frame, bar);
        self.render_table(uidata, frame, table);
        self.render_statusline(uidata, frame, status);
        if uidata.show_popup {
            self.render_popup(uidata, frame);
        }
    }

    fn render_filter_bar(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let sheet = match uidata.sheet_position {
            Some((idx, total)) => format!("{} ({idx}/{total})", uidata.name),
            None => "-".to_string(),
        };

        let mut spans: Vec<Span> = vec![
            "Sheet: ".into(),
            Span::styled(sheet, Style::new().yellow()),
            SEPARATOR.into(),
        ];
        spans.push("Search: ".into());
        // Where the search text starts, for placing the terminal cursor.
        let search_offset = Line::from(spans.clone()).width();
        if uidata.active_search {
            spans.push(Span::styled(
                uidata.search.input.clone(),
                Style::new().underlined(),
            ));
        } else if uidata.search.input.is_empty() {
            spans.push("-".dark_gray());
        } else {
            spans.push(Span::styled(
                uidata.search.input.clone(),
                Style::new().green(),
            ));
        }

        let event = uidata
            .event_options
            .get(uidata.selected_event)
            .cloned()
            .unwrap_or_default();
        spans.push(SEPARATOR.into());
        spans.push("Event: ".into());
        spans.push(Span::styled(event, Style::new().cyan()));
        spans.push(SEPARATOR.into());
        spans.push("Only positive: ".into());
        spans.push(if uidata.only_positive { "[x]" } else { "[ ]" }.into());

        let block = Block::bordered().title(Line::from(" rankview ".bold()));
        let inner = block.inner(area);
        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);

        if uidata.active_search {
            let typed: String = uidata
                .search
                .input
                .chars()
                .take(uidata.search.curser_pos)
                .collect();
            let x = inner.x as usize + search_offset + display_width(&typed);
            let x = x.min((inner.x + inner.width).saturating_sub(1) as usize) as u16;
            frame.set_cursor_position((x, inner.y));
        }
    }

    fn render_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.table.is_empty() {
            return;
        }

        let header = Row::new(uidata.table.iter().map(|c| {
            Cell::from(c.name.chars().take(self.max_column_width).collect::<String>())
        }))
        .style(Style::new().add_modifier(Modifier::BOLD | Modifier::UNDERLINED));

        let nrows = uidata.table[0].data.len();
        let rows = (0..nrows).map(|ridx| {
            let cells = uidata.table.iter().enumerate().map(|(cidx, column)| {
                let cell = Cell::from(column.data[ridx].clone());
                if ridx == uidata.selected_row && cidx == uidata.selected_column {
                    cell.style(Style::new().add_modifier(Modifier::REVERSED | Modifier::BOLD))
                } else {
                    cell
                }
            });
            let row = Row::new(cells);
            if ridx == uidata.selected_row {
                row.style(Style::new().add_modifier(Modifier::BOLD))
            } else {
                row
            }
        });

        let widths = uidata
            .table
            .iter()
            .map(|c| Constraint::Length(c.width as u16));

        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(COLUMN_SPACING as u16);
        frame.render_widget(table, area);
    }

    fn render_statusline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let counter = if uidata.nrows == 0 {
            format!("0/{} ", uidata.total_rows)
        } else {
            format!(
                "{}/{} of {} ",
                uidata.abs_selected_row + 1,
                uidata.nrows,
                uidata.total_rows
            )
        };
        let [left, right] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(counter.chars().count() as u16),
        ])
        .areas(area);

        frame.render_widget(Paragraph::new(uidata.status_message.as_str()), left);
        frame.render_widget(
            Paragraph::new(Span::styled(counter, Style::new().blue().bold())),
            right,
        );
    }

    fn render_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let area = popup_area(frame.area(), 60, 60);
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .title_bottom(Line::from(" <Esc> ".blue().bold()).centered());
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(uidata.popup_message.as_str()).block(block),
            area,
        );
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}
