use std::mem;

use gridlens_core::format::{classify, display_value, format_value, CellKind};
use gridlens_core::row_height::DisplayMode;
use gridlens_core::selection::CellPosition;
use gridlens_core::state::{GridState, Panel};
use gridlens_core::value::CellValue;
use gridlens_core::virtualizer::{VirtualWindow, Virtualizer};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthChar;

use crate::{ShellView, FOOTER_ACTIONS_LIMIT};

const COLUMN_GAP: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hit {
    Cell(CellPosition),
    Header(usize),
    Chrome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct GridRegions {
    pub header: Rect,
    pub gutter: Rect,
    pub body: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColumnSpan {
    pub position: usize,
    pub x: u16,
    pub width: u16,
    pub truncated: bool,
}

/// On-screen slice of one row; `clip_top` lines are scrolled off above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RowSpan {
    pub position: usize,
    pub y: u16,
    pub height: u16,
    pub clip_top: u16,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct GridLayout {
    pub regions: GridRegions,
    pub columns: Vec<ColumnSpan>,
    pub rows: Vec<RowSpan>,
    pub window: VirtualWindow,
}

impl GridLayout {
    pub(crate) fn hit(&self, x: u16, y: u16) -> Hit {
        let column = self
            .columns
            .iter()
            .find(|span| x >= span.x && x < span.x.saturating_add(span.width));

        if contains(self.regions.header, x, y) {
            return column.map_or(Hit::Chrome, |span| Hit::Header(span.position));
        }
        if !contains(self.regions.body, x, y) {
            return Hit::Chrome;
        }

        let row = self
            .rows
            .iter()
            .find(|span| y >= span.y && y < span.y.saturating_add(span.height));
        match (row, column) {
            (Some(row), Some(column)) => Hit::Cell(CellPosition::new(row.position, column.position)),
            _ => Hit::Chrome,
        }
    }

    pub(crate) fn body_height(&self) -> u16 {
        self.regions.body.height
    }
}

fn contains(area: Rect, x: u16, y: u16) -> bool {
    x >= area.x
        && x < area.x.saturating_add(area.width)
        && y >= area.y
        && y < area.y.saturating_add(area.height)
}

pub(crate) fn screen_chunks(area: Rect) -> [Rect; 3] {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(4),
            Constraint::Length(4),
        ])
        .split(area);
    [chunks[0], chunks[1], chunks[2]]
}

pub(crate) fn grid_regions(area: Rect, row_count: usize) -> GridRegions {
    let [_, grid, _] = screen_chunks(area);
    let inner = Block::default().borders(Borders::ALL).inner(grid);
    let gutter_width = u16::try_from(row_count.max(1).to_string().len())
        .unwrap_or(u16::MAX)
        .saturating_add(1)
        .max(3)
        .min(inner.width);

    let header = Rect::new(inner.x, inner.y, inner.width, inner.height.min(1));
    let rows_y = inner.y.saturating_add(header.height);
    let rows_height = inner.height.saturating_sub(header.height);
    GridRegions {
        header,
        gutter: Rect::new(inner.x, rows_y, gutter_width, rows_height),
        body: Rect::new(
            inner.x.saturating_add(gutter_width),
            rows_y,
            inner.width.saturating_sub(gutter_width),
            rows_height,
        ),
    }
}

pub(crate) fn column_width_cells(state: &GridState, position: usize) -> u16 {
    let width = state
        .view()
        .column(position)
        .map_or(state.metrics().min_column_width, |column| {
            state.widths().width(&column.name)
        });
    let cells = width.round();
    if cells.is_finite() && cells >= 1.0 {
        u16::try_from(cells as u64).unwrap_or(u16::MAX)
    } else {
        1
    }
}

pub(crate) fn column_spans(state: &GridState, first: usize, body: Rect) -> Vec<ColumnSpan> {
    let right = body.x.saturating_add(body.width);
    let mut spans = Vec::new();
    let mut x = body.x;
    for position in first..state.view().visible_column_count() {
        if x >= right {
            break;
        }
        let width = column_width_cells(state, position);
        let visible = width.min(right - x);
        spans.push(ColumnSpan {
            position,
            x,
            width: visible,
            truncated: visible < width,
        });
        x = x.saturating_add(width).saturating_add(COLUMN_GAP);
    }
    spans
}

fn to_cells(value: f64) -> i64 {
    if value.is_finite() {
        value.round() as i64
    } else {
        0
    }
}

pub(crate) fn row_spans(
    virtualizer: &Virtualizer,
    window: &VirtualWindow,
    scroll_offset: f64,
    body: Rect,
) -> Vec<RowSpan> {
    let viewport = i64::from(body.height);
    let mut spans = Vec::with_capacity(window.visible_end.saturating_sub(window.first_visible));
    for position in window.first_visible..window.visible_end {
        let top = to_cells(virtualizer.row_offset(position) - scroll_offset);
        let height = to_cells(virtualizer.row_height(position)).max(1);
        let visible_top = top.max(0);
        let bottom = (top + height).min(viewport);
        if bottom <= visible_top {
            continue;
        }

        let offset = u16::try_from(visible_top).unwrap_or(u16::MAX);
        spans.push(RowSpan {
            position,
            y: body.y.saturating_add(offset),
            height: u16::try_from(bottom - visible_top).unwrap_or(u16::MAX),
            clip_top: u16::try_from(visible_top - top).unwrap_or(u16::MAX),
        });
    }
    spans
}

/// Rendered lines for one cell, mirroring the row height estimate.
pub(crate) fn cell_lines(value: &CellValue, mode: DisplayMode, chars_per_line: usize) -> Vec<String> {
    let chars_per_line = chars_per_line.max(1);
    let logical = if mode.show_line_breaks {
        format_value(value)
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
            .collect::<Vec<_>>()
    } else {
        vec![display_value(value, false)]
    };

    if !mode.wrap_text {
        return logical;
    }

    logical
        .iter()
        .flat_map(|line| wrap_to_width(line, chars_per_line))
        .collect()
}

fn wrap_to_width(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut used = 0;
    for ch in line.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width && !current.is_empty() {
            lines.push(mem::take(&mut current));
            used = 0;
        }
        current.push(ch);
        used += ch_width;
    }
    lines.push(current);
    lines
}

fn kind_style(kind: CellKind) -> Style {
    match kind {
        CellKind::Null => Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
        CellKind::Number => Style::default().fg(Color::Cyan),
        CellKind::Boolean => Style::default().fg(Color::Magenta),
        CellKind::Other => Style::default(),
    }
}

/// Fits `text` into exactly `width` terminal cells.
fn pad_to(text: &str, width: usize, right_align: bool) -> String {
    let mut fitted = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width > width {
            break;
        }
        fitted.push(ch);
        used += ch_width;
    }

    let padding = " ".repeat(width - used);
    if right_align {
        format!("{padding}{fitted}")
    } else {
        format!("{fitted}{padding}")
    }
}

pub(crate) fn render(frame: &mut Frame<'_>, shell: &ShellView<'_>) {
    let [header_area, grid_area, footer_area] = screen_chunks(frame.area());

    render_header(frame, shell, header_area);

    let block = Block::default().borders(Borders::ALL).title("Results");
    match shell.state.panel() {
        Panel::Loading => {
            let loading = Paragraph::new("Loading results...")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(loading, grid_area);
        }
        Panel::Validation(message) => {
            let validation = Paragraph::new(message)
                .style(Style::default().fg(Color::Yellow))
                .wrap(Wrap { trim: false })
                .block(block.title("Validation"));
            frame.render_widget(validation, grid_area);
        }
        Panel::Error(message) => {
            let error = Paragraph::new(message)
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: false })
                .block(block.title("Error"));
            frame.render_widget(error, grid_area);
        }
        Panel::Empty => {
            let empty = Paragraph::new("No results")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(empty, grid_area);
        }
        Panel::Grid => {
            frame.render_widget(block, grid_area);
            render_grid(frame, shell);
        }
    }

    render_footer(frame, shell, footer_area);

    if shell.show_palette {
        render_palette(frame, shell);
    }
    if shell.show_help {
        render_help_popup(frame);
    }
}

fn render_header(frame: &mut Frame<'_>, shell: &ShellView<'_>, area: Rect) {
    let status = shell.state.status();
    let display = shell.state.display();
    let mut counts = format!(
        "Rows: {} of {}",
        status.visible_rows, status.total_rows
    );
    if status.filtered_out > 0 {
        counts.push_str(&format!(" ({} filtered out)", status.filtered_out));
    }
    if status.has_more {
        counts.push_str(&format!(" | {} loaded, more available", status.loaded_rows));
    }

    let sort = shell.state.sort().map_or_else(
        || "none".to_string(),
        |spec| format!("{} {}", spec.column, spec.direction.arrow()),
    );

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", shell.title),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(counts),
        Span::raw(" | "),
        Span::raw(format!("Sort: {sort}")),
        Span::raw(" | "),
        Span::raw(format!(
            "Wrap: {} | Breaks: {}",
            if display.wrap_text { "on" } else { "off" },
            if display.show_line_breaks { "on" } else { "off" }
        )),
        Span::raw(" | "),
        Span::raw(format!("{} ms", status.execution_time_ms)),
    ]))
    .block(Block::default().borders(Borders::ALL).title("gridlens"));
    frame.render_widget(header, area);
}

fn render_grid(frame: &mut Frame<'_>, shell: &ShellView<'_>) {
    let layout = shell.layout;
    let state = shell.state;
    let view = state.view();
    let selection = state.selection();
    let display = state.display();
    let metrics = state.metrics();
    let buffer = frame.buffer_mut();

    let header_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    for span in &layout.columns {
        let Some(column) = view.column(span.position) else {
            continue;
        };
        let mut label = column.name.clone();
        if let Some(spec) = state.sort().filter(|spec| spec.column == column.name) {
            label.push(' ');
            label.push_str(spec.direction.arrow());
        }
        if state.filters().get(&column.name).is_some() {
            label.push('*');
        }
        let style = if span.position == shell.cursor.column {
            header_style.add_modifier(Modifier::UNDERLINED)
        } else {
            header_style
        };
        buffer.set_stringn(
            span.x,
            layout.regions.header.y,
            pad_to(&label, usize::from(span.width), false),
            usize::from(span.width),
            style,
        );
    }

    let gutter = layout.regions.gutter;
    for row in &layout.rows {
        let number = (row.position + 1).to_string();
        buffer.set_stringn(
            gutter.x,
            row.y,
            pad_to(&number, usize::from(gutter.width.saturating_sub(1)), true),
            usize::from(gutter.width),
            Style::default().fg(Color::DarkGray),
        );

        for span in &layout.columns {
            let Some(column) = view.column(span.position) else {
                continue;
            };
            let value = view
                .cell(row.position, span.position)
                .unwrap_or(&CellValue::Undefined);
            let kind = classify(value);
            let cell = CellPosition::new(row.position, span.position);

            let mut style = kind_style(kind);
            if selection.is_some_and(|selection| selection.contains(cell)) {
                style = style.bg(Color::Blue);
            }
            if cell == shell.cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }

            let chars_per_line = metrics.chars_per_line(state.widths().width(&column.name));
            let content_width = usize::from(span.width).min(chars_per_line.saturating_add(1));
            let lines = cell_lines(value, display, chars_per_line);
            for line_index in 0..row.height {
                let text = lines
                    .get(usize::from(row.clip_top + line_index))
                    .map_or("", String::as_str);
                let padded = format!(
                    " {}",
                    pad_to(text, content_width.saturating_sub(1), kind == CellKind::Number)
                );
                buffer.set_stringn(
                    span.x,
                    row.y + line_index,
                    pad_to(&padded, usize::from(span.width), false),
                    usize::from(span.width),
                    style,
                );
            }
        }
    }
}

fn render_footer(frame: &mut Frame<'_>, shell: &ShellView<'_>, area: Rect) {
    let actions_line = if shell.ranked_actions.is_empty() {
        "No available actions in this context".to_string()
    } else {
        shell
            .ranked_actions
            .iter()
            .take(FOOTER_ACTIONS_LIMIT)
            .enumerate()
            .map(|(index, action)| format!("{}:{} ", index + 1, action.title))
            .collect::<Vec<_>>()
            .join("| ")
    };

    let summary_line = match shell.state.aggregate() {
        Some(summary) => {
            let mut line = format!("Count: {}", summary.count);
            if let Some(numeric) = summary.numeric {
                line.push_str(&format!(
                    " | Sum: {} | Avg: {:.4} | Min: {} | Max: {} | Numeric: {}",
                    numeric.sum, numeric.avg, numeric.min, numeric.max, numeric.count
                ));
            }
            line
        }
        None => "No selection".to_string(),
    };

    let status_line = match shell.prompt {
        Some((column, input)) => format!("Filter {column}: {input}_"),
        None => format!("Status: {}", shell.status_line),
    };

    let footer = Paragraph::new(vec![
        Line::from(actions_line),
        Line::from(summary_line),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(status_line),
    );
    frame.render_widget(footer, area);
}

fn render_palette(frame: &mut Frame<'_>, shell: &ShellView<'_>) {
    let area = centered_rect(50, 60, frame.area());
    frame.render_widget(Clear, area);
    let lines = shell
        .palette_actions
        .iter()
        .enumerate()
        .map(|(index, action)| {
            let marker = if index == shell.palette_index { ">" } else { " " };
            Line::from(format!("{marker} {} - {}", action.title, action.description))
        })
        .collect::<Vec<_>>();
    let palette = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Actions (Enter to run, Esc to close)"),
    );
    frame.render_widget(palette, area);
}

fn render_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("Grid keymap"),
        Line::from("q: quit    ?: toggle help    Ctrl+P: action palette"),
        Line::from("Arrows or hjkl: move    Shift+arrows or HJKL: extend selection"),
        Line::from("PageUp/PageDown: page    mouse drag: select    header click: sort"),
        Line::from("s: cycle sort    /: filter column    Esc: clear selection"),
        Line::from("w: wrap text    b: show line breaks"),
        Line::from("+/-: resize column    =: auto-fit    x: hide    a: show all"),
        Line::from("y or Ctrl+C: copy    m: load more"),
        Line::from("1..7: invoke ranked action slot"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}
