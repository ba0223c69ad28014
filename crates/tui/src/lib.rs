mod clipboard;
mod render;

use std::io::{self, Stdout};
use std::mem;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use gridlens_adapters::export::write_export;
use gridlens_core::actions::{
    apply_invocation, ActionContext, ActionDefinition, ActionId, ActionInvocation, ActionsEngine,
    CopyScope, RankedAction,
};
use gridlens_core::export::{copy_all, default_file_name, ExportFormat};
use gridlens_core::filter::{ColumnFilter, TypeFamily};
use gridlens_core::selection::{CellPosition, CellSelection, ClickTarget};
use gridlens_core::source::{ResultLoader, ResultSource};
use gridlens_core::virtualizer::{ViewportMetrics, Virtualizer};
use gridlens_core::{GridConfig, GridSignal, GridState};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tracing::{info, warn};

use crate::render::{column_spans, grid_regions, row_spans, GridLayout, Hit};

const TICK_RATE: Duration = Duration::from_millis(120);
pub(crate) const FOOTER_ACTIONS_LIMIT: usize = 7;
const SCROLL_STEP: i32 = 3;
const RESIZE_STEP: i16 = 4;

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),
}

#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub config: GridConfig,
    pub page_size: usize,
    pub export_dir: PathBuf,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectionKey {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MouseInput {
    Press { x: u16, y: u16, extend: bool },
    Drag { x: u16, y: u16 },
    Release { x: u16, y: u16 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    ToggleHelp,
    TogglePalette,
    Escape,
    Submit,
    Move(DirectionKey),
    Extend(DirectionKey),
    Page(DirectionKey),
    CycleSort,
    OpenFilterPrompt,
    PromptInput(char),
    PromptBackspace,
    ResizeColumn(i16),
    HideColumn,
    Copy,
    Invoke(ActionId),
    InvokeActionSlot(usize),
    Mouse(MouseInput),
    Scroll(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FilterPrompt {
    column: String,
    input: String,
}

/// Borrowed snapshot handed to the renderer.
pub(crate) struct ShellView<'a> {
    pub state: &'a GridState,
    pub layout: &'a GridLayout,
    pub cursor: CellPosition,
    pub title: &'a str,
    pub status_line: &'a str,
    pub prompt: Option<(&'a str, &'a str)>,
    pub ranked_actions: Vec<RankedAction>,
    pub palette_actions: Vec<ActionDefinition>,
    pub palette_index: usize,
    pub show_palette: bool,
    pub show_help: bool,
}

struct TuiApp<S: ResultSource> {
    state: GridState,
    loader: ResultLoader<S>,
    runtime: Runtime,
    actions: ActionsEngine,
    virtualizer: Virtualizer,
    layout: GridLayout,
    scroll_offset: f64,
    follow_cursor: bool,
    column_offset: usize,
    cursor: CellPosition,
    prompt: Option<FilterPrompt>,
    show_help: bool,
    show_palette: bool,
    palette_index: usize,
    should_quit: bool,
    status_line: String,
    pending_clipboard: Option<String>,
    export_dir: PathBuf,
    title: String,
}

impl<S: ResultSource> TuiApp<S> {
    fn new(source: S, options: ShellOptions) -> Result<Self, TuiError> {
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(TuiError::Runtime)?;

        Ok(Self {
            state: GridState::new(options.config),
            loader: ResultLoader::new(source, options.page_size),
            runtime,
            actions: ActionsEngine::new(),
            virtualizer: Virtualizer::new(),
            layout: GridLayout::default(),
            scroll_offset: 0.0,
            follow_cursor: true,
            column_offset: 0,
            cursor: CellPosition::default(),
            prompt: None,
            show_help: false,
            show_palette: false,
            palette_index: 0,
            should_quit: false,
            status_line: "Loading results...".to_string(),
            pending_clipboard: None,
            export_dir: options.export_dir,
            title: options.title,
        })
    }

    fn load(&mut self) {
        let state = mem::take(&mut self.state);
        self.state = self.runtime.block_on(self.loader.load(state));
        self.cursor = CellPosition::default();
        self.scroll_offset = 0.0;
        self.column_offset = 0;

        let status = self.state.status();
        self.status_line = match self.state.signal() {
            Some(GridSignal::Validation(message) | GridSignal::Error(message)) => {
                format!("Load failed: {message}")
            }
            None => format!(
                "Loaded {} rows in {} ms",
                status.loaded_rows, status.execution_time_ms
            ),
        };
    }

    fn update(&mut self, transition: impl FnOnce(GridState) -> GridState) {
        let state = mem::take(&mut self.state);
        self.state = transition(state);
        self.clamp_cursor();
    }

    fn clamp_cursor(&mut self) {
        let view = self.state.view();
        self.cursor.row = self
            .cursor
            .row
            .min(view.visible_row_count().saturating_sub(1));
        self.cursor.column = self
            .cursor
            .column
            .min(view.visible_column_count().saturating_sub(1));
        self.column_offset = self.column_offset.min(self.cursor.column);
    }

    fn key_message(&self, key: KeyEvent) -> Option<Msg> {
        if self.prompt.is_some() {
            map_prompt_key(key)
        } else if self.show_palette {
            map_palette_key(key)
        } else {
            map_key_event(key)
        }
    }

    fn handle(&mut self, msg: Msg) {
        if self.prompt.is_some() {
            self.handle_prompt(msg);
            return;
        }
        if self.show_palette {
            self.handle_palette(msg);
            return;
        }

        match msg {
            Msg::Quit => self.should_quit = true,
            Msg::ToggleHelp => self.show_help = !self.show_help,
            Msg::TogglePalette => {
                self.show_palette = true;
                self.palette_index = 0;
            }
            Msg::Escape => {
                if self.show_help {
                    self.show_help = false;
                } else {
                    self.update(GridState::clear_selection);
                    self.status_line = "Selection cleared".to_string();
                }
            }
            Msg::Submit => {}
            Msg::Move(direction) => self.move_cursor(direction, 1, false),
            Msg::Extend(direction) => self.move_cursor(direction, 1, true),
            Msg::Page(direction) => {
                let step = self.layout.rows.len().max(1);
                self.move_cursor(direction, step, false);
            }
            Msg::CycleSort => self.cycle_sort(self.cursor.column),
            Msg::OpenFilterPrompt => self.open_filter_prompt(),
            Msg::PromptInput(_) | Msg::PromptBackspace => {}
            Msg::ResizeColumn(delta) => self.resize_column(delta),
            Msg::HideColumn => self.hide_column(),
            Msg::Copy => {
                let action = if self.state.selection().is_some() {
                    ActionId::CopySelection
                } else {
                    ActionId::CopyAll
                };
                self.invoke(action);
            }
            Msg::Invoke(action_id) => self.invoke(action_id),
            Msg::InvokeActionSlot(index) => self.invoke_ranked_action(index),
            Msg::Mouse(input) => self.handle_mouse(input),
            Msg::Scroll(delta) => {
                self.follow_cursor = false;
                self.scroll_offset +=
                    f64::from(delta) * f64::from(self.state.metrics().row_height);
            }
        }
    }

    fn handle_prompt(&mut self, msg: Msg) {
        match msg {
            Msg::PromptInput(character) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.input.push(character);
                }
            }
            Msg::PromptBackspace => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.input.pop();
                }
            }
            Msg::Submit => self.submit_filter(),
            Msg::Escape => {
                self.prompt = None;
                self.status_line = "Filter cancelled".to_string();
            }
            _ => {}
        }
    }

    fn handle_palette(&mut self, msg: Msg) {
        let actions = self
            .actions
            .registry()
            .enabled_actions(&self.action_context());
        match msg {
            Msg::Move(DirectionKey::Up) => {
                self.palette_index = self.palette_index.saturating_sub(1);
            }
            Msg::Move(DirectionKey::Down) => {
                if self.palette_index + 1 < actions.len() {
                    self.palette_index += 1;
                }
            }
            Msg::Submit => {
                self.show_palette = false;
                if let Some(action) = actions.get(self.palette_index) {
                    self.invoke(action.id);
                }
            }
            Msg::Escape | Msg::TogglePalette => self.show_palette = false,
            _ => {}
        }
    }

    fn handle_mouse(&mut self, input: MouseInput) {
        match input {
            MouseInput::Press { x, y, extend } => match self.layout.hit(x, y) {
                Hit::Cell(cell) => {
                    self.cursor = cell;
                    self.follow_cursor = true;
                    self.update(|state| state.mouse_down(cell, extend));
                }
                Hit::Header(position) => self.cycle_sort(position),
                Hit::Chrome => self.update(|state| state.click(ClickTarget::Chrome)),
            },
            MouseInput::Drag { x, y } => {
                if let Hit::Cell(cell) = self.layout.hit(x, y) {
                    self.cursor = cell;
                    self.update(|state| state.mouse_move(cell));
                }
            }
            MouseInput::Release { x, y } => {
                let target = match self.layout.hit(x, y) {
                    Hit::Cell(cell) => ClickTarget::Cell(cell),
                    Hit::Header(_) | Hit::Chrome => ClickTarget::Chrome,
                };
                self.update(|state| state.mouse_up().click(target));
            }
        }
    }

    fn move_cursor(&mut self, direction: DirectionKey, step: usize, extend: bool) {
        let view = self.state.view();
        let rows = view.visible_row_count();
        let columns = view.visible_column_count();
        if rows == 0 || columns == 0 {
            return;
        }

        let mut next = self.cursor;
        match direction {
            DirectionKey::Up => next.row = next.row.saturating_sub(step),
            DirectionKey::Down => next.row = next.row.saturating_add(step).min(rows - 1),
            DirectionKey::Left => next.column = next.column.saturating_sub(1),
            DirectionKey::Right => next.column = (next.column + 1).min(columns - 1),
        }

        let anchor = self
            .state
            .selection()
            .map_or(self.cursor, |selection| selection.anchor);
        self.cursor = next;
        self.follow_cursor = true;
        if extend {
            self.update(|state| state.select_range(CellSelection { anchor, end: next }));
        } else {
            self.update(|state| state.select_cell(next));
        }
    }

    fn column_name(&self, position: usize) -> Option<String> {
        self.state
            .view()
            .column(position)
            .map(|column| column.name.clone())
    }

    fn cycle_sort(&mut self, position: usize) {
        let Some(name) = self.column_name(position) else {
            return;
        };
        self.update(|state| state.toggle_sort(&name));
        self.status_line = match self.state.sort() {
            Some(spec) => format!("Sorted by {} {}", spec.column, spec.direction.arrow()),
            None => "Sort cleared".to_string(),
        };
    }

    fn open_filter_prompt(&mut self) {
        let Some(column) = self.state.view().column(self.cursor.column) else {
            self.status_line = "No column to filter".to_string();
            return;
        };
        let operators = TypeFamily::classify(&column.data_type)
            .operators()
            .iter()
            .map(|operator| operator.label())
            .collect::<Vec<_>>()
            .join(", ");
        self.status_line = format!("Operators: {operators}");
        self.prompt = Some(FilterPrompt {
            column: column.name.clone(),
            input: String::new(),
        });
    }

    fn submit_filter(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let expression = prompt.input.trim();
        if expression.is_empty() {
            self.update(|state| state.remove_filter(&prompt.column));
            self.status_line = format!("Filter removed from {}", prompt.column);
            return;
        }

        let Some(column) = self.state.result().column(&prompt.column).cloned() else {
            self.status_line = format!("Unknown column {}", prompt.column);
            return;
        };
        match ColumnFilter::parse(&column, expression) {
            Ok(filter) => {
                let label = filter.to_string();
                self.update(|state| state.apply_filter(filter));
                self.status_line = format!(
                    "Filter {label}: {} rows",
                    self.state.view().visible_row_count()
                );
            }
            Err(error) => {
                self.status_line = format!("Filter error: {error}");
                self.prompt = Some(prompt);
            }
        }
    }

    fn resize_column(&mut self, delta: i16) {
        let Some(name) = self.column_name(self.cursor.column) else {
            return;
        };
        let metrics = self.state.metrics();
        let width = self.state.widths().width(&name) + f32::from(delta) * metrics.char_width;
        self.update(|state| state.set_column_width(&name, width));
        self.status_line = format!("{name} width {}", self.state.widths().width(&name));
    }

    fn hide_column(&mut self) {
        let Some(name) = self.column_name(self.cursor.column) else {
            return;
        };
        self.update(|state| state.hide_column(&name));
        self.status_line = format!("Hid column {name}");
    }

    fn action_context(&self) -> ActionContext {
        let focused = self.column_name(self.cursor.column);
        ActionContext::from_state(&self.state, focused.as_deref())
    }

    fn invoke_ranked_action(&mut self, index: usize) {
        let context = self.action_context();
        let ranked = self.actions.rank_top_n(&context, FOOTER_ACTIONS_LIMIT);
        let Some(action) = ranked.get(index) else {
            self.status_line = format!("No action bound to slot {}", index + 1);
            return;
        };
        self.invoke(action.id);
    }

    fn invoke(&mut self, action_id: ActionId) {
        let context = self.action_context();
        match self.actions.invoke(action_id, &context) {
            Ok(invocation) => self.run_invocation(invocation),
            Err(error) => self.status_line = format!("Action error: {error}"),
        }
    }

    fn run_invocation(&mut self, invocation: ActionInvocation) {
        match invocation {
            ActionInvocation::Copy(scope) => {
                let text = match scope {
                    CopyScope::Selection => self.state.clipboard_text(),
                    CopyScope::All => copy_all(self.state.view()),
                };
                self.status_line = format!("Copied {} line(s) to clipboard", text.lines().count());
                self.pending_clipboard = Some(text);
            }
            ActionInvocation::Export(format) => self.export(format),
            ActionInvocation::LoadMore => self.load_more(),
            other => {
                self.update(|state| apply_invocation(state, &other));
                let display = self.state.display();
                self.status_line = match other {
                    ActionInvocation::ToggleWrap => {
                        format!("Wrap text {}", on_off(display.wrap_text))
                    }
                    ActionInvocation::ToggleLineBreaks => {
                        format!("Line breaks {}", on_off(display.show_line_breaks))
                    }
                    ActionInvocation::ClearFilters => "Filters cleared".to_string(),
                    ActionInvocation::ClearSort => "Sort cleared".to_string(),
                    ActionInvocation::ClearSelection => "Selection cleared".to_string(),
                    ActionInvocation::AutoFitColumn(column) => format!(
                        "{column} fitted to {}",
                        self.state.widths().width(&column)
                    ),
                    ActionInvocation::ShowAllColumns => "All columns shown".to_string(),
                    ActionInvocation::Copy(_)
                    | ActionInvocation::Export(_)
                    | ActionInvocation::LoadMore => String::new(),
                };
            }
        }
    }

    fn export(&mut self, format: ExportFormat) {
        let destination = self.export_dir.join(default_file_name(format));
        let request = self.state.export_request(format, destination);
        self.status_line = match write_export(&request) {
            Ok(summary) => format!(
                "Exported {} rows to {}",
                summary.rows,
                summary.path.display()
            ),
            Err(error) => {
                warn!(%error, "export failed");
                format!("Export failed: {error}")
            }
        };
    }

    fn load_more(&mut self) {
        match self.runtime.block_on(self.loader.next_page(&self.state)) {
            Ok(Some(page)) => {
                let fetched = page.rows.len();
                self.update(|state| state.append_rows(page.rows, page.row_count, page.has_more));
                self.status_line = format!(
                    "Loaded {fetched} more rows ({} total)",
                    self.state.status().loaded_rows
                );
            }
            Ok(None) => self.status_line = "No more rows to load".to_string(),
            Err(error) => {
                warn!(%error, "loading more rows failed");
                self.status_line = format!("Load more failed: {error}");
            }
        }
    }

    /// Lays out the grid for `area`: syncs the virtualizer, keeps the cursor
    /// on screen and records the spans used for drawing and hit testing.
    fn prepare(&mut self, area: Rect) {
        let row_count = self.state.view().visible_row_count();
        let regions = grid_regions(area, row_count);
        let viewport_height = f64::from(regions.body.height);
        let sizer = self.state.row_sizer();

        self.virtualizer
            .sync(self.state.layout_revision(), row_count, &sizer);
        if self.follow_cursor && row_count > 0 {
            let top = self.virtualizer.row_offset(self.cursor.row);
            let bottom = top + self.virtualizer.row_height(self.cursor.row);
            if top < self.scroll_offset {
                self.scroll_offset = top;
            } else if bottom > self.scroll_offset + viewport_height {
                self.scroll_offset = bottom - viewport_height;
            }
        }
        self.scroll_offset = self
            .virtualizer
            .clamp_scroll(self.scroll_offset, viewport_height);
        let window = self.virtualizer.window(
            ViewportMetrics::new(self.scroll_offset, viewport_height),
            self.state.metrics().overscan,
            &sizer,
        );

        self.column_offset = self.column_offset.min(self.cursor.column);
        let columns = loop {
            let spans = column_spans(&self.state, self.column_offset, regions.body);
            let cursor_visible = spans
                .iter()
                .any(|span| span.position == self.cursor.column && !span.truncated);
            if cursor_visible || self.column_offset >= self.cursor.column {
                break spans;
            }
            self.column_offset += 1;
        };

        self.layout = GridLayout {
            regions,
            columns,
            rows: row_spans(&self.virtualizer, &window, self.scroll_offset, regions.body),
            window,
        };
    }

    fn view(&self) -> ShellView<'_> {
        let context = self.action_context();
        ShellView {
            state: &self.state,
            layout: &self.layout,
            cursor: self.cursor,
            title: &self.title,
            status_line: &self.status_line,
            prompt: self
                .prompt
                .as_ref()
                .map(|prompt| (prompt.column.as_str(), prompt.input.as_str())),
            ranked_actions: self.actions.rank_top_n(&context, FOOTER_ACTIONS_LIMIT),
            palette_actions: self.actions.registry().enabled_actions(&context),
            palette_index: self.palette_index,
            show_palette: self.show_palette,
            show_help: self.show_help,
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Loads the first page from `source` and runs the grid until the user quits.
pub fn run<S: ResultSource>(source: S, options: ShellOptions) -> Result<(), TuiError> {
    let mut app = TuiApp::new(source, options)?;
    app.load();
    info!(title = %app.title, "grid shell started");

    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, &mut app);
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop<S: ResultSource>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut TuiApp<S>,
) -> Result<(), TuiError> {
    loop {
        terminal.draw(|frame| {
            app.prepare(frame.area());
            render::render(frame, &app.view());
        })?;

        if event::poll(TICK_RATE)? {
            let message = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.key_message(key),
                Event::Mouse(mouse) => map_mouse_event(mouse),
                _ => None,
            };
            if let Some(message) = message {
                app.handle(message);
            }
        }

        if let Some(text) = app.pending_clipboard.take() {
            clipboard::write_clipboard(terminal.backend_mut(), &text)?;
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn map_key_event(key: KeyEvent) -> Option<Msg> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('p')) => Some(Msg::TogglePalette),
        (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Char('y')) => Some(Msg::Copy),
        (_, KeyCode::Char('q')) => Some(Msg::Quit),
        (_, KeyCode::Char('?')) => Some(Msg::ToggleHelp),
        (_, KeyCode::Esc) => Some(Msg::Escape),
        (_, KeyCode::Enter) => Some(Msg::Submit),
        (KeyModifiers::SHIFT, KeyCode::Up) | (_, KeyCode::Char('K')) => {
            Some(Msg::Extend(DirectionKey::Up))
        }
        (KeyModifiers::SHIFT, KeyCode::Down) | (_, KeyCode::Char('J')) => {
            Some(Msg::Extend(DirectionKey::Down))
        }
        (KeyModifiers::SHIFT, KeyCode::Left) | (_, KeyCode::Char('H')) => {
            Some(Msg::Extend(DirectionKey::Left))
        }
        (KeyModifiers::SHIFT, KeyCode::Right) | (_, KeyCode::Char('L')) => {
            Some(Msg::Extend(DirectionKey::Right))
        }
        (_, KeyCode::Up | KeyCode::Char('k')) => Some(Msg::Move(DirectionKey::Up)),
        (_, KeyCode::Down | KeyCode::Char('j')) => Some(Msg::Move(DirectionKey::Down)),
        (_, KeyCode::Left | KeyCode::Char('h')) => Some(Msg::Move(DirectionKey::Left)),
        (_, KeyCode::Right | KeyCode::Char('l')) => Some(Msg::Move(DirectionKey::Right)),
        (_, KeyCode::PageUp) => Some(Msg::Page(DirectionKey::Up)),
        (_, KeyCode::PageDown) => Some(Msg::Page(DirectionKey::Down)),
        (_, KeyCode::Char('s')) => Some(Msg::CycleSort),
        (_, KeyCode::Char('/')) => Some(Msg::OpenFilterPrompt),
        (_, KeyCode::Char('w')) => Some(Msg::Invoke(ActionId::ToggleWrap)),
        (_, KeyCode::Char('b')) => Some(Msg::Invoke(ActionId::ToggleLineBreaks)),
        (_, KeyCode::Char('+' | '>')) => Some(Msg::ResizeColumn(RESIZE_STEP)),
        (_, KeyCode::Char('-' | '<')) => Some(Msg::ResizeColumn(-RESIZE_STEP)),
        (_, KeyCode::Char('=')) => Some(Msg::Invoke(ActionId::AutoFitColumn)),
        (_, KeyCode::Char('x')) => Some(Msg::HideColumn),
        (_, KeyCode::Char('a')) => Some(Msg::Invoke(ActionId::ShowAllColumns)),
        (_, KeyCode::Char('m')) => Some(Msg::Invoke(ActionId::LoadMore)),
        (_, KeyCode::Char('1')) => Some(Msg::InvokeActionSlot(0)),
        (_, KeyCode::Char('2')) => Some(Msg::InvokeActionSlot(1)),
        (_, KeyCode::Char('3')) => Some(Msg::InvokeActionSlot(2)),
        (_, KeyCode::Char('4')) => Some(Msg::InvokeActionSlot(3)),
        (_, KeyCode::Char('5')) => Some(Msg::InvokeActionSlot(4)),
        (_, KeyCode::Char('6')) => Some(Msg::InvokeActionSlot(5)),
        (_, KeyCode::Char('7')) => Some(Msg::InvokeActionSlot(6)),
        _ => None,
    }
}

fn map_prompt_key(key: KeyEvent) -> Option<Msg> {
    match key.code {
        KeyCode::Esc => Some(Msg::Escape),
        KeyCode::Enter => Some(Msg::Submit),
        KeyCode::Backspace => Some(Msg::PromptBackspace),
        KeyCode::Char(character) => Some(Msg::PromptInput(character)),
        _ => None,
    }
}

fn map_palette_key(key: KeyEvent) -> Option<Msg> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('p')) => Some(Msg::TogglePalette),
        (_, KeyCode::Esc) => Some(Msg::Escape),
        (_, KeyCode::Enter) => Some(Msg::Submit),
        (_, KeyCode::Up | KeyCode::Char('k')) => Some(Msg::Move(DirectionKey::Up)),
        (_, KeyCode::Down | KeyCode::Char('j')) => Some(Msg::Move(DirectionKey::Down)),
        _ => None,
    }
}

fn map_mouse_event(mouse: MouseEvent) -> Option<Msg> {
    let (x, y) = (mouse.column, mouse.row);
    let input = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => MouseInput::Press {
            x,
            y,
            extend: mouse.modifiers.contains(KeyModifiers::SHIFT),
        },
        MouseEventKind::Drag(MouseButton::Left) => MouseInput::Drag { x, y },
        MouseEventKind::Up(MouseButton::Left) => MouseInput::Release { x, y },
        MouseEventKind::ScrollDown => return Some(Msg::Scroll(SCROLL_STEP)),
        MouseEventKind::ScrollUp => return Some(Msg::Scroll(-SCROLL_STEP)),
        _ => return None,
    };
    Some(Msg::Mouse(input))
}
