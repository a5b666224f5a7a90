use anyhow::{anyhow, Result};
use chrono::{Days, Local, NaiveDate, Utc};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::ListState;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Terminal;
use reflect::calendar::{
    category_for, group_weeks, tokenize, week_label, DayCell, DayIntent, DayWindow, EntryIndex,
    InitialAnchorScroller, ScrollCoordinator, ScrollMetrics, TextToken, Viewport, DAYS_PER_WEEK,
};
use reflect::config::Config;
use reflect::model::{
    format_date, icon_cycle, parse_date, Category, CategoryColor, CategoryId, Entry, EntryId,
    Journal, Period, ReportId, DEFAULT_ICON,
};
use reflect::report::{HttpRelay, ReportGenerator};
use reflect::storage::{save_journal, JournalLocation};
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SCROLL_STEP: i64 = 3;
const MIN_CARD_WIDTH: usize = 12;

pub fn run(journal: Journal, location: JournalLocation, config: Config) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(journal, location, config);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    journal: Journal,
    location: JournalLocation,
    config: Config,
    index: EntryIndex,
    last_save: Instant,
    status: String,
    mode: Mode,
    view: ViewMode,
    calendar: Option<CalendarView>,
    reports: ReportsState,
    categories: CategoriesState,
    pending_report: Option<Period>,
}

enum Mode {
    Normal,
    CreatingEntry(EntryForm),
    EditingEntry { entry_id: EntryId, form: EntryForm },
    CreatingCategory(CategoryForm),
    EditingCategory { category_id: CategoryId, form: CategoryForm },
    ConfirmDelete(DeleteTarget),
}

#[derive(Clone)]
enum DeleteTarget {
    Entry(EntryId),
    Category(CategoryId),
    Report(ReportId),
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum ViewMode {
    Calendar,
    Reports,
    Categories,
}

impl ViewMode {
    fn label(&self) -> &'static str {
        match self {
            ViewMode::Calendar => "Calendar",
            ViewMode::Reports => "Reports",
            ViewMode::Categories => "Categories",
        }
    }
}

struct ReportsState {
    selected: usize,
    period: Period,
    content_scroll: u16,
}

struct CategoriesState {
    selected: usize,
}

/// Terminal rows seen through the calendar's pixel-based scroll model.
struct TerminalViewport {
    top_row: u32,
    content_rows: u32,
    client_rows: u32,
    row_height: u32,
}

impl TerminalViewport {
    fn max_top(&self) -> u32 {
        self.content_rows.saturating_sub(self.client_rows)
    }

    fn scroll_rows(&mut self, delta: i64) -> bool {
        let target = (i64::from(self.top_row) + delta).clamp(0, i64::from(self.max_top())) as u32;
        let changed = target != self.top_row;
        self.top_row = target;
        changed
    }
}

impl Viewport for TerminalViewport {
    fn metrics(&self) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top: self.top_row * self.row_height,
            scroll_height: self.content_rows * self.row_height,
            client_height: self.client_rows * self.row_height,
        }
    }

    fn set_scroll_top(&mut self, offset: u32) {
        self.top_row = (offset / self.row_height).min(self.max_top());
    }
}

/// Mounted while the calendar view is shown; dropped when the user leaves it.
struct CalendarView {
    today: NaiveDate,
    window: DayWindow,
    scroll: ScrollCoordinator,
    anchor: InitialAnchorScroller,
    viewport: TerminalViewport,
    card_height: u16,
    anchor_offset: u32,
    cursor: NaiveDate,
    entry_idx: usize,
}

impl CalendarView {
    fn mount(today: NaiveDate, config: &Config) -> Self {
        let cal = &config.calendar;
        CalendarView {
            today,
            window: DayWindow::initialize(today, cal),
            scroll: ScrollCoordinator::new(cal.scroll_threshold),
            anchor: InitialAnchorScroller::new(cal.initial_scroll_delay(), cal.scroll_top_offset),
            viewport: TerminalViewport {
                top_row: 0,
                content_rows: 0,
                client_rows: 0,
                row_height: config.tui.row_height,
            },
            card_height: config.tui.day_card_height,
            anchor_offset: cal.scroll_top_offset,
            cursor: today,
            entry_idx: 0,
        }
    }

    fn unmount(mut self) {
        self.anchor.cancel();
    }

    fn section_rows(&self) -> u32 {
        u32::from(self.card_height) + 2
    }

    fn week_top_px(&self, date: NaiveDate) -> Option<u32> {
        let pos = self.window.position(date)?;
        let week = (pos / DAYS_PER_WEEK) as u32;
        Some(week * self.section_rows() * self.viewport.row_height)
    }

    /// Top of today's day card: one header row below its week's top.
    fn today_card_top_px(&self) -> Option<u32> {
        self.week_top_px(self.today)
            .map(|top| top + self.viewport.row_height)
    }

    fn layout(&mut self, area: Rect) {
        let weeks = self.window.len().div_ceil(DAYS_PER_WEEK) as u32;
        self.viewport.client_rows = u32::from(area.height);
        self.viewport.content_rows = weeks * self.section_rows();
    }

    /// Runs between layout and paint: prepend compensation, then arming
    /// the initial scroll on the first render.
    fn after_layout(&mut self, now: Instant) {
        if self.scroll.after_layout(&mut self.window, &mut self.viewport) {
            debug!(top_row = self.viewport.top_row, "calendar offset compensated");
        }
        self.viewport.top_row = self.viewport.top_row.min(self.viewport.max_top());
        self.anchor.on_render(&self.window, now);
    }

    fn tick(&mut self, now: Instant) {
        let today_top = self.today_card_top_px();
        if self.anchor.poll(now, today_top, &mut self.viewport) {
            self.notify_scroll();
        }
    }

    fn deadline(&self) -> Option<Instant> {
        self.anchor.deadline()
    }

    fn notify_scroll(&mut self) {
        if let Some(ext) = self.scroll.on_scroll(&mut self.window, &self.viewport) {
            debug!(
                direction = ?ext.direction,
                first = %ext.first,
                last = %ext.last,
                "calendar window extended"
            );
        }
    }

    fn scroll_by(&mut self, rows: i64) {
        if self.viewport.scroll_rows(rows) {
            self.notify_scroll();
        }
    }

    fn page(&mut self, direction: i64) {
        let rows = i64::from(self.viewport.client_rows.max(1));
        self.scroll_by(direction * rows);
    }

    fn move_cursor(&mut self, days: i64) {
        let moved = if days >= 0 {
            self.cursor.checked_add_days(Days::new(days as u64))
        } else {
            self.cursor.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        let (Some(target), Some(first), Some(last)) = (moved, self.window.first(), self.window.last())
        else {
            return;
        };
        self.cursor = target.clamp(first, last);
        self.entry_idx = 0;
        self.reveal_cursor();
    }

    fn select_entry(&mut self, step: isize, len: usize) {
        if len == 0 {
            self.entry_idx = 0;
            return;
        }
        let next = (self.entry_idx as isize + step).clamp(0, len as isize - 1);
        self.entry_idx = next as usize;
    }

    fn jump_to_today(&mut self) {
        self.cursor = self.today;
        self.entry_idx = 0;
        if let Some(top) = self.today_card_top_px() {
            self.viewport
                .set_scroll_top(top.saturating_sub(self.anchor_offset));
            self.notify_scroll();
        }
    }

    fn reveal_cursor(&mut self) {
        let Some(pos) = self.window.position(self.cursor) else {
            return;
        };
        let section = self.section_rows();
        let week_top = (pos / DAYS_PER_WEEK) as u32 * section;
        let week_bottom = week_top + section;
        let before = self.viewport.top_row;
        if week_top < self.viewport.top_row {
            self.viewport.top_row = week_top;
        } else if week_bottom > self.viewport.top_row + self.viewport.client_rows {
            self.viewport.top_row = week_bottom.saturating_sub(self.viewport.client_rows);
        }
        self.viewport.top_row = self.viewport.top_row.min(self.viewport.max_top());
        if self.viewport.top_row != before {
            self.notify_scroll();
        }
    }

    fn draw(
        &mut self,
        f: &mut ratatui::Frame<'_>,
        area: Rect,
        categories: &[Category],
        index: &EntryIndex,
        now: Instant,
    ) {
        self.layout(area);
        self.after_layout(now);

        let section = self.section_rows() as usize;
        let top = self.viewport.top_row as usize;
        let height = area.height as usize;
        let weeks = group_weeks(self.window.days());
        let mut skip = top % section;
        let mut lines: Vec<Line<'static>> = Vec::with_capacity(height);
        for week in weeks.iter().skip(top / section) {
            if lines.len() >= height {
                break;
            }
            lines.extend(
                self.week_lines(week, area.width, categories, index)
                    .into_iter()
                    .skip(skip),
            );
            skip = 0;
        }
        lines.truncate(height);
        f.render_widget(Paragraph::new(lines), area);
    }

    fn week_lines(
        &self,
        week: &[NaiveDate],
        width: u16,
        categories: &[Category],
        index: &EntryIndex,
    ) -> Vec<Line<'static>> {
        let mut lines = Vec::with_capacity(self.section_rows() as usize);
        lines.push(week_header_line(week, width as usize));

        let card_width = (width as usize / DAYS_PER_WEEK).max(MIN_CARD_WIDTH);
        let mut cards: Vec<std::vec::IntoIter<Vec<Span<'static>>>> = week
            .iter()
            .map(|date| {
                let cell = DayCell::new(*date, self.today, index);
                let selected = if *date == self.cursor {
                    Some(self.entry_idx)
                } else {
                    None
                };
                day_card_rows(&cell, categories, card_width, self.card_height as usize, selected)
                    .into_iter()
            })
            .collect();
        for _ in 0..self.card_height {
            let mut spans = Vec::new();
            for card in cards.iter_mut() {
                spans.extend(card.next().unwrap_or_default());
            }
            lines.push(Line::from(spans));
        }
        lines.push(Line::raw(""));
        lines
    }
}

impl App {
    fn new(journal: Journal, location: JournalLocation, config: Config) -> Self {
        let status = format!("Loaded journal from {}", location.path.display());
        let index = EntryIndex::build(&journal.entries);
        let calendar = CalendarView::mount(Local::now().date_naive(), &config);
        App {
            journal,
            location,
            config,
            index,
            last_save: Instant::now(),
            status,
            mode: Mode::Normal,
            view: ViewMode::Calendar,
            calendar: Some(calendar),
            reports: ReportsState {
                selected: 0,
                period: Period::Week,
                content_scroll: 0,
            },
            categories: CategoriesState { selected: 0 },
            pending_report: None,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| self.draw(f))?;
            if let Some(period) = self.pending_report.take() {
                self.generate_report(period);
                continue;
            }
            if event::poll(self.poll_timeout(Instant::now()))? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            }
            if let Some(calendar) = self.calendar.as_mut() {
                calendar.tick(Instant::now());
            }
        }
        Ok(())
    }

    fn poll_timeout(&self, now: Instant) -> Duration {
        let tick = Duration::from_millis(self.config.tui.tick_ms);
        match self.calendar.as_ref().and_then(|c| c.deadline()) {
            Some(deadline) => deadline.saturating_duration_since(now).min(tick),
            None => tick,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::CreatingEntry(_) | Mode::EditingEntry { .. } => {
                self.handle_entry_form_key(key);
                Ok(false)
            }
            Mode::CreatingCategory(_) | Mode::EditingCategory { .. } => {
                self.handle_category_form_key(key);
                Ok(false)
            }
            Mode::ConfirmDelete(_) => {
                self.handle_confirm_key(key);
                Ok(false)
            }
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if !matches!(self.mode, Mode::Normal) {
            return;
        }
        let step = match mouse.kind {
            MouseEventKind::ScrollUp => -SCROLL_STEP,
            MouseEventKind::ScrollDown => SCROLL_STEP,
            _ => return,
        };
        match self.view {
            ViewMode::Calendar => {
                if let Some(calendar) = self.calendar.as_mut() {
                    calendar.scroll_by(step);
                }
            }
            ViewMode::Reports => self.scroll_report(step),
            ViewMode::Categories => {}
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('1') => {
                self.set_view(ViewMode::Calendar);
                return Ok(false);
            }
            KeyCode::Char('2') => {
                self.set_view(ViewMode::Reports);
                return Ok(false);
            }
            KeyCode::Char('3') => {
                self.set_view(ViewMode::Categories);
                return Ok(false);
            }
            _ => {}
        }

        match self.view {
            ViewMode::Calendar => self.handle_calendar_key(key),
            ViewMode::Reports => self.handle_reports_key(key),
            ViewMode::Categories => self.handle_categories_key(key),
        }
        Ok(false)
    }

    fn handle_calendar_key(&mut self, key: KeyEvent) {
        let Some(calendar) = self.calendar.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => calendar.move_cursor(-1),
            KeyCode::Right | KeyCode::Char('l') => calendar.move_cursor(1),
            KeyCode::Up => calendar.move_cursor(-(DAYS_PER_WEEK as i64)),
            KeyCode::Down => calendar.move_cursor(DAYS_PER_WEEK as i64),
            KeyCode::Char('k') => calendar.scroll_by(-SCROLL_STEP),
            KeyCode::Char('j') => calendar.scroll_by(SCROLL_STEP),
            KeyCode::PageUp => calendar.page(-1),
            KeyCode::PageDown => calendar.page(1),
            KeyCode::Char('[') => {
                let len = self.index.entries_on(calendar.cursor).len();
                calendar.select_entry(-1, len);
            }
            KeyCode::Char(']') => {
                let len = self.index.entries_on(calendar.cursor).len();
                calendar.select_entry(1, len);
            }
            KeyCode::Char('t') => {
                calendar.jump_to_today();
                self.status = "Back to today".into();
            }
            KeyCode::Char('n') => {
                let date = calendar.cursor;
                self.open_entry_form(date);
            }
            KeyCode::Char('e') => {
                let cell = DayCell::new(calendar.cursor, calendar.today, &self.index);
                match cell.edit_intent(calendar.entry_idx) {
                    Some(intent) => self.apply_intent(intent),
                    None => self.status = "No entry selected to edit".into(),
                }
            }
            KeyCode::Char('d') => {
                let cell = DayCell::new(calendar.cursor, calendar.today, &self.index);
                match cell.delete_intent(calendar.entry_idx) {
                    Some(intent) => self.apply_intent(intent),
                    None => self.status = "No entry selected to delete".into(),
                }
            }
            _ => {}
        }
    }

    fn handle_reports_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.reports.selected = self.reports.selected.saturating_sub(1);
                self.reports.content_scroll = 0;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.reports.selected + 1 < self.journal.reports.len() {
                    self.reports.selected += 1;
                    self.reports.content_scroll = 0;
                }
            }
            KeyCode::PageUp => self.scroll_report(-10),
            KeyCode::PageDown => self.scroll_report(10),
            KeyCode::Char('p') => {
                self.reports.period = self.reports.period.next();
                self.status = format!("Report period: {}", self.reports.period.label());
            }
            KeyCode::Char('g') => {
                let period = self.reports.period;
                self.status = format!("Generating {} report...", period.adjective());
                self.pending_report = Some(period);
            }
            KeyCode::Char('n') => self.open_entry_form(Local::now().date_naive()),
            KeyCode::Char('d') => match self.journal.reports.get(self.reports.selected) {
                Some(report) => {
                    self.mode = Mode::ConfirmDelete(DeleteTarget::Report(report.id.clone()));
                    self.status = "Delete this report? (y to confirm, n/Esc to cancel)".into();
                }
                None => self.status = "No report selected to delete".into(),
            },
            _ => {}
        }
    }

    fn handle_categories_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.categories.selected = self.categories.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.categories.selected + 1 < self.journal.categories.len() {
                    self.categories.selected += 1;
                }
            }
            KeyCode::Char('n') => {
                self.mode = Mode::CreatingCategory(CategoryForm::new());
                self.status =
                    "New category (Tab moves, ←/→ pick icon and color, Enter saves, Esc cancels)"
                        .into();
            }
            KeyCode::Char('e') => match self.journal.categories.get(self.categories.selected) {
                Some(category) => {
                    self.mode = Mode::EditingCategory {
                        category_id: category.id.clone(),
                        form: CategoryForm::from_category(category),
                    };
                    self.status = format!("Editing {}", category.name);
                }
                None => self.status = "No category selected to edit".into(),
            },
            KeyCode::Char('d') => match self.journal.categories.get(self.categories.selected) {
                Some(category) => {
                    let count = self.journal.entry_count_for(&category.id);
                    self.status = format!(
                        "Delete {} and its {} entries? (y to confirm, n/Esc to cancel)",
                        category.name, count
                    );
                    self.mode = Mode::ConfirmDelete(DeleteTarget::Category(category.id.clone()));
                }
                None => self.status = "No category selected to delete".into(),
            },
            _ => {}
        }
    }

    fn apply_intent(&mut self, intent: DayIntent) {
        match intent {
            DayIntent::Edit(entry) => {
                match EntryForm::from_entry(&entry, &self.journal.categories) {
                    Some(form) => {
                        self.status = format!("Editing {}", entry.id);
                        self.mode = Mode::EditingEntry {
                            entry_id: entry.id,
                            form,
                        };
                    }
                    None => {
                        self.status = format!(
                            "{} belongs to missing category {}; restore it before editing",
                            entry.id, entry.category_id
                        );
                    }
                }
            }
            DayIntent::Delete(entry_id) => {
                self.status = format!("Delete {}? (y to confirm, n/Esc to cancel)", entry_id);
                self.mode = Mode::ConfirmDelete(DeleteTarget::Entry(entry_id));
            }
        }
    }

    fn open_entry_form(&mut self, date: NaiveDate) {
        if self.journal.categories.is_empty() {
            self.status = "Create a category first".into();
            return;
        }
        self.mode = Mode::CreatingEntry(EntryForm::new(date));
        self.status = "New moment (Tab moves, ←/→ pick category, Enter saves, Esc cancels)".into();
    }

    fn handle_entry_form_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close = match &mut mode {
            Mode::CreatingEntry(form) => self.process_entry_form_key(None, form, key),
            Mode::EditingEntry { entry_id, form } => {
                let id = entry_id.clone();
                self.process_entry_form_key(Some(id), form, key)
            }
            _ => true,
        };
        self.mode = if close { Mode::Normal } else { mode };
    }

    fn process_entry_form_key(
        &mut self,
        entry_id: Option<EntryId>,
        form: &mut EntryForm,
        key: KeyEvent,
    ) -> bool {
        let category_count = self.journal.categories.len();
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return true;
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Left if form.field == EntryField::Category => {
                form.cycle_category(-1, category_count)
            }
            KeyCode::Right if form.field == EntryField::Category => {
                form.cycle_category(1, category_count)
            }
            KeyCode::Enter => match self.submit_entry(entry_id.as_deref(), form) {
                Ok(()) => return true,
                Err(err) => self.status = format!("Could not save: {}", err),
            },
            _ => {
                if let Some(field) = form.active_field_mut() {
                    edit_field(field, key);
                }
            }
        }
        false
    }

    fn submit_entry(&mut self, entry_id: Option<&str>, form: &EntryForm) -> Result<()> {
        let category_id = self
            .journal
            .categories
            .get(form.category_idx)
            .map(|c| c.id.clone())
            .ok_or_else(|| anyhow!("pick a category"))?;
        let date = parse_date(&form.date.value)?;
        let today = Local::now().date_naive();
        let mut next = self.journal.clone();
        let message = match entry_id {
            Some(id) => {
                next.update_entry(id, &form.text.value, &category_id, Some(date))?;
                format!("Updated {}", id)
            }
            None => {
                // today's entries keep the time they were written
                let day = if date == today { None } else { Some(date) };
                let id = next.add_entry(&form.text.value, &category_id, day, Utc::now())?;
                format!("Added {}", id)
            }
        };
        self.commit(next, message)?;
        if let Some(calendar) = self.calendar.as_mut() {
            if calendar.window.contains(date) {
                calendar.cursor = date;
                calendar.entry_idx = 0;
                calendar.reveal_cursor();
            }
        }
        Ok(())
    }

    fn handle_category_form_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close = match &mut mode {
            Mode::CreatingCategory(form) => self.process_category_form_key(None, form, key),
            Mode::EditingCategory { category_id, form } => {
                let id = category_id.clone();
                self.process_category_form_key(Some(id), form, key)
            }
            _ => true,
        };
        self.mode = if close { Mode::Normal } else { mode };
    }

    fn process_category_form_key(
        &mut self,
        category_id: Option<CategoryId>,
        form: &mut CategoryForm,
        key: KeyEvent,
    ) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return true;
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Left if form.field != CategoryField::Name => form.cycle(-1),
            KeyCode::Right if form.field != CategoryField::Name => form.cycle(1),
            KeyCode::Enter => {
                let mut next = self.journal.clone();
                let result = match category_id.as_deref() {
                    Some(id) => next
                        .update_category(id, &form.name.value, &form.icon, form.color)
                        .map(|_| format!("Updated category {}", form.name.value.trim())),
                    None => next
                        .add_category(&form.name.value, &form.icon, form.color)
                        .map(|_| format!("Added category {}", form.name.value.trim())),
                };
                match result
                    .map_err(anyhow::Error::from)
                    .and_then(|message| self.commit(next, message))
                {
                    Ok(()) => return true,
                    Err(err) => self.status = format!("Could not save: {}", err),
                }
            }
            _ => {
                if form.field == CategoryField::Name {
                    edit_field(&mut form.name, key);
                }
            }
        }
        false
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) {
        let target = match &self.mode {
            Mode::ConfirmDelete(target) => target.clone(),
            _ => return,
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let mut next = self.journal.clone();
                let result = match &target {
                    DeleteTarget::Entry(id) => {
                        next.delete_entry(id).map(|_| format!("Deleted {}", id))
                    }
                    DeleteTarget::Category(id) => next
                        .delete_category(id)
                        .map(|removed| format!("Deleted category {} and {} entries", id, removed)),
                    DeleteTarget::Report(id) => {
                        next.delete_report(id).map(|_| format!("Deleted report {}", id))
                    }
                };
                if let Err(err) = result
                    .map_err(anyhow::Error::from)
                    .and_then(|message| self.commit(next, message))
                {
                    self.status = format!("Delete failed: {}", err);
                }
                self.mode = Mode::Normal;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.status = "Delete canceled".into();
                self.mode = Mode::Normal;
            }
            _ => {}
        }
    }

    fn set_view(&mut self, view: ViewMode) {
        if self.view == view {
            return;
        }
        if self.view == ViewMode::Calendar {
            if let Some(calendar) = self.calendar.take() {
                calendar.unmount();
            }
        }
        if view == ViewMode::Calendar {
            self.calendar = Some(CalendarView::mount(Local::now().date_naive(), &self.config));
        }
        self.view = view;
        self.status = format!("Switched to {} view", view.label());
        self.ensure_bounds();
    }

    fn scroll_report(&mut self, delta: i64) {
        let next = (i64::from(self.reports.content_scroll) + delta).clamp(0, i64::from(u16::MAX));
        self.reports.content_scroll = next as u16;
    }

    fn generate_report(&mut self, period: Period) {
        let relay = match HttpRelay::new(&self.config.relay) {
            Ok(relay) => relay,
            Err(err) => {
                self.status = format!("Report failed: {}", err);
                return;
            }
        };
        let generated = ReportGenerator::new(&relay, &self.config.relay).generate(
            &self.journal,
            period,
            &Local::now(),
        );
        match generated {
            Ok(report) => {
                let mut next = self.journal.clone();
                next.add_report(report);
                let message = format!("Generated {} report", period.adjective());
                match self.commit(next, message) {
                    Ok(()) => {
                        self.reports.selected = 0;
                        self.reports.content_scroll = 0;
                    }
                    Err(err) => self.status = format!("Could not save report: {}", err),
                }
            }
            Err(err) => {
                warn!(error = %err, "report generation failed");
                self.status = format!("Report failed: {}", err);
            }
        }
    }

    fn commit(&mut self, next: Journal, message: impl Into<String>) -> Result<()> {
        commit_journal(&mut self.journal, &mut self.index, &self.location, next)?;
        self.last_save = Instant::now();
        self.status = message.into();
        self.ensure_bounds();
        Ok(())
    }

    fn ensure_bounds(&mut self) {
        self.reports.selected = self
            .reports
            .selected
            .min(self.journal.reports.len().saturating_sub(1));
        self.categories.selected = self
            .categories
            .selected
            .min(self.journal.categories.len().saturating_sub(1));
        if let Some(calendar) = self.calendar.as_mut() {
            let len = self.index.entries_on(calendar.cursor).len();
            calendar.entry_idx = calendar.entry_idx.min(len.saturating_sub(1));
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(f.size());

        self.draw_header(f, layout[0]);
        match self.view {
            ViewMode::Calendar => {
                if let Some(calendar) = self.calendar.as_mut() {
                    calendar.draw(
                        f,
                        layout[1],
                        &self.journal.categories,
                        &self.index,
                        Instant::now(),
                    );
                }
            }
            ViewMode::Reports => self.draw_reports(f, layout[1]),
            ViewMode::Categories => self.draw_categories(f, layout[1]),
        }
        self.draw_footer(f, layout[2]);

        match &self.mode {
            Mode::CreatingEntry(form) => self.draw_entry_form(f, "New Moment", form),
            Mode::EditingEntry { form, .. } => self.draw_entry_form(f, "Edit Entry", form),
            Mode::CreatingCategory(form) => self.draw_category_form(f, "New Category", form),
            Mode::EditingCategory { form, .. } => self.draw_category_form(f, "Edit Category", form),
            Mode::ConfirmDelete(target) => self.draw_confirm(f, target),
            Mode::Normal => {}
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "reflect ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                self.location.scope.label(),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("{}", self.location.path.display()),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("saved {}", format_elapsed(self.last_save)),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("  •  "),
            Span::styled(
                format!("view {}", self.view.label().to_lowercase()),
                Style::default().fg(Color::Magenta),
            ),
        ]);

        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_reports(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let sections = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(area);

        let mut state = ListState::default();
        let viewport = sections[0].height.saturating_sub(2) as usize;
        let reports = &self.journal.reports;
        let selected = self.reports.selected.min(reports.len().saturating_sub(1));
        *state.offset_mut() = adjust_offset(selected, 0, viewport, 1, reports.len());
        if !reports.is_empty() {
            state.select(Some(selected));
        }
        let items = if reports.is_empty() {
            vec![ListItem::new("No reports yet (g to generate)")]
        } else {
            reports
                .iter()
                .map(|r| {
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("{:<6}", r.period.label()),
                            Style::default().fg(Color::LightCyan),
                        ),
                        Span::raw(" "),
                        Span::styled(
                            format!(
                                "{} — {}",
                                r.start_date.with_timezone(&Local).format("%d.%m.%Y"),
                                r.end_date.with_timezone(&Local).format("%d.%m.%Y")
                            ),
                            Style::default().fg(Color::White),
                        ),
                    ]))
                })
                .collect()
        };
        let list = List::new(items)
            .block(titled_block(
                format!("Reports ({})", reports.len()),
                Color::Cyan,
                Color::Cyan,
            ))
            .highlight_style(selection_style());
        f.render_stateful_widget(list, sections[0], &mut state);

        let (title, body) = match reports.get(selected) {
            Some(report) => (
                format!(
                    "{} report • generated {}",
                    report.period.label(),
                    report
                        .generated_at
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M")
                ),
                report.content.clone(),
            ),
            None => (
                "AI insights".to_string(),
                format!(
                    "Generate a {} report with g; p switches between day, week and month.",
                    self.reports.period.adjective()
                ),
            ),
        };
        let content = Paragraph::new(body)
            .wrap(Wrap { trim: false })
            .scroll((self.reports.content_scroll, 0))
            .block(titled_block(
                format!("{}  [next: {}]", title, self.reports.period.label()),
                Color::Gray,
                Color::DarkGray,
            ));
        f.render_widget(content, sections[1]);
    }

    fn draw_categories(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let mut state = ListState::default();
        let viewport = area.height.saturating_sub(2) as usize;
        let categories = &self.journal.categories;
        let selected = self
            .categories
            .selected
            .min(categories.len().saturating_sub(1));
        *state.offset_mut() = adjust_offset(selected, 0, viewport, 1, categories.len());
        if !categories.is_empty() {
            state.select(Some(selected));
        }
        let items = if categories.is_empty() {
            vec![ListItem::new("No categories (n to add)")]
        } else {
            categories
                .iter()
                .map(|c| {
                    ListItem::new(Line::from(vec![
                        Span::styled("● ", Style::default().fg(category_color(c.color))),
                        Span::styled(
                            c.name.clone(),
                            Style::default()
                                .fg(Color::White)
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::raw("  "),
                        Span::styled(c.icon.clone(), Style::default().fg(Color::DarkGray)),
                        Span::raw("  "),
                        Span::styled(
                            format!("{} entries", self.journal.entry_count_for(&c.id)),
                            Style::default().fg(Color::Gray),
                        ),
                    ]))
                })
                .collect()
        };
        let list = List::new(items)
            .block(titled_block("Categories", Color::Cyan, Color::Cyan))
            .highlight_style(selection_style());
        f.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Length(2)])
            .split(area);

        let help_bar = Paragraph::new(self.footer_help_line())
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(help_bar, rows[0]);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);

        let status = Paragraph::new(self.status.clone())
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(status, bottom[0]);

        let (detail_line, title) = self.detail_content();
        let detail = Paragraph::new(detail_line)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(title),
            );
        f.render_widget(detail, bottom[1]);
    }

    fn footer_help_line(&self) -> Line<'static> {
        let mut hints = vec![
            ("1", Color::LightCyan, "calendar"),
            ("2", Color::LightCyan, "reports"),
            ("3", Color::LightCyan, "categories"),
        ];
        hints.extend_from_slice(match self.view {
            ViewMode::Calendar => &[
                ("←↑↓→", Color::LightCyan, "day/week"),
                ("j k PgUp PgDn", Color::LightCyan, "scroll"),
                ("[ ]", Color::LightCyan, "entry"),
                ("t", Color::LightGreen, "today"),
                ("n", Color::LightMagenta, "new"),
                ("e", Color::LightYellow, "edit"),
                ("d", Color::LightRed, "delete"),
            ][..],
            ViewMode::Reports => &[
                ("↑↓", Color::LightCyan, "browse"),
                ("PgUp PgDn", Color::LightCyan, "scroll"),
                ("p", Color::LightGreen, "period"),
                ("g", Color::LightMagenta, "generate"),
                ("d", Color::LightRed, "delete"),
            ][..],
            ViewMode::Categories => &[
                ("↑↓", Color::LightCyan, "browse"),
                ("n", Color::LightMagenta, "new"),
                ("e", Color::LightYellow, "edit"),
                ("d", Color::LightRed, "delete"),
            ][..],
        });
        hints.push(("q", Color::LightRed, "quit"));

        let mut spans = Vec::with_capacity(hints.len() * 2);
        for (i, (key, color, label)) in hints.into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(key, Style::default().fg(color)));
            spans.push(Span::raw(format!(" {}", label)));
        }
        Line::from(spans)
    }

    fn detail_content(&self) -> (Line<'static>, String) {
        match self.view {
            ViewMode::Calendar => self.calendar_detail_content(),
            ViewMode::Reports => (
                Line::from(format!(
                    "{} stored, next period {}",
                    self.journal.reports.len(),
                    self.reports.period.label()
                )),
                "Reports".into(),
            ),
            ViewMode::Categories => (
                Line::from(format!(
                    "{} categories, {} entries",
                    self.journal.categories.len(),
                    self.journal.entries.len()
                )),
                "Journal".into(),
            ),
        }
    }

    fn calendar_detail_content(&self) -> (Line<'static>, String) {
        let Some(calendar) = self.calendar.as_ref() else {
            return (Line::from(""), "Selected".into());
        };
        let title = format_date(calendar.cursor);
        let entries = self.index.entries_on(calendar.cursor);
        match entries.get(calendar.entry_idx) {
            Some(entry) => (
                selected_entry_detail(entry, category_for(entry, &self.journal.categories)),
                title,
            ),
            None => (Line::from("No entries on this day"), title),
        }
    }

    fn draw_entry_form(&self, f: &mut ratatui::Frame<'_>, title: &str, form: &EntryForm) {
        let area = centered_rect(60, 40, f.size());
        f.render_widget(Clear, area);
        let category = self
            .journal
            .categories
            .get(form.category_idx)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "(none)".into());
        let mut lines = field_lines("Text", &form.text, form.field == EntryField::Text);
        lines.push(choice_line(
            "Category",
            &category,
            form.field == EntryField::Category,
        ));
        lines.extend(field_lines(
            "Date",
            &form.date,
            form.field == EntryField::Date,
        ));
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            "Tab next field • ←/→ category • Enter save • Esc cancel",
            Style::default().fg(Color::DarkGray),
        ));
        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(titled_block(title, Color::Cyan, Color::Cyan));
        f.render_widget(paragraph, area);
    }

    fn draw_category_form(&self, f: &mut ratatui::Frame<'_>, title: &str, form: &CategoryForm) {
        let area = centered_rect(50, 35, f.size());
        f.render_widget(Clear, area);
        let mut lines = field_lines("Name", &form.name, form.field == CategoryField::Name);
        lines.push(choice_line(
            "Icon",
            &form.icon,
            form.field == CategoryField::Icon,
        ));
        let mut color_line = choice_line(
            "Color",
            form.color.label(),
            form.field == CategoryField::Color,
        );
        color_line
            .spans
            .push(Span::styled("  ●", Style::default().fg(category_color(form.color))));
        lines.push(color_line);
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            "Tab next field • ←/→ change • Enter save • Esc cancel",
            Style::default().fg(Color::DarkGray),
        ));
        let paragraph =
            Paragraph::new(lines).block(titled_block(title, Color::Cyan, Color::Cyan));
        f.render_widget(paragraph, area);
    }

    fn draw_confirm(&self, f: &mut ratatui::Frame<'_>, target: &DeleteTarget) {
        let area = centered_rect(50, 20, f.size());
        f.render_widget(Clear, area);
        let message = match target {
            DeleteTarget::Entry(id) => match self.journal.entry(id) {
                Some(entry) => format!("Delete this entry?\n\n{}", truncate_text(entry.text(), 80)),
                None => format!("Delete entry {}?", id),
            },
            DeleteTarget::Category(id) => match self.journal.category(id) {
                Some(category) => format!(
                    "Delete category {}?\n\nIts {} entries will be deleted too.",
                    category.name,
                    self.journal.entry_count_for(id)
                ),
                None => format!("Delete category {}?", id),
            },
            DeleteTarget::Report(id) => format!("Delete report {}?", id),
        };
        let paragraph = Paragraph::new(format!("{}\n\ny confirm • n/Esc cancel", message))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(titled_block("Confirm", Color::LightRed, Color::LightRed));
        f.render_widget(paragraph, area);
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum EntryField {
    Text,
    Category,
    Date,
}

struct EntryForm {
    text: FieldValue,
    category_idx: usize,
    date: FieldValue,
    field: EntryField,
}

impl EntryForm {
    fn new(date: NaiveDate) -> Self {
        EntryForm {
            text: FieldValue::new(""),
            category_idx: 0,
            date: FieldValue::new(&format_date(date)),
            field: EntryField::Text,
        }
    }

    /// `None` when the entry's category is gone; editing it would silently
    /// move the entry elsewhere.
    fn from_entry(entry: &Entry, categories: &[Category]) -> Option<Self> {
        let category_idx = categories
            .iter()
            .position(|c| c.id == entry.category_id)?;
        Some(EntryForm {
            text: FieldValue::new(entry.text()),
            category_idx,
            date: FieldValue::new(&format_date(entry.local_date())),
            field: EntryField::Text,
        })
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            EntryField::Text => EntryField::Category,
            EntryField::Category => EntryField::Date,
            EntryField::Date => EntryField::Text,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            EntryField::Text => EntryField::Date,
            EntryField::Category => EntryField::Text,
            EntryField::Date => EntryField::Category,
        };
    }

    fn cycle_category(&mut self, step: isize, len: usize) {
        if len == 0 {
            return;
        }
        let next = (self.category_idx as isize + step).rem_euclid(len as isize);
        self.category_idx = next as usize;
    }

    fn active_field_mut(&mut self) -> Option<&mut FieldValue> {
        match self.field {
            EntryField::Text => Some(&mut self.text),
            EntryField::Date => Some(&mut self.date),
            EntryField::Category => None,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum CategoryField {
    Name,
    Icon,
    Color,
}

struct CategoryForm {
    name: FieldValue,
    icon: String,
    color: CategoryColor,
    field: CategoryField,
}

impl CategoryForm {
    fn new() -> Self {
        CategoryForm {
            name: FieldValue::new(""),
            icon: icon_cycle(DEFAULT_ICON, 1).to_string(),
            color: CategoryColor::Blue,
            field: CategoryField::Name,
        }
    }

    fn from_category(category: &Category) -> Self {
        CategoryForm {
            name: FieldValue::new(&category.name),
            icon: category.icon.clone(),
            color: category.color,
            field: CategoryField::Name,
        }
    }

    fn next_field(&mut self) {
        self.field = match self.field {
            CategoryField::Name => CategoryField::Icon,
            CategoryField::Icon => CategoryField::Color,
            CategoryField::Color => CategoryField::Name,
        };
    }

    fn prev_field(&mut self) {
        self.field = match self.field {
            CategoryField::Name => CategoryField::Color,
            CategoryField::Icon => CategoryField::Name,
            CategoryField::Color => CategoryField::Icon,
        };
    }

    fn cycle(&mut self, step: isize) {
        match self.field {
            CategoryField::Icon => self.icon = icon_cycle(&self.icon, step).to_string(),
            CategoryField::Color => self.color = self.color.cycle(step),
            CategoryField::Name => {}
        }
    }
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new(value: &str) -> Self {
        FieldValue {
            value: value.to_string(),
            cursor: value.len(),
        }
    }

    fn move_left(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor = prev_char_boundary(self.cursor, &self.value);
    }

    fn move_right(&mut self) {
        if self.cursor >= self.value.len() {
            return;
        }
        self.cursor = next_char_boundary(self.cursor, &self.value);
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = prev_char_boundary(self.cursor, &self.value);
        self.value.drain(prev..self.cursor);
        self.cursor = prev;
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

fn edit_field(field: &mut FieldValue, key: KeyEvent) {
    match key.code {
        KeyCode::Left => field.move_left(),
        KeyCode::Right => field.move_right(),
        KeyCode::Home => field.cursor = 0,
        KeyCode::End => field.cursor = field.value.len(),
        KeyCode::Backspace => field.backspace(),
        KeyCode::Char(c) => {
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
            {
                field.insert_char(c);
            }
        }
        _ => {}
    }
}

/// Saves `next` and swaps it in with a fresh index. On failure the
/// current journal and index stay as they were.
fn commit_journal(
    journal: &mut Journal,
    index: &mut EntryIndex,
    location: &JournalLocation,
    next: Journal,
) -> Result<()> {
    if let Err(err) = save_journal(location, &next) {
        warn!(error = %err, "saving journal failed");
        return Err(err);
    }
    *index = EntryIndex::build(&next.entries);
    *journal = next;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn titled_block(title: impl Into<String>, fg: Color, border: Color) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            title.into(),
            Style::default().fg(fg).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

fn selection_style() -> Style {
    Style::default()
        .bg(Color::LightCyan)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

fn category_color(color: CategoryColor) -> Color {
    match color {
        CategoryColor::Blue => Color::Blue,
        CategoryColor::Green => Color::Green,
        CategoryColor::Red => Color::Red,
        CategoryColor::Purple => Color::Magenta,
        CategoryColor::Yellow => Color::Yellow,
        CategoryColor::Orange => Color::Rgb(249, 115, 22),
        CategoryColor::Pink => Color::Rgb(236, 72, 153),
        CategoryColor::Teal => Color::Rgb(20, 184, 166),
        CategoryColor::Indigo => Color::Rgb(99, 102, 241),
    }
}

fn adjust_offset(
    selected: usize,
    current_offset: usize,
    viewport: usize,
    scrolloff: usize,
    len: usize,
) -> usize {
    if viewport == 0 || len == 0 {
        return 0;
    }
    let max_offset = len.saturating_sub(viewport);
    let margin = scrolloff.min(viewport.saturating_sub(1));
    let mut offset = current_offset.min(max_offset);
    if selected < offset.saturating_add(margin) {
        offset = selected.saturating_sub(margin);
    } else {
        let upper = offset
            .saturating_add(viewport.saturating_sub(1))
            .saturating_sub(margin);
        if selected > upper {
            offset = selected.saturating_add(margin + 1).saturating_sub(viewport);
        }
    }
    offset.min(max_offset)
}

fn week_header_line(week: &[NaiveDate], width: usize) -> Line<'static> {
    let label = format!(" {} ", week_label(week));
    let side = width.saturating_sub(label.chars().count()) / 2;
    let rule = "─".repeat(side);
    Line::from(vec![
        Span::styled(rule.clone(), Style::default().fg(Color::DarkGray)),
        Span::styled(
            label,
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(rule, Style::default().fg(Color::DarkGray)),
    ])
}

/// One card as `height` rows of exactly `width` cells: border, title, year,
/// divider, entries, border.
fn day_card_rows(
    cell: &DayCell<'_>,
    categories: &[Category],
    width: usize,
    height: usize,
    selected: Option<usize>,
) -> Vec<Vec<Span<'static>>> {
    let inner = width.saturating_sub(4);
    let is_cursor = selected.is_some();
    let border_style = if is_cursor {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else if cell.is_today {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let border_char = if cell.is_today || is_cursor { "=" } else { "-" };
    let horizontal = format!("+{}+", border_char.repeat(width.saturating_sub(2)));
    let framed = |content: Vec<Span<'static>>, used: usize| -> Vec<Span<'static>> {
        let mut row = vec![Span::styled("| ", border_style)];
        row.extend(content);
        row.push(Span::raw(" ".repeat(inner.saturating_sub(used))));
        row.push(Span::styled(" |", border_style));
        row
    };

    let title_style = if cell.is_today {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    };
    let title = truncate_text(&cell.title(), inner);
    let title_len = title.chars().count();
    let year = truncate_text(&cell.year_label(), inner);
    let year_len = year.chars().count();

    let mut rows = vec![
        vec![Span::styled(horizontal.clone(), border_style)],
        framed(vec![Span::styled(title, title_style)], title_len),
        framed(
            vec![Span::styled(year, Style::default().fg(Color::DarkGray))],
            year_len,
        ),
        vec![Span::styled(
            format!("|{}|", "-".repeat(width.saturating_sub(2))),
            border_style,
        )],
    ];

    let body_rows = height.saturating_sub(5);
    let mut body: Vec<Vec<Span<'static>>> = Vec::with_capacity(body_rows);
    if cell.is_empty() {
        if body_rows > 0 {
            let label = truncate_text("Empty", inner);
            let pad = inner.saturating_sub(label.chars().count()) / 2;
            let used = pad + label.chars().count();
            body.push(framed(
                vec![
                    Span::raw(" ".repeat(pad)),
                    Span::styled(label, Style::default().fg(Color::DarkGray)),
                ],
                used,
            ));
        }
    } else {
        let total = cell.entries.len();
        let visible = if total > body_rows {
            body_rows.saturating_sub(1)
        } else {
            body_rows
        };
        let focus = selected.unwrap_or(0).min(total.saturating_sub(1));
        let offset = adjust_offset(focus, 0, visible, 0, total);
        for (idx, entry) in cell.entries.iter().enumerate().skip(offset).take(visible) {
            let category = category_for(entry, categories);
            let (spans, used) = entry_spans(entry, category, inner, selected == Some(idx));
            body.push(framed(spans, used));
        }
        let hidden = total - visible.min(total);
        if hidden > 0 && body_rows > 0 {
            let more = truncate_text(&format!("+{} more", hidden), inner);
            let used = more.chars().count();
            body.push(framed(
                vec![Span::styled(more, Style::default().fg(Color::DarkGray))],
                used,
            ));
        }
    }
    while body.len() < body_rows {
        body.push(framed(Vec::new(), 0));
    }
    rows.extend(body);
    rows.push(vec![Span::styled(horizontal, border_style)]);
    rows.truncate(height);
    rows
}

fn entry_spans(
    entry: &Entry,
    category: Option<&Category>,
    budget: usize,
    selected: bool,
) -> (Vec<Span<'static>>, usize) {
    let marker_color = category
        .map(|c| category_color(c.color))
        .unwrap_or(Color::Gray);
    let mut spans = vec![Span::styled(
        if selected { "›" } else { "●" },
        Style::default().fg(marker_color),
    )];
    let mut used = 1;
    let highlight = if selected {
        Modifier::REVERSED
    } else {
        Modifier::empty()
    };
    for token in tokenize(entry.text()) {
        if used + 1 >= budget {
            break;
        }
        let (word, style) = match token {
            TextToken::Tag(tag) => (
                tag,
                Style::default()
                    .fg(Color::LightBlue)
                    .add_modifier(Modifier::BOLD | highlight),
            ),
            TextToken::Word(word) => (word, Style::default().fg(Color::Gray).add_modifier(highlight)),
        };
        let room = budget - used - 1;
        let piece = truncate_text(word, room);
        used += 1 + piece.chars().count();
        spans.push(Span::raw(" "));
        spans.push(Span::styled(piece, style));
    }
    (spans, used.min(budget))
}

fn field_lines(label: &str, field: &FieldValue, active: bool) -> Vec<Line<'static>> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    vec![Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])]
}

fn choice_line(label: &str, value: &str, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let shown = if active {
        format!("‹ {} ›", value)
    } else {
        value.to_string()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(shown, value_style),
    ])
}

fn selected_entry_detail(entry: &Entry, category: Option<&Category>) -> Line<'static> {
    let mut spans = vec![Span::styled(
        category.map(|c| c.name.clone()).unwrap_or_else(|| "Unknown".into()),
        Style::default()
            .fg(category.map(|c| category_color(c.color)).unwrap_or(Color::Gray))
            .add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        entry
            .created_at
            .with_timezone(&Local)
            .format("%H:%M")
            .to_string(),
        Style::default().fg(Color::LightYellow),
    ));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        entry.text().to_string(),
        Style::default().fg(Color::White),
    ));
    if !entry.tags().is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            entry.tags().join(" "),
            Style::default().fg(Color::LightMagenta),
        ));
    }
    Line::from(spans)
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max <= 3 {
        return text.chars().take(max).collect();
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

fn prev_char_boundary(cursor: usize, text: &str) -> usize {
    text[..cursor]
        .char_indices()
        .next_back()
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

fn next_char_boundary(cursor: usize, text: &str) -> usize {
    text[cursor..]
        .chars()
        .next()
        .map(|ch| cursor + ch.len_utf8())
        .unwrap_or(text.len())
}

fn format_elapsed(last: Instant) -> String {
    let secs = last.elapsed().as_secs();
    if secs < 60 {
        format!("{}s ago", secs)
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else {
        format!("{}h ago", secs / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport() -> TerminalViewport {
        TerminalViewport {
            top_row: 10,
            content_rows: 264,
            client_rows: 40,
            row_height: 20,
        }
    }

    #[test]
    fn terminal_viewport_reports_pixels() {
        let vp = viewport();
        assert_eq!(
            vp.metrics(),
            ScrollMetrics {
                scroll_top: 200,
                scroll_height: 5280,
                client_height: 800,
            }
        );
    }

    #[test]
    fn terminal_viewport_clamps_scrolling() {
        let mut vp = viewport();
        assert!(vp.scroll_rows(-100));
        assert_eq!(vp.top_row, 0);
        assert!(!vp.scroll_rows(-1));
        vp.set_scroll_top(1_000_000);
        assert_eq!(vp.top_row, 224);
        vp.set_scroll_top(1680);
        assert_eq!(vp.top_row, 84);
    }

    #[test]
    fn calendar_prepend_keeps_rows_under_the_viewport() {
        let config = Config::default();
        let today = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let mut view = CalendarView::mount(today, &config);
        view.layout(Rect::new(0, 0, 120, 40));
        let section = view.section_rows();
        assert_eq!(view.viewport.content_rows, 24 * section);

        view.viewport.top_row = 5;
        view.notify_scroll();
        assert_eq!(view.window.len(), 168 + 28);
        view.layout(Rect::new(0, 0, 120, 40));
        view.after_layout(Instant::now());
        assert_eq!(view.viewport.top_row, 5 + 4 * section);
        assert!(view.window.is_idle());
    }

    #[test]
    fn calendar_anchor_scrolls_today_below_the_offset() {
        let config = Config::default();
        let today = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let mut view = CalendarView::mount(today, &config);
        let start = Instant::now();
        view.layout(Rect::new(0, 0, 120, 40));
        view.after_layout(start);
        view.tick(start + Duration::from_millis(200));
        let card_row = 8 * view.section_rows() + 1;
        assert_eq!(view.viewport.top_row, card_row - 80 / config.tui.row_height);
        let gap_px = (card_row - view.viewport.top_row) * config.tui.row_height;
        assert_eq!(gap_px, 80);
        assert_eq!(view.window.len(), 168);
    }

    #[test]
    fn cursor_stays_inside_the_window() {
        let config = Config::default();
        let today = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let mut view = CalendarView::mount(today, &config);
        view.layout(Rect::new(0, 0, 120, 40));
        view.move_cursor(-10_000);
        assert_eq!(Some(view.cursor), view.window.first());
    }

    #[test]
    fn day_card_has_fixed_shape() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let index = EntryIndex::default();
        let cell = DayCell::new(today, today, &index);
        let rows = day_card_rows(&cell, &[], 16, 9, None);
        assert_eq!(rows.len(), 9);
        for row in rows {
            let width: usize = row.iter().map(|s| s.content.chars().count()).sum();
            assert_eq!(width, 16);
        }
    }

    #[test]
    fn failed_save_keeps_journal_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file").unwrap();
        let location = JournalLocation {
            path: blocker.join("journal.yml"),
            scope: reflect::storage::JournalScope::Project,
        };

        let mut journal = Journal::seeded();
        let mut index = EntryIndex::build(&journal.entries);
        let mut next = journal.clone();
        let day = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        next.add_entry("lost on save", "1", Some(day), Utc::now()).unwrap();

        let result = commit_journal(&mut journal, &mut index, &location, next);
        assert!(result.is_err());
        assert!(journal.entries.is_empty());
        assert!(index.is_empty());
        assert!(index.entries_on(day).is_empty());
    }

    #[test]
    fn successful_save_swaps_journal_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let location = JournalLocation {
            path: dir.path().join("journal.yml"),
            scope: reflect::storage::JournalScope::Project,
        };

        let mut journal = Journal::seeded();
        let mut index = EntryIndex::build(&journal.entries);
        let mut next = journal.clone();
        let day = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        next.add_entry("kept", "1", Some(day), Utc::now()).unwrap();

        commit_journal(&mut journal, &mut index, &location, next).unwrap();
        assert_eq!(journal.entries.len(), 1);
        assert_eq!(index.entries_on(day).len(), 1);
        assert!(location.path.exists());
    }

    #[test]
    fn entry_with_missing_category_is_not_editable() {
        let categories = Journal::seeded().categories;
        let orphan = Entry::new("x".into(), "gone".into(), "orphan", Utc::now());
        assert!(EntryForm::from_entry(&orphan, &categories).is_none());

        let filed = Entry::new("y".into(), "3".into(), "ran", Utc::now());
        let form = EntryForm::from_entry(&filed, &categories).unwrap();
        assert_eq!(form.category_idx, 2);
    }

    #[test]
    fn truncates_with_ellipsis() {
        assert_eq!(truncate_text("journal", 10), "journal");
        assert_eq!(truncate_text("journaling", 7), "jour...");
        assert_eq!(truncate_text("abc", 0), "");
    }
}
